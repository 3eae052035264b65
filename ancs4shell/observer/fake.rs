//! In-memory object tree standing in for BlueZ in tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedSender};
use futures::stream::{BoxStream, StreamExt};

use crate::common::dbus::parent_path;
use crate::common::external_apis::{GattProvider, Sample};
use crate::error::Error;
use crate::observer::ancs::constants::{
    ANCS_SERVICE, CONTROL_POINT_CHAR, DATA_SOURCE_CHAR, NOTIFICATION_SOURCE_CHAR,
};
use crate::observer::discovery::AncsHandles;

#[derive(Debug, Default, Clone)]
struct FakeObject {
    connected: Option<bool>,
    uuid: Option<String>,
    value: Vec<u8>,
    battery: Option<u8>,
}

/// Clones share state, so a test can keep a handle while a bridge owns another.
#[derive(Clone, Default)]
pub(crate) struct FakeProvider {
    objects: Arc<Mutex<BTreeMap<String, FakeObject>>>,
    writes: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    notifying: Arc<Mutex<Vec<String>>>,
    fail_writes: Arc<Mutex<bool>>,
    pushed: Arc<Mutex<Option<UnboundedSender<Result<Sample, Error>>>>>,
}

fn failure(what: &str, path: &str) -> Error {
    Error::Dbus(zbus::Error::Failure(format!("{}: {}", what, path)))
}

impl FakeProvider {
    pub(crate) fn with_phone(device: &str) -> Self {
        let provider = Self::default();
        provider.add_phone(device);
        provider
    }

    pub(crate) fn add_phone(&self, device: &str) {
        let adapter = parent_path(device).unwrap_or("/").to_string();
        self.add_object(&adapter);
        self.add_device(device, true);
        self.set_battery(device, Some(80));
        let service = format!("{}/service0030", device);
        self.add_service(&service, ANCS_SERVICE);
        self.add_characteristic(&format!("{}/char0031", service), NOTIFICATION_SOURCE_CHAR);
        self.add_characteristic(&format!("{}/char0034", service), CONTROL_POINT_CHAR);
        self.add_characteristic(&format!("{}/char0036", service), DATA_SOURCE_CHAR);
    }

    pub(crate) fn handles(device: &str) -> AncsHandles {
        AncsHandles {
            device: device.to_string(),
            notification_source: format!("{}/service0030/char0031", device),
            control_point: format!("{}/service0030/char0034", device),
            data_source: format!("{}/service0030/char0036", device),
        }
    }

    pub(crate) fn add_object(&self, path: &str) {
        self.objects
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default();
    }

    fn update(&self, path: &str, f: impl FnOnce(&mut FakeObject)) {
        let mut objects = self.objects.lock().unwrap();
        f(objects.entry(path.to_string()).or_default());
    }

    pub(crate) fn add_device(&self, path: &str, connected: bool) {
        self.update(path, |o| o.connected = Some(connected));
    }

    pub(crate) fn set_connected(&self, path: &str, connected: bool) {
        self.add_device(path, connected);
    }

    pub(crate) fn add_service(&self, path: &str, uuid: &str) {
        self.update(path, |o| o.uuid = Some(uuid.to_string()));
    }

    pub(crate) fn add_characteristic(&self, path: &str, uuid: &str) {
        self.update(path, |o| o.uuid = Some(uuid.to_string()));
    }

    pub(crate) fn set_value(&self, path: &str, value: &[u8]) {
        self.update(path, |o| o.value = value.to_vec());
    }

    pub(crate) fn set_battery(&self, path: &str, percentage: Option<u8>) {
        self.update(path, |o| o.battery = percentage);
    }

    pub(crate) fn fail_writes(&self) {
        *self.fail_writes.lock().unwrap() = true;
    }

    pub(crate) fn writes(&self) -> Vec<(String, Vec<u8>)> {
        self.writes.lock().unwrap().clone()
    }

    pub(crate) fn notifying(&self) -> Vec<String> {
        self.notifying.lock().unwrap().clone()
    }

    /// Delivers a sample to the stream returned by `watch`.
    pub(crate) fn push(&self, sample: Sample) {
        if let Some(tx) = self.pushed.lock().unwrap().as_ref() {
            tx.unbounded_send(Ok(sample)).unwrap();
        }
    }

    pub(crate) fn push_error(&self, error: Error) {
        if let Some(tx) = self.pushed.lock().unwrap().as_ref() {
            tx.unbounded_send(Err(error)).unwrap();
        }
    }

    /// Ends the stream returned by `watch`.
    pub(crate) fn close(&self) {
        self.pushed.lock().unwrap().take();
    }

    fn object(&self, path: &str) -> Result<FakeObject, Error> {
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| failure("no such object", path))
    }
}

#[async_trait]
impl GattProvider for FakeProvider {
    async fn children(&self, path: &str) -> Result<Vec<String>, Error> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|object| parent_path(object) == Some(path))
            .cloned()
            .collect())
    }

    async fn is_connected(&self, device: &str) -> Result<bool, Error> {
        self.object(device)?
            .connected
            .ok_or_else(|| failure("not a device", device))
    }

    async fn service_uuid(&self, service: &str) -> Result<String, Error> {
        self.object(service)?
            .uuid
            .ok_or_else(|| failure("no UUID", service))
    }

    async fn characteristic_uuid(&self, characteristic: &str) -> Result<String, Error> {
        self.object(characteristic)?
            .uuid
            .ok_or_else(|| failure("no UUID", characteristic))
    }

    async fn start_notify(&self, characteristic: &str) -> Result<(), Error> {
        self.object(characteristic)?;
        self.notifying
            .lock()
            .unwrap()
            .push(characteristic.to_string());
        Ok(())
    }

    async fn read_value(&self, characteristic: &str) -> Result<Vec<u8>, Error> {
        Ok(self.object(characteristic)?.value)
    }

    async fn write_value(&self, characteristic: &str, value: &[u8]) -> Result<(), Error> {
        self.object(characteristic)?;
        if *self.fail_writes.lock().unwrap() {
            return Err(failure("write failed", characteristic));
        }
        self.writes
            .lock()
            .unwrap()
            .push((characteristic.to_string(), value.to_vec()));
        Ok(())
    }

    async fn has_battery(&self, device: &str) -> Result<bool, Error> {
        Ok(self.object(device)?.battery.is_some())
    }

    async fn battery_percentage(&self, device: &str) -> Result<u8, Error> {
        self.object(device)?
            .battery
            .ok_or_else(|| failure("no battery", device))
    }

    async fn watch(
        &self,
        _device: &str,
        _notification_source: &str,
        _data_source: &str,
        _battery: bool,
    ) -> Result<BoxStream<'static, Result<Sample, Error>>, Error> {
        let (tx, rx) = unbounded();
        *self.pushed.lock().unwrap() = Some(tx);
        Ok(rx.boxed())
    }
}
