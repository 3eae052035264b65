use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::Mutex;
use zbus::fdo::ObjectManagerProxy;
use zbus::zvariant::Value;
use zbus::{dbus_proxy, CacheProperties, Connection};

use crate::common::dbus::{parent_path, BLUEZ_SERVICE};
use crate::error::Error;

#[dbus_proxy(interface = "org.bluez.Device1", default_service = "org.bluez")]
trait BluezDevice {
    #[dbus_proxy(property)]
    fn connected(&self) -> zbus::Result<bool>;
}

#[dbus_proxy(interface = "org.bluez.GattService1", default_service = "org.bluez")]
trait BluezGattService {
    #[dbus_proxy(property, name = "UUID")]
    fn uuid(&self) -> zbus::Result<String>;
}

#[dbus_proxy(interface = "org.bluez.GattCharacteristic1", default_service = "org.bluez")]
trait BluezGattCharacteristic {
    fn start_notify(&self) -> zbus::Result<()>;

    fn write_value(&self, value: &[u8], options: HashMap<&str, Value<'_>>) -> zbus::Result<()>;

    #[dbus_proxy(property, name = "UUID")]
    fn uuid(&self) -> zbus::Result<String>;

    #[dbus_proxy(property)]
    fn value(&self) -> zbus::Result<Vec<u8>>;
}

#[dbus_proxy(interface = "org.bluez.Battery1", default_service = "org.bluez")]
trait BluezBattery {
    #[dbus_proxy(property)]
    fn percentage(&self) -> zbus::Result<u8>;
}

pub const BATTERY_INTERFACE: &str = "org.bluez.Battery1";

/// A value observed on one of the watched sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sample {
    NotificationSource(Vec<u8>),
    DataSource(Vec<u8>),
    Battery(u8),
}

/// Object tree and GATT operations of the Bluetooth stack.
///
/// Objects are addressed by path. Characteristic values read back the last
/// value the stack received once `start_notify` is active. Reads fail once
/// the object is gone.
#[async_trait]
pub trait GattProvider: Send + Sync {
    /// Direct children of `path`.
    async fn children(&self, path: &str) -> Result<Vec<String>, Error>;

    async fn is_connected(&self, device: &str) -> Result<bool, Error>;

    async fn service_uuid(&self, service: &str) -> Result<String, Error>;

    async fn characteristic_uuid(&self, characteristic: &str) -> Result<String, Error>;

    async fn start_notify(&self, characteristic: &str) -> Result<(), Error>;

    async fn read_value(&self, characteristic: &str) -> Result<Vec<u8>, Error>;

    async fn write_value(&self, characteristic: &str, value: &[u8]) -> Result<(), Error>;

    async fn has_battery(&self, device: &str) -> Result<bool, Error>;

    async fn battery_percentage(&self, device: &str) -> Result<u8, Error>;

    /// Stream of values pushed by the stack for the two characteristics and,
    /// when `battery` is set, the device battery. Yields
    /// `Error::Disconnected` once `device` goes away.
    async fn watch(
        &self,
        device: &str,
        notification_source: &str,
        data_source: &str,
        battery: bool,
    ) -> Result<BoxStream<'static, Result<Sample, Error>>, Error>;
}

/// `org.bluez` on the system bus.
///
/// Proxies used for reads and writes do not cache properties, so every read is
/// a `Get` on the bus. `watch` builds its own caching proxies for the change
/// streams.
pub struct BluezProvider {
    connection: Connection,
    characteristics: Mutex<HashMap<String, BluezGattCharacteristicProxy<'static>>>,
    batteries: Mutex<HashMap<String, BluezBatteryProxy<'static>>>,
}

impl BluezProvider {
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            characteristics: Mutex::new(HashMap::new()),
            batteries: Mutex::new(HashMap::new()),
        }
    }

    async fn characteristic(&self, path: &str) -> Result<BluezGattCharacteristicProxy<'static>, Error> {
        let mut cache = self.characteristics.lock().await;
        if let Some(proxy) = cache.get(path) {
            return Ok(proxy.clone());
        }
        let proxy = BluezGattCharacteristicProxy::builder(&self.connection)
            .path(path.to_string())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?;
        cache.insert(path.to_string(), proxy.clone());
        Ok(proxy)
    }

    async fn battery(&self, device: &str) -> Result<BluezBatteryProxy<'static>, Error> {
        let mut cache = self.batteries.lock().await;
        if let Some(proxy) = cache.get(device) {
            return Ok(proxy.clone());
        }
        let proxy = BluezBatteryProxy::builder(&self.connection)
            .path(device.to_string())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?;
        cache.insert(device.to_string(), proxy.clone());
        Ok(proxy)
    }

    async fn object_manager(&self) -> Result<ObjectManagerProxy<'static>, Error> {
        Ok(ObjectManagerProxy::builder(&self.connection)
            .destination(BLUEZ_SERVICE)?
            .path("/")?
            .cache_properties(CacheProperties::No)
            .build()
            .await?)
    }

    /// Yields `Error::Disconnected` when `device` reports itself disconnected
    /// or loses interfaces, itself or any object below it.
    async fn disconnection(
        &self,
        device: &str,
    ) -> Result<BoxStream<'static, Result<Sample, Error>>, Error> {
        let proxy = BluezDeviceProxy::builder(&self.connection)
            .path(device.to_string())?
            .build()
            .await?;
        let owned = device.to_string();
        let connected = proxy
            .receive_connected_changed()
            .await
            .filter_map(move |changed| {
                let device = owned.clone();
                async move {
                    match changed.get().await {
                        Ok(true) => None,
                        Ok(false) => Some(Err::<Sample, _>(Error::Disconnected(device))),
                        Err(e) => Some(Err(e.into())),
                    }
                }
            });

        let owned = device.to_string();
        let removed = self
            .object_manager()
            .await?
            .receive_interfaces_removed()
            .await?
            .filter_map(move |signal| {
                let device = owned.clone();
                async move {
                    let args = signal.args().ok()?;
                    let path = args.object_path().as_str();
                    let below = path
                        .strip_prefix(device.as_str())
                        .map_or(false, |rest| rest.is_empty() || rest.starts_with('/'));
                    below.then(|| Err::<Sample, _>(Error::Disconnected(device)))
                }
            });

        Ok(stream::select(connected, removed).boxed())
    }
}

#[async_trait]
impl GattProvider for BluezProvider {
    async fn children(&self, path: &str) -> Result<Vec<String>, Error> {
        let objects = self.object_manager().await?.get_managed_objects().await?;
        let mut children: Vec<String> = objects
            .keys()
            .map(|object| object.as_str())
            .filter(|object| parent_path(object) == Some(path))
            .map(str::to_string)
            .collect();
        children.sort();
        Ok(children)
    }

    async fn is_connected(&self, device: &str) -> Result<bool, Error> {
        let proxy = BluezDeviceProxy::builder(&self.connection)
            .path(device.to_string())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?;
        Ok(proxy.connected().await?)
    }

    async fn service_uuid(&self, service: &str) -> Result<String, Error> {
        let proxy = BluezGattServiceProxy::builder(&self.connection)
            .path(service.to_string())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?;
        Ok(proxy.uuid().await?)
    }

    async fn characteristic_uuid(&self, characteristic: &str) -> Result<String, Error> {
        Ok(self.characteristic(characteristic).await?.uuid().await?)
    }

    async fn start_notify(&self, characteristic: &str) -> Result<(), Error> {
        Ok(self.characteristic(characteristic).await?.start_notify().await?)
    }

    async fn read_value(&self, characteristic: &str) -> Result<Vec<u8>, Error> {
        Ok(self.characteristic(characteristic).await?.value().await?)
    }

    async fn write_value(&self, characteristic: &str, value: &[u8]) -> Result<(), Error> {
        let proxy = self.characteristic(characteristic).await?;
        Ok(proxy.write_value(value, HashMap::new()).await?)
    }

    async fn has_battery(&self, device: &str) -> Result<bool, Error> {
        let objects = self.object_manager().await?.get_managed_objects().await?;
        Ok(objects.iter().any(|(object, interfaces)| {
            object.as_str() == device
                && interfaces
                    .keys()
                    .any(|interface| interface.as_str() == BATTERY_INTERFACE)
        }))
    }

    async fn battery_percentage(&self, device: &str) -> Result<u8, Error> {
        Ok(self.battery(device).await?.percentage().await?)
    }

    async fn watch(
        &self,
        device: &str,
        notification_source: &str,
        data_source: &str,
        battery: bool,
    ) -> Result<BoxStream<'static, Result<Sample, Error>>, Error> {
        let ns = BluezGattCharacteristicProxy::builder(&self.connection)
            .path(notification_source.to_string())?
            .build()
            .await?;
        let ds = BluezGattCharacteristicProxy::builder(&self.connection)
            .path(data_source.to_string())?
            .build()
            .await?;
        let mut streams = vec![
            ns.receive_value_changed()
                .await
                .then(|changed| async move {
                    Ok::<_, Error>(Sample::NotificationSource(changed.get().await?))
                })
                .boxed(),
            ds.receive_value_changed()
                .await
                .then(|changed| async move { Ok::<_, Error>(Sample::DataSource(changed.get().await?)) })
                .boxed(),
        ];
        if battery {
            let battery = BluezBatteryProxy::builder(&self.connection)
                .path(device.to_string())?
                .build()
                .await?;
            streams.push(
                battery
                    .receive_percentage_changed()
                    .await
                    .then(|changed| async move { Ok::<_, Error>(Sample::Battery(changed.get().await?)) })
                    .boxed(),
            );
        }
        streams.push(self.disconnection(device).await?);
        Ok(stream::select_all(streams).boxed())
    }
}
