use log::{debug, info};

use crate::common::config::adapter_path;
use crate::common::dbus::node_name;
use crate::common::external_apis::GattProvider;
use crate::error::Error;
use crate::observer::ancs::constants::{
    ANCS_SERVICE, CONTROL_POINT_CHAR, DATA_SOURCE_CHAR, NOTIFICATION_SOURCE_CHAR,
};

/// The ANCS characteristics of one connected phone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncsHandles {
    pub device: String,
    pub notification_source: String,
    pub control_point: String,
    pub data_source: String,
}

#[derive(Default)]
struct PartialHandles {
    notification_source: Option<String>,
    control_point: Option<String>,
    data_source: Option<String>,
}

impl PartialHandles {
    fn complete(self, device: &str) -> Option<AncsHandles> {
        Some(AncsHandles {
            device: device.to_string(),
            notification_source: self.notification_source?,
            control_point: self.control_point?,
            data_source: self.data_source?,
        })
    }
}

/// Finds the first connected device on `hci{hci}` exposing the ANCS service
/// with all three of its characteristics.
pub async fn discover(provider: &dyn GattProvider, hci: usize) -> Result<AncsHandles, Error> {
    let adapter = adapter_path(hci);
    for device in provider.children(&adapter).await? {
        if !node_name(&device).starts_with("dev_") {
            continue;
        }
        if !provider.is_connected(&device).await? {
            debug!("{}: not connected", device);
            continue;
        }
        for service in provider.children(&device).await? {
            if !node_name(&service).starts_with("service") {
                continue;
            }
            let uuid = provider.service_uuid(&service).await?;
            if !uuid.eq_ignore_ascii_case(ANCS_SERVICE) {
                continue;
            }
            info!("Found an iPhone! ({})", device);
            if let Some(handles) = find_characteristics(provider, &service).await?.complete(&device)
            {
                return Ok(handles);
            }
            debug!("{}: ANCS service is missing characteristics", service);
        }
    }
    Err(Error::ServiceNotFound(hci))
}

async fn find_characteristics(
    provider: &dyn GattProvider,
    service: &str,
) -> Result<PartialHandles, Error> {
    let mut found = PartialHandles::default();
    for characteristic in provider.children(service).await? {
        if !node_name(&characteristic).starts_with("char") {
            continue;
        }
        let uuid = provider
            .characteristic_uuid(&characteristic)
            .await?
            .to_ascii_lowercase();
        if uuid == NOTIFICATION_SOURCE_CHAR {
            found.notification_source = Some(characteristic);
        } else if uuid == CONTROL_POINT_CHAR {
            found.control_point = Some(characteristic);
        } else if uuid == DATA_SOURCE_CHAR {
            found.data_source = Some(characteristic);
        }
    }
    Ok(found)
}
