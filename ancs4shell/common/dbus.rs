use zbus::Connection;

pub const BLUEZ_SERVICE: &str = "org.bluez";

pub struct SystemBus {
    connection: Connection,
}

impl SystemBus {
    pub async fn new() -> zbus::Result<Self> {
        let connection = Connection::system().await?;
        Ok(Self { connection })
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

/// `/org/bluez/hci0/dev_X` -> `/org/bluez/hci0`
pub fn parent_path(path: &str) -> Option<&str> {
    match path.rsplit_once('/') {
        Some(("", _)) if path.len() > 1 => Some("/"),
        Some((parent, _)) if !parent.is_empty() => Some(parent),
        _ => None,
    }
}

/// `/org/bluez/hci0/dev_X/service0010` -> `service0010`
pub fn node_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}
