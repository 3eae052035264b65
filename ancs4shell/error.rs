use thiserror::Error;

use crate::observer::ancs::parsers::DecodeError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("D-Bus error: {0}")]
    Dbus(#[from] zbus::Error),
    #[error("D-Bus error: {0}")]
    Fdo(#[from] zbus::fdo::Error),
    #[error("iPhone ANCS not found on hci{0}")]
    ServiceNotFound(usize),
    #[error("{0} disconnected")]
    Disconnected(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}
