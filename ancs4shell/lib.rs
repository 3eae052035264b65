//! Bridges the Apple Notification Center Service of a connected iPhone to
//! local shell handlers, through BlueZ on the system D-Bus.

pub mod common;
pub mod error;
pub mod observer;

pub use error::Error;
