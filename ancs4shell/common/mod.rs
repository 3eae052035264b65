pub mod apis;
pub mod config;
pub mod dbus;
pub mod external_apis;
