use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use log::{debug, error};
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::observer::ancs::parsers::NotificationAttributes;

/// Environment variable carrying the JSON form of a notification to the
/// notification handler.
pub const NOTIFICATION_JSON_ENV: &str = "ANCS_NOTIFICATION_JSON";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationReceived {
    pub id: u32,
    pub app_id: String,
    pub title: String,
    pub message: String,
}

impl NotificationReceived {
    pub fn json(&self) -> String {
        // Plain strings and integers always serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl From<NotificationAttributes> for NotificationReceived {
    fn from(attrs: NotificationAttributes) -> Self {
        Self {
            id: attrs.id,
            app_id: attrs.app_id,
            title: attrs.title,
            message: attrs.message,
        }
    }
}

/// Receives decoded events. Implementations must not block and must not
/// fail: the loop does not wait for them.
pub trait ActionSink {
    fn on_notification(&self, notification: &NotificationReceived);

    fn on_battery_change(&self, percentage: u8);
}

/// Runs one external program per event without waiting for it.
#[derive(Debug, Clone)]
pub struct ShellHandlers {
    notification: PathBuf,
    battery: PathBuf,
}

impl ShellHandlers {
    pub fn new(notification: PathBuf, battery: PathBuf) -> Self {
        Self {
            notification,
            battery,
        }
    }

    fn try_running<I, S>(&self, program: &Path, args: I, env: Option<(&str, String)>) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(program);
        command.args(args);
        if let Some((key, value)) = env {
            command.env(key, value);
        }
        match command.spawn() {
            Ok(child) => {
                debug!("Started {} (pid {:?}).", program.display(), child.id());
                true
            }
            Err(e) => {
                error!("Error: {}: {}", program.display(), e);
                false
            }
        }
    }
}

impl ActionSink for ShellHandlers {
    fn on_notification(&self, notification: &NotificationReceived) {
        self.try_running(
            &self.notification,
            [
                notification.title.as_str(),
                notification.app_id.as_str(),
                notification.message.as_str(),
            ],
            Some((NOTIFICATION_JSON_ENV, notification.json())),
        );
    }

    fn on_battery_change(&self, percentage: u8) {
        self.try_running(&self.battery, [percentage.to_string()], None);
    }
}
