use log::{debug, info, warn};

use crate::common::apis::NotificationReceived;
use crate::common::external_apis::GattProvider;
use crate::error::Error;
use crate::observer::ancs::builders::GetNotificationAttributes;
use crate::observer::ancs::parsers::{Notification, NotificationAttributes};
use crate::observer::discovery::AncsHandles;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// A request for `id` was written; the next data source value is taken
    /// as its answer.
    AwaitingAttributes { id: u32 },
}

/// Drives the control point and turns data source values into events.
///
/// There is a single pending slot: a newer request replaces an older one and
/// the next data source value is attributed to whichever was written last.
pub struct NotificationSession {
    handles: AncsHandles,
    state: SessionState,
}

impl NotificationSession {
    pub fn new(handles: AncsHandles) -> Self {
        Self {
            handles,
            state: SessionState::Idle,
        }
    }

    pub fn handles(&self) -> &AncsHandles {
        &self.handles
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Handles a new notification source value. Returns whether a request
    /// was written to the control point.
    pub async fn on_notification_source(
        &mut self,
        provider: &dyn GattProvider,
        value: &[u8],
    ) -> Result<bool, Error> {
        let notification = match Notification::parse(value) {
            Ok(notification) => notification,
            Err(e) => {
                warn!("Dropping notification source event: {}", e);
                return Ok(false);
            }
        };
        if !notification.is_added() {
            debug!(
                "Ignoring event {} for notification {}",
                notification.event_id, notification.id
            );
            return Ok(false);
        }

        if let SessionState::AwaitingAttributes { id } = self.state {
            debug!("Notification {} superseded by {}", id, notification.id);
        }
        info!("New notification! Asking for details...");
        let msg = GetNotificationAttributes::new(notification.id);
        provider
            .write_value(&self.handles.control_point, &msg.to_vec())
            .await?;
        self.state = SessionState::AwaitingAttributes {
            id: notification.id,
        };
        Ok(true)
    }

    /// Handles a new data source value, returning the decoded notification.
    pub fn on_data_source(&mut self, value: &[u8]) -> Option<NotificationReceived> {
        let pending = std::mem::replace(&mut self.state, SessionState::Idle);
        let attrs = match NotificationAttributes::parse(value) {
            Ok(attrs) => attrs,
            Err(e) => {
                warn!("Dropping malformed notification details: {}", e);
                return None;
            }
        };
        info!("Notification details received!");
        match pending {
            SessionState::AwaitingAttributes { id } if id != attrs.id => warn!(
                "Details are for notification {} but {} was requested",
                attrs.id, id
            ),
            SessionState::Idle => debug!("Details for {} arrived unrequested", attrs.id),
            _ => {}
        }
        info!("From: {} ({})", attrs.title, attrs.app_id);
        info!("{}", attrs.message);
        Some(attrs.into())
    }
}
