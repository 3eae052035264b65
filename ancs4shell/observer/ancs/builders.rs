use crate::observer::ancs::constants::{CommandID, NotificationAttributeID, USHORT_MAX};

/// Control point command asking the phone for the app identifier, title and
/// message of one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetNotificationAttributes {
    pub id: u32,
}

impl GetNotificationAttributes {
    pub fn new(id: u32) -> Self {
        Self { id }
    }

    /// Encodes the command. The app identifier takes no max length; title and
    /// message ask for as much as the phone is willing to send.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut msg = Vec::with_capacity(12);
        msg.push(CommandID::GetNotificationAttributes as u8);
        msg.extend_from_slice(&self.id.to_le_bytes());
        msg.push(NotificationAttributeID::AppIdentifier as u8);
        msg.push(NotificationAttributeID::Title as u8);
        msg.extend_from_slice(&USHORT_MAX.to_le_bytes());
        msg.push(NotificationAttributeID::Message as u8);
        msg.extend_from_slice(&USHORT_MAX.to_le_bytes());
        msg
    }
}
