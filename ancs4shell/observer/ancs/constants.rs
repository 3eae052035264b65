pub const USHORT_MAX: u16 = u16::MAX;

pub const ANCS_SERVICE: &str = "7905f431-b5ce-4e99-a40f-4b1e122d00d0";
pub const NOTIFICATION_SOURCE_CHAR: &str = "9fbf120d-6301-42d9-8c58-25e699a21dbd";
pub const CONTROL_POINT_CHAR: &str = "69d1d8f3-45e1-49a8-9821-9bbdfdaad9d9";
pub const DATA_SOURCE_CHAR: &str = "22eac6e9-24d6-4bb5-be44-b36ace7c7bfb";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventID {
    NotificationAdded = 0,
    NotificationModified = 1,
    NotificationRemoved = 2,
}

impl EventID {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(EventID::NotificationAdded),
            1 => Some(EventID::NotificationModified),
            2 => Some(EventID::NotificationRemoved),
            _ => None,
        }
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EventFlag: u8 {
        const SILENT = 1 << 0;
        const IMPORTANT = 1 << 1;
        const PRE_EXISTING = 1 << 2;
        const POSITIVE_ACTION = 1 << 3;
        const NEGATIVE_ACTION = 1 << 4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandID {
    GetNotificationAttributes = 0,
    GetAppAttributes = 1,
    PerformNotificationAction = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NotificationAttributeID {
    AppIdentifier = 0,
    Title = 1,
    Subtitle = 2,
    Message = 3,
    MessageSize = 4,
    Date = 5,
    PositiveActionLabel = 6,
    NegativeActionLabel = 7,
}
