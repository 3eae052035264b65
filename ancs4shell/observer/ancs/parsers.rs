use thiserror::Error;

use crate::observer::ancs::constants::{EventFlag, EventID};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("notification source record is {0} bytes, expected 8")]
    ShortEvent(usize),
    #[error("truncated {field}: need {needed} bytes, {remaining} left")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },
}

/// One record from the notification source characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub event_id: u8,
    pub event_flags: EventFlag,
    pub category_id: u8,
    pub category_count: u8,
    pub id: u32,
}

impl Notification {
    pub const LEN: usize = 8;

    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        let data: &[u8; Self::LEN] = data
            .get(..Self::LEN)
            .and_then(|d| d.try_into().ok())
            .ok_or(DecodeError::ShortEvent(data.len()))?;
        Ok(Notification {
            event_id: data[0],
            event_flags: EventFlag::from_bits_retain(data[1]),
            category_id: data[2],
            category_count: data[3],
            id: u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let id = self.id.to_le_bytes();
        [
            self.event_id,
            self.event_flags.bits(),
            self.category_id,
            self.category_count,
            id[0],
            id[1],
            id[2],
            id[3],
        ]
    }

    pub fn event(&self) -> Option<EventID> {
        EventID::from_u8(self.event_id)
    }

    pub fn is_added(&self) -> bool {
        self.event() == Some(EventID::NotificationAdded)
    }
}

/// Response to `GetNotificationAttributes`, as delivered on the data source.
///
/// Records are taken in request order (app identifier, title, message); the
/// attribute ids sent back by the phone are not consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationAttributes {
    pub command_id: u8,
    pub id: u32,
    pub app_id: String,
    pub title: String,
    pub message: String,
}

impl NotificationAttributes {
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(data);
        let command_id = reader.u8("command id")?;
        let id = reader.u32("notification uid")?;
        let app_id = reader.attribute("app identifier")?;
        let title = reader.attribute("title")?;
        let message = reader.attribute("message")?;
        Ok(NotificationAttributes {
            command_id,
            id,
            app_id,
            title,
            message,
        })
    }
}

struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn take(&mut self, field: &'static str, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.data.len() < n {
            return Err(DecodeError::Truncated {
                field,
                needed: n,
                remaining: self.data.len(),
            });
        }
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Ok(head)
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        Ok(self.take(field, 1)?[0])
    }

    fn u16(&mut self, field: &'static str) -> Result<u16, DecodeError> {
        let b = self.take(field, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        let b = self.take(field, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// `{id: u8, len: u16, value: [u8; len]}`, value decoded as lossy UTF-8.
    fn attribute(&mut self, field: &'static str) -> Result<String, DecodeError> {
        self.u8(field)?;
        let len = self.u16(field)? as usize;
        let value = self.take(field, len)?;
        Ok(String::from_utf8_lossy(value).into_owned())
    }
}
