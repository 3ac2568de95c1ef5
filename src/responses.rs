use crate::commands::{READ_HEADER, REGISTRATION_HEADER};
use crate::matcher::find;
use crate::sms::{ReadError, RegistrationError};
use heapless::String;

/// Max. length of a message body in bytes (single part message)
pub const MESSAGE_BODY_SIZE: usize = 160;

/// Line boundary of modem responses
const LINE_BREAK: &[u8] = b"\r\n";

/// Network registration state, `<stat>` of `+CREG: <n>,<stat>`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistrationStatus {
    /// 0: Not registered, not searching
    NotRegistered,
    /// 1: Registered, home network
    Home,
    /// 2: Not registered, searching a network
    Searching,
    /// 3: Registration denied
    Denied,
    /// 4 or any unexpected value
    Unknown,
    /// 5: Registered, roaming
    Roaming,
}

impl RegistrationStatus {
    /// True if messages may be sent, i.e. registered in home network or roaming
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Home | Self::Roaming)
    }
}

impl From<u8> for RegistrationStatus {
    /// Maps the ASCII status digit
    fn from(stat: u8) -> Self {
        match stat {
            b'0' => Self::NotRegistered,
            b'1' => Self::Home,
            b'2' => Self::Searching,
            b'3' => Self::Denied,
            b'5' => Self::Roaming,
            _ => Self::Unknown,
        }
    }
}

/// A received text message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Storage index on the SIM
    pub index: u16,

    /// Message text
    pub body: String<MESSAGE_BODY_SIZE>,
}

/// Extracts the status digit following the first comma after `+CREG:`
pub(crate) fn parse_registration(response: &[u8]) -> Result<RegistrationStatus, RegistrationError> {
    let header = find(response, REGISTRATION_HEADER).ok_or(RegistrationError::MissingMarker)?;
    let record = &response[header..];

    let comma = record
        .iter()
        .position(|byte| *byte == b',')
        .ok_or(RegistrationError::MissingStatus)?;
    let stat = record.get(comma + 1).ok_or(RegistrationError::MissingStatus)?;

    Ok(RegistrationStatus::from(*stat))
}

/// Extracts the line following the `+CMGR:` header line. Never returns a partial body.
pub(crate) fn parse_message_body(response: &[u8]) -> Result<&[u8], ReadError> {
    let header = find(response, READ_HEADER).ok_or(ReadError::MissingHeader)?;

    let start = header + find(&response[header..], LINE_BREAK).ok_or(ReadError::MissingBody)? + LINE_BREAK.len();
    let end = start + find(&response[start..], LINE_BREAK).ok_or(ReadError::MissingBody)?;

    Ok(&response[start..end])
}

/// Parses the full message record
pub(crate) fn parse_message(index: u16, response: &[u8]) -> Result<Message, ReadError> {
    let body = parse_message_body(response)?;
    let text = core::str::from_utf8(body).map_err(|_| ReadError::InvalidBody)?;

    Ok(Message {
        index,
        body: String::try_from(text).map_err(|_| ReadError::InvalidBody)?,
    })
}
