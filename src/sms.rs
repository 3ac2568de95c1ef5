//! # SMS client
//!
//! Sending, reading and deleting text messages plus network registration checks. Each operation is a
//! short chain of commands. The first failing command aborts the chain, later commands are not sent.
//! No operation retries, callers may simply call it again.
//!
//! All operations block until finished, at most for the sum of the involved command timeouts
//! (s. [ModemConfig]). For cooperative scheduling use the engine's poll interface or the async client.
//!
//! ## Example
//!
//! ````
//! # use at_sms::config::ModemConfig;
//! # use at_sms::example::{ExampleStore, ExampleTimer, ExampleTransport};
//! # use at_sms::sms::Modem;
//! # use at_sms::storage::{PhoneNumberStore, StoreConfig};
//! #
//! let numbers = PhoneNumberStore::load(ExampleStore::default(), StoreConfig::default());
//! let mut modem: Modem<_, _, _, 1_000, 256> =
//!     Modem::new(ExampleTransport::default(), ExampleTimer::default(), numbers, ModemConfig::default());
//!
//! modem.power_on().unwrap();
//! assert!(modem.is_registered());
//!
//! // Sending to an explicit recipient
//! modem.send_sms("+15551234567", "Feeder refilled").unwrap();
//!
//! // Sending to the stored default recipient
//! modem.set_phone_number("+15551234567").unwrap();
//! modem.send_sms_to_stored("Feeder empty").unwrap();
//!
//! // Reading and deleting
//! let message = modem.read_sms(1).unwrap();
//! assert_eq!("Hello world", message.body.as_str());
//! modem.delete_sms(1).unwrap();
//! ````
use crate::commands::{self, SUBMIT};
use crate::config::ModemConfig;
use crate::engine::{Command, CommandError, Engine};
use crate::responses::{parse_message, parse_registration, Message, RegistrationStatus};
use crate::storage::{NvStore, PhoneNumber, PhoneNumberStore, StoreError};
use embedded_io::{Read, ReadReady, Write};
use fugit_timer::Timer;

/// Possible errors when sending a message
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError {
    /// Error while switching to text mode (AT+CMGF)
    TextMode(CommandError),

    /// Error while setting the recipient (AT+CMGS), e.g. no body prompt received
    Recipient(CommandError),

    /// Error while writing the message body
    Body(CommandError),

    /// Submission of the message was not confirmed
    Submit(CommandError),

    /// No phone number is stored
    NoStoredNumber,

    /// Recipient address does not fit in the command line
    AddressTooLong,
}

/// Errors when querying the network registration
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistrationError {
    /// AT+CREG? failed
    Query(CommandError),

    /// Response does not contain `+CREG:`
    MissingMarker,

    /// No status value following `+CREG:`
    MissingStatus,
}

/// Errors when reading a message
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadError {
    /// Error while switching to text mode (AT+CMGF)
    TextMode(CommandError),

    /// AT+CMGR failed, e.g. no message stored at the given index
    Read(CommandError),

    /// Response does not contain `+CMGR:`
    MissingHeader,

    /// Body line is not delimited by line breaks
    MissingBody,

    /// Body is not valid text or exceeds [crate::responses::MESSAGE_BODY_SIZE]
    InvalidBody,
}

/// Central client for SMS communication
///
/// RX_SIZE: Response buffer size in bytes. Needs to hold a full message record including header.
pub struct Modem<IO, T: Timer<TIMER_HZ>, S: NvStore, const TIMER_HZ: u32, const RX_SIZE: usize> {
    /// Command/response engine owning transport and timer
    pub(crate) engine: Engine<IO, T, TIMER_HZ, RX_SIZE>,

    /// Default recipient
    pub(crate) numbers: PhoneNumberStore<S>,

    /// Command timeouts
    pub(crate) config: ModemConfig,
}

impl<IO, T, S, const TIMER_HZ: u32, const RX_SIZE: usize> Modem<IO, T, S, TIMER_HZ, RX_SIZE>
where
    IO: Read + Write + ReadReady,
    T: Timer<TIMER_HZ>,
    S: NvStore,
{
    /// Creates a new client. The phone number store is expected to be loaded at startup.
    pub fn new(io: IO, timer: T, numbers: PhoneNumberStore<S>, config: ModemConfig) -> Self {
        Self {
            engine: Engine::new(io, timer),
            numbers,
            config,
        }
    }

    /// Checks if the module responds to AT commands
    pub fn power_on(&mut self) -> Result<(), CommandError> {
        self.engine.execute(&commands::liveness(&self.config))
    }

    /// Powers down the module
    pub fn power_off(&mut self) -> Result<(), CommandError> {
        self.engine.execute(&commands::power_down(&self.config))
    }

    /// Sends a custom command and waits for the given token, using the default command timeout
    pub fn send_command(&mut self, text: &[u8], token: &[u8]) -> Result<(), CommandError> {
        self.engine.execute(&Command::new(text, token, self.config.command_timeout))
    }

    /// Sends a text message to the given address
    pub fn send_sms(&mut self, address: &str, body: &str) -> Result<(), SendError> {
        let recipient = commands::recipient_line(address).ok_or(SendError::AddressTooLong)?;

        self.engine.execute(&commands::text_mode(&self.config)).map_err(SendError::TextMode)?;
        self.engine
            .execute(&commands::recipient(&recipient, &self.config))
            .map_err(SendError::Recipient)?;

        self.engine.write_raw(body.as_bytes()).map_err(SendError::Body)?;
        self.engine.write_raw(&[SUBMIT]).map_err(SendError::Body)?;

        self.engine.execute(&commands::submit(&self.config)).map_err(SendError::Submit)?;
        info!("Message sent to {:?}", address);
        Ok(())
    }

    /// Sends a text message to the stored phone number
    ///
    /// Fails with [SendError::NoStoredNumber] without any modem communication if no number is stored.
    pub fn send_sms_to_stored(&mut self, body: &str) -> Result<(), SendError> {
        let address = self.stored_address()?;
        self.send_sms(&address, body)
    }

    /// Queries the network registration state
    pub fn registration_status(&mut self) -> Result<RegistrationStatus, RegistrationError> {
        self.engine
            .execute(&commands::registration_query(&self.config))
            .map_err(RegistrationError::Query)?;

        let response = self
            .engine
            .collect(self.config.registration_window)
            .map_err(RegistrationError::Query)?;
        parse_registration(response)
    }

    /// True if registered in home network or roaming. All errors count as not registered.
    pub fn is_registered(&mut self) -> bool {
        match self.registration_status() {
            Ok(status) => status.is_registered(),
            Err(error) => {
                debug!("Registration unknown: {:?}", error);
                false
            }
        }
    }

    /// Reads the message stored at the given index
    pub fn read_sms(&mut self, index: u16) -> Result<Message, ReadError> {
        let line = commands::read_line(index);

        self.engine.execute(&commands::text_mode(&self.config)).map_err(ReadError::TextMode)?;
        self.engine
            .execute(&commands::read_message(&line, &self.config))
            .map_err(ReadError::Read)?;

        let response = self.engine.collect(self.config.read_window).map_err(ReadError::Read)?;
        parse_message(index, response)
    }

    /// Deletes the message stored at the given index
    pub fn delete_sms(&mut self, index: u16) -> Result<(), CommandError> {
        let line = commands::delete_line(index);
        self.engine.execute(&commands::delete_message(&line, &self.config))
    }

    /// Validates and persists the default recipient
    pub fn set_phone_number(&mut self, number: &str) -> Result<(), StoreError<S::Error>> {
        self.numbers.set(number)
    }

    /// Returns the stored default recipient
    pub fn phone_number(&self) -> Option<&str> {
        self.numbers.phone_number()
    }

    /// Gives access to the engine, e.g. for polling custom commands
    pub fn engine(&mut self) -> &mut Engine<IO, T, TIMER_HZ, RX_SIZE> {
        &mut self.engine
    }

    /// Gives access to the command timeouts
    pub fn config_mut(&mut self) -> &mut ModemConfig {
        &mut self.config
    }

    /// Releases transport, timer and store
    pub fn release(self) -> (IO, T, S) {
        let (io, timer) = self.engine.release();
        (io, timer, self.numbers.release())
    }

    fn stored_address(&self) -> Result<PhoneNumber, SendError> {
        self.numbers
            .phone_number()
            .and_then(|number| PhoneNumber::try_from(number).ok())
            .ok_or(SendError::NoStoredNumber)
    }
}
