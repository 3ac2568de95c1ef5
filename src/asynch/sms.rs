use super::engine::Engine;
use crate::commands::{self, SUBMIT};
use crate::config::ModemConfig;
use crate::engine::{Command, CommandError};
use crate::responses::{parse_message, parse_registration, Message, RegistrationStatus};
use crate::sms::{ReadError, RegistrationError, SendError};
use crate::storage::{NvStore, PhoneNumber, PhoneNumberStore, StoreError};
use embedded_io::ReadReady;
use embedded_io_async::{Read, Write};

/// Async SMS client, s. [crate::sms::Modem] for the blocking variant
pub struct Modem<IO, S: NvStore, const RX_SIZE: usize> {
    pub(crate) engine: Engine<IO, RX_SIZE>,
    pub(crate) numbers: PhoneNumberStore<S>,
    pub(crate) config: ModemConfig,
}

impl<IO, S, const RX_SIZE: usize> Modem<IO, S, RX_SIZE>
where
    IO: Read + Write + ReadReady,
    S: NvStore,
{
    pub fn new(io: IO, numbers: PhoneNumberStore<S>, config: ModemConfig) -> Self {
        Self {
            engine: Engine::new(io),
            numbers,
            config,
        }
    }

    /// Checks if the module responds to AT commands
    pub async fn power_on(&mut self) -> Result<(), CommandError> {
        self.engine.execute(&commands::liveness(&self.config)).await
    }

    /// Powers down the module
    pub async fn power_off(&mut self) -> Result<(), CommandError> {
        self.engine.execute(&commands::power_down(&self.config)).await
    }

    /// Sends a custom command and waits for the given token, using the default command timeout
    pub async fn send_command(&mut self, text: &[u8], token: &[u8]) -> Result<(), CommandError> {
        self.engine
            .execute(&Command::new(text, token, self.config.command_timeout))
            .await
    }

    /// Sends a text message to the given address
    pub async fn send_sms(&mut self, address: &str, body: &str) -> Result<(), SendError> {
        let recipient = commands::recipient_line(address).ok_or(SendError::AddressTooLong)?;

        self.engine
            .execute(&commands::text_mode(&self.config))
            .await
            .map_err(SendError::TextMode)?;
        self.engine
            .execute(&commands::recipient(&recipient, &self.config))
            .await
            .map_err(SendError::Recipient)?;

        self.engine.write_raw(body.as_bytes()).await.map_err(SendError::Body)?;
        self.engine.write_raw(&[SUBMIT]).await.map_err(SendError::Body)?;

        self.engine
            .execute(&commands::submit(&self.config))
            .await
            .map_err(SendError::Submit)
    }

    /// Sends a text message to the stored phone number
    pub async fn send_sms_to_stored(&mut self, body: &str) -> Result<(), SendError> {
        let address = self
            .numbers
            .phone_number()
            .and_then(|number| PhoneNumber::try_from(number).ok())
            .ok_or(SendError::NoStoredNumber)?;

        self.send_sms(&address, body).await
    }

    /// Queries the network registration state
    pub async fn registration_status(&mut self) -> Result<RegistrationStatus, RegistrationError> {
        self.engine
            .execute(&commands::registration_query(&self.config))
            .await
            .map_err(RegistrationError::Query)?;

        let response = self
            .engine
            .collect(self.config.registration_window)
            .await
            .map_err(RegistrationError::Query)?;
        parse_registration(response)
    }

    /// True if registered in home network or roaming. All errors count as not registered.
    pub async fn is_registered(&mut self) -> bool {
        match self.registration_status().await {
            Ok(status) => status.is_registered(),
            Err(error) => {
                debug!("Registration unknown: {:?}", error);
                false
            }
        }
    }

    /// Reads the message stored at the given index
    pub async fn read_sms(&mut self, index: u16) -> Result<Message, ReadError> {
        let line = commands::read_line(index);

        self.engine
            .execute(&commands::text_mode(&self.config))
            .await
            .map_err(ReadError::TextMode)?;
        self.engine
            .execute(&commands::read_message(&line, &self.config))
            .await
            .map_err(ReadError::Read)?;

        let response = self.engine.collect(self.config.read_window).await.map_err(ReadError::Read)?;
        parse_message(index, response)
    }

    /// Deletes the message stored at the given index
    pub async fn delete_sms(&mut self, index: u16) -> Result<(), CommandError> {
        let line = commands::delete_line(index);
        self.engine.execute(&commands::delete_message(&line, &self.config)).await
    }

    /// Validates and persists the default recipient
    pub fn set_phone_number(&mut self, number: &str) -> Result<(), StoreError<S::Error>> {
        self.numbers.set(number)
    }

    /// Returns the stored default recipient
    pub fn phone_number(&self) -> Option<&str> {
        self.numbers.phone_number()
    }

    /// Gives access to the command timeouts
    pub fn config_mut(&mut self) -> &mut ModemConfig {
        &mut self.config
    }

    /// Releases transport and store
    pub fn release(self) -> (IO, S) {
        (self.engine.release(), self.numbers.release())
    }
}
