//! # Persistent phone number
//!
//! Default recipient for [crate::sms::Modem::send_sms_to_stored], kept in a byte-addressable
//! non-volatile store (e.g. EEPROM or an emulated EEPROM flash section).
//!
//! Record layout at the configured base address:
//!
//! | Offset       | Content                                 |
//! |--------------|-----------------------------------------|
//! | 0            | Length (0 = no number)                  |
//! | 1..=max_len  | ASCII characters, zero padded           |
//!
//! ## Example
//!
//! ````
//! # use at_sms::example::ExampleStore;
//! # use at_sms::storage::{PhoneNumberStore, StoreConfig};
//! #
//! let mut numbers = PhoneNumberStore::load(ExampleStore::default(), StoreConfig::default());
//! assert_eq!(None, numbers.phone_number());
//!
//! numbers.set("15551234567").unwrap();
//!
//! // Survives a restart
//! let numbers = PhoneNumberStore::load(numbers.release(), StoreConfig::default());
//! assert_eq!(Some("15551234567"), numbers.phone_number());
//! ````
use core::fmt::Debug;
use heapless::String;

/// Max. phone number length supported by [PhoneNumberStore]
pub const PHONE_NUMBER_CAPACITY: usize = 32;

/// Phone number as stored in memory
pub type PhoneNumber = String<PHONE_NUMBER_CAPACITY>;

/// Byte-addressable non-volatile storage
///
/// Writes are only guaranteed to be durable after `commit()`.
pub trait NvStore {
    type Error: Debug;

    /// Reads a single byte
    fn read(&mut self, address: u32) -> Result<u8, Self::Error>;

    /// Writes a single byte
    fn write(&mut self, address: u32, value: u8) -> Result<(), Self::Error>;

    /// Makes all previous writes durable
    fn commit(&mut self) -> Result<(), Self::Error>;
}

/// Location and size of the phone number record
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StoreConfig {
    /// Address of the length byte, followed by `max_len` character bytes
    pub base_address: u32,

    /// Max. phone number length. Gets limited to [PHONE_NUMBER_CAPACITY].
    pub max_len: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_address: 600,
            max_len: 20,
        }
    }
}

impl StoreConfig {
    pub fn new(base_address: u32, max_len: usize) -> Self {
        Self {
            base_address,
            max_len: max_len.min(PHONE_NUMBER_CAPACITY),
        }
    }
}

/// Errors when changing the stored phone number
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError<E> {
    /// Given number is empty or longer than the configured max. length
    InvalidLength,

    /// Underlying store failed. The stored record may be partially written, the cached number is unchanged.
    Storage(E),
}

/// Phone number record in a [NvStore], cached in memory
pub struct PhoneNumberStore<S: NvStore> {
    store: S,
    config: StoreConfig,

    /// Mirrors the persisted record
    cached: Option<PhoneNumber>,
}

impl<S: NvStore> PhoneNumberStore<S> {
    /// Takes ownership of the store and loads the persisted number
    ///
    /// A length of zero or above the max. length (e.g. erased or never written memory) is treated as
    /// "no number", as are unreadable records.
    pub fn load(store: S, config: StoreConfig) -> Self {
        let config = StoreConfig::new(config.base_address, config.max_len);
        let mut instance = Self {
            store,
            config,
            cached: None,
        };

        match instance.read_record() {
            Ok(number) => instance.cached = number,
            Err(_) => warn!("Reading phone number failed, treating as not stored"),
        }

        instance
    }

    /// Returns the stored phone number, None if no number is stored
    pub fn phone_number(&self) -> Option<&str> {
        self.cached.as_deref()
    }

    /// Validates and stores the given number
    ///
    /// Empty numbers or numbers exceeding the max. length are rejected without touching the store.
    pub fn set(&mut self, number: &str) -> Result<(), StoreError<S::Error>> {
        if number.is_empty() || number.len() > self.config.max_len {
            return Err(StoreError::InvalidLength);
        }

        self.save(number)
    }

    /// Stores the given number, truncated to the max. length
    pub fn save(&mut self, number: &str) -> Result<(), StoreError<S::Error>> {
        let number = truncate(number, self.config.max_len);
        self.write_record(number.as_bytes()).map_err(StoreError::Storage)?;

        // Truncated to max_len <= capacity, so always fits
        self.cached = if number.is_empty() {
            None
        } else {
            PhoneNumber::try_from(number).ok()
        };
        debug!("Stored phone number of length {}", number.len());
        Ok(())
    }

    /// Overwrites the record with an empty number
    pub fn clear(&mut self) -> Result<(), StoreError<S::Error>> {
        self.save("")
    }

    /// Returns the current configuration
    pub fn config(&self) -> StoreConfig {
        self.config
    }

    /// Releases the underlying store
    pub fn release(self) -> S {
        self.store
    }

    fn read_record(&mut self) -> Result<Option<PhoneNumber>, S::Error> {
        let base = self.config.base_address;
        let length = self.store.read(base)? as usize;

        if length == 0 || length > self.config.max_len {
            trace!("No phone number stored (length byte {})", length);
            return Ok(None);
        }

        let mut bytes = [0x0; PHONE_NUMBER_CAPACITY];
        for (offset, byte) in bytes[..length].iter_mut().enumerate() {
            *byte = self.store.read(base + 1 + offset as u32)?;
        }

        let number = core::str::from_utf8(&bytes[..length]).ok().and_then(|text| PhoneNumber::try_from(text).ok());
        if number.is_none() {
            warn!("Stored phone number is not valid text");
        }

        Ok(number)
    }

    fn write_record(&mut self, number: &[u8]) -> Result<(), S::Error> {
        let base = self.config.base_address;
        self.store.write(base, number.len() as u8)?;

        for offset in 0..self.config.max_len {
            let value = number.get(offset).copied().unwrap_or(0x0);
            self.store.write(base + 1 + offset as u32, value)?;
        }

        self.store.commit()
    }
}

/// Cuts the number to the given max. byte length, respecting char boundaries
fn truncate(number: &str, max_len: usize) -> &str {
    let mut end = number.len().min(max_len);
    while !number.is_char_boundary(end) {
        end -= 1;
    }

    &number[..end]
}
