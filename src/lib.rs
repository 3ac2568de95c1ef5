//! # SMS client for serial AT modems
//!
//! Sends, reads and deletes text messages and checks the network registration of SIM800/Quectel
//! class modules over a plain serial byte stream, plus a persistent default recipient.
//!
//! * [engine]: Command/response engine, one AT command at a time
//! * [sms]: Blocking SMS client
//! * [storage]: Phone number record in non-volatile memory
//! * `asynch`: Async SMS client (feature `async`)
#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub(crate) mod commands;
pub mod config;
pub mod engine;
pub mod matcher;
pub mod responses;
pub mod sms;
pub mod storage;

#[cfg(feature = "async")]
pub mod asynch;

#[cfg(feature = "examples")]
pub mod example;

#[cfg(test)]
mod tests;
