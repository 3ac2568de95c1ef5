//! # Async client
//!
//! Same operations as the blocking client, based on [embedded_io_async] and [embassy_time]. Waiting for
//! responses yields to the executor instead of busy polling.
mod engine;
mod sms;

pub use engine::Engine;
pub use sms::Modem;
