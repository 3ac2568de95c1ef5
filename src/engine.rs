//! # Command/response engine
//!
//! Executes one AT command at a time over a plain byte stream. Response bytes are accumulated until
//! the expected token shows up or the command timeout elapses.
//!
//! The engine is a small state machine advanced by [Engine::poll]. A cooperative scheduler may call
//! `poll()` on every tick and continue with other work while it returns `WouldBlock`. The blocking
//! methods [Engine::execute] and [Engine::collect] just drive the same machine until it finishes.
//!
//! ## Example
//!
//! ````
//! # use at_sms::example::{ExampleTimer, ExampleTransport};
//! # use at_sms::engine::{Command, Engine, State};
//! # use fugit::ExtU32;
//! #
//! let mut engine: Engine<_, _, 1_000, 256> = Engine::new(ExampleTransport::default(), ExampleTimer::default());
//!
//! // Blocking
//! engine.execute(&Command::new(b"AT", b"OK", 1_000.millis())).unwrap();
//!
//! // Non-blocking
//! engine.start(&Command::new(b"AT", b"OK", 1_000.millis())).unwrap();
//! while engine.poll().is_err() {
//!     // Other work
//! }
//! assert_eq!(State::Matched, engine.state());
//! ````
use crate::fmt::Bytes;
use crate::matcher::TokenMatcher;
use embedded_io::{Error as IoError, ErrorKind, Read, ReadReady, Write};
use fugit::{MillisDurationU32, TimerDurationU32};
use fugit_timer::Timer;
use heapless::Vec;

/// Appended to every transmitted command line
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Max. count of stale bytes discarded before a command is sent
pub const DRAIN_LIMIT: usize = 1_024;

/// A single AT command
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command<'a> {
    /// Command line without terminator. Empty text means "just listen".
    pub text: &'a [u8],

    /// Token whose appearance in the response completes the command
    pub token: &'a [u8],

    /// Max. time to wait for the token
    pub timeout: MillisDurationU32,
}

impl<'a> Command<'a> {
    pub fn new(text: &'a [u8], token: &'a [u8], timeout: MillisDurationU32) -> Self {
        Self { text, token, timeout }
    }

    /// Command which transmits nothing and waits for the token only
    pub fn listen(token: &'a [u8], timeout: MillisDurationU32) -> Self {
        Self::new(b"", token, timeout)
    }
}

/// Errors of a single command exchange
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Expected token was not received within the command timeout
    Timeout,

    /// Reading or writing the transport failed
    Transport(ErrorKind),

    /// Upstream timer error
    Timer,

    /// Token is longer than [crate::matcher::MAX_TOKEN_LEN]
    InvalidToken,

    /// Another exchange is still in progress
    Busy,

    /// poll() was called without starting an exchange
    NotStarted,
}

/// State of the current exchange
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// No exchange was started yet, or the last one was aborted by a transport/timer error
    Idle,

    /// Command was sent, waiting for the token
    AwaitingToken,

    /// Accumulating all received bytes until the timeout elapses
    Collecting,

    /// Token was received
    Matched,

    /// Collection window elapsed
    Collected,

    /// Timeout elapsed before the token was received
    TimedOut,
}

/// Drives the transport for one command at a time
///
/// RX_SIZE: Capacity of the response buffer. Bytes exceeding the capacity are dropped from the buffer
/// but still checked for the expected token.
pub struct Engine<IO, T: Timer<TIMER_HZ>, const TIMER_HZ: u32, const RX_SIZE: usize> {
    /// Serial transport to the modem
    pub(crate) io: IO,

    /// Timer used for timeout measurement
    pub(crate) timer: T,

    /// Response bytes of the current exchange
    buffer: Vec<u8, RX_SIZE>,

    /// Matcher for the expected token of the current command
    matcher: TokenMatcher,

    /// Current exchange state
    state: State,

    /// True if bytes got dropped during the current exchange
    overflow: bool,
}

impl<IO, T, const TIMER_HZ: u32, const RX_SIZE: usize> Engine<IO, T, TIMER_HZ, RX_SIZE>
where
    IO: Read + Write + ReadReady,
    T: Timer<TIMER_HZ>,
{
    pub fn new(io: IO, timer: T) -> Self {
        Self {
            io,
            timer,
            buffer: Vec::new(),
            matcher: TokenMatcher::default(),
            state: State::Idle,
            overflow: false,
        }
    }

    /// Sends the command and blocks until the token was received or the timeout elapsed
    pub fn execute(&mut self, command: &Command<'_>) -> Result<(), CommandError> {
        self.start(command)?;
        nb::block!(self.poll())
    }

    /// Accumulates all received bytes for the given duration and returns the full response
    ///
    /// Nothing is transmitted or drained. The bytes of the preceding exchange are kept in front, so
    /// a response may be parsed as a whole after the command itself matched a token.
    pub fn collect(&mut self, timeout: MillisDurationU32) -> Result<&[u8], CommandError> {
        self.start_collect(timeout)?;
        nb::block!(self.poll())?;
        Ok(self.response())
    }

    /// Starts a command exchange without blocking
    ///
    /// Pending bytes get discarded before the command is sent, so stale modem messages never count
    /// for the new command.
    pub fn start(&mut self, command: &Command<'_>) -> Result<(), CommandError> {
        self.assert_not_busy()?;
        let matcher = TokenMatcher::new(command.token).ok_or(CommandError::InvalidToken)?;

        self.abort_on_error(|engine| engine.drain())?;
        self.buffer.clear();
        self.overflow = false;
        self.matcher = matcher;

        if !command.text.is_empty() {
            debug!("AT >> {:?}", Bytes(command.text));
            self.abort_on_error(|engine| engine.transmit(command.text, true))?;
        }

        self.start_timer(command.timeout)?;
        self.state = State::AwaitingToken;
        Ok(())
    }

    /// Starts accumulating without blocking, s. [Engine::collect]
    pub fn start_collect(&mut self, timeout: MillisDurationU32) -> Result<(), CommandError> {
        self.assert_not_busy()?;

        self.start_timer(timeout)?;
        self.state = State::Collecting;
        Ok(())
    }

    /// Advances the current exchange by reading the available bytes (at most RX_SIZE) and checking the timer
    ///
    /// Returns `WouldBlock` while the exchange is in progress. A finished exchange repeats its outcome.
    pub fn poll(&mut self) -> nb::Result<(), CommandError> {
        match self.state {
            State::Idle => Err(nb::Error::Other(CommandError::NotStarted)),
            State::Matched | State::Collected => Ok(()),
            State::TimedOut => Err(nb::Error::Other(CommandError::Timeout)),
            State::AwaitingToken | State::Collecting => self.advance(),
        }
    }

    /// Writes the given bytes verbatim, without line terminator
    pub fn write_raw(&mut self, data: &[u8]) -> Result<(), CommandError> {
        self.assert_not_busy()?;
        trace!("AT >> {} raw bytes", data.len());
        self.abort_on_error(|engine| engine.transmit(data, false))
    }

    /// Returns the current exchange state
    pub fn state(&self) -> State {
        self.state
    }

    /// Returns the bytes received by the current (or last) exchange
    pub fn response(&self) -> &[u8] {
        &self.buffer
    }

    /// Releases transport and timer
    pub fn release(self) -> (IO, T) {
        (self.io, self.timer)
    }

    fn advance(&mut self) -> nb::Result<(), CommandError> {
        self.abort_on_error(|engine| engine.receive())?;

        if self.state == State::AwaitingToken && self.matcher.is_matched() {
            trace!("AT << {:?}", Bytes(&self.buffer));
            self.state = State::Matched;
            return Ok(());
        }

        match self.timer.wait() {
            Ok(()) => self.finish_window(),
            Err(nb::Error::WouldBlock) => Err(nb::Error::WouldBlock),
            Err(nb::Error::Other(_)) => {
                self.state = State::Idle;
                Err(nb::Error::Other(CommandError::Timer))
            }
        }
    }

    /// Handles the elapsed timer
    fn finish_window(&mut self) -> nb::Result<(), CommandError> {
        if self.state == State::Collecting {
            trace!("AT << {:?}", Bytes(&self.buffer));
            self.state = State::Collected;
            return Ok(());
        }

        warn!("Timeout, received so far: {:?}", Bytes(&self.buffer));
        self.state = State::TimedOut;
        Err(nb::Error::Other(CommandError::Timeout))
    }

    /// Reads the available bytes, at most RX_SIZE per poll. Stops right after the token was matched.
    fn receive(&mut self) -> Result<(), CommandError> {
        for _ in 0..RX_SIZE.max(1) {
            if !self.io.read_ready().map_err(transport_error)? {
                break;
            }

            let mut byte = [0x0; 1];
            if self.io.read(&mut byte).map_err(transport_error)? == 0 {
                break;
            }

            self.store(byte[0]);
            if self.state == State::AwaitingToken && self.matcher.feed(byte[0]) {
                break;
            }
        }

        Ok(())
    }

    /// Appends a received byte to the response buffer
    fn store(&mut self, byte: u8) {
        if self.buffer.push(byte).is_err() && !self.overflow {
            warn!("Response buffer full, dropping bytes beyond {}", RX_SIZE);
            self.overflow = true;
        }
    }

    /// Discards pending bytes, at most [DRAIN_LIMIT]
    fn drain(&mut self) -> Result<(), CommandError> {
        let mut count = 0_usize;

        while count < DRAIN_LIMIT && self.io.read_ready().map_err(transport_error)? {
            let mut byte = [0x0; 1];
            if self.io.read(&mut byte).map_err(transport_error)? == 0 {
                break;
            }
            count += 1;
        }

        if count == DRAIN_LIMIT {
            warn!("Transport still busy after discarding {} stale bytes", count);
        } else if count > 0 {
            debug!("Discarded {} stale bytes", count);
        }
        Ok(())
    }

    fn transmit(&mut self, data: &[u8], terminate: bool) -> Result<(), CommandError> {
        self.io.write_all(data).map_err(transport_error)?;
        if terminate {
            self.io.write_all(LINE_TERMINATOR).map_err(transport_error)?;
        }
        self.io.flush().map_err(transport_error)
    }

    fn start_timer(&mut self, timeout: MillisDurationU32) -> Result<(), CommandError> {
        let duration = TimerDurationU32::<TIMER_HZ>::millis(timeout.to_millis());
        self.timer.start(duration).map_err(|_| {
            self.state = State::Idle;
            CommandError::Timer
        })
    }

    fn assert_not_busy(&self) -> Result<(), CommandError> {
        match self.state {
            State::AwaitingToken | State::Collecting => Err(CommandError::Busy),
            _ => Ok(()),
        }
    }

    /// Resets the state to idle if the given operation fails
    fn abort_on_error<R>(&mut self, operation: impl FnOnce(&mut Self) -> Result<R, CommandError>) -> Result<R, CommandError> {
        operation(self).map_err(|error| {
            error!("Exchange aborted: {:?}", error);
            self.state = State::Idle;
            error
        })
    }
}

pub(crate) fn transport_error<E: IoError>(error: E) -> CommandError {
    CommandError::Transport(error.kind())
}
