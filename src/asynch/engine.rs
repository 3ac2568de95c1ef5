use crate::engine::{transport_error, Command, CommandError, DRAIN_LIMIT, LINE_TERMINATOR};
use crate::fmt::Bytes;
use crate::matcher::TokenMatcher;
use core::convert::Infallible;
use embassy_futures::select::{select, Either};
use embassy_futures::yield_now;
use embassy_time::{Duration, Timer};
use embedded_io::ReadReady;
use embedded_io_async::{Read, Write};
use fugit::MillisDurationU32;
use heapless::Vec;

/// Async counterpart of [crate::engine::Engine]
///
/// Timeouts are measured by [embassy_time::Timer], racing against the reception of response bytes.
pub struct Engine<IO, const RX_SIZE: usize> {
    /// Serial transport to the modem
    pub(crate) io: IO,

    /// Response bytes of the current exchange
    buffer: Vec<u8, RX_SIZE>,

    /// True if bytes got dropped during the current exchange
    overflow: bool,
}

impl<IO, const RX_SIZE: usize> Engine<IO, RX_SIZE>
where
    IO: Read + Write + ReadReady,
{
    pub fn new(io: IO) -> Self {
        Self {
            io,
            buffer: Vec::new(),
            overflow: false,
        }
    }

    /// Sends the command and waits until the token was received or the timeout elapsed
    pub async fn execute(&mut self, command: &Command<'_>) -> Result<(), CommandError> {
        let mut matcher = TokenMatcher::new(command.token).ok_or(CommandError::InvalidToken)?;

        self.drain().await?;
        self.buffer.clear();
        self.overflow = false;

        if !command.text.is_empty() {
            debug!("AT >> {:?}", Bytes(command.text));
            self.transmit(command.text).await?;
            self.transmit(LINE_TERMINATOR).await?;
        }

        let result = select(Timer::after(duration(command.timeout)), self.receive_token(&mut matcher)).await;
        match result {
            Either::First(_) => {
                warn!("Timeout, received so far: {:?}", Bytes(&self.buffer));
                Err(CommandError::Timeout)
            }
            Either::Second(result) => {
                trace!("AT << {:?}", Bytes(&self.buffer));
                result
            }
        }
    }

    /// Accumulates all received bytes for the given duration and returns the full response
    ///
    /// Like the blocking engine, the bytes of the preceding exchange are kept in front.
    pub async fn collect(&mut self, timeout: MillisDurationU32) -> Result<&[u8], CommandError> {
        let result = select(Timer::after(duration(timeout)), self.receive_all()).await;
        match result {
            Either::First(_) => {
                trace!("AT << {:?}", Bytes(&self.buffer));
                Ok(self.buffer.as_slice())
            }
            Either::Second(Err(error)) => Err(error),
            Either::Second(Ok(never)) => match never {},
        }
    }

    /// Writes the given bytes verbatim, without line terminator
    pub async fn write_raw(&mut self, data: &[u8]) -> Result<(), CommandError> {
        trace!("AT >> {} raw bytes", data.len());
        self.transmit(data).await
    }

    /// Returns the bytes received by the last exchange
    pub fn response(&self) -> &[u8] {
        &self.buffer
    }

    /// Releases the transport
    pub fn release(self) -> IO {
        self.io
    }

    async fn receive_token(&mut self, matcher: &mut TokenMatcher) -> Result<(), CommandError> {
        let mut count = 0_usize;
        loop {
            let byte = self.receive_byte().await?;
            if matcher.feed(byte) {
                return Ok(());
            }

            count = count.wrapping_add(1);
            pace::<RX_SIZE>(count).await;
        }
    }

    async fn receive_all(&mut self) -> Result<Infallible, CommandError> {
        let mut count = 0_usize;
        loop {
            self.receive_byte().await?;
            count = count.wrapping_add(1);
            pace::<RX_SIZE>(count).await;
        }
    }

    async fn receive_byte(&mut self) -> Result<u8, CommandError> {
        let mut byte = [0x0; 1];
        while self.io.read(&mut byte).await.map_err(transport_error)? == 0 {
            yield_now().await;
        }

        if self.buffer.push(byte[0]).is_err() && !self.overflow {
            warn!("Response buffer full, dropping bytes beyond {}", RX_SIZE);
            self.overflow = true;
        }
        Ok(byte[0])
    }

    /// Discards pending bytes, at most [DRAIN_LIMIT]
    async fn drain(&mut self) -> Result<(), CommandError> {
        let mut byte = [0x0; 1];
        let mut count = 0_usize;

        while count < DRAIN_LIMIT && self.io.read_ready().map_err(transport_error)? {
            if self.io.read(&mut byte).await.map_err(transport_error)? == 0 {
                break;
            }
            count += 1;
        }

        if count == DRAIN_LIMIT {
            warn!("Transport still busy after discarding {} stale bytes", count);
        }
        Ok(())
    }

    async fn transmit(&mut self, data: &[u8]) -> Result<(), CommandError> {
        self.io.write_all(data).await.map_err(transport_error)?;
        self.io.flush().await.map_err(transport_error)
    }
}

/// Yields after every RX_SIZE received bytes, so the timeout gets polled on a continuous byte stream
async fn pace<const RX_SIZE: usize>(count: usize) {
    if count % RX_SIZE.max(1) == 0 {
        yield_now().await;
    }
}

fn duration(timeout: MillisDurationU32) -> Duration {
    Duration::from_millis(timeout.to_millis() as u64)
}
