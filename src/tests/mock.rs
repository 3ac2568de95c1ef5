use crate::storage::NvStore;
use embedded_io::{ErrorKind, ErrorType, Read, ReadReady, Write};
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer as FugitTimer;
use mockall::mock;
use std::collections::VecDeque;

/// Reply which gets released once the next command line (or message body) was written
struct MockedReply {
    /// Expected command line including terminator
    expected: &'static [u8],

    /// Reply chunks. Each chunk becomes readable one poll after the previous one.
    chunks: Vec<&'static [u8]>,
}

/// Custom serial mock
///
/// Written bytes are split into units terminated by `\n` or Ctrl+Z. Each unit releases the next mocked
/// reply. Reply chunks are separated by gaps, so a gap ends the current read cycle of the engine.
pub struct MockTransport {
    /// All written bytes
    pub written: Vec<u8>,

    /// Current incomplete unit
    line: Vec<u8>,

    /// Readable bytes, None represents a gap
    pending: VecDeque<Option<u8>>,

    /// Mocked replies which get returned in the same order as inserted
    replies: VecDeque<MockedReply>,

    /// Count of all read_ready(), read() and write() calls
    pub io_calls: usize,

    /// Simulates a broken read direction
    pub fail_reads: bool,

    /// Simulates a broken write direction
    pub fail_writes: bool,

    /// Simulates a write direction breaking after the given count of write() calls
    pub fail_writes_after: Option<usize>,

    /// Count of write() calls
    write_calls: usize,

    /// Line noise, readable without end once the pending bytes are exhausted
    pub noise: Option<u8>,

    /// Count of bytes returned by read()
    pub bytes_read: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            written: vec![],
            line: vec![],
            pending: VecDeque::new(),
            replies: VecDeque::new(),
            io_calls: 0,
            fail_reads: false,
            fail_writes: false,
            fail_writes_after: None,
            write_calls: 0,
            noise: None,
            bytes_read: 0,
        }
    }

    /// Adds bytes which are readable before any command is sent
    pub fn add_stale(&mut self, bytes: &'static [u8]) {
        self.pending.extend(bytes.iter().map(|byte| Some(*byte)));
    }

    /// Adds a reply for the given command line
    pub fn add_reply(&mut self, expected: &'static [u8], reply: &'static [u8]) {
        self.add_chunked_reply(expected, &[reply]);
    }

    /// Adds a reply arriving in multiple chunks
    pub fn add_chunked_reply(&mut self, expected: &'static [u8], chunks: &[&'static [u8]]) {
        self.replies.push_back(MockedReply {
            expected,
            chunks: chunks.to_vec(),
        });
    }

    /// Simulates a command the modem does not respond to
    pub fn add_silence(&mut self, expected: &'static [u8]) {
        self.add_chunked_reply(expected, &[]);
    }

    /// Simulates the regular OK response
    pub fn add_ok_reply(&mut self, expected: &'static [u8]) {
        self.add_reply(expected, b"\r\nOK\r\n");
    }

    /// Returns the written bytes as string
    pub fn written_as_string(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }

    /// Asserts that all mocked replies have been consumed
    pub fn assert_all_replies_sent(&self) {
        assert!(self.replies.is_empty(), "{} replies left", self.replies.len());
    }

    fn respond(&mut self, unit: &[u8]) {
        let Some(reply) = self.replies.pop_front() else {
            return;
        };

        assert_eq!(
            String::from_utf8_lossy(reply.expected),
            String::from_utf8_lossy(unit),
            "unexpected command"
        );

        // Leading gap, reply is never available in the same read cycle as the command was sent
        self.pending.push_back(None);
        for chunk in reply.chunks {
            self.pending.extend(chunk.iter().map(|byte| Some(*byte)));
            self.pending.push_back(None);
        }
    }
}

impl ErrorType for MockTransport {
    type Error = ErrorKind;
}

impl Read for MockTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.io_calls += 1;
        if self.fail_reads {
            return Err(ErrorKind::Other);
        }

        let mut count = 0;
        while count < buf.len() {
            match (self.pending.front(), self.noise) {
                (Some(Some(byte)), _) => {
                    buf[count] = *byte;
                    self.pending.pop_front();
                }
                (None, Some(noise)) => buf[count] = noise,
                _ => break,
            }
            count += 1;
        }

        self.bytes_read += count;
        Ok(count)
    }
}

impl ReadReady for MockTransport {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        self.io_calls += 1;
        if self.fail_reads {
            return Err(ErrorKind::Other);
        }

        match self.pending.front() {
            Some(Some(_)) => Ok(true),
            Some(None) => {
                self.pending.pop_front();
                Ok(false)
            }
            None => Ok(self.noise.is_some()),
        }
    }
}

impl Write for MockTransport {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.io_calls += 1;
        self.write_calls += 1;
        if self.fail_writes || self.fail_writes_after.is_some_and(|limit| self.write_calls > limit) {
            return Err(ErrorKind::BrokenPipe);
        }

        for byte in buf {
            self.written.push(*byte);
            self.line.push(*byte);

            if *byte == b'\n' || *byte == 0x1A {
                let unit = core::mem::take(&mut self.line);
                self.respond(&unit);
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(feature = "async")]
impl embedded_io_async::Read for MockTransport {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        loop {
            if self.fail_reads {
                return Err(ErrorKind::Other);
            }

            match self.pending.front() {
                Some(Some(_)) => return Read::read(self, buf),
                Some(None) => {
                    self.pending.pop_front();
                }
                None if self.noise.is_some() => return Read::read(self, buf),
                None => {}
            }

            embassy_futures::yield_now().await;
        }
    }
}

#[cfg(feature = "async")]
impl embedded_io_async::Write for MockTransport {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Write::write(self, buf)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Timer advancing one tick (= 1 ms) on every wait() call
#[derive(Default)]
pub struct TickTimer {
    /// Ticks since last start()
    pub elapsed: u32,

    /// Duration of the last start() call in ticks
    pub deadline: u32,

    /// Count of start() calls
    pub started: usize,
}

impl FugitTimer<1_000> for TickTimer {
    type Error = u32;

    fn now(&mut self) -> TimerInstantU32<1_000> {
        TimerInstantU32::from_ticks(self.elapsed)
    }

    fn start(&mut self, duration: TimerDurationU32<1_000>) -> Result<(), u32> {
        self.elapsed = 0;
        self.deadline = duration.ticks();
        self.started += 1;
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), u32> {
        Ok(())
    }

    fn wait(&mut self) -> nb::Result<(), u32> {
        if self.elapsed >= self.deadline {
            return Ok(());
        }

        self.elapsed += 1;
        Err(nb::Error::WouldBlock)
    }
}

mock! {
    pub Timer{}

    impl FugitTimer<1_000> for Timer {
        type Error = u32;

        fn now(&mut self) -> TimerInstantU32<1000>;
        fn start(&mut self, duration: TimerDurationU32<1000>) -> Result<(), u32>;
        fn cancel(&mut self) -> Result<(), u32>;
        fn wait(&mut self) -> nb::Result<(), u32>;
    }
}

/// Error of [MockStore]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreFault;

/// In-memory EEPROM of 1 KiB
pub struct MockStore {
    pub memory: [u8; 1024],

    /// Count of write() calls
    pub writes: usize,

    /// Count of commit() calls
    pub commits: usize,

    pub fail_reads: bool,
    pub fail_writes: bool,
}

impl MockStore {
    /// Erased memory
    pub fn erased() -> Self {
        Self::filled(0xFF)
    }

    pub fn filled(value: u8) -> Self {
        Self {
            memory: [value; 1024],
            writes: 0,
            commits: 0,
            fail_reads: false,
            fail_writes: false,
        }
    }

    /// Memory with the given record at the given address
    pub fn with_record(address: usize, record: &[u8]) -> Self {
        let mut store = Self::erased();
        store.memory[address..address + record.len()].copy_from_slice(record);
        store
    }
}

impl NvStore for MockStore {
    type Error = StoreFault;

    fn read(&mut self, address: u32) -> Result<u8, StoreFault> {
        if self.fail_reads {
            return Err(StoreFault);
        }

        self.memory.get(address as usize).copied().ok_or(StoreFault)
    }

    fn write(&mut self, address: u32, value: u8) -> Result<(), StoreFault> {
        if self.fail_writes {
            return Err(StoreFault);
        }

        self.writes += 1;
        *self.memory.get_mut(address as usize).ok_or(StoreFault)? = value;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreFault> {
        self.commits += 1;
        Ok(())
    }
}
