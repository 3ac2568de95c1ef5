//! Mocks for doc examples
use crate::storage::NvStore;
use core::convert::Infallible;
use embedded_io::{ErrorType, Read, ReadReady, Write};
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer;
use heapless::{Deque, Vec};

/// Serial transport mock answering like a registered SIM800 module with one stored message
#[derive(Default)]
pub struct ExampleTransport {
    /// Current (incomplete) command line
    line: Vec<u8, 256>,

    /// Response bytes not read yet
    pending: Deque<u8, 512>,

    /// Submission confirmation, arrives one poll later than other responses
    delayed: Deque<u8, 64>,
}

impl ExampleTransport {
    fn respond(&mut self) {
        if self.line.ends_with(&[0x1A]) {
            for byte in b"\r\n+CMGS: 7\r\n\r\nOK\r\n" {
                let _ = self.delayed.push_back(*byte);
            }
            self.line.clear();
            return;
        }

        let reply: &[u8] = match self.line.as_slice() {
            b"AT\r\n" | b"AT+CMGF=1\r\n" | b"AT+CMGD=1\r\n" | b"AT+QPOWD\r\n" => b"\r\nOK\r\n",
            b"AT+CREG?\r\n" => b"\r\n+CREG: 0,1\r\n\r\nOK\r\n",
            b"AT+CMGR=1\r\n" => b"\r\n+CMGR: \"REC READ\",\"+15551234567\",\"\",\"24/05/01,10:00:00+00\"\r\nHello world\r\n\r\nOK\r\n",
            line if line.starts_with(b"AT+CMGS=") => b"\r\n> ",
            _ => b"\r\nERROR\r\n",
        };

        for byte in reply {
            let _ = self.pending.push_back(*byte);
        }
        self.line.clear();
    }
}

impl ErrorType for ExampleTransport {
    type Error = Infallible;
}

impl Read for ExampleTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut count = 0;
        while count < buf.len() {
            match self.pending.pop_front() {
                Some(byte) => buf[count] = byte,
                None => break,
            }
            count += 1;
        }

        Ok(count)
    }
}

impl ReadReady for ExampleTransport {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        if self.pending.is_empty() && !self.delayed.is_empty() {
            while let Some(byte) = self.delayed.pop_front() {
                let _ = self.pending.push_back(byte);
            }
            return Ok(false);
        }

        Ok(!self.pending.is_empty())
    }
}

impl Write for ExampleTransport {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        for byte in buf {
            let _ = self.line.push(*byte);
            if *byte == b'\n' || *byte == 0x1A {
                self.respond();
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Timer mock, elapses after 100 polls
#[derive(Default)]
pub struct ExampleTimer {
    remaining: u32,
}

impl<const TIMER_HZ: u32> Timer<TIMER_HZ> for ExampleTimer {
    type Error = Infallible;

    fn now(&mut self) -> TimerInstantU32<TIMER_HZ> {
        TimerInstantU32::from_ticks(0)
    }

    fn start(&mut self, _duration: TimerDurationU32<TIMER_HZ>) -> Result<(), Self::Error> {
        self.remaining = 100;
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn wait(&mut self) -> nb::Result<(), Self::Error> {
        if self.remaining == 0 {
            return Ok(());
        }

        self.remaining -= 1;
        Err(nb::Error::WouldBlock)
    }
}

/// EEPROM mock of 1 KiB, initially erased
pub struct ExampleStore {
    memory: [u8; 1024],
}

impl Default for ExampleStore {
    fn default() -> Self {
        Self { memory: [0xFF; 1024] }
    }
}

impl NvStore for ExampleStore {
    type Error = Infallible;

    fn read(&mut self, address: u32) -> Result<u8, Self::Error> {
        Ok(self.memory.get(address as usize).copied().unwrap_or(0xFF))
    }

    fn write(&mut self, address: u32, value: u8) -> Result<(), Self::Error> {
        if let Some(cell) = self.memory.get_mut(address as usize) {
            *cell = value;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
