//! Scripted in-memory port for deterministic testing of the protocol layers.
//!
//! [`MockPort`] implements [`TransportPort`] with pre-loaded request/response
//! pairs, so frame encoding, stream resynchronization and reply decoding can
//! be exercised without hardware.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use instrframe_transport::{MockPort, TransportPort};
//!
//! let mut port = MockPort::new();
//! port.expect(b"!#@O7", b"!%AV1");
//!
//! port.write(b"!#@O7").unwrap();
//! let mut buf = [0u8; 5];
//! port.read_exact(&mut buf, Duration::from_millis(10)).unwrap();
//! assert_eq!(&buf, b"!%AV1");
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::traits::TransportPort;

#[derive(Debug, Clone)]
struct Expectation {
    request: Option<Vec<u8>>,
    response: Vec<u8>,
}

/// A [`TransportPort`] backed by in-memory queues.
///
/// Expectations are consumed in order. A write is checked against the next
/// expectation and its response is appended to the input queue. Reads that
/// cannot be satisfied wait out their timeout (so deadline behavior is
/// observable) and then fail with `Timeout`, unless the port was marked as
/// disconnected, in which case they fail with `Closed` once input runs dry.
#[derive(Debug)]
pub struct MockPort {
    expectations: VecDeque<Expectation>,
    input: VecDeque<u8>,
    sent_log: Vec<Vec<u8>>,
    open: bool,
    eof_when_drained: bool,
    wait_on_timeout: bool,
}

impl MockPort {
    /// Create an open port with nothing scripted.
    pub fn new() -> Self {
        Self {
            expectations: VecDeque::new(),
            input: VecDeque::new(),
            sent_log: Vec::new(),
            open: true,
            eof_when_drained: false,
            wait_on_timeout: true,
        }
    }

    /// Answer the next write, which must equal `request`, with `response`.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expectations.push_back(Expectation {
            request: Some(request.to_vec()),
            response: response.to_vec(),
        });
    }

    /// Answer the next write, whatever it contains, with `response`.
    pub fn reply_to_any(&mut self, response: &[u8]) {
        self.expectations.push_back(Expectation {
            request: None,
            response: response.to_vec(),
        });
    }

    /// Queue bytes as if the device had sent them unprompted.
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.extend(bytes.iter().copied());
    }

    /// Report end-of-stream instead of waiting once input is exhausted.
    pub fn set_eof_when_drained(&mut self, eof: bool) {
        self.eof_when_drained = eof;
    }

    /// Fail unsatisfied reads immediately instead of sleeping for the timeout.
    pub fn set_wait_on_timeout(&mut self, wait: bool) {
        self.wait_on_timeout = wait;
    }

    /// All writes seen so far, one entry per call.
    pub fn sent_data(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    /// Expectations not yet consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Bytes queued on the input side.
    pub fn pending_input(&self) -> usize {
        self.input.len()
    }
}

impl Default for MockPort {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportPort for MockPort {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        self.sent_log.push(data.to_vec());

        if let Some(expectation) = self.expectations.pop_front() {
            if let Some(request) = &expectation.request {
                if request.as_slice() != data {
                    return Err(TransportError::UnexpectedWrite {
                        expected: request.clone(),
                        actual: data.to_vec(),
                    });
                }
            }
            self.input.extend(expectation.response.iter().copied());
        }
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        if !self.open {
            return Err(TransportError::Closed);
        }

        let available = self.input.len().min(buf.len());
        for slot in buf.iter_mut().take(available) {
            // `available` never exceeds the queue length.
            *slot = self.input.pop_front().unwrap_or_default();
        }
        if available == buf.len() {
            return Ok(());
        }

        if self.eof_when_drained {
            return Err(TransportError::Closed);
        }
        if self.wait_on_timeout {
            std::thread::sleep(timeout);
        }
        Err(TransportError::Timeout {
            wanted: buf.len(),
            received: available,
            timeout,
        })
    }

    fn bytes_available(&mut self) -> Result<usize> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        Ok(self.input.len())
    }

    fn discard_input(&mut self) -> Result<usize> {
        let n = self.input.len();
        self.input.clear();
        Ok(n)
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
