use std::time::Duration;

use crate::error::Result;

/// A blocking, exclusively owned byte stream to one instrument.
///
/// The link is half-duplex: callers write one request and read its reply
/// before writing again. Implementations never reorder or transform bytes;
/// every value 0–255 crosses the link unchanged.
pub trait TransportPort {
    /// Write all bytes to the port (blocking).
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Fill `buf` completely, waiting at most `timeout` in total.
    ///
    /// On expiry returns [`TransportError::Timeout`](crate::TransportError::Timeout)
    /// with the number of bytes already placed at the front of `buf`.
    fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()>;

    /// Number of bytes that can be read without blocking.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Drop everything currently buffered on the input side.
    ///
    /// Returns the number of bytes discarded when the implementation can
    /// tell, otherwise zero.
    fn discard_input(&mut self) -> Result<usize>;

    /// Close the port. Later reads and writes fail with `Closed`.
    fn close(&mut self) -> Result<()>;

    /// Whether the port is still open.
    fn is_open(&self) -> bool;
}

impl<T: TransportPort + ?Sized> TransportPort for &mut T {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        (**self).read_exact(buf, timeout)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        (**self).bytes_available()
    }

    fn discard_input(&mut self) -> Result<usize> {
        (**self).discard_input()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

impl<T: TransportPort + ?Sized> TransportPort for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        (**self).read_exact(buf, timeout)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        (**self).bytes_available()
    }

    fn discard_input(&mut self) -> Result<usize> {
        (**self).discard_input()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}
