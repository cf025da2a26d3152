use bytes::BytesMut;
use instrframe_transport::TransportPort;
use tracing::trace;

use crate::codec::encode_frame;
use crate::error::Result;
use crate::variant::{Direction, VariantConfig};

const INITIAL_BUFFER_CAPACITY: usize = 264;

/// Writes complete frames to a [`TransportPort`].
///
/// Frames are fully encoded before the first byte is written, so a payload
/// that does not fit the length field never reaches the wire.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: VariantConfig,
    direction: Direction,
}

impl<T: TransportPort> FrameWriter<T> {
    /// Create a writer for host-to-device frames.
    pub fn new(inner: T, config: VariantConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            direction: Direction::HostToDevice,
        }
    }

    /// Write frames travelling in `direction` instead (device simulators).
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Encode and send one frame; returns the number of bytes written.
    pub fn send(&mut self, destination: u8, source: u8, command: u16, payload: &[u8]) -> Result<usize> {
        self.buf.clear();
        encode_frame(
            &self.config,
            self.direction,
            destination,
            source,
            command,
            payload,
            &mut self.buf,
        )?;

        trace!(command, bytes = ?&self.buf[..], "writing frame");
        self.inner.write(&self.buf)?;
        Ok(self.buf.len())
    }

    /// Bytes of the most recently sent frame.
    pub fn last_frame(&self) -> &[u8] {
        &self.buf
    }

    /// Borrow the underlying port.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying port.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner port.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
