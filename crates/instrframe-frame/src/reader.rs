use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use instrframe_transport::{TransportError, TransportPort};
use tracing::{debug, trace, warn};

use crate::codec::{assemble_frame, FrameWarning, Received};
use crate::error::{FrameError, Result};
use crate::variant::{Direction, VariantConfig};

/// Longest single blocking read while a stop signal is attached.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Shared flag asking an in-progress read to give up.
///
/// Polled between bytes while the reader is hunting for the sync byte.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask readers holding a clone of this signal to stop.
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a previous request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Position of a [`FrameReader`] in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    SeekSync,
    ReadLength,
    ReadBody,
    ReadChecksum,
    Validate,
    Complete,
    Error,
}

/// Reads one validated frame at a time from a [`TransportPort`].
///
/// Stray bytes before the sync byte are discarded. Every step shares one
/// deadline computed when [`read_frame`](Self::read_frame) is entered, so the
/// call returns no later than its timeout plus one transport read.
pub struct FrameReader<T> {
    inner: T,
    config: VariantConfig,
    direction: Direction,
    stop: Option<StopSignal>,
    state: ReadState,
}

impl<T: TransportPort> FrameReader<T> {
    /// Create a reader for device-to-host frames.
    pub fn new(inner: T, config: VariantConfig) -> Self {
        Self {
            inner,
            config,
            direction: Direction::DeviceToHost,
            stop: None,
            state: ReadState::SeekSync,
        }
    }

    /// Read frames travelling in `direction` instead.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Attach a stop signal polled while seeking the sync byte.
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Read the next complete frame, waiting at most `timeout` overall.
    pub fn read_frame(&mut self, timeout: Duration) -> Result<Received> {
        let deadline = Instant::now() + timeout;
        match self.drive(deadline, timeout) {
            Ok(received) => {
                self.state = ReadState::Complete;
                Ok(received)
            }
            Err(err) => {
                self.state = ReadState::Error;
                Err(err)
            }
        }
    }

    fn drive(&mut self, deadline: Instant, timeout: Duration) -> Result<Received> {
        let mut warnings = Vec::new();

        self.state = ReadState::SeekSync;
        let discarded = self.seek_sync(deadline, timeout)?;
        if discarded > 0 {
            debug!(discarded, "skipped stray bytes before sync");
            warnings.push(FrameWarning::DiscardedBytes(discarded));
        }
        let mut received = 1usize;

        self.state = ReadState::ReadLength;
        let mut length = [0u8; 1];
        self.read_step(&mut length, deadline, received, self.config.min_frame_len())?;
        received += 1;

        self.state = ReadState::ReadBody;
        let body_len = self.config.body_len(length[0], self.direction)?;
        let expected = 2 + body_len + self.config.trailer_len();
        let mut body = vec![0u8; body_len];
        self.read_step(&mut body, deadline, received, expected)?;
        received += body_len;

        self.state = ReadState::ReadChecksum;
        let mut trailer = [0u8; 2];
        let trailer = &mut trailer[..self.config.trailer_len()];
        self.read_step(trailer, deadline, received, expected)?;

        self.state = ReadState::Validate;
        let (frame, checksum_warning) = assemble_frame(&self.config, length[0], &body, trailer)?;
        warnings.extend(checksum_warning);

        // Only feeds the trailing-bytes warning; the frame itself is complete.
        let trailing = match self.inner.bytes_available() {
            Ok(n) => n,
            Err(err) => {
                debug!(error = %err, "could not query pending input after frame");
                0
            }
        };
        if trailing > 0 {
            warn!(trailing, command = frame.command, "bytes pending after frame");
            warnings.push(FrameWarning::TrailingBytes(trailing));
        }

        trace!(
            command = frame.command,
            payload_len = frame.payload.len(),
            "frame complete"
        );
        Ok(Received { frame, warnings })
    }

    /// Consume bytes until the sync byte; returns how many were skipped.
    fn seek_sync(&mut self, deadline: Instant, timeout: Duration) -> Result<usize> {
        let sync = self.config.sync_byte;
        let mut discarded = 0usize;
        let mut byte = [0u8; 1];

        loop {
            if self.stop_requested() {
                return Err(FrameError::Cancelled);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(if discarded == 0 {
                    FrameError::Timeout(timeout)
                } else {
                    FrameError::DesyncTimeout { sync, discarded }
                });
            }
            let wait = match self.stop {
                Some(_) => remaining.min(STOP_POLL_INTERVAL),
                None => remaining,
            };

            match self.inner.read_exact(&mut byte, wait) {
                Ok(()) if byte[0] == sync => return Ok(discarded),
                Ok(()) => discarded += 1,
                Err(TransportError::Timeout { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Fill `buf` before `deadline`; `received` and `expected` count whole-frame bytes.
    fn read_step(
        &mut self,
        buf: &mut [u8],
        deadline: Instant,
        received: usize,
        expected: usize,
    ) -> Result<()> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(FrameError::TruncatedStream { expected, received });
        }
        match self.inner.read_exact(buf, remaining) {
            Ok(()) => Ok(()),
            Err(err @ TransportError::Timeout { .. }) => Err(FrameError::TruncatedStream {
                expected,
                received: received + err.bytes_received(),
            }),
            Err(TransportError::Closed) => {
                Err(FrameError::TruncatedStream { expected, received })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn stop_requested(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|stop| stop.is_stop_requested())
    }

    /// Current state-machine position.
    pub fn state(&self) -> ReadState {
        self.state
    }

    /// Borrow the underlying port.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying port.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner port.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Variant parameters in use.
    pub fn config(&self) -> &VariantConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use instrframe_transport::MockPort;

    use super::*;
    use crate::codec::FrameCodec;
    use crate::variant::ChecksumPolicy;

    fn reply(config: VariantConfig, command: u16, payload: &[u8]) -> Vec<u8> {
        FrameCodec::new(config)
            .encode_as(Direction::DeviceToHost, 0xFF, 0x01, command, payload)
            .unwrap()
            .to_vec()
    }

    fn port_with(bytes: &[u8]) -> MockPort {
        let mut port = MockPort::new();
        port.set_wait_on_timeout(false);
        port.push_input(bytes);
        port
    }

    #[test]
    fn reads_single_prevac_frame() {
        let config = VariantConfig::prevac();
        let mut reader = FrameReader::new(port_with(&reply(config, 0x0202, &[1, 2, 3])), config);

        let received = reader.read_frame(Duration::from_millis(50)).unwrap();
        assert_eq!(received.frame.command, 0x0202);
        assert_eq!(received.frame.payload.as_ref(), &[1, 2, 3]);
        assert!(received.warnings.is_empty());
        assert_eq!(reader.state(), ReadState::Complete);
    }

    #[test]
    fn reads_single_sqm160_frame() {
        let config = VariantConfig::sqm160();
        let mut reader = FrameReader::new(port_with(&reply(config, u16::from(b'A'), b"1.23")), config);

        let received = reader.read_frame(Duration::from_millis(50)).unwrap();
        assert_eq!(received.frame.command, u16::from(b'A'));
        assert_eq!(received.frame.payload.as_ref(), b"1.23");
    }

    #[test]
    fn recovers_from_leading_garbage() {
        for config in [VariantConfig::prevac(), VariantConfig::sqm160()] {
            for garbage in [0usize, 1, 50] {
                // Never emit the sync byte as noise.
                let noise: Vec<u8> = (0..garbage)
                    .map(|i| {
                        let b = (i as u8).wrapping_mul(13).wrapping_add(1);
                        if b == config.sync_byte {
                            b.wrapping_add(1)
                        } else {
                            b
                        }
                    })
                    .collect();
                let mut wire = noise;
                wire.extend(reply(config, 0x41, b"xyz"));

                let mut reader = FrameReader::new(port_with(&wire), config);
                let received = reader.read_frame(Duration::from_millis(100)).unwrap();
                assert_eq!(received.frame.payload.as_ref(), b"xyz");
                if garbage > 0 {
                    assert_eq!(received.warnings, vec![FrameWarning::DiscardedBytes(garbage)]);
                } else {
                    assert!(received.warnings.is_empty());
                }
            }
        }
    }

    #[test]
    fn silent_stream_times_out_within_deadline() {
        let config = VariantConfig::prevac();
        let mut reader = FrameReader::new(MockPort::new(), config);
        let timeout = Duration::from_millis(40);

        let start = Instant::now();
        let err = reader.read_frame(timeout).unwrap_err();
        let elapsed = start.elapsed();

        assert!(matches!(err, FrameError::Timeout(t) if t == timeout));
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + Duration::from_millis(200));
        assert_eq!(reader.state(), ReadState::Error);
    }

    #[test]
    fn garbage_without_sync_is_desync_timeout() {
        let config = VariantConfig::prevac();
        let mut port = MockPort::new();
        port.push_input(&[0x01, 0x02, 0x03]);
        let mut reader = FrameReader::new(port, config);

        let err = reader.read_frame(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(
            err,
            FrameError::DesyncTimeout {
                sync: 0xBB,
                discarded: 3
            }
        ));
    }

    #[test]
    fn partial_body_is_truncated_stream() {
        let config = VariantConfig::prevac();
        let wire = reply(config, 0x0202, &[9; 8]);
        let mut reader = FrameReader::new(port_with(&wire[..6]), config);

        let err = reader.read_frame(Duration::from_millis(20)).unwrap_err();
        match err {
            FrameError::TruncatedStream { expected, received } => {
                assert_eq!(expected, wire.len());
                assert_eq!(received, 6);
            }
            other => panic!("expected TruncatedStream, got {other:?}"),
        }
    }

    #[test]
    fn eof_mid_frame_is_truncated_stream() {
        let config = VariantConfig::sqm160();
        let wire = reply(config, 0x41, b"12345");
        let mut port = port_with(&wire[..4]);
        port.set_eof_when_drained(true);
        let mut reader = FrameReader::new(port, config);

        let err = reader.read_frame(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, FrameError::TruncatedStream { .. }));
    }

    #[test]
    fn corrupted_frame_is_checksum_mismatch() {
        let config = VariantConfig::prevac();
        let mut wire = reply(config, 0x0202, &[1, 2, 3]);
        wire[6] ^= 0x40;
        let mut reader = FrameReader::new(port_with(&wire), config);

        let err = reader.read_frame(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, FrameError::ChecksumMismatch { .. }));
    }

    #[test]
    fn checksum_ignore_policy_completes() {
        let config = VariantConfig::sqm160().with_checksum_policy(ChecksumPolicy::Ignore);
        let mut wire = reply(config, 0x41, b"7");
        let last = wire.len() - 1;
        wire[last] = b'~';
        let mut reader = FrameReader::new(port_with(&wire), config);

        let received = reader.read_frame(Duration::from_millis(20)).unwrap();
        assert_eq!(received.frame.payload.as_ref(), b"7");
        assert!(matches!(
            received.warnings.as_slice(),
            [FrameWarning::ChecksumIgnored { .. }]
        ));
    }

    #[test]
    fn trailing_bytes_are_a_warning() {
        let config = VariantConfig::prevac();
        let mut wire = reply(config, 0x0101, &[]);
        wire.extend_from_slice(&[0x00, 0x00]);
        let mut reader = FrameReader::new(port_with(&wire), config);

        let received = reader.read_frame(Duration::from_millis(20)).unwrap();
        assert_eq!(received.warnings, vec![FrameWarning::TrailingBytes(2)]);
        assert_eq!(reader.get_mut().pending_input(), 2);
    }

    /// Delivers bytes but cannot report how many are pending.
    struct NoPendingCount(MockPort);

    impl TransportPort for NoPendingCount {
        fn write(&mut self, data: &[u8]) -> instrframe_transport::Result<()> {
            self.0.write(data)
        }

        fn read_exact(
            &mut self,
            buf: &mut [u8],
            timeout: Duration,
        ) -> instrframe_transport::Result<()> {
            self.0.read_exact(buf, timeout)
        }

        fn bytes_available(&mut self) -> instrframe_transport::Result<usize> {
            Err(TransportError::Closed)
        }

        fn discard_input(&mut self) -> instrframe_transport::Result<usize> {
            self.0.discard_input()
        }

        fn close(&mut self) -> instrframe_transport::Result<()> {
            self.0.close()
        }

        fn is_open(&self) -> bool {
            self.0.is_open()
        }
    }

    #[test]
    fn pending_count_failure_keeps_completed_frame() {
        let config = VariantConfig::prevac();
        let port = NoPendingCount(port_with(&reply(config, 0x0202, &[7])));
        let mut reader = FrameReader::new(port, config);

        let received = reader.read_frame(Duration::from_millis(20)).unwrap();
        assert_eq!(received.frame.payload.as_ref(), &[7]);
        assert!(received.warnings.is_empty());
        assert_eq!(reader.state(), ReadState::Complete);
    }

    #[test]
    fn consecutive_frames_leave_nothing_behind() {
        let config = VariantConfig::sqm160();
        let mut wire = reply(config, 0x41, b"one");
        wire.extend(reply(config, 0x41, b"two"));
        let mut reader = FrameReader::new(port_with(&wire), config);

        let first = reader.read_frame(Duration::from_millis(20)).unwrap();
        assert_eq!(first.frame.payload.as_ref(), b"one");
        assert_eq!(first.warnings.len(), 1);
        let second = reader.read_frame(Duration::from_millis(20)).unwrap();
        assert_eq!(second.frame.payload.as_ref(), b"two");
        assert!(second.warnings.is_empty());
        assert_eq!(reader.into_inner().pending_input(), 0);
    }

    #[test]
    fn stop_signal_cancels_sync_search() {
        let config = VariantConfig::prevac();
        let stop = StopSignal::new();
        stop.request_stop();
        let mut reader = FrameReader::new(MockPort::new(), config).with_stop_signal(stop.clone());

        let err = reader.read_frame(Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, FrameError::Cancelled));

        stop.reset();
        assert!(!stop.is_stop_requested());
    }

    #[test]
    fn stop_signal_interrupts_a_waiting_read() {
        let config = VariantConfig::prevac();
        let stop = StopSignal::new();
        let mut reader = FrameReader::new(MockPort::new(), config).with_stop_signal(stop.clone());

        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            stop.request_stop();
        });

        let start = Instant::now();
        let err = reader.read_frame(Duration::from_secs(5)).unwrap_err();
        stopper.join().unwrap();
        assert!(matches!(err, FrameError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn invalid_length_is_reported() {
        let config = VariantConfig::sqm160();
        // Length character below the +34 offset.
        let mut reader = FrameReader::new(port_with(&[b'!', 0x05, 0x41]), config);
        let err = reader.read_frame(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, FrameError::InvalidLength(0x05)));
    }
}
