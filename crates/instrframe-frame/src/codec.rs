use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::checksum::Checksum;
use crate::error::{FrameError, Result};
use crate::variant::{ChecksumPolicy, Direction, VariantConfig};

/// A validated frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub sync: u8,
    /// Length field exactly as transmitted.
    pub length: u8,
    /// Destination address; `None` on variants without addressing.
    pub destination: Option<u8>,
    /// Source address; `None` on variants without addressing.
    pub source: Option<u8>,
    /// Command (host frames) or command/response code (device frames).
    pub command: u16,
    /// Bytes the command occupies on the wire.
    pub command_width: usize,
    pub payload: Bytes,
    /// Trailer as received.
    pub checksum: Checksum,
}

impl Frame {
    /// Total bytes on the wire.
    pub fn wire_size(&self) -> usize {
        let addresses = usize::from(self.destination.is_some()) + usize::from(self.source.is_some());
        2 + addresses + self.command_width + self.payload.len() + self.checksum.len()
    }
}

/// Non-fatal observations made while reading or decoding a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameWarning {
    /// Stray bytes skipped before the sync byte.
    DiscardedBytes(usize),
    /// Bytes still pending after the frame completed.
    TrailingBytes(usize),
    /// The checksum failed but the variant policy accepts the frame anyway.
    ChecksumIgnored { expected: Checksum, actual: Vec<u8> },
}

/// A frame together with any warnings produced while obtaining it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub frame: Frame,
    pub warnings: Vec<FrameWarning>,
}

/// Encode a frame into the wire format of `config`.
///
/// Wire formats:
/// ```text
/// PREVAC  ┌──────┬─────┬──────┬──────┬─────────┬─────────┬──────────┬─────┐
///         │ 0xBB │ len │ dest │ host │ cmd msb │ cmd lsb │ payload  │ sum │
///         └──────┴─────┴──────┴──────┴─────────┴─────────┴──────────┴─────┘
/// SQM-160 ┌─────┬──────────┬─────────┬──────────┬──────┬──────┐
///         │ '!' │ len + 34 │ cmd/rsp │ payload  │ crc1 │ crc2 │
///         └─────┴──────────┴─────────┴──────────┴──────┴──────┘
/// ```
/// The checksum covers `len` through the end of the payload. Oversized
/// payloads fail before anything is written to `dst`.
pub fn encode_frame(
    config: &VariantConfig,
    direction: Direction,
    destination: u8,
    source: u8,
    command: u16,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    let length = config.length_field(payload.len(), direction)?;
    if config.command_width == 1 && command > 0xFF {
        return Err(FrameError::CommandOutOfRange {
            command,
            width: config.command_width,
        });
    }

    let start = dst.len();
    dst.reserve(2 + config.header_len() + payload.len() + config.trailer_len());
    dst.put_u8(config.sync_byte);
    dst.put_u8(length);
    if config.has_addresses {
        dst.put_u8(destination);
        dst.put_u8(source);
    }
    if config.command_width == 2 {
        dst.put_u16(command);
    } else {
        dst.put_u8(command as u8);
    }
    dst.put_slice(payload);

    let checksum = config.checksum.compute(&dst[start + 1..]);
    dst.put_slice(checksum.as_bytes());
    Ok(())
}

/// Decode one frame from `src`.
///
/// Bytes before the first sync byte are skipped and reported as a
/// `DiscardedBytes` warning; bytes after the frame as `TrailingBytes`.
pub fn decode_frame(config: &VariantConfig, direction: Direction, src: &[u8]) -> Result<Received> {
    let start = src
        .iter()
        .position(|&b| b == config.sync_byte)
        .ok_or(FrameError::NoSync {
            sync: config.sync_byte,
            discarded: src.len(),
        })?;
    let frame_bytes = &src[start..];

    if frame_bytes.len() < 2 {
        return Err(FrameError::TruncatedStream {
            expected: config.min_frame_len(),
            received: frame_bytes.len(),
        });
    }
    let length = frame_bytes[1];
    let body_len = config.body_len(length, direction)?;
    let total = 2 + body_len + config.trailer_len();
    if frame_bytes.len() < total {
        return Err(FrameError::TruncatedStream {
            expected: total,
            received: frame_bytes.len(),
        });
    }

    let body = &frame_bytes[2..2 + body_len];
    let trailer = &frame_bytes[2 + body_len..total];
    let (frame, checksum_warning) = assemble_frame(config, length, body, trailer)?;

    let mut warnings = Vec::new();
    if start > 0 {
        warnings.push(FrameWarning::DiscardedBytes(start));
    }
    warnings.extend(checksum_warning);
    let trailing = frame_bytes.len() - total;
    if trailing > 0 {
        warnings.push(FrameWarning::TrailingBytes(trailing));
    }

    Ok(Received { frame, warnings })
}

/// Validate the checksum of a received frame and split its body into fields.
///
/// `body` is everything between the length field and the trailer.
pub(crate) fn assemble_frame(
    config: &VariantConfig,
    length: u8,
    body: &[u8],
    trailer: &[u8],
) -> Result<(Frame, Option<FrameWarning>)> {
    let mut covered = Vec::with_capacity(1 + body.len());
    covered.push(length);
    covered.extend_from_slice(body);

    let expected = config.checksum.compute(&covered);
    let mut warning = None;
    if expected.as_bytes() != trailer {
        match config.checksum_policy {
            ChecksumPolicy::Enforce => {
                return Err(FrameError::ChecksumMismatch {
                    expected: expected.as_bytes().to_vec(),
                    actual: trailer.to_vec(),
                });
            }
            ChecksumPolicy::Ignore => {
                trace!(?expected, actual = ?trailer, "ignoring checksum mismatch");
                warning = Some(FrameWarning::ChecksumIgnored {
                    expected,
                    actual: trailer.to_vec(),
                });
            }
        }
    }

    let mut pos = 0usize;
    let (destination, source) = if config.has_addresses {
        pos = 2;
        (Some(body[0]), Some(body[1]))
    } else {
        (None, None)
    };
    let command = if config.command_width == 2 {
        u16::from_be_bytes([body[pos], body[pos + 1]])
    } else {
        u16::from(body[pos])
    };
    pos += config.command_width;

    let checksum = match trailer {
        [one] => Checksum::one(*one),
        [first, second] => Checksum::two(*first, *second),
        _ => expected,
    };

    let frame = Frame {
        sync: config.sync_byte,
        length,
        destination,
        source,
        command,
        command_width: config.command_width,
        payload: Bytes::copy_from_slice(&body[pos..]),
        checksum,
    };
    Ok((frame, warning))
}

/// Variant-bound encoder/decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCodec {
    config: VariantConfig,
}

impl FrameCodec {
    pub fn new(config: VariantConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VariantConfig {
        &self.config
    }

    /// Encode a host-to-device frame.
    pub fn encode(&self, destination: u8, source: u8, command: u16, payload: &[u8]) -> Result<Bytes> {
        self.encode_as(Direction::HostToDevice, destination, source, command, payload)
    }

    /// Encode a frame travelling in `direction`.
    pub fn encode_as(
        &self,
        direction: Direction,
        destination: u8,
        source: u8,
        command: u16,
        payload: &[u8],
    ) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        encode_frame(
            &self.config,
            direction,
            destination,
            source,
            command,
            payload,
            &mut buf,
        )?;
        Ok(buf.freeze())
    }

    /// Decode a device-to-host frame.
    pub fn decode(&self, src: &[u8]) -> Result<Received> {
        self.decode_as(Direction::DeviceToHost, src)
    }

    /// Decode a frame travelling in `direction`.
    pub fn decode_as(&self, direction: Direction, src: &[u8]) -> Result<Received> {
        decode_frame(&self.config, direction, src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::ChecksumPolicy;

    fn prevac() -> FrameCodec {
        FrameCodec::new(VariantConfig::prevac())
    }

    fn sqm() -> FrameCodec {
        FrameCodec::new(VariantConfig::sqm160())
    }

    #[test]
    fn prevac_wire_layout() {
        let wire = prevac().encode(0x01, 0xFF, 0x0202, &[0x03]).unwrap();
        let sum = 0x01u8
            .wrapping_add(0x01)
            .wrapping_add(0xFF)
            .wrapping_add(0x02)
            .wrapping_add(0x02)
            .wrapping_add(0x03);
        assert_eq!(
            wire.as_ref(),
            &[0xBB, 0x01, 0x01, 0xFF, 0x02, 0x02, 0x03, sum]
        );
    }

    #[test]
    fn sqm160_version_query_matches_known_bytes() {
        let wire = sqm().encode(0, 0, u16::from(b'@'), &[]).unwrap();
        assert_eq!(wire.as_ref(), b"!#@O7");
    }

    #[test]
    fn prevac_roundtrip_all_payload_lengths() {
        let codec = prevac();
        for len in 0..=255usize {
            let payload: Vec<u8> = (0..len).map(|i| (i * 7 + len) as u8).collect();
            let wire = codec
                .encode_as(Direction::DeviceToHost, 0xFF, 0x01, 0x8102, &payload)
                .unwrap();
            let received = codec.decode(&wire).unwrap();
            let frame = received.frame;
            assert_eq!(frame.destination, Some(0xFF));
            assert_eq!(frame.source, Some(0x01));
            assert_eq!(frame.command, 0x8102);
            assert_eq!(frame.command_width, 2);
            assert_eq!(frame.payload.as_ref(), payload.as_slice());
            assert_eq!(frame.wire_size(), wire.len());
            assert!(received.warnings.is_empty());
        }
    }

    #[test]
    fn sqm160_roundtrip_all_payload_lengths() {
        let codec = sqm();
        for len in 0..=220usize {
            let payload: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_mul(31)).collect();
            let wire = codec.encode(0, 0, u16::from(b'A'), &payload).unwrap();
            let frame = codec.decode_as(Direction::HostToDevice, &wire).unwrap().frame;
            assert_eq!(frame.destination, None);
            assert_eq!(frame.command, u16::from(b'A'));
            assert_eq!(frame.command_width, 1);
            assert_eq!(frame.payload.as_ref(), payload.as_slice());
            assert_eq!(frame.wire_size(), wire.len());
        }
    }

    #[test]
    fn oversized_payload_fails_closed() {
        let mut buf = BytesMut::new();
        let err = encode_frame(
            &VariantConfig::prevac(),
            Direction::HostToDevice,
            1,
            0xFF,
            0x0101,
            &[0u8; 256],
            &mut buf,
        )
        .unwrap_err();
        assert!(matches!(err, FrameError::LengthOverflow { size: 256, max: 255 }));
        assert!(buf.is_empty());

        let err = sqm().encode(0, 0, 0x41, &[0u8; 221]).unwrap_err();
        assert!(matches!(err, FrameError::LengthOverflow { size: 221, max: 220 }));
    }

    #[test]
    fn wide_command_rejected_on_single_byte_variant() {
        let err = sqm().encode(0, 0, 0x1234, &[]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::CommandOutOfRange {
                command: 0x1234,
                width: 1
            }
        ));
    }

    #[test]
    fn decode_skips_leading_noise_and_reports_trailing() {
        let codec = prevac();
        let wire = codec
            .encode_as(Direction::DeviceToHost, 0xFF, 0x01, 0x0101, b"ok")
            .unwrap();
        let mut buf = vec![0x00, 0x13];
        buf.extend_from_slice(&wire);
        buf.push(0x42);

        let received = codec.decode(&buf).unwrap();
        assert_eq!(received.frame.payload.as_ref(), b"ok");
        assert_eq!(
            received.warnings,
            vec![
                FrameWarning::DiscardedBytes(2),
                FrameWarning::TrailingBytes(1)
            ]
        );
    }

    #[test]
    fn decode_detects_tampering() {
        let codec = prevac();
        let wire = codec.encode(0x01, 0xFF, 0x0202, &[0x01]).unwrap();
        for idx in 1..wire.len() - 1 {
            let mut tampered = wire.to_vec();
            tampered[idx] ^= 0x10;
            match codec.decode_as(Direction::HostToDevice, &tampered) {
                Err(FrameError::ChecksumMismatch { .. })
                | Err(FrameError::TruncatedStream { .. }) => {}
                Ok(received) => panic!("tampered byte {idx} accepted: {received:?}"),
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn ignore_policy_accepts_bad_checksum_with_warning() {
        let config = VariantConfig::sqm160().with_checksum_policy(ChecksumPolicy::Ignore);
        let codec = FrameCodec::new(config);
        let mut wire = codec.encode(0, 0, u16::from(b'@'), &[]).unwrap().to_vec();
        let last = wire.len() - 1;
        wire[last] = b'x';

        let received = codec.decode_as(Direction::HostToDevice, &wire).unwrap();
        assert_eq!(received.frame.command, u16::from(b'@'));
        assert!(matches!(
            received.warnings.as_slice(),
            [FrameWarning::ChecksumIgnored { .. }]
        ));
    }

    #[test]
    fn decode_without_sync_fails() {
        let err = prevac().decode(&[0x01, 0x02, 0x03]).unwrap_err();
        assert!(matches!(err, FrameError::NoSync { sync: 0xBB, discarded: 3 }));
    }

    #[test]
    fn decode_incomplete_frame() {
        let wire = prevac().encode(0x01, 0xFF, 0x0202, &[1, 2, 3]).unwrap();
        let err = prevac().decode(&wire[..wire.len() - 2]).unwrap_err();
        assert!(matches!(err, FrameError::TruncatedStream { .. }));
    }
}
