//! Checksum-protected, length-prefixed framing for half-duplex instrument links.
//!
//! Two wire variants are supported, selected by [`ProtocolVariant`]:
//! - PREVAC V2.x: `0xBB` sync, 1-byte payload length, addresses, 2-byte
//!   command, modulo-256 checksum
//! - Inficon SQM-160: `'!'` sync, offset length character, 1-byte command or
//!   response code, two-character CRC-14 trailer
//!
//! The [`FrameReader`] resynchronizes on the sync byte and bounds every read by
//! one overall deadline. The [`value`] module decodes the mixed binary and
//! decimal-ASCII payloads these instruments reply with.

pub mod checksum;
pub mod codec;
pub mod error;
pub mod reader;
pub mod value;
pub mod variant;
pub mod writer;

pub use checksum::{Checksum, ChecksumStrategy};
pub use codec::{decode_frame, encode_frame, Frame, FrameCodec, FrameWarning, Received};
pub use error::{ErrorClass, FrameError, Result};
pub use reader::{FrameReader, ReadState, StopSignal};
pub use variant::{ChecksumPolicy, Direction, LengthConvention, ProtocolVariant, VariantConfig};
pub use writer::FrameWriter;
