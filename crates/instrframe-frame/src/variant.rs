use crate::checksum::ChecksumStrategy;
use crate::error::{FrameError, Result};

/// PREVAC V2.x sync byte.
pub const PREVAC_SYNC: u8 = 0xBB;

/// SQM-160 sync character `'!'`.
pub const SQM160_SYNC: u8 = 0x21;

/// Offset added to the SQM-160 length character.
pub const SQM160_LENGTH_OFFSET: u8 = 34;

/// Supported wire protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVariant {
    /// PREVAC V2.x controllers.
    Prevac,
    /// Inficon SQM-160 rate/thickness monitor.
    Sqm160,
}

impl ProtocolVariant {
    /// Stable lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            ProtocolVariant::Prevac => "prevac",
            ProtocolVariant::Sqm160 => "sqm160",
        }
    }
}

impl std::fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ProtocolVariant {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "prevac" => Ok(ProtocolVariant::Prevac),
            "sqm160" | "sqm-160" => Ok(ProtocolVariant::Sqm160),
            other => Err(FrameError::InvalidValue(format!(
                "unknown protocol variant '{other}'"
            ))),
        }
    }
}

/// What to do when a received checksum does not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumPolicy {
    /// Reject the frame with `ChecksumMismatch`.
    Enforce,
    /// Accept the frame and attach a `ChecksumIgnored` warning.
    Ignore,
}

/// What the length field counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthConvention {
    /// Payload bytes only.
    PayloadOnly,
    /// Command/response byte(s) plus payload.
    CommandAndPayload,
}

/// Which way a frame travels. Offsets may differ per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HostToDevice,
    DeviceToHost,
}

/// Immutable wire parameters of one protocol variant.
///
/// Built once per variant and handed to the codec, reader and writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantConfig {
    pub variant: ProtocolVariant,
    pub sync_byte: u8,
    pub checksum: ChecksumStrategy,
    pub checksum_policy: ChecksumPolicy,
    /// Whether destination and source address bytes follow the length.
    pub has_addresses: bool,
    /// Command field width in bytes (1 or 2).
    pub command_width: usize,
    pub length_convention: LengthConvention,
    /// Added to the counted length on frames sent by the host.
    pub tx_length_offset: u8,
    /// Added to the counted length on frames sent by the device.
    pub rx_length_offset: u8,
}

impl VariantConfig {
    /// PREVAC V2.x parameters.
    pub const fn prevac() -> Self {
        Self {
            variant: ProtocolVariant::Prevac,
            sync_byte: PREVAC_SYNC,
            checksum: ChecksumStrategy::Modulo256,
            checksum_policy: ChecksumPolicy::Enforce,
            has_addresses: true,
            command_width: 2,
            length_convention: LengthConvention::PayloadOnly,
            tx_length_offset: 0,
            rx_length_offset: 0,
        }
    }

    /// SQM-160 parameters.
    pub const fn sqm160() -> Self {
        Self {
            variant: ProtocolVariant::Sqm160,
            sync_byte: SQM160_SYNC,
            checksum: ChecksumStrategy::crc14(),
            checksum_policy: ChecksumPolicy::Enforce,
            has_addresses: false,
            command_width: 1,
            length_convention: LengthConvention::CommandAndPayload,
            tx_length_offset: SQM160_LENGTH_OFFSET,
            rx_length_offset: SQM160_LENGTH_OFFSET,
        }
    }

    /// Parameters for `variant`.
    pub const fn for_variant(variant: ProtocolVariant) -> Self {
        match variant {
            ProtocolVariant::Prevac => Self::prevac(),
            ProtocolVariant::Sqm160 => Self::sqm160(),
        }
    }

    /// Same parameters with a different checksum policy.
    pub const fn with_checksum_policy(mut self, policy: ChecksumPolicy) -> Self {
        self.checksum_policy = policy;
        self
    }

    /// Bytes between the length field and the payload.
    pub const fn header_len(&self) -> usize {
        let addresses = if self.has_addresses { 2 } else { 0 };
        addresses + self.command_width
    }

    /// Trailer width in bytes.
    pub const fn trailer_len(&self) -> usize {
        self.checksum.width()
    }

    /// Smallest possible frame on the wire (empty payload).
    pub const fn min_frame_len(&self) -> usize {
        2 + self.header_len() + self.trailer_len()
    }

    fn length_offset(&self, direction: Direction) -> u8 {
        match direction {
            Direction::HostToDevice => self.tx_length_offset,
            Direction::DeviceToHost => self.rx_length_offset,
        }
    }

    fn counted_overhead(&self) -> usize {
        match self.length_convention {
            LengthConvention::PayloadOnly => 0,
            LengthConvention::CommandAndPayload => self.command_width,
        }
    }

    /// Largest payload the length field can describe in `direction`.
    pub fn max_payload(&self, direction: Direction) -> usize {
        (u8::MAX as usize)
            .saturating_sub(self.length_offset(direction) as usize)
            .saturating_sub(self.counted_overhead())
    }

    /// Length field value for a payload of `payload_len` bytes.
    pub fn length_field(&self, payload_len: usize, direction: Direction) -> Result<u8> {
        let max = self.max_payload(direction);
        if payload_len > max {
            return Err(FrameError::LengthOverflow {
                size: payload_len,
                max,
            });
        }
        let value =
            payload_len + self.counted_overhead() + self.length_offset(direction) as usize;
        // Bounded by the max_payload check above.
        Ok(value as u8)
    }

    /// Payload length described by a received length field.
    pub fn payload_len(&self, length: u8, direction: Direction) -> Result<usize> {
        (length as usize)
            .checked_sub(self.length_offset(direction) as usize)
            .and_then(|n| n.checked_sub(self.counted_overhead()))
            .ok_or(FrameError::InvalidLength(length))
    }

    /// Bytes to read after the length field, excluding the trailer.
    pub fn body_len(&self, length: u8, direction: Direction) -> Result<usize> {
        Ok(self.header_len() + self.payload_len(length, direction)?)
    }
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self::prevac()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prevac_length_counts_payload_only() {
        let cfg = VariantConfig::prevac();
        assert_eq!(cfg.length_field(0, Direction::HostToDevice).unwrap(), 0);
        assert_eq!(cfg.length_field(8, Direction::HostToDevice).unwrap(), 8);
        assert_eq!(cfg.max_payload(Direction::HostToDevice), 255);
        assert_eq!(cfg.body_len(8, Direction::DeviceToHost).unwrap(), 4 + 8);
    }

    #[test]
    fn sqm160_length_counts_command_and_offset() {
        let cfg = VariantConfig::sqm160();
        // "@" alone: 1 + 34 = '#'
        assert_eq!(cfg.length_field(0, Direction::HostToDevice).unwrap(), b'#');
        assert_eq!(cfg.payload_len(b'#', Direction::DeviceToHost).unwrap(), 0);
        assert_eq!(cfg.body_len(b'%', Direction::DeviceToHost).unwrap(), 3);
        assert_eq!(cfg.max_payload(Direction::HostToDevice), 220);
    }

    #[test]
    fn sqm160_rejects_length_below_offset() {
        let cfg = VariantConfig::sqm160();
        assert!(matches!(
            cfg.payload_len(b'"', Direction::DeviceToHost),
            Err(FrameError::InvalidLength(0x22))
        ));
        assert!(matches!(
            cfg.payload_len(0x05, Direction::DeviceToHost),
            Err(FrameError::InvalidLength(0x05))
        ));
    }

    #[test]
    fn overflow_is_reported_with_limit() {
        let cfg = VariantConfig::sqm160();
        let err = cfg.length_field(221, Direction::HostToDevice).unwrap_err();
        assert!(matches!(
            err,
            FrameError::LengthOverflow { size: 221, max: 220 }
        ));
    }

    #[test]
    fn variant_names_parse() {
        assert_eq!("prevac".parse::<ProtocolVariant>().unwrap(), ProtocolVariant::Prevac);
        assert_eq!("SQM-160".parse::<ProtocolVariant>().unwrap(), ProtocolVariant::Sqm160);
        assert!("scpi".parse::<ProtocolVariant>().is_err());
        assert_eq!(ProtocolVariant::Sqm160.to_string(), "sqm160");
    }

    #[test]
    fn checksum_policy_override() {
        let cfg = VariantConfig::sqm160().with_checksum_policy(ChecksumPolicy::Ignore);
        assert_eq!(cfg.checksum_policy, ChecksumPolicy::Ignore);
        assert_eq!(cfg.variant, ProtocolVariant::Sqm160);
    }
}
