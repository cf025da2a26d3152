//! Typed values carried in frame payloads.
//!
//! Instrument replies mix big-endian binary fields with decimal ASCII. A
//! payload often starts with a marker byte (a channel number, for example)
//! that must be sliced off before the value itself is decoded; [`skip`] does
//! that without copying.
//!
//! Text is mapped one byte to one character (ISO-8859-1), so every byte value
//! 0–255 round-trips exactly. Fixed-width decoders take exactly their width:
//! too few bytes is [`FrameError::TruncatedPayload`], too many is
//! [`FrameError::TrailingPayload`]. Nothing is padded or silently dropped.

use crate::error::{FrameError, Result};

/// Drop `n` leading bytes.
pub fn skip(bytes: &[u8], n: usize) -> Result<&[u8]> {
    bytes.get(n..).ok_or(FrameError::TruncatedPayload {
        needed: n,
        available: bytes.len(),
    })
}

fn exact(bytes: &[u8], n: usize) -> Result<&[u8]> {
    match bytes.len() {
        len if len < n => Err(FrameError::TruncatedPayload {
            needed: n,
            available: len,
        }),
        len if len > n => Err(FrameError::TrailingPayload {
            width: n,
            extra: len - n,
        }),
        _ => Ok(bytes),
    }
}

fn check_width(width: usize) -> Result<()> {
    if (1..=8).contains(&width) {
        Ok(())
    } else {
        Err(FrameError::InvalidValue(format!(
            "integer width must be 1..=8, got {width}"
        )))
    }
}

/// Big-endian IEEE-754 double; `bytes` must be exactly 8 long.
pub fn decode_double(bytes: &[u8]) -> Result<f64> {
    let raw: [u8; 8] = exact(bytes, 8)?
        .try_into()
        .map_err(|_| FrameError::TruncatedPayload {
            needed: 8,
            available: bytes.len(),
        })?;
    Ok(f64::from_be_bytes(raw))
}

/// Big-endian IEEE-754 encoding of `value`.
pub fn encode_double(value: f64) -> [u8; 8] {
    value.to_be_bytes()
}

/// Big-endian unsigned integer of exactly `width` bytes.
pub fn decode_uint(bytes: &[u8], width: usize) -> Result<u64> {
    check_width(width)?;
    let field = exact(bytes, width)?;
    Ok(field.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

/// Big-endian two's-complement integer of exactly `width` bytes.
pub fn decode_int(bytes: &[u8], width: usize) -> Result<i64> {
    let raw = decode_uint(bytes, width)?;
    let shift = 64 - 8 * width as u32;
    Ok(((raw << shift) as i64) >> shift)
}

/// `value` as `width` big-endian bytes; fails if it does not fit.
pub fn encode_uint(value: u64, width: usize) -> Result<Vec<u8>> {
    check_width(width)?;
    if width < 8 && value >> (8 * width) != 0 {
        return Err(FrameError::InvalidValue(format!(
            "{value} does not fit in {width} byte(s)"
        )));
    }
    Ok(value.to_be_bytes()[8 - width..].to_vec())
}

/// Text from the bytes after the first `skip_leading` ones, one char per byte.
pub fn decode_ascii(bytes: &[u8], skip_leading: usize) -> Result<String> {
    Ok(skip(bytes, skip_leading)?.iter().map(|&b| char::from(b)).collect())
}

/// Bytes for `text`, one byte per char; chars above U+00FF are rejected.
pub fn encode_ascii(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .map(|c| {
            u8::try_from(u32::from(c)).map_err(|_| {
                FrameError::InvalidValue(format!("character {c:?} has no single-byte form"))
            })
        })
        .collect()
}

/// Decimal ASCII for `value` with `decimals` fractional digits.
pub fn format_decimal(value: f64, decimals: usize) -> Vec<u8> {
    format!("{value:.decimals$}").into_bytes()
}

/// Decimal ASCII for an integer.
pub fn format_integer(value: i64) -> Vec<u8> {
    value.to_string().into_bytes()
}

fn trimmed_text(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| char::from(b))
        .collect::<String>()
        .trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .to_string()
}

/// Parse decimal ASCII (surrounding whitespace and NULs ignored).
pub fn parse_decimal(bytes: &[u8]) -> Result<f64> {
    let text = trimmed_text(bytes);
    text.parse::<f64>()
        .map_err(|_| FrameError::InvalidValue(format!("not a decimal number: {text:?}")))
}

/// Parse a decimal ASCII integer (surrounding whitespace and NULs ignored).
pub fn parse_integer(bytes: &[u8]) -> Result<i64> {
    let text = trimmed_text(bytes);
    text.parse::<i64>()
        .map_err(|_| FrameError::InvalidValue(format!("not an integer: {text:?}")))
}

/// Split a multi-value ASCII reply on `separator`, dropping empty fields.
pub fn split_fields(bytes: &[u8], separator: u8) -> Vec<&[u8]> {
    bytes
        .split(|&b| b == separator)
        .filter(|field| !field.is_empty())
        .collect()
}
