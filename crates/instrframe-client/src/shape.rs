use std::fmt;
use std::str::FromStr;

use instrframe_frame::value;
use instrframe_frame::FrameError;
use instrframe_registry::{ErrorKind, ErrorRegistry, Severity, Status};
use serde::{Deserialize, Serialize};

/// How to interpret the payload of a successful reply.
///
/// `skip` counts leading bytes to drop first, such as a channel marker
/// echoed in front of the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseShape {
    /// Nothing expected; any payload is ignored.
    Ack,
    /// Payload returned unchanged.
    Raw,
    /// Big-endian IEEE-754 double.
    Double { skip: usize },
    /// Big-endian unsigned integer of `width` bytes.
    Uint { skip: usize, width: usize },
    /// Big-endian two's-complement integer of `width` bytes.
    Int { skip: usize, width: usize },
    /// Single-byte text.
    Ascii { skip: usize },
    /// Decimal number written in ASCII.
    Decimal { skip: usize },
    /// Integer written in ASCII.
    Integer { skip: usize },
    /// ASCII fields split on `separator`.
    Fields { skip: usize, separator: u8 },
    /// 16-bit device status word classified against the status table.
    StatusWord { skip: usize },
}

impl ResponseShape {
    /// Decode `payload`; `statuses` classifies [`ResponseShape::StatusWord`].
    pub fn decode(self, payload: &[u8], statuses: &ErrorRegistry) -> Result<Value, FrameError> {
        Ok(match self {
            ResponseShape::Ack => Value::None,
            ResponseShape::Raw => Value::Raw(payload.to_vec()),
            ResponseShape::Double { skip } => {
                Value::Double(value::decode_double(value::skip(payload, skip)?)?)
            }
            ResponseShape::Uint { skip, width } => {
                Value::Uint(value::decode_uint(value::skip(payload, skip)?, width)?)
            }
            ResponseShape::Int { skip, width } => {
                Value::Int(value::decode_int(value::skip(payload, skip)?, width)?)
            }
            ResponseShape::Ascii { skip } => Value::Text(value::decode_ascii(payload, skip)?),
            ResponseShape::Decimal { skip } => {
                Value::Double(value::parse_decimal(value::skip(payload, skip)?)?)
            }
            ResponseShape::Integer { skip } => {
                Value::Int(value::parse_integer(value::skip(payload, skip)?)?)
            }
            ResponseShape::Fields { skip, separator } => Value::Fields(
                value::split_fields(value::skip(payload, skip)?, separator)
                    .into_iter()
                    .map(|field| field.iter().map(|&b| char::from(b)).collect())
                    .collect(),
            ),
            ResponseShape::StatusWord { skip } => {
                let code = value::decode_uint(value::skip(payload, skip)?, 2)? as u16;
                let (kind, severity) = match statuses.get(code) {
                    Status::Ok => (None, None),
                    Status::Error { kind, severity } => (Some(kind), Some(severity)),
                };
                Value::Status {
                    code,
                    kind,
                    severity,
                }
            }
        })
    }
}

impl fmt::Display for ResponseShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseShape::Ack => write!(f, "ack"),
            ResponseShape::Raw => write!(f, "raw"),
            ResponseShape::Double { skip } => write!(f, "double:{skip}"),
            ResponseShape::Uint { skip, width } => write!(f, "uint:{width}:{skip}"),
            ResponseShape::Int { skip, width } => write!(f, "int:{width}:{skip}"),
            ResponseShape::Ascii { skip } => write!(f, "ascii:{skip}"),
            ResponseShape::Decimal { skip } => write!(f, "decimal:{skip}"),
            ResponseShape::Integer { skip } => write!(f, "integer:{skip}"),
            ResponseShape::Fields { skip, separator } => {
                write!(f, "fields:{skip}:{}", char::from(*separator))
            }
            ResponseShape::StatusWord { skip } => write!(f, "status:{skip}"),
        }
    }
}

/// Parses the compact form used on the command line.
///
/// ```text
/// ack | raw | double[:skip] | uint:width[:skip] | int:width[:skip]
/// ascii[:skip] | decimal[:skip] | integer[:skip] | fields[:skip[:sep]]
/// status[:skip]
/// ```
impl FromStr for ResponseShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let name = parts.next().unwrap_or_default().to_ascii_lowercase();
        let args: Vec<&str> = parts.collect();

        let number = |idx: usize, default: Option<usize>| -> Result<usize, String> {
            match args.get(idx) {
                Some(raw) => raw
                    .parse::<usize>()
                    .map_err(|_| format!("invalid number {raw:?} in shape {s:?}")),
                None => default.ok_or_else(|| format!("shape {s:?} needs argument {}", idx + 1)),
            }
        };

        let shape = match name.as_str() {
            "ack" => ResponseShape::Ack,
            "raw" => ResponseShape::Raw,
            "double" => ResponseShape::Double {
                skip: number(0, Some(0))?,
            },
            "uint" => ResponseShape::Uint {
                width: number(0, None)?,
                skip: number(1, Some(0))?,
            },
            "int" => ResponseShape::Int {
                width: number(0, None)?,
                skip: number(1, Some(0))?,
            },
            "ascii" => ResponseShape::Ascii {
                skip: number(0, Some(0))?,
            },
            "decimal" => ResponseShape::Decimal {
                skip: number(0, Some(0))?,
            },
            "integer" => ResponseShape::Integer {
                skip: number(0, Some(0))?,
            },
            "fields" => {
                let separator = match args.get(1) {
                    None => b' ',
                    Some(sep) if sep.len() == 1 => sep.as_bytes()[0],
                    Some(sep) => return Err(format!("separator must be one byte, got {sep:?}")),
                };
                ResponseShape::Fields {
                    skip: number(0, Some(0))?,
                    separator,
                }
            }
            "status" => ResponseShape::StatusWord {
                skip: number(0, Some(0))?,
            },
            other => return Err(format!("unknown response shape {other:?}")),
        };

        if let ResponseShape::Uint { width, .. } | ResponseShape::Int { width, .. } = shape {
            if !(1..=8).contains(&width) {
                return Err(format!("integer width must be 1..=8, got {width}"));
            }
        }
        Ok(shape)
    }
}

/// A decoded reply value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    None,
    Raw(Vec<u8>),
    Double(f64),
    Uint(u64),
    Int(i64),
    Text(String),
    Fields(Vec<String>),
    Status {
        code: u16,
        kind: Option<ErrorKind>,
        severity: Option<Severity>,
    },
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Uint(v) => Some(*v as f64),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "ok"),
            Value::Raw(bytes) => {
                for (i, byte) in bytes.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{byte:02X}")?;
                }
                Ok(())
            }
            Value::Double(v) => write!(f, "{v}"),
            Value::Uint(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Text(text) => write!(f, "{text}"),
            Value::Fields(fields) => write!(f, "{}", fields.join(" ")),
            Value::Status {
                code,
                kind: None,
                ..
            } => write!(f, "0x{code:04X} ok"),
            Value::Status {
                code,
                kind: Some(kind),
                severity,
            } => {
                let level = match severity {
                    Some(Severity::Warning) => "warning",
                    _ => "fatal",
                };
                write!(f, "0x{code:04X} {level}: {kind}")
            }
        }
    }
}
