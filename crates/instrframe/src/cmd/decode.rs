use instrframe_client::PREVAC_ERROR_FLAG;
use instrframe_frame::{
    ChecksumPolicy, Direction, FrameCodec, FrameWarning, ProtocolVariant, VariantConfig,
};
use serde::Serialize;

use crate::cmd::encode::direction_name;
use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_report, printable, to_hex, OutputFormat, Report};

#[derive(Serialize)]
struct DecodeOutput {
    variant: &'static str,
    direction: &'static str,
    length: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    destination: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<u8>,
    command: u16,
    error_reply: bool,
    payload_size: usize,
    payload: String,
    payload_text: String,
    checksum: String,
    checksum_valid: bool,
    warnings: Vec<String>,
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_hex(&args.bytes)?;
    let policy = if args.ignore_checksum {
        ChecksumPolicy::Ignore
    } else {
        ChecksumPolicy::Enforce
    };
    let direction = if args.request {
        Direction::HostToDevice
    } else {
        Direction::DeviceToHost
    };

    let codec =
        FrameCodec::new(VariantConfig::for_variant(args.variant).with_checksum_policy(policy));
    let received = codec
        .decode_as(direction, &bytes)
        .map_err(|err| frame_error("decode failed", err))?;
    let frame = &received.frame;

    let record = DecodeOutput {
        variant: args.variant.name(),
        direction: direction_name(direction),
        length: frame.length,
        destination: frame.destination,
        source: frame.source,
        command: frame.command,
        error_reply: args.variant == ProtocolVariant::Prevac
            && direction == Direction::DeviceToHost
            && frame.command & PREVAC_ERROR_FLAG != 0,
        payload_size: frame.payload.len(),
        payload: to_hex(&frame.payload),
        payload_text: printable(&frame.payload),
        checksum: to_hex(frame.checksum.as_bytes()),
        checksum_valid: !received
            .warnings
            .iter()
            .any(|w| matches!(w, FrameWarning::ChecksumIgnored { .. })),
        warnings: received.warnings.iter().map(describe_warning).collect(),
    };

    let mut fields = vec![
        ("variant", record.variant.to_string()),
        ("direction", record.direction.to_string()),
        ("length", record.length.to_string()),
    ];
    if let (Some(dest), Some(src)) = (record.destination, record.source) {
        fields.push(("destination", format!("0x{dest:02X}")));
        fields.push(("source", format!("0x{src:02X}")));
    }
    fields.push(("command", format!("0x{:04X}", record.command)));
    if record.error_reply {
        fields.push(("error_reply", "true".to_string()));
    }
    fields.push(("payload", record.payload.clone()));
    fields.push(("payload_text", record.payload_text.clone()));
    fields.push(("checksum", record.checksum.clone()));
    fields.push(("checksum_valid", record.checksum_valid.to_string()));
    if !record.warnings.is_empty() {
        fields.push(("warnings", record.warnings.join("; ")));
    }

    print_report(
        &Report {
            record: &record,
            fields,
            raw: &frame.payload,
        },
        format,
    );

    Ok(SUCCESS)
}

fn describe_warning(warning: &FrameWarning) -> String {
    match warning {
        FrameWarning::DiscardedBytes(n) => format!("skipped {n} byte(s) before sync"),
        FrameWarning::TrailingBytes(n) => format!("{n} byte(s) after frame"),
        FrameWarning::ChecksumIgnored { expected, actual } => format!(
            "checksum mismatch ignored (expected {}, got {})",
            to_hex(expected.as_bytes()),
            to_hex(actual)
        ),
    }
}
