use instrframe_frame::{Direction, FrameCodec, VariantConfig};
use serde::Serialize;
use tracing::debug;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_report, to_hex, OutputFormat, Report};

#[derive(Serialize)]
struct EncodeOutput<'a> {
    variant: &'a str,
    direction: &'a str,
    command: u16,
    payload_size: usize,
    size: usize,
    bytes: String,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = args.payload.bytes()?;
    let direction = if args.reply {
        Direction::DeviceToHost
    } else {
        Direction::HostToDevice
    };

    let codec = FrameCodec::new(VariantConfig::for_variant(args.variant));
    let frame = codec
        .encode_as(direction, args.dest, args.source, args.command, &payload)
        .map_err(|err| frame_error("encode failed", err))?;
    debug!(variant = %args.variant, size = frame.len(), "encoded frame");

    let record = EncodeOutput {
        variant: args.variant.name(),
        direction: direction_name(direction),
        command: args.command,
        payload_size: payload.len(),
        size: frame.len(),
        bytes: to_hex(&frame),
    };
    let fields = vec![
        ("variant", record.variant.to_string()),
        ("direction", record.direction.to_string()),
        ("command", format!("0x{:04X}", record.command)),
        ("payload_size", record.payload_size.to_string()),
        ("bytes", record.bytes.clone()),
    ];
    print_report(
        &Report {
            record: &record,
            fields,
            raw: &frame,
        },
        format,
    );

    Ok(SUCCESS)
}

pub(crate) fn direction_name(direction: Direction) -> &'static str {
    match direction {
        Direction::HostToDevice => "request",
        Direction::DeviceToHost => "reply",
    }
}
