use instrframe_frame::checksum::{crc14, modulo256, ChecksumStrategy};
use serde::Serialize;

use crate::cmd::{parse_hex, ChecksumAlgorithm, ChecksumArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_report, to_hex, OutputFormat, Report};

#[derive(Serialize)]
struct ChecksumOutput {
    algorithm: &'static str,
    input_size: usize,
    /// Checksum value before it is split into trailer bytes.
    value: u16,
    trailer: String,
}

pub fn run(args: ChecksumArgs, format: OutputFormat) -> CliResult<i32> {
    let data = parse_hex(&args.bytes)?;

    let (algorithm, value, strategy) = match args.algorithm {
        ChecksumAlgorithm::Mod256 => (
            "mod256",
            u16::from(modulo256(&data)),
            ChecksumStrategy::Modulo256,
        ),
        ChecksumAlgorithm::Crc14 => ("crc14", crc14(&data), ChecksumStrategy::crc14()),
    };
    let trailer = strategy.compute(&data);

    let record = ChecksumOutput {
        algorithm,
        input_size: data.len(),
        value,
        trailer: to_hex(trailer.as_bytes()),
    };
    let fields = vec![
        ("algorithm", algorithm.to_string()),
        ("input_size", record.input_size.to_string()),
        ("value", format!("0x{value:04X}")),
        ("trailer", record.trailer.clone()),
    ];
    print_report(
        &Report {
            record: &record,
            fields,
            raw: trailer.as_bytes(),
        },
        format,
    );

    Ok(SUCCESS)
}
