use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One result: a serializable record, its human-readable fields, and the
/// bytes written in raw mode.
pub struct Report<'a, T: Serialize> {
    pub record: &'a T,
    pub fields: Vec<(&'static str, String)>,
    pub raw: &'a [u8],
}

pub fn print_report<T: Serialize>(report: &Report<'_, T>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report.record),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (name, value) in &report.fields {
                table.add_row(vec![name.to_string(), value.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line = report
                .fields
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(" ");
            println!("{line}");
        }
        OutputFormat::Raw => print_raw(report.raw),
    }
}

/// Print a list of records; `header` and `rows` are used by table and pretty output.
pub fn print_rows<T: Serialize>(
    records: &[T],
    header: &[&str],
    rows: Vec<Vec<String>>,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => print_json(&records),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(header.to_vec());
            for row in rows {
                table.add_row(row);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for row in rows {
                println!("{}", row.join("\t"));
            }
        }
    }
}

fn print_json<T: Serialize + ?Sized>(record: &T) {
    println!(
        "{}",
        serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Space-separated uppercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    let digits = hex::encode_upper(bytes);
    let mut out = String::with_capacity(digits.len() + digits.len() / 2);
    for (i, pair) in digits.as_bytes().chunks(2).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.extend(pair.iter().map(|&b| char::from(b)));
    }
    out
}

/// Printable text with non-printing bytes escaped.
pub fn printable(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x20..=0x7E => char::from(b).to_string(),
            _ => format!("\\x{b:02X}"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_spaced_uppercase() {
        assert_eq!(to_hex(&[0xBB, 0x01, 0x0A]), "BB 01 0A");
        assert_eq!(to_hex(&[]), "");
        assert_eq!(to_hex(&[0x00]), "00");
    }

    #[test]
    fn printable_escapes_control_bytes() {
        assert_eq!(printable(b"A1\r\n"), "A1\\x0D\\x0A");
    }
}
