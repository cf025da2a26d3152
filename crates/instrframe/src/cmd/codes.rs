use instrframe_frame::ProtocolVariant;
use instrframe_registry::{
    tables, CodeWidth, ErrorKind, ErrorRegistry, ErrorTable, RegistryConfig, Severity, Status,
};
use serde::Serialize;

use crate::cmd::{CodeTable, CodesArgs};
use crate::exit::{registry_error, CliResult, SUCCESS};
use crate::output::{print_rows, OutputFormat};

#[derive(Serialize)]
struct CodeOutput<'a> {
    table: &'a str,
    code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    severity: Option<Severity>,
    description: &'a str,
}

pub fn run(args: CodesArgs, format: OutputFormat) -> CliResult<i32> {
    let registries = match &args.file {
        Some(path) => vec![ErrorRegistry::from_path(path, &RegistryConfig::default())
            .map_err(|err| registry_error(&format!("loading {}", path.display()), err))?],
        None => bundled_tables(args.variant, args.table)
            .into_iter()
            .map(ErrorRegistry::register_error_table)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| registry_error("bundled table", err))?,
    };

    let mut records = Vec::new();
    let mut rows = Vec::new();
    for registry in &registries {
        for (code, status, description) in registry.entries() {
            let (kind, severity) = match status {
                Status::Ok => (None, None),
                Status::Error { kind, severity } => (Some(kind), Some(severity)),
            };
            rows.push(vec![
                registry.name().to_string(),
                format_code(registry, code),
                kind.map_or_else(|| "ok".to_string(), |k| k.to_string()),
                severity.map_or_else(String::new, |s| severity_name(s).to_string()),
                description.to_string(),
            ]);
            records.push(CodeOutput {
                table: registry.name(),
                code,
                kind,
                severity,
                description,
            });
        }
    }

    print_rows(
        &records,
        &["TABLE", "CODE", "OUTCOME", "SEVERITY", "DESCRIPTION"],
        rows,
        format,
    );
    Ok(SUCCESS)
}

fn bundled_tables(variant: ProtocolVariant, which: CodeTable) -> Vec<ErrorTable> {
    let (results, status) = match variant {
        ProtocolVariant::Prevac => (
            tables::prevac_operation_results(),
            Some(tables::prevac_device_status()),
        ),
        ProtocolVariant::Sqm160 => (tables::sqm160_response_codes(), None),
    };
    match which {
        CodeTable::Results => vec![results],
        CodeTable::Status => status.into_iter().collect(),
        CodeTable::All => std::iter::once(results).chain(status).collect(),
    }
}

fn format_code(registry: &ErrorRegistry, code: u16) -> String {
    match registry.width() {
        CodeWidth::Byte if (0x21..=0x7E).contains(&code) => {
            format!("0x{code:02X} '{}'", char::from(code as u8))
        }
        CodeWidth::Byte => format!("0x{code:02X}"),
        CodeWidth::Word => format!("0x{code:04X}"),
    }
}

fn severity_name(severity: Severity) -> &'static str {
    match severity {
        Severity::Fatal => "fatal",
        Severity::Warning => "warning",
    }
}
