use instrframe_client::{retry, ClientConfig, RequestResponseClient, RetryPolicy, Value};
use instrframe_frame::VariantConfig;
use instrframe_transport::{SerialSettings, SerialTransport};
use serde::Serialize;
use tracing::info;

use crate::cmd::{LinkArgs, QueryArgs};
use crate::exit::{client_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat, Report};

#[derive(Serialize)]
pub(crate) struct ReadingOutput<'a> {
    pub variant: &'static str,
    pub command: u16,
    pub shape: String,
    pub value: &'a Value,
    pub warnings: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<usize>,
}

pub fn run(args: QueryArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = args.payload.bytes()?;
    let mut client = open_client(&args.link)?;

    let policy = RetryPolicy::new(args.attempts, args.retry_delay);
    let timeout = args.link.timeout;
    let value = retry(&policy, |attempt| {
        if attempt > 1 {
            info!(attempt, "retrying request");
        }
        client.send_and_receive(args.command, &payload, args.shape, timeout)
    })
    .map_err(|err| client_error("query failed", err))?;

    print_reading(
        &ReadingOutput {
            variant: args.link.variant.name(),
            command: args.command,
            shape: args.shape.to_string(),
            value: &value,
            warnings: client.last_warnings().len(),
            sequence: None,
        },
        format,
    );
    Ok(SUCCESS)
}

/// Open the serial port described by `link` and wrap it in a client.
pub(crate) fn open_client(link: &LinkArgs) -> CliResult<RequestResponseClient<SerialTransport>> {
    let settings = SerialSettings::new_8n1(link.port.clone(), link.baud_rate());
    let port = SerialTransport::open(settings).map_err(|err| transport_error("open failed", err))?;

    let config = ClientConfig {
        variant: VariantConfig::for_variant(link.variant),
        default_timeout: link.timeout,
        destination: link.dest,
        source: link.source,
        resync_before_request: true,
    };
    RequestResponseClient::new(port, config).map_err(|err| client_error("client setup failed", err))
}

pub(crate) fn print_reading(record: &ReadingOutput<'_>, format: OutputFormat) {
    let raw = match record.value {
        Value::Raw(bytes) => bytes.clone(),
        value => format!("{value}\n").into_bytes(),
    };
    let mut fields = Vec::new();
    if let Some(seq) = record.sequence {
        fields.push(("sequence", seq.to_string()));
    }
    fields.push(("command", format!("0x{:04X}", record.command)));
    fields.push(("value", record.value.to_string()));
    if record.warnings > 0 {
        fields.push(("warnings", record.warnings.to_string()));
    }
    print_report(
        &Report {
            record,
            fields,
            raw: &raw,
        },
        format,
    );
}
