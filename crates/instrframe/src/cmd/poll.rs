use std::time::{Duration, Instant};

use instrframe_client::ClientError;
use instrframe_frame::{FrameError, StopSignal};
use tracing::{debug, warn};

use crate::cmd::query::{open_client, print_reading, ReadingOutput};
use crate::cmd::PollArgs;
use crate::exit::{client_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::OutputFormat;

const SLEEP_SLICE: Duration = Duration::from_millis(50);

pub fn run(args: PollArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = args.payload.bytes()?;
    let stop = StopSignal::new();
    install_ctrlc_handler(stop.clone())?;

    let mut client = open_client(&args.link)?.with_stop_signal(stop.clone());
    let mut readings = 0usize;
    let mut failures = 0usize;

    while !stop.is_stop_requested() {
        let started = Instant::now();
        match client.send_and_receive(args.command, &payload, args.shape, args.link.timeout) {
            Ok(value) => {
                readings += 1;
                print_reading(
                    &ReadingOutput {
                        variant: args.link.variant.name(),
                        command: args.command,
                        shape: args.shape.to_string(),
                        value: &value,
                        warnings: client.last_warnings().len(),
                        sequence: Some(readings),
                    },
                    format,
                );
                if args.count.is_some_and(|count| readings >= count) {
                    break;
                }
            }
            Err(ClientError::Frame(FrameError::Cancelled)) => break,
            Err(err) if err.is_transient() || err.device_kind().is_some() => {
                failures += 1;
                warn!(error = %err, failures, "poll request failed");
            }
            Err(err) => return Err(client_error("poll failed", err)),
        }

        sleep_until(started + args.interval, &stop);
    }

    debug!(readings, failures, "polling stopped");
    Ok(SUCCESS)
}

/// Sleep until `deadline`, waking early when a stop is requested.
fn sleep_until(deadline: Instant, stop: &StopSignal) {
    loop {
        if stop.is_stop_requested() {
            return;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return;
        }
        std::thread::sleep(remaining.min(SLEEP_SLICE));
    }
}

fn install_ctrlc_handler(stop: StopSignal) -> CliResult<()> {
    ctrlc::set_handler(move || {
        stop.request_stop();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleep_returns_early_on_stop() {
        let stop = StopSignal::new();
        stop.request_stop();
        let start = Instant::now();
        sleep_until(start + Duration::from_secs(5), &stop);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn sleep_waits_for_deadline() {
        let stop = StopSignal::new();
        let start = Instant::now();
        sleep_until(start + Duration::from_millis(60), &stop);
        assert!(start.elapsed() >= Duration::from_millis(60));
    }
}
