//! Poll an SQM-160 rate monitor through a flaky link, with bounded retries.
//!
//! Run with:
//!   cargo run --example rate-monitor

use std::time::Duration;

use instrframe::client::{retry, ClientConfig, RequestResponseClient, ResponseShape, RetryPolicy};
use instrframe::frame::{Direction, FrameCodec, ProtocolVariant};
use instrframe::transport::MockPort;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig {
        default_timeout: Duration::from_millis(100),
        ..ClientConfig::for_variant(ProtocolVariant::Sqm160)
    };
    let codec = FrameCodec::new(config.variant);
    let reply = |payload: &[u8]| {
        codec.encode_as(Direction::DeviceToHost, 0, 0, u16::from(b'A'), payload)
    };

    let mut port = MockPort::new();
    port.set_wait_on_timeout(false);
    // First request goes unanswered; the retry gets the readings.
    port.expect(b"!#@O7", &[]);
    port.reply_to_any(&reply(b"MON Ver 2.05")?);
    port.reply_to_any(&reply(b" 1.25  0.00 14.80")?);

    let mut client = RequestResponseClient::new(port, config)?;
    let policy = RetryPolicy::new(3, Duration::from_millis(10));

    let version = retry(&policy, |attempt| {
        eprintln!("version query, attempt {attempt}");
        client.query(u16::from(b'@'), &[], ResponseShape::Ascii { skip: 0 })
    })?;
    println!("firmware: {version}");

    let rates = client.query(
        u16::from(b'W'),
        &[],
        ResponseShape::Fields {
            skip: 0,
            separator: b' ',
        },
    )?;
    println!("rates: {rates}");
    Ok(())
}
