//! Read one channel from a PREVAC controller, scripted against a mock port.
//!
//! Run with:
//!   cargo run --example read-channel
//!
//! Against real hardware the same exchange is:
//!   cargo run --features cli -- query --port /dev/ttyUSB0 \
//!     --command 0x0202 --hex 01 --shape double:1

use std::time::Duration;

use instrframe::client::{ClientConfig, RequestResponseClient, ResponseShape};
use instrframe::frame::{value, Direction, FrameCodec};
use instrframe::transport::MockPort;

const READ_CHANNEL: u16 = 0x0202;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::default();
    let codec = FrameCodec::new(config.variant);

    // The controller echoes the channel number ahead of the reading.
    let mut reply_payload = vec![0x01];
    reply_payload.extend_from_slice(&value::encode_double(123.45));
    let request = codec.encode(config.destination, config.source, READ_CHANNEL, &[0x01])?;
    let reply = codec.encode_as(
        Direction::DeviceToHost,
        config.source,
        config.destination,
        READ_CHANNEL,
        &reply_payload,
    )?;

    let mut port = MockPort::new();
    port.expect(&request, &reply);

    let mut client = RequestResponseClient::new(port, config)?;
    let reading = client.send_and_receive(
        READ_CHANNEL,
        &[0x01],
        ResponseShape::Double { skip: 1 },
        Duration::from_millis(500),
    )?;

    eprintln!("request: {:02X?}", &request[..]);
    eprintln!("reply:   {:02X?}", &reply[..]);
    println!("channel 1 = {reading}");
    Ok(())
}
