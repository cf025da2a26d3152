use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::TransportPort;

/// Line settings for a serial port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    /// Device path (`/dev/ttyUSB0`, `COM3`, ...).
    pub path: String,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
}

impl SerialSettings {
    /// 8 data bits, no parity, one stop bit, no flow control.
    pub fn new_8n1(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
        }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self::new_8n1("/dev/ttyUSB0", 9600)
    }
}

/// Serial port transport.
///
/// Wraps a [`serialport`] handle. Each [`read_exact`](TransportPort::read_exact)
/// call re-arms the port timeout with whatever remains of its overall
/// deadline, so a stalled device yields a deterministic timeout rather than
/// one timeout per byte.
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    settings: SerialSettings,
}

impl SerialTransport {
    /// Open a serial port with the given settings.
    pub fn open(settings: SerialSettings) -> Result<Self> {
        let port = serialport::new(&settings.path, settings.baud_rate)
            .data_bits(settings.data_bits)
            .parity(settings.parity)
            .stop_bits(settings.stop_bits)
            .flow_control(settings.flow_control)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|err| TransportError::Open {
                path: settings.path.clone(),
                message: err.to_string(),
            })?;

        info!(path = %settings.path, baud = settings.baud_rate, "opened serial port");

        Ok(Self {
            port: Some(port),
            settings,
        })
    }

    /// Settings the port was opened with.
    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(TransportError::Closed)
    }
}

impl TransportPort for SerialTransport {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port_mut()?;
        let mut offset = 0usize;
        while offset < data.len() {
            match port.write(&data[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        port.flush()?;
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let port = self.port_mut()?;
        let mut filled = 0usize;

        while filled < buf.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::Timeout {
                    wanted: buf.len(),
                    received: filled,
                    timeout,
                });
            }
            port.set_timeout(remaining)
                .map_err(|err| TransportError::Io(err.into()))?;

            match port.read(&mut buf[filled..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => filled += n,
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::Interrupted | ErrorKind::TimedOut | ErrorKind::WouldBlock
                    ) =>
                {
                    continue;
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize> {
        let port = self.port_mut()?;
        let n = port
            .bytes_to_read()
            .map_err(|err| TransportError::Io(err.into()))?;
        Ok(n as usize)
    }

    fn discard_input(&mut self) -> Result<usize> {
        let port = self.port_mut()?;
        let pending = match port.bytes_to_read() {
            Ok(n) => n as usize,
            Err(err) => {
                debug!(error = %err, "could not count pending serial input");
                0
            }
        };
        port.clear(ClearBuffer::Input)
            .map_err(|err| TransportError::Io(err.into()))?;
        if pending > 0 {
            debug!(pending, "discarded serial input");
        }
        Ok(pending)
    }

    fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            debug!(path = %self.settings.path, "closed serial port");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("path", &self.settings.path)
            .field("baud_rate", &self.settings.baud_rate)
            .field("open", &self.port.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_is_8n1() {
        let settings = SerialSettings::new_8n1("/dev/ttyS0", 57_600);
        assert_eq!(settings.baud_rate, 57_600);
        assert_eq!(settings.data_bits, DataBits::Eight);
        assert_eq!(settings.parity, Parity::None);
        assert_eq!(settings.stop_bits, StopBits::One);
        assert_eq!(settings.flow_control, FlowControl::None);
    }

    #[test]
    fn open_missing_port_reports_path() {
        let settings = SerialSettings::new_8n1("/dev/instrframe-does-not-exist", 9600);
        let err = SerialTransport::open(settings).unwrap_err();
        match err {
            TransportError::Open { path, .. } => {
                assert_eq!(path, "/dev/instrframe-does-not-exist")
            }
            other => panic!("expected Open error, got {other:?}"),
        }
    }
}
