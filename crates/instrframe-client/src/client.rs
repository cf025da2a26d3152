use std::time::Duration;

use bytes::Bytes;
use instrframe_frame::{
    value, Frame, FrameCodec, FrameError, FrameReader, FrameWarning, FrameWriter,
    ProtocolVariant, Received, StopSignal, VariantConfig,
};
use instrframe_registry::{tables, CodeWidth, ErrorRegistry, ErrorTable, Status};
use instrframe_transport::TransportPort;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::shape::{ResponseShape, Value};

/// Bit set in the command echo of a PREVAC error reply.
pub const PREVAC_ERROR_FLAG: u16 = 0x8000;

/// Position of a [`RequestResponseClient`] in its exchange cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    Sending,
    AwaitingResponse,
    Decoding,
    /// The last exchange failed; the next one starts normally.
    Failed,
}

/// Configuration for a [`RequestResponseClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Wire parameters.
    pub variant: VariantConfig,
    /// Deadline used by [`RequestResponseClient::query`].
    pub default_timeout: Duration,
    /// Device address written into addressed frames.
    pub destination: u8,
    /// Host address written into addressed frames.
    pub source: u8,
    /// Drain pending input before every request, not only after errors.
    pub resync_before_request: bool,
}

impl ClientConfig {
    pub fn new(variant: VariantConfig) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }

    pub fn for_variant(variant: ProtocolVariant) -> Self {
        Self::new(VariantConfig::for_variant(variant))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            variant: VariantConfig::prevac(),
            default_timeout: Duration::from_secs(1),
            destination: 0x01,
            source: 0xFF,
            resync_before_request: false,
        }
    }
}

fn bundled_result_table(variant: ProtocolVariant) -> ErrorTable {
    match variant {
        ProtocolVariant::Prevac => tables::prevac_operation_results(),
        ProtocolVariant::Sqm160 => tables::sqm160_response_codes(),
    }
}

fn bundled_status_table(variant: ProtocolVariant) -> ErrorTable {
    match variant {
        ProtocolVariant::Prevac => tables::prevac_device_status(),
        ProtocolVariant::Sqm160 => ErrorTable::new("sqm160-status", CodeWidth::Word),
    }
}

/// One request, one reply, over an exclusively owned port.
///
/// Each exchange writes a request and then reads exactly one reply frame
/// before returning. Nothing is retried implicitly; compose
/// [`retry`](crate::retry) around calls when a device warrants it.
///
/// After any error that may leave reply bytes in the port, the next exchange
/// first drains the input so it starts on a frame boundary.
pub struct RequestResponseClient<T> {
    port: T,
    config: ClientConfig,
    codec: FrameCodec,
    results: ErrorRegistry,
    statuses: ErrorRegistry,
    stop: Option<StopSignal>,
    state: ClientState,
    needs_resync: bool,
    last_warnings: Vec<FrameWarning>,
}

impl<T: TransportPort> RequestResponseClient<T> {
    /// Create a client using the bundled code tables for the variant.
    pub fn new(port: T, config: ClientConfig) -> Result<Self> {
        let variant = config.variant.variant;
        let results = ErrorRegistry::register_error_table(bundled_result_table(variant))?;
        let statuses = ErrorRegistry::register_error_table(bundled_status_table(variant))?;
        Ok(Self {
            port,
            config,
            codec: FrameCodec::new(config.variant),
            results,
            statuses,
            stop: None,
            state: ClientState::Idle,
            needs_resync: false,
            last_warnings: Vec::new(),
        })
    }

    /// Attach a stop signal polled while waiting for a reply.
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Replace the table used to classify reply result codes.
    pub fn register_error_table(&mut self, table: ErrorTable) -> Result<()> {
        self.results = ErrorRegistry::register_error_table(table)?;
        Ok(())
    }

    /// Replace the table used to classify device status words.
    pub fn register_status_table(&mut self, table: ErrorTable) -> Result<()> {
        self.statuses = ErrorRegistry::register_error_table(table)?;
        Ok(())
    }

    /// Use an already built result-code registry.
    pub fn set_error_registry(&mut self, registry: ErrorRegistry) {
        self.results = registry;
    }

    /// Encode a request frame without sending it.
    pub fn encode_request(&self, command: u16, payload: &[u8]) -> Result<Bytes> {
        Ok(self
            .codec
            .encode(self.config.destination, self.config.source, command, payload)?)
    }

    /// Decode a reply frame from raw bytes.
    pub fn decode_response(&self, bytes: &[u8]) -> Result<Received> {
        Ok(self.codec.decode(bytes)?)
    }

    /// Run one exchange using the configured default timeout.
    pub fn query(&mut self, command: u16, payload: &[u8], shape: ResponseShape) -> Result<Value> {
        let timeout = self.config.default_timeout;
        self.send_and_receive(command, payload, shape, timeout)
    }

    /// Send `command` with `payload` and decode the reply as `shape`.
    ///
    /// `timeout` bounds the wait for the whole reply frame.
    pub fn send_and_receive(
        &mut self,
        command: u16,
        payload: &[u8],
        shape: ResponseShape,
        timeout: Duration,
    ) -> Result<Value> {
        self.last_warnings.clear();
        match self.exchange(command, payload, shape, timeout) {
            Ok(value) => {
                self.state = ClientState::Idle;
                Ok(value)
            }
            Err(err) => {
                if err.leaves_stream_dirty() {
                    self.needs_resync = true;
                }
                debug!(command, error = %err, "exchange failed");
                self.state = ClientState::Failed;
                Err(err)
            }
        }
    }

    fn exchange(
        &mut self,
        command: u16,
        payload: &[u8],
        shape: ResponseShape,
        timeout: Duration,
    ) -> Result<Value> {
        if self.needs_resync || self.config.resync_before_request {
            self.resync()?;
        }

        self.state = ClientState::Sending;
        let mut writer = FrameWriter::new(&mut self.port, self.config.variant);
        writer.send(self.config.destination, self.config.source, command, payload)?;

        self.state = ClientState::AwaitingResponse;
        let mut reader = FrameReader::new(&mut self.port, self.config.variant);
        if let Some(stop) = &self.stop {
            reader = reader.with_stop_signal(stop.clone());
        }
        let received = reader.read_frame(timeout)?;

        self.state = ClientState::Decoding;
        for warning in &received.warnings {
            warn!(command, ?warning, "reply accepted with warning");
        }
        self.last_warnings = received.warnings;
        let frame = received.frame;

        self.check_addresses(&frame)?;
        let data = self.check_status(command, frame.command, &frame.payload)?;
        Ok(shape.decode(data, &self.statuses)?)
    }

    /// On addressed variants the reply must come from our device to our host.
    fn check_addresses(&self, frame: &Frame) -> Result<()> {
        if !self.config.variant.has_addresses {
            return Ok(());
        }
        let device = self.config.destination;
        let host = self.config.source;
        match (frame.source, frame.destination) {
            (Some(source), Some(destination)) if source == device && destination == host => {
                Ok(())
            }
            (source, destination) => Err(ClientError::AddressMismatch {
                device,
                host,
                sender: source.unwrap_or_default(),
                recipient: destination.unwrap_or_default(),
            }),
        }
    }

    /// Classify the embedded status; returns the payload left for the value.
    fn check_status<'a>(&self, command: u16, reply: u16, payload: &'a [u8]) -> Result<&'a [u8]> {
        match self.config.variant.variant {
            ProtocolVariant::Prevac => {
                if reply & !PREVAC_ERROR_FLAG != command {
                    return Err(ClientError::UnexpectedResponse {
                        expected: command,
                        actual: reply,
                    });
                }
                if reply & PREVAC_ERROR_FLAG == 0 {
                    return Ok(payload);
                }
                let code = u16::from(
                    *payload.first().ok_or(FrameError::TruncatedPayload {
                        needed: 1,
                        available: 0,
                    })?,
                );
                self.classify(code)?;
                Ok(value::skip(payload, 1)?)
            }
            ProtocolVariant::Sqm160 => {
                self.classify(reply)?;
                Ok(payload)
            }
        }
    }

    fn classify(&self, code: u16) -> Result<()> {
        match self.results.get(code) {
            Status::Ok => Ok(()),
            Status::Error { kind, severity } => Err(ClientError::Device {
                kind,
                code,
                severity,
            }),
        }
    }

    fn resync(&mut self) -> Result<()> {
        let discarded = self.port.discard_input()?;
        if discarded > 0 {
            debug!(discarded, "drained stale input before request");
        }
        self.needs_resync = false;
        Ok(())
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Warnings attached to the most recent reply.
    pub fn last_warnings(&self) -> &[FrameWarning] {
        &self.last_warnings
    }

    /// Whether the next exchange will drain the input first.
    pub fn needs_resync(&self) -> bool {
        self.needs_resync
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Registry classifying reply result codes.
    pub fn error_registry(&self) -> &ErrorRegistry {
        &self.results
    }

    /// Registry classifying device status words.
    pub fn status_registry(&self) -> &ErrorRegistry {
        &self.statuses
    }

    /// Borrow the underlying port.
    pub fn get_ref(&self) -> &T {
        &self.port
    }

    /// Mutably borrow the underlying port.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.port
    }

    /// Consume the client and return the port.
    pub fn into_inner(self) -> T {
        self.port
    }
}
