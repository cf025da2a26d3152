//! Bundled vendor tables.

use crate::kind::{ErrorKind, Severity};
use crate::registry::{CodeWidth, ErrorTable};

use ErrorKind::*;
use Severity::{Fatal, Warning};

/// One-byte result codes carried in PREVAC error replies.
pub fn prevac_operation_results() -> ErrorTable {
    ErrorTable::new("prevac-operation-results", CodeWidth::Byte)
        .ok(0x00, "operation completed")
        .entry(0x01, Unsupported, Fatal, "unknown function code")
        .entry(0x02, InvalidParameter, Fatal, "invalid data length")
        .entry(0x03, OutOfRange, Fatal, "value out of range")
        .entry(0x04, ReadOnly, Fatal, "parameter is read-only")
        .entry(0x05, NotRegistered, Fatal, "host is not registered")
        .entry(0x06, NotAuthorized, Fatal, "host has no master rights")
        .entry(0x07, LocalMode, Fatal, "device is under local control")
        .entry(0x08, InvalidParameter, Fatal, "invalid channel")
}

/// Sixteen-bit device status words, grouped by subsystem in the high byte.
pub fn prevac_device_status() -> ErrorTable {
    ErrorTable::new("prevac-device-status", CodeWidth::Word)
        .ok(0x0000, "no condition")
        // system
        .entry(0x0101, NotAuthorized, Fatal, "host lost master rights")
        .entry(0x0102, LocalMode, Fatal, "device switched to local control")
        .entry(0x0103, InvalidParameter, Warning, "configuration reset to defaults")
        .entry(0x0104, Unsupported, Fatal, "mode not supported by firmware")
        .entry(0x0105, NotRegistered, Warning, "host registration expired")
        .entry(0x0106, ReadOnly, Fatal, "parameter memory write protected")
        // output stage
        .entry(0x0201, OutOfRange, Fatal, "output overcurrent")
        .entry(0x0202, OutOfRange, Fatal, "output overvoltage")
        .entry(0x0203, OutOfRange, Warning, "output current limited")
        .entry(0x0204, OutOfRange, Warning, "output voltage limited")
        .entry(0x0205, OutOfRange, Fatal, "output power exceeded")
        .entry(0x0206, OutOfRange, Warning, "setpoint ramp clipped")
        .entry(0x0207, InvalidParameter, Fatal, "output not enabled")
        .entry(0x0208, InvalidParameter, Warning, "setpoint outside calibration")
        // interlocks
        .entry(0x0301, NotAuthorized, Fatal, "external interlock open")
        .entry(0x0302, NotAuthorized, Fatal, "vacuum interlock open")
        .entry(0x0303, NotAuthorized, Fatal, "cooling water interlock open")
        .entry(0x0304, NotAuthorized, Warning, "door interlock bypassed")
        .entry(0x0305, LocalMode, Fatal, "emergency stop active")
        // temperature
        .entry(0x0401, OutOfRange, Fatal, "overtemperature")
        .entry(0x0402, OutOfRange, Warning, "temperature approaching limit")
        .entry(0x0403, InvalidParameter, Fatal, "thermocouple open")
        .entry(0x0404, InvalidParameter, Warning, "thermocouple reversed")
        .entry(0x0405, OutOfRange, Warning, "ambient temperature high")
        .entry(0x0406, OutOfRange, Fatal, "heatsink overtemperature")
        // measurement
        .entry(0x0501, OutOfRange, Warning, "reading below range")
        .entry(0x0502, OutOfRange, Warning, "reading above range")
        .entry(0x0503, InvalidParameter, Fatal, "gauge not connected")
        .entry(0x0504, InvalidParameter, Warning, "gauge calibration due")
}

/// SQM-160 response characters.
pub fn sqm160_response_codes() -> ErrorTable {
    ErrorTable::new("sqm160-response-codes", CodeWidth::Byte)
        .ok(u16::from(b'A'), "command understood")
        .entry(u16::from(b'C'), Unsupported, Fatal, "invalid command")
        .entry(u16::from(b'D'), InvalidParameter, Fatal, "problem with data in command")
}
