//! Checksum-protected framed protocols for serial laboratory instruments.
//!
//! instrframe speaks the binary, length-prefixed protocols used by PREVAC
//! controllers and Inficon SQM-160 rate monitors over half-duplex serial
//! links: framing with two checksum families, stream resynchronization,
//! bounded timeouts, typed payload decoding and vendor error tables.
//!
//! # Crate Structure
//!
//! - [`transport`]: blocking port abstraction, serial and mock ports
//! - [`frame`]: wire codec, stream reader/writer, payload values
//! - [`registry`]: vendor status and error code tables (behind `client` feature)
//! - [`client`]: request/response exchanges (behind `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use instrframe_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use instrframe_frame::*;
}

/// Re-export registry types (requires `client` feature).
#[cfg(feature = "client")]
pub mod registry {
    pub use instrframe_registry::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use instrframe_client::*;
}
