//! Blocking byte-stream transport abstraction for instrument links.
//!
//! Provides a single interface over the physical link beneath the framing
//! layer:
//! - Serial ports and USB-serial adapters (feature `serial`)
//! - A scripted in-memory port for deterministic tests
//!
//! This is the lowest layer of instrframe. Everything else builds on top of
//! the [`TransportPort`] trait provided here.

pub mod error;
pub mod mock;
pub mod traits;

#[cfg(feature = "serial")]
pub mod serial;

pub use error::{Result, TransportError};
pub use mock::MockPort;
pub use traits::TransportPort;

#[cfg(feature = "serial")]
pub use serial::{SerialSettings, SerialTransport};
