//! Vendor status and error code tables.
//!
//! Instruments answer rejected requests with small numeric codes. This crate
//! turns them into a closed [`ErrorKind`] taxonomy through an immutable
//! [`ErrorRegistry`], built once per protocol variant from a bundled table,
//! a caller-supplied table, or a JSON file.

pub mod config;
pub mod error;
pub mod kind;
pub mod registry;
pub mod tables;

pub use config::RegistryConfig;
pub use error::{RegistryError, Result};
pub use kind::{ErrorKind, Severity, Status};
pub use registry::{CodeWidth, ErrorRegistry, ErrorTable, TableEntry};
