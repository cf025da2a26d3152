//! Request/response exchanges with framed instruments.
//!
//! This is the layer instrument drivers talk to. A [`RequestResponseClient`]
//! owns one port, sends one request at a time, validates the reply frame,
//! classifies any vendor status code and decodes the payload into a typed
//! [`Value`].

pub mod client;
pub mod error;
pub mod retry;
pub mod shape;

pub use client::{ClientConfig, ClientState, RequestResponseClient, PREVAC_ERROR_FLAG};
pub use error::{ClientError, Result};
pub use retry::{retry, RetryPolicy};
pub use shape::{ResponseShape, Value};
