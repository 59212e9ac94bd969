//! Error types for the sFlow-RT client.
//!
//! # Design
//! Only transport failures are errors at request time. A body that is not
//! JSON is returned as `Payload::Text`, and HTTP status codes are never
//! mapped to errors: a 404 body is handed back like a 200 body.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by `SFlowRt` and its helpers.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection refused, DNS failure, timeout, or a failed body read.
    #[error("transport error: {0}")]
    Transport(#[from] ureq::Error),

    /// An environment variable held a value that could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unknown aggregation operator: {0:?}")]
    UnknownAggregation(String),
}
