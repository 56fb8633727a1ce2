//! Error types for node access and timestamp handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("invalid node URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },

    #[error("could not decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    #[error("empty timestamp")]
    Empty,

    #[error("unrecognised timestamp: {0}")]
    Unparseable(String),
}
