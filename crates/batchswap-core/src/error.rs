//! Error types for the Batchswap signing and settlement library.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Typed data error: {message}")]
    TypedData { message: String },

    #[error("Signature error: {message}")]
    Signature { message: String },

    #[error("Signing error: {0}")]
    Signer(#[from] alloy_signer::Error),

    #[error("{kind} signer does not support the requested operation")]
    UnsupportedSigner { kind: &'static str },

    #[error("Order error: {message}")]
    Order { message: String },

    #[error("Settlement error: {message}")]
    Settlement { message: String },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("RPC transport error: {message}")]
    RpcTransport { message: String, status: Option<u16> },
}

impl Error {
    /// Shorthand for a typed data encoding failure.
    pub(crate) fn typed_data(message: impl Into<String>) -> Self {
        Error::TypedData {
            message: message.into(),
        }
    }

    /// Shorthand for a signature encoding/decoding failure.
    pub(crate) fn signature(message: impl Into<String>) -> Self {
        Error::Signature {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
