// Ingest-path error taxonomy.
// Invariants: every variant is local to a single message and never carries plaintext.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
    #[error("invalid hex encoding: {0}")]
    InvalidHexEncoding(String),
    #[error("authentication failed")]
    AuthenticationFailure,
    #[error("malformed reading: {0}")]
    MalformedReading(String),
}

impl IngestError {
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::MalformedEnvelope(_) => "malformed_envelope",
            IngestError::InvalidHexEncoding(_) => "invalid_hex_encoding",
            IngestError::AuthenticationFailure => "authentication_failure",
            IngestError::MalformedReading(_) => "malformed_reading",
        }
    }
}
