//! Error types for design snapshot handling.

/// Errors that can occur while encoding or decoding a design snapshot.
#[derive(Debug, thiserror::Error)]
pub enum DesignError {
    #[error("Failed to serialize design: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid snapshot encoding: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Snapshot is empty")]
    Empty,
}
