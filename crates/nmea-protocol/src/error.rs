//! Protocol Error Types

use std::time::Duration;
use thiserror::Error;

/// Errors from decoding one NMEA 0183 sentence
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Line does not begin with the sentence delimiter
    #[error("sentence does not start with '$' or '!'")]
    MissingDelimiter,

    /// Line has no checksum marker
    #[error("sentence has no '*' checksum marker")]
    MissingChecksum,

    /// Checksum trailer is not two hex digits
    #[error("malformed checksum trailer: {0:?}")]
    MalformedChecksum(String),

    /// Transmitted checksum does not match the computed one
    #[error("checksum mismatch: expected {expected:02X}, got {actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// Address field is not a five-character talker+type code
    #[error("malformed address field: {0:?}")]
    BadAddress(String),

    /// Sentence type has no extraction rule
    #[error("unsupported sentence type: {0}")]
    Unsupported(String),

    /// A present field failed to parse
    #[error("invalid {name} field: {value:?}")]
    InvalidField { name: &'static str, value: String },
}

/// Errors from the socket stream. Every variant means the current connection
/// is unusable; the caller drops the stream and reconnects.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Could not establish the TCP connection
    #[error("connect to {peer} failed: {source}")]
    Connect {
        peer: String,
        #[source]
        source: std::io::Error,
    },

    /// Read failed mid-stream
    #[error("socket read failed: {0}")]
    Io(#[from] std::io::Error),

    /// Peer went silent past the read timeout
    #[error("no data received within {0:?}")]
    ReadTimeout(Duration),

    /// Peer closed the connection (EOF)
    #[error("connection closed by peer")]
    Closed,
}
