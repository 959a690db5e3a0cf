//! Error types
//!
//! A single error enum covers every fallible boundary of the crate: event
//! ingestion, sink forwarding and frame encoding. Slow or vanished
//! subscribers are never errors; they are handled inside the fan-out.

/// Error type for changefeed operations
#[derive(Debug)]
pub enum Error {
    /// Event rejected at the publish boundary (bad payload or operation type)
    MalformedEvent(String),
    /// JSON body or payload could not be parsed or serialized
    Json(serde_json::Error),
    /// A forwarding sink refused an event
    Sink(String),
    /// Transport write failed
    Io(std::io::Error),
    /// The broadcaster has been shut down
    Closed,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MalformedEvent(reason) => write!(f, "Malformed event: {}", reason),
            Error::Json(e) => write!(f, "JSON error: {}", e),
            Error::Sink(reason) => write!(f, "Sink error: {}", reason),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Closed => write!(f, "Broadcaster is closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
