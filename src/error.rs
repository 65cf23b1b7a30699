//! Error types
//!
//! A single error enum covers the control plane. Network errors inside a
//! running relay never surface here; they are logged and swallowed.

use std::io;

/// Error type for selector operations
#[derive(Debug)]
pub enum Error {
    /// Hostname could not be resolved to an address
    Resolution { host: String },
    /// Camera slot index outside `[0, count)`
    SlotOutOfRange { slot: usize, count: usize },
    /// Routers and relays were built for different slot counts
    SlotCountMismatch { routers: usize, relays: usize },
    /// Only dynamic (discovered) sources accept a PTZ name
    NotDynamic(String),
    /// Source name is not in the cache
    UnknownSource(String),
    /// A relay receive port could not be bound
    SocketBind { port: u16, source: io::Error },
    /// Other I/O failure
    Io(io::Error),
    /// Persisted state could not be read or written
    Persistence(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Resolution { host } => write!(f, "Host not found: {}", host),
            Error::SlotOutOfRange { slot, count } => {
                write!(f, "Camera slot {} out of range (0..{})", slot, count)
            }
            Error::SlotCountMismatch { routers, relays } => {
                write!(f, "{} routers but {} PTZ relays", routers, relays)
            }
            Error::NotDynamic(name) => write!(f, "Can't set PTZ for {}", name),
            Error::UnknownSource(name) => write!(f, "Unknown source: {}", name),
            Error::SocketBind { port, source } => {
                write!(f, "Failed to bind UDP port {}: {}", port, source)
            }
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Persistence(msg) => write!(f, "Persistence error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::SocketBind { source, .. } => Some(source),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Persistence(e.to_string())
    }
}

/// Result alias for selector operations
pub type Result<T> = std::result::Result<T, Error>;
