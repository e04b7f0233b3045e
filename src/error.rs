//! Errors surfaced while pushing an image to a device.
//!
//! None of these is recoverable: the boot ROM expects one synchronous
//! exchange, so every error unwinds the session and the device has to
//! broadcast a fresh BOOTME before another attempt.

use std::io;

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong during a push session.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket-level failure while binding, sending or receiving.
    #[error("transport failure while {action}: {source}")]
    Transport {
        action: &'static str,
        source: io::Error,
    },

    /// The device violated the expected exchange.
    #[error("protocol violation: {0}")]
    Protocol(&'static str),

    /// The source image could not be opened or read.
    #[error("cannot read image `{path}`: {source}")]
    Image { path: String, source: io::Error },
}

impl Error {
    pub(crate) fn transport(action: &'static str, source: io::Error) -> Self {
        Error::Transport { action, source }
    }

    pub(crate) fn image(path: impl Into<String>, source: io::Error) -> Self {
        Error::Image {
            path: path.into(),
            source,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn transport_errors_name_the_failed_action() {
    let err = Error::transport(
        "binding the discovery port",
        io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
    );
    assert_eq!(
        err.to_string(),
        "transport failure while binding the discovery port: address in use"
    );
}

#[test]
fn image_errors_name_the_file() {
    let err = Error::image(
        "nk.nb0",
        io::Error::new(io::ErrorKind::NotFound, "no such file"),
    );
    assert_eq!(err.to_string(), "cannot read image `nk.nb0`: no such file");
}
