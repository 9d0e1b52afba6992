//! Protocol errors

use thiserror::Error;

/// Errors that can occur while talking to the board
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("Could not open port {port}: {reason}")]
    OpenFailed { port: String, reason: String },

    #[error("Read timed out before terminator arrived")]
    Timeout,

    #[error("Not connected to board")]
    NotConnected,

    #[error("Frame exceeded {0} bytes without a terminator")]
    FrameTooLong(usize),

    #[error("Port closed by device")]
    PortClosed,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<serialport::Error> for ProtocolError {
    fn from(e: serialport::Error) -> Self {
        ProtocolError::SerialError(e.to_string())
    }
}
