//! Serial Protocol Communication
//!
//! Line-oriented text protocol spoken by the kit board firmware.
//!
//! Frames are opaque byte payloads followed by a terminator (a single newline
//! by default). The driver never interprets them; [`commands`] offers typed
//! helpers for callers that want to.

pub mod commands;
mod connection;
mod error;
mod framing;
pub mod mock;
pub mod transport;

pub use commands::{BoardCommand, BoardEvent};
pub use connection::{ConnectOutcome, ConnectionCounters, ConnectionManager, ConnectionState};
pub use error::ProtocolError;
pub use framing::FramingProtocol;
pub use transport::{Connector, SerialConnector, SerialTransport, Transport};

/// Default baud rate for the kit board
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default read timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Default delay between connection attempts in milliseconds
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Default number of connection attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default frame terminator
pub const DEFAULT_TERMINATOR: &[u8] = b"\n";
