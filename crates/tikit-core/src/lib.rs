//! # TI Kit Core Library
//!
//! Host-side driver for a TI LaunchPad kit board connected over a serial link.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Serial connection management with bounded retries and liveness probing
//! - Newline-delimited (configurable) frame I/O
//! - A small key/value store persisted next to the host application
//!
//! ## Example
//!
//! ```rust,ignore
//! use tikit_core::{BoardDriver, EndpointConfig};
//!
//! let mut board = BoardDriver::new(EndpointConfig::new("/dev/ttyACM0"))?;
//! board.connect_with_retries(None);
//!
//! if board.is_board_connected() {
//!     board.send(b"light_on");
//!     board.set_value("timer_length", 21_600_000);
//!     if let Some(frame) = board.read() {
//!         println!("board says {:?}", String::from_utf8_lossy(&frame));
//!     }
//! }
//! ```

pub mod board;
pub mod config;
pub mod protocol;
pub mod storage;

pub use board::{BoardDriver, Outcome};
pub use config::{ConfigError, EndpointConfig};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::board::{BoardDriver, Outcome};
    pub use crate::config::EndpointConfig;
    pub use crate::protocol::{
        BoardCommand, BoardEvent, ConnectionState, Connector, ProtocolError, Transport,
    };
    pub use crate::storage::PersistentStore;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
