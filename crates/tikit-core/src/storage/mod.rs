//! Persistent key/value storage
//!
//! A flat map of string keys to string values, mirrored to a plain text file
//! so that values such as the timer length survive restarts.

mod error;
mod store;

pub use error::StorageError;
pub use store::{parse_records, PersistentStore, TIMER_LENGTH_KEY};
