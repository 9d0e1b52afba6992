//! Board driver
//!
//! [`BoardDriver`] ties the connection, framing and persistent store together
//! for one board. Every operation other than connecting and the liveness
//! check is a silent no-op while disconnected; callers are expected to poll
//! [`BoardDriver::is_board_connected`] and reconnect when it turns false.
//!
//! The `try_*` variants return an [`Outcome`] that says why nothing happened.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::config::{ConfigError, EndpointConfig};
use crate::protocol::{
    ConnectOutcome, ConnectionCounters, ConnectionManager, ConnectionState, Connector,
    FramingProtocol, ProtocolError, SerialConnector,
};
use crate::storage::PersistentStore;

/// Result of a driver operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation ran
    Ok(T),
    /// Skipped because the board is not connected
    NotConnected,
    /// The link failed during the operation and has been torn down
    TransportError(String),
    /// The backing file could not be read or written
    StorageError(String),
}

impl<T> Outcome<T> {
    /// The value if the operation ran
    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Ok(v) => Some(v),
            _ => None,
        }
    }

    /// Whether the operation ran
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    fn from_protocol(result: Result<T, ProtocolError>) -> Self {
        match result {
            Ok(v) => Outcome::Ok(v),
            Err(ProtocolError::NotConnected) => Outcome::NotConnected,
            Err(e) => Outcome::TransportError(e.to_string()),
        }
    }
}

/// Host-side driver for one kit board
pub struct BoardDriver {
    connection: ConnectionManager,
    framing: FramingProtocol,
    store: PersistentStore,
}

impl BoardDriver {
    /// Driver for a board on a real serial port (not yet connected)
    pub fn new(config: EndpointConfig) -> Result<Self, ConfigError> {
        Self::with_connector(config, Box::new(SerialConnector))
    }

    /// Driver using a custom connector
    pub fn with_connector(
        config: EndpointConfig,
        connector: Box<dyn Connector>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            framing: FramingProtocol::new(config.terminator.clone()),
            store: PersistentStore::new(&config.storage_file_path),
            connection: ConnectionManager::with_connector(config, connector),
        })
    }

    /// Endpoint configuration
    pub fn config(&self) -> &EndpointConfig {
        self.connection.config()
    }

    /// Last known connection state. Use [`is_board_connected`](Self::is_board_connected)
    /// to refresh it.
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Traffic counters
    pub fn counters(&self) -> ConnectionCounters {
        self.connection.counters()
    }

    fn connected(&self) -> bool {
        self.connection.state() == ConnectionState::Connected
    }

    /// Connect, retrying up to `max_retries` times (configured count if `None`).
    ///
    /// On success the store is reloaded from its backing file.
    pub fn connect_with_retries(&mut self, max_retries: Option<u32>) -> ConnectOutcome {
        let outcome = self.connection.connect_with_retries(max_retries);
        if outcome.is_connected() {
            if let Err(e) = self.store.reload() {
                tracing::warn!("Could not reload stored values: {}", e);
            }
        }
        outcome
    }

    /// Probe the link; false once the board is gone
    pub fn is_board_connected(&mut self) -> bool {
        self.connection.is_board_connected()
    }

    /// Drop the connection
    pub fn disconnect(&mut self) {
        self.connection.disconnect();
    }

    /// Send one frame
    pub fn try_send(&mut self, payload: &[u8]) -> Outcome<()> {
        Outcome::from_protocol(self.connection.write_frame(&self.framing, payload))
    }

    /// Send one frame; does nothing while disconnected
    pub fn send(&mut self, payload: &[u8]) {
        if let Outcome::TransportError(e) = self.try_send(payload) {
            tracing::warn!("Send failed, board disconnected: {}", e);
        }
    }

    /// Receive one frame if one is pending
    pub fn try_read(&mut self) -> Outcome<Option<Vec<u8>>> {
        Outcome::from_protocol(self.connection.read_frame(&self.framing))
    }

    /// Receive one frame; `None` when nothing arrived or disconnected
    pub fn read(&mut self) -> Option<Vec<u8>> {
        match self.try_read() {
            Outcome::Ok(frame) => frame,
            Outcome::TransportError(e) => {
                tracing::warn!("Read failed, board disconnected: {}", e);
                None
            }
            _ => None,
        }
    }

    /// Store a value and rewrite the backing file
    pub fn try_set_value(&mut self, key: &str, value: impl ToString) -> Outcome<()> {
        if !self.connected() {
            return Outcome::NotConnected;
        }
        match self.store.set(key, value) {
            Ok(()) => Outcome::Ok(()),
            Err(e) => Outcome::StorageError(e.to_string()),
        }
    }

    /// Store a value; dropped while disconnected
    pub fn set_value(&mut self, key: &str, value: impl ToString) {
        if let Outcome::StorageError(e) = self.try_set_value(key, value) {
            tracing::warn!("{}", e);
        }
    }

    /// Remove a key and rewrite the backing file
    pub fn try_remove_value(&mut self, key: &str) -> Outcome<Option<String>> {
        if !self.connected() {
            return Outcome::NotConnected;
        }
        match self.store.remove(key) {
            Ok(old) => Outcome::Ok(old),
            Err(e) => Outcome::StorageError(e.to_string()),
        }
    }

    /// Remove a key; dropped while disconnected
    pub fn remove_value(&mut self, key: &str) {
        if let Outcome::StorageError(e) = self.try_remove_value(key) {
            tracing::warn!("{}", e);
        }
    }

    /// Look up a stored value
    pub fn try_get_value(&self, key: &str) -> Outcome<Option<&str>> {
        if !self.connected() {
            return Outcome::NotConnected;
        }
        Outcome::Ok(self.store.get(key))
    }

    /// Look up a stored value; `None` when missing or disconnected
    pub fn get_value(&self, key: &str) -> Option<&str> {
        self.try_get_value(key).ok().flatten()
    }

    /// Look up a stored value parsed as `T`
    pub fn get_value_as<T: FromStr>(&self, key: &str) -> Option<T> {
        if !self.connected() {
            return None;
        }
        self.store.get_parsed(key)
    }

    /// The whole store
    pub fn try_values(&self) -> Outcome<&BTreeMap<String, String>> {
        if !self.connected() {
            return Outcome::NotConnected;
        }
        Outcome::Ok(self.store.get_all())
    }

    /// The whole store; `None` while disconnected
    pub fn values(&self) -> Option<&BTreeMap<String, String>> {
        self.try_values().ok()
    }
}
