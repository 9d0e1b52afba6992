//! Connection management
//!
//! Handles the connection lifecycle with the board: opening with bounded
//! retries, liveness probing and teardown when the link goes away.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Connector, FramingProtocol, ProtocolError, SerialConnector, Transport};
use crate::config::EndpointConfig;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No transport; I/O is refused
    Disconnected,
    /// Transport open and last known to be alive
    Connected,
}

/// Result of a `connect_with_retries` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Connected on the given attempt (1-based)
    Connected {
        /// Attempt number that succeeded
        attempt: u32,
    },
    /// Every attempt failed; still disconnected
    Exhausted {
        /// Number of attempts made
        attempts: u32,
    },
}

impl ConnectOutcome {
    /// Whether the call left the manager connected
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectOutcome::Connected { .. })
    }
}

/// Cumulative traffic counters for the current manager
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionCounters {
    /// Bytes written, terminators included
    pub tx_bytes: u64,
    /// Bytes read, terminators included
    pub rx_bytes: u64,
    /// Frames written
    pub tx_frames: u64,
    /// Frames read
    pub rx_frames: u64,
}

/// Owns the transport to one board and its connection state
pub struct ConnectionManager {
    /// Transport handle; present only while connected
    transport: Option<Box<dyn Transport>>,
    /// Current connection state
    state: ConnectionState,
    /// Opens new transports
    connector: Box<dyn Connector>,
    /// Endpoint the connector opens
    config: EndpointConfig,
    /// Traffic counters
    counters: ConnectionCounters,
}

impl ConnectionManager {
    /// Manager for a real serial port (not yet connected)
    pub fn new(config: EndpointConfig) -> Self {
        Self::with_connector(config, Box::new(SerialConnector))
    }

    /// Manager using a custom connector
    pub fn with_connector(config: EndpointConfig, connector: Box<dyn Connector>) -> Self {
        Self {
            transport: None,
            state: ConnectionState::Disconnected,
            connector,
            config,
            counters: ConnectionCounters::default(),
        }
    }

    /// Get current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Get cumulative traffic counters
    pub fn counters(&self) -> ConnectionCounters {
        self.counters
    }

    /// Endpoint this manager connects to
    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Open the transport, retrying up to `max_retries` times.
    ///
    /// `None` uses the configured retry count. Failure is not an error: the
    /// manager stays disconnected and the caller may try again later.
    pub fn connect_with_retries(&mut self, max_retries: Option<u32>) -> ConnectOutcome {
        let max_retries = max_retries.unwrap_or(self.config.max_retries);
        let backoff = Duration::from_millis(self.config.retry_delay_ms);

        self.teardown("reconnecting");

        let mut attempts = 0;
        while attempts < max_retries {
            tracing::info!("Trying to connect to {}...", self.config.port_name);
            match self.connector.open(&self.config) {
                Ok(transport) => {
                    attempts += 1;
                    tracing::info!(
                        "Connected to {} at {} baud (attempt {})",
                        self.config.port_name,
                        self.config.baud_rate,
                        attempts
                    );
                    self.transport = Some(transport);
                    self.state = ConnectionState::Connected;
                    return ConnectOutcome::Connected { attempt: attempts };
                }
                Err(e) => {
                    attempts += 1;
                    tracing::warn!(
                        "Connection attempt {}/{} failed: {}",
                        attempts,
                        max_retries,
                        e
                    );
                    if attempts < max_retries {
                        std::thread::sleep(backoff);
                    }
                }
            }
        }

        ConnectOutcome::Exhausted { attempts }
    }

    /// Check whether the board is still reachable.
    ///
    /// Probes the pending-byte count; a probe failure tears the link down.
    pub fn is_board_connected(&mut self) -> bool {
        let open = self.transport.as_ref().is_some_and(|t| t.is_open());
        if !open {
            self.teardown("transport not open");
            return false;
        }

        let probe = match self.transport.as_mut() {
            Some(transport) => transport.bytes_to_read(),
            None => return false,
        };

        match probe {
            Ok(_) => {
                self.state = ConnectionState::Connected;
                true
            }
            Err(e) => {
                self.teardown(&format!("liveness probe failed: {}", e));
                false
            }
        }
    }

    /// Close and discard the transport and go to `Disconnected`.
    ///
    /// Returns true if a transport was actually released.
    pub fn teardown(&mut self, reason: &str) -> bool {
        self.state = ConnectionState::Disconnected;
        match self.transport.take() {
            Some(mut transport) => {
                transport.close();
                tracing::info!("Disconnected from {}: {}", self.config.port_name, reason);
                true
            }
            None => false,
        }
    }

    /// Disconnect from the board
    pub fn disconnect(&mut self) {
        self.teardown("disconnect requested");
    }

    fn connected_transport(&mut self) -> Result<&mut Box<dyn Transport>, ProtocolError> {
        if self.state != ConnectionState::Connected {
            return Err(ProtocolError::NotConnected);
        }
        self.transport.as_mut().ok_or(ProtocolError::NotConnected)
    }

    /// Read one frame; link failures tear the connection down
    pub fn read_frame(
        &mut self,
        framing: &FramingProtocol,
    ) -> Result<Option<Vec<u8>>, ProtocolError> {
        let transport = self.connected_transport()?;
        match framing.read_one(transport.as_mut()) {
            Ok(Some(payload)) => {
                self.counters.rx_bytes = self
                    .counters
                    .rx_bytes
                    .saturating_add((payload.len() + framing.terminator().len()) as u64);
                self.counters.rx_frames = self.counters.rx_frames.saturating_add(1);
                tracing::debug!("Incoming data: {:?}", String::from_utf8_lossy(&payload));
                Ok(Some(payload))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                self.teardown(&format!("read failed: {}", e));
                Err(e)
            }
        }
    }

    /// Write one frame; link failures tear the connection down
    pub fn write_frame(
        &mut self,
        framing: &FramingProtocol,
        payload: &[u8],
    ) -> Result<(), ProtocolError> {
        let transport = self.connected_transport()?;
        match framing.write_one(transport.as_mut(), payload) {
            Ok(written) => {
                self.counters.tx_bytes = self.counters.tx_bytes.saturating_add(written as u64);
                self.counters.tx_frames = self.counters.tx_frames.saturating_add(1);
                tracing::debug!("Sent {:?}", String::from_utf8_lossy(payload));
                Ok(())
            }
            Err(e) => {
                self.teardown(&format!("write failed: {}", e));
                Err(e)
            }
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}
