//! Serial port handling
//!
//! Provides the byte-level [`Transport`] seam between the driver and the OS
//! serial port, plus the [`Connector`] that opens one.

use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use super::ProtocolError;
use crate::config::EndpointConfig;

/// Safety cap on frame length. A device streaming bytes without ever sending
/// the terminator fails the read with [`ProtocolError::FrameTooLong`] instead
/// of growing the buffer forever.
pub const MAX_FRAME_SIZE: usize = 4096;

/// Half-duplex byte channel to the board
pub trait Transport: Send {
    /// Whether the underlying handle is still open
    fn is_open(&self) -> bool;

    /// Number of bytes waiting in the receive buffer
    ///
    /// Doubles as the liveness probe: a vanished device makes this fail.
    fn bytes_to_read(&mut self) -> Result<u32, ProtocolError>;

    /// Read until `terminator` has been received, returning everything read
    /// including the terminator. Bounded by the transport's read timeout.
    fn read_until(&mut self, terminator: &[u8]) -> Result<Vec<u8>, ProtocolError>;

    /// Write all of `data` in one operation
    fn write_all(&mut self, data: &[u8]) -> Result<(), ProtocolError>;

    /// Release the handle. Calling it on a closed transport does nothing.
    fn close(&mut self);
}

/// Opens transports for a given endpoint
pub trait Connector: Send {
    /// Try once to open the endpoint
    fn open(&mut self, config: &EndpointConfig) -> Result<Box<dyn Transport>, ProtocolError>;
}

/// Open a serial port with the endpoint's baud rate and read timeout
pub fn open_port(config: &EndpointConfig) -> Result<Box<dyn SerialPort>, ProtocolError> {
    serialport::new(&config.port_name, config.baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(Duration::from_millis(config.timeout_ms))
        .open()
        .map_err(|e| ProtocolError::OpenFailed {
            port: config.port_name.clone(),
            reason: e.to_string(),
        })
}

/// Read byte by byte until `terminator` arrives or the reader gives up.
///
/// The returned bytes include the terminator.
pub fn read_until_terminator<R: Read + ?Sized>(
    reader: &mut R,
    terminator: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    let mut data = Vec::new();
    let mut byte = [0u8; 1];

    while !data.ends_with(terminator) {
        if data.len() >= MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLong(MAX_FRAME_SIZE));
        }
        match reader.read(&mut byte) {
            Ok(0) => return Err(ProtocolError::PortClosed),
            Ok(_) => data.push(byte[0]),
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(ref e) if e.kind() == ErrorKind::TimedOut => return Err(ProtocolError::Timeout),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(data)
}

/// [`Transport`] backed by a real serial port
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Wrap an already opened port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port: Some(port) }
    }

    /// Open the port described by `config`
    pub fn open(config: &EndpointConfig) -> Result<Self, ProtocolError> {
        let port = open_port(config)?;
        tracing::debug!(
            "opened {} at {} baud (timeout {}ms)",
            config.port_name,
            config.baud_rate,
            config.timeout_ms
        );
        Ok(Self::new(port))
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>, ProtocolError> {
        self.port.as_mut().ok_or(ProtocolError::NotConnected)
    }
}

impl Transport for SerialTransport {
    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn bytes_to_read(&mut self) -> Result<u32, ProtocolError> {
        Ok(self.port_mut()?.bytes_to_read()?)
    }

    fn read_until(&mut self, terminator: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        read_until_terminator(&mut **self.port_mut()?, terminator)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        let port = self.port_mut()?;
        port.write_all(data)?;
        port.flush()?;
        Ok(())
    }

    fn close(&mut self) {
        // Dropping the handle closes the OS descriptor
        self.port = None;
    }
}

/// [`Connector`] that opens real serial ports
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    fn open(&mut self, config: &EndpointConfig) -> Result<Box<dyn Transport>, ProtocolError> {
        Ok(Box::new(SerialTransport::open(config)?))
    }
}
