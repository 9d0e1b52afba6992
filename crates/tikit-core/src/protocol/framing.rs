//! Frame delimiting
//!
//! Turns the raw byte transport into message I/O. A frame is a payload
//! followed by the terminator; no escaping is done, so payloads must not
//! contain the terminator themselves.

use super::{ProtocolError, Transport, DEFAULT_TERMINATOR};

/// Terminator-delimited framing over a [`Transport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramingProtocol {
    terminator: Vec<u8>,
}

impl Default for FramingProtocol {
    fn default() -> Self {
        Self::new(DEFAULT_TERMINATOR.to_vec())
    }
}

impl FramingProtocol {
    /// Framing with the given terminator
    pub fn new(terminator: Vec<u8>) -> Self {
        Self { terminator }
    }

    /// The configured terminator
    pub fn terminator(&self) -> &[u8] {
        &self.terminator
    }

    /// Payload plus terminator, ready to write
    pub fn encode(&self, payload: &[u8]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(payload.len() + self.terminator.len());
        frame.extend_from_slice(payload);
        frame.extend_from_slice(&self.terminator);
        frame
    }

    /// Drop exactly the terminator length from the end of a raw frame
    pub fn strip(&self, mut raw: Vec<u8>) -> Vec<u8> {
        let keep = raw.len().saturating_sub(self.terminator.len());
        raw.truncate(keep);
        raw
    }

    /// Read one frame if any bytes are pending.
    ///
    /// Returns `Ok(None)` when nothing has arrived this tick.
    pub fn read_one(
        &self,
        transport: &mut dyn Transport,
    ) -> Result<Option<Vec<u8>>, ProtocolError> {
        if transport.bytes_to_read()? == 0 {
            return Ok(None);
        }

        let raw = transport.read_until(&self.terminator)?;
        Ok(Some(self.strip(raw)))
    }

    /// Write `payload` followed by the terminator in a single write
    pub fn write_one(
        &self,
        transport: &mut dyn Transport,
        payload: &[u8],
    ) -> Result<usize, ProtocolError> {
        let frame = self.encode(payload);
        transport.write_all(&frame)?;
        Ok(frame.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;
    use crate::protocol::mock::MockBoard;
    use crate::protocol::Connector;

    fn open(board: &MockBoard) -> Box<dyn Transport> {
        board
            .connector()
            .open(&EndpointConfig::new("mock"))
            .unwrap_or_else(|e| panic!("open failed: {e}"))
    }

    #[test]
    fn test_read_one_strips_terminator() {
        let board = MockBoard::new();
        let mut transport = open(&board);
        board.push_inbound(b"load_timer_data\n");

        let framing = FramingProtocol::default();
        let frame = framing.read_one(transport.as_mut()).unwrap();
        assert_eq!(frame, Some(b"load_timer_data".to_vec()));
    }

    #[test]
    fn test_read_one_nothing_pending() {
        let board = MockBoard::new();
        let mut transport = open(&board);

        let framing = FramingProtocol::default();
        assert_eq!(framing.read_one(transport.as_mut()).unwrap(), None);
    }

    #[test]
    fn test_write_one_appends_terminator() {
        let board = MockBoard::new();
        let mut transport = open(&board);

        let framing = FramingProtocol::default();
        let written = framing.write_one(transport.as_mut(), b"light_on").unwrap();
        assert_eq!(written, 9);
        assert_eq!(board.written(), b"light_on\n");
    }

    #[test]
    fn test_multi_byte_terminator() {
        let board = MockBoard::new();
        let mut transport = open(&board);
        board.push_inbound(b"timer=3600000\r\n");

        let framing = FramingProtocol::new(b"\r\n".to_vec());
        assert_eq!(
            framing.read_one(transport.as_mut()).unwrap(),
            Some(b"timer=3600000".to_vec())
        );
        framing.write_one(transport.as_mut(), b"cancel_timer").unwrap();
        assert_eq!(board.written(), b"cancel_timer\r\n");
    }

    #[test]
    fn test_strip_short_frame() {
        let framing = FramingProtocol::new(b"\r\n".to_vec());
        assert!(framing.strip(b"\n".to_vec()).is_empty());
    }
}
