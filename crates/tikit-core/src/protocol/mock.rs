//! In-memory stand-in for a kit board
//!
//! [`MockBoard`] simulates the device side of the serial link: bytes pushed
//! with [`MockBoard::push_inbound`] become readable by the host, and every
//! byte the host writes is captured. The board can be unplugged at any time
//! to exercise the link-loss paths. Used by the test suites and by the
//! monitor's demo mode.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Connector, ProtocolError, Transport};
use crate::config::EndpointConfig;

#[derive(Debug)]
struct MockState {
    plugged_in: bool,
    failing_opens: u32,
    open_attempts: u32,
    closes: u32,
    inbound: VecDeque<u8>,
    written: Vec<u8>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            plugged_in: true,
            failing_opens: 0,
            open_attempts: 0,
            closes: 0,
            inbound: VecDeque::new(),
            written: Vec::new(),
        }
    }
}

/// Handle to a simulated board. Clones share the same device.
#[derive(Debug, Clone, Default)]
pub struct MockBoard {
    state: Arc<Mutex<MockState>>,
}

impl MockBoard {
    /// A plugged-in board with empty buffers
    pub fn new() -> Self {
        Self::default()
    }

    /// A board that is not attached, so every open attempt fails
    pub fn unplugged() -> Self {
        let board = Self::new();
        board.unplug();
        board
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Connector that opens transports to this board
    pub fn connector(&self) -> MockConnector {
        MockConnector {
            board: self.clone(),
        }
    }

    /// Detach the device: opens fail and open transports start erroring
    pub fn unplug(&self) {
        self.lock().plugged_in = false;
    }

    /// Re-attach the device
    pub fn plug_in(&self) {
        self.lock().plugged_in = true;
    }

    /// Make the next `count` open attempts fail even if plugged in
    pub fn fail_next_opens(&self, count: u32) {
        self.lock().failing_opens = count;
    }

    /// Queue bytes sent by the device
    pub fn push_inbound(&self, bytes: &[u8]) {
        self.lock().inbound.extend(bytes.iter().copied());
    }

    /// Bytes still waiting to be read by the host
    pub fn pending_inbound(&self) -> usize {
        self.lock().inbound.len()
    }

    /// Everything the host has written so far
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Return and clear everything the host has written
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().written)
    }

    /// Number of times a connector tried to open this board
    pub fn open_attempts(&self) -> u32 {
        self.lock().open_attempts
    }

    /// Number of times an open transport was closed
    pub fn close_count(&self) -> u32 {
        self.lock().closes
    }
}

/// [`Connector`] for a [`MockBoard`]
#[derive(Debug, Clone)]
pub struct MockConnector {
    board: MockBoard,
}

impl Connector for MockConnector {
    fn open(&mut self, config: &EndpointConfig) -> Result<Box<dyn Transport>, ProtocolError> {
        let mut state = self.board.lock();
        state.open_attempts += 1;

        if !state.plugged_in || state.failing_opens > 0 {
            state.failing_opens = state.failing_opens.saturating_sub(1);
            return Err(ProtocolError::OpenFailed {
                port: config.port_name.clone(),
                reason: "no such device".to_string(),
            });
        }

        Ok(Box::new(MockTransport {
            board: self.board.clone(),
            open: true,
        }))
    }
}

/// Host end of a [`MockBoard`] link
#[derive(Debug)]
pub struct MockTransport {
    board: MockBoard,
    open: bool,
}

impl MockTransport {
    fn check_link(&self) -> Result<MutexGuard<'_, MockState>, ProtocolError> {
        if !self.open {
            return Err(ProtocolError::NotConnected);
        }
        let state = self.board.lock();
        if !state.plugged_in {
            return Err(ProtocolError::SerialError(
                "device reports no longer present".to_string(),
            ));
        }
        Ok(state)
    }
}

impl Transport for MockTransport {
    fn is_open(&self) -> bool {
        self.open
    }

    fn bytes_to_read(&mut self) -> Result<u32, ProtocolError> {
        let state = self.check_link()?;
        Ok(state.inbound.len() as u32)
    }

    fn read_until(&mut self, terminator: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let mut state = self.check_link()?;
        let buffered: Vec<u8> = state.inbound.iter().copied().collect();

        let end = buffered
            .windows(terminator.len().max(1))
            .position(|w| w == terminator)
            .map(|pos| pos + terminator.len());

        match end {
            Some(end) => Ok(state.inbound.drain(..end).collect()),
            None => {
                // A real port would block for its timeout and then give up
                // with whatever partial data it had consumed
                state.inbound.clear();
                Err(ProtocolError::Timeout)
            }
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        let mut state = self.check_link()?;
        state.written.extend_from_slice(data);
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.board.lock().closes += 1;
        }
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(board: &MockBoard) -> Box<dyn Transport> {
        match board.connector().open(&EndpointConfig::new("mock")) {
            Ok(t) => t,
            Err(e) => panic!("open failed: {e}"),
        }
    }

    #[test]
    fn test_read_until_takes_one_frame() {
        let board = MockBoard::new();
        let mut transport = open(&board);
        board.push_inbound(b"timer_finished\nload_timer_data\n");

        assert_eq!(transport.read_until(b"\n").unwrap(), b"timer_finished\n");
        assert_eq!(board.pending_inbound(), 16);
        assert_eq!(transport.read_until(b"\n").unwrap(), b"load_timer_data\n");
        assert_eq!(transport.bytes_to_read().unwrap(), 0);
    }

    #[test]
    fn test_read_without_terminator_times_out() {
        let board = MockBoard::new();
        let mut transport = open(&board);
        board.push_inbound(b"timer=12");

        assert!(matches!(
            transport.read_until(b"\n"),
            Err(ProtocolError::Timeout)
        ));
    }

    #[test]
    fn test_unplugged_board_refuses_open() {
        let board = MockBoard::unplugged();
        assert!(board.connector().open(&EndpointConfig::new("mock")).is_err());
        assert_eq!(board.open_attempts(), 1);
    }

    #[test]
    fn test_close_counted_once() {
        let board = MockBoard::new();
        let mut transport = open(&board);
        transport.close();
        transport.close();
        drop(transport);
        assert_eq!(board.close_count(), 1);
    }
}
