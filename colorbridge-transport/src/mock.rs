//! Scripted in-memory link
//!
//! `MockLink` answers reads from a queue of scripted bytes and records every
//! byte written. Clones share the same state, so a test can box one handle
//! into a [`crate::Bus`] and inspect traffic through another.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::crc;
use crate::error::TransportError;
use crate::link::ByteLink;

#[derive(Debug)]
enum Scripted {
    Byte(u8),
    /// Already sitting in the receive buffer; dropped by `discard_input`
    Stale(u8),
    Fail,
}

#[derive(Debug, Default)]
struct MockState {
    inbound: VecDeque<Scripted>,
    written: Vec<u8>,
    unplugged: bool,
    discards: usize,
}

/// Scripted link for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct MockLink {
    state: Arc<Mutex<MockState>>,
}

impl MockLink {
    /// Create an empty mock; reads fail until bytes are scripted
    pub fn new() -> Self {
        Self::default()
    }

    /// Script raw bytes for upcoming reads
    pub fn push_bytes(&self, bytes: &[u8]) {
        let mut state = self.state.lock();
        state
            .inbound
            .extend(bytes.iter().map(|&b| Scripted::Byte(b)));
    }

    /// Script bytes that are buffered but unsolicited
    ///
    /// They are read like any other byte; a `discard_input` that finds them
    /// at the head of the queue drops them.
    pub fn push_stale(&self, bytes: &[u8]) {
        let mut state = self.state.lock();
        state
            .inbound
            .extend(bytes.iter().map(|&b| Scripted::Stale(b)));
    }

    /// Script a well-formed reply to getter `opcode`
    pub fn push_reply(&self, opcode: u8, payload: &[u8]) {
        self.push_bytes(payload);
        self.push_bytes(&[crc::frame_crc(opcode, payload)]);
    }

    /// Script a reply whose CRC byte is wrong
    pub fn push_corrupt_reply(&self, opcode: u8, payload: &[u8]) {
        self.push_bytes(payload);
        self.push_bytes(&[crc::frame_crc(opcode, payload) ^ 0xFF]);
    }

    /// Script a single read failure (timeout)
    pub fn push_failure(&self) {
        self.state.lock().inbound.push_back(Scripted::Fail);
    }

    /// Make every operation fail, as if the cable was pulled
    pub fn unplug(&self) {
        self.state.lock().unplugged = true;
    }

    /// Undo [`MockLink::unplug`]
    pub fn replug(&self) {
        self.state.lock().unplugged = false;
    }

    /// Every byte written so far
    pub fn written(&self) -> Vec<u8> {
        self.state.lock().written.clone()
    }

    /// Forget recorded writes
    pub fn clear_written(&self) {
        self.state.lock().written.clear();
    }

    /// Scripted bytes not yet consumed
    pub fn pending_reads(&self) -> usize {
        self.state.lock().inbound.len()
    }

    /// Number of `discard_input` calls
    pub fn discards(&self) -> usize {
        self.state.lock().discards
    }
}

#[async_trait]
impl ByteLink for MockLink {
    async fn write_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.unplugged {
            return Err(TransportError::Link("mock unplugged".into()));
        }
        state.written.push(byte);
        Ok(())
    }

    async fn read_byte(&mut self) -> Result<u8, TransportError> {
        let mut state = self.state.lock();
        if state.unplugged {
            return Err(TransportError::Link("mock unplugged".into()));
        }
        match state.inbound.pop_front() {
            Some(Scripted::Byte(b)) | Some(Scripted::Stale(b)) => Ok(b),
            Some(Scripted::Fail) | None => Err(TransportError::Link("mock read timeout".into())),
        }
    }

    async fn discard_input(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.unplugged {
            return Err(TransportError::Link("mock unplugged".into()));
        }
        state.discards += 1;
        while matches!(state.inbound.front(), Some(Scripted::Stale(_))) {
            state.inbound.pop_front();
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}
