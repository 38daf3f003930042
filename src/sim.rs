//! Simulated bus and indicator.
//!
//! Both handles are cheap clones over shared state, so a test or the simulator
//! binary can keep one copy to script the token while the scheduler owns the
//! other.

use crate::bus::{Indicator, OneWireBus};
use crate::identifier::{Identifier, IDENTIFIER_SIZE};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Level an undriven 1-Wire line reads back as.
const IDLE_BYTE: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimBusError {
    #[error("bus did not respond")]
    NoResponse,
}

#[derive(Debug, Default)]
struct BusState {
    token: Option<[u8; IDENTIFIER_SIZE]>,
    read_cursor: usize,
    pending_failures: u32,
    presence_checks: u32,
    written: Vec<u8>,
    descriptor: Option<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedBus {
    state: Arc<Mutex<BusState>>,
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put a token on the bus.
    pub fn attach(&self, identifier: Identifier) {
        self.attach_raw(*identifier.as_bytes());
    }

    /// Put a token on the bus that answers with exactly these bytes.
    pub fn attach_raw(&self, bytes: [u8; IDENTIFIER_SIZE]) {
        self.lock().token = Some(bytes);
    }

    pub fn detach(&self) {
        self.lock().token = None;
    }

    pub fn is_attached(&self) -> bool {
        self.lock().token.is_some()
    }

    /// Fail the next `count` presence checks.
    pub fn fail_next(&self, count: u32) {
        self.lock().pending_failures = count;
    }

    pub fn presence_checks(&self) -> u32 {
        self.lock().presence_checks
    }

    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    pub fn descriptor(&self) -> Option<u8> {
        self.lock().descriptor
    }
}

impl OneWireBus for SimulatedBus {
    type Error = SimBusError;
    type Descriptor = u8;

    fn init(&mut self, descriptor: u8) -> Result<(), SimBusError> {
        self.lock().descriptor = Some(descriptor);
        Ok(())
    }

    fn presence(&mut self) -> Result<bool, SimBusError> {
        let mut state = self.lock();
        state.presence_checks += 1;
        if state.pending_failures > 0 {
            state.pending_failures -= 1;
            return Err(SimBusError::NoResponse);
        }
        state.read_cursor = 0;
        Ok(state.token.is_some())
    }

    fn read_byte(&mut self) -> Result<u8, SimBusError> {
        let mut state = self.lock();
        let cursor = state.read_cursor;
        let byte = state
            .token
            .and_then(|token| token.get(cursor).copied())
            .unwrap_or(IDLE_BYTE);
        state.read_cursor = cursor + 1;
        Ok(byte)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), SimBusError> {
        self.lock().written.push(byte);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct IndicatorState {
    on: bool,
    set_count: u32,
    clear_count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedIndicator {
    state: Arc<Mutex<IndicatorState>>,
}

impl SimulatedIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, IndicatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_on(&self) -> bool {
        self.lock().on
    }

    pub fn set_count(&self) -> u32 {
        self.lock().set_count
    }

    pub fn clear_count(&self) -> u32 {
        self.lock().clear_count
    }
}

impl Indicator for SimulatedIndicator {
    fn set(&mut self) {
        let mut state = self.lock();
        state.on = true;
        state.set_count += 1;
    }

    fn clear(&mut self) {
        let mut state = self.lock();
        state.on = false;
        state.clear_count += 1;
    }
}
