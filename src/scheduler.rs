//! Periodic presence polling with a post-detection refractory window.
//!
//! Each tick either counts down the suppression window (indicator on, bus
//! untouched) or polls the bus for a token. A valid read stores the
//! identifier snapshot, lights the indicator, starts the countdown and raises
//! one detection signal. Nothing in a tick is fatal; the caller re-arms the
//! timer unconditionally.

use crate::bus::{Indicator, OneWireBus, READ_ROM};
use crate::context::{ModuleContext, ModuleStats};
use crate::dispatcher::DetectionSignal;
use crate::error::DetectorError;
use crate::identifier::{Identifier, IDENTIFIER_SIZE};
use std::sync::Arc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Polling,
    /// Indicator on; `remaining` ticks until polling resumes.
    Suppressing { remaining: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    NoPresence,
    /// Presence check or frame read failed; same as no presence.
    BusError,
    /// Family code zero: incomplete or glitched read.
    Spurious,
    CrcMismatch,
    Detected { identifier: Identifier, signalled: bool },
    Suppressed { remaining: u32 },
    /// Countdown reached zero, indicator cleared.
    Released,
}

pub struct DetectionScheduler<B: OneWireBus, I: Indicator> {
    bus: B,
    indicator: I,
    context: Arc<ModuleContext>,
    signal: DetectionSignal,
    state: SchedulerState,
    countdown_ticks: u32,
}

impl<B: OneWireBus, I: Indicator> DetectionScheduler<B, I> {
    pub fn new(bus: B, indicator: I, context: Arc<ModuleContext>, signal: DetectionSignal) -> Self {
        let countdown_ticks = context.config().countdown_ticks();
        Self {
            bus,
            indicator,
            context,
            signal,
            state: SchedulerState::Polling,
            countdown_ticks,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_suppressing(&self) -> bool {
        matches!(self.state, SchedulerState::Suppressing { .. })
    }

    pub fn countdown_ticks(&self) -> u32 {
        self.countdown_ticks
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    /// One timer expiry. Never blocks beyond a single bus transaction.
    pub fn tick(&mut self) -> TickOutcome {
        ModuleStats::bump(&self.context.stats().ticks);

        match self.state {
            SchedulerState::Suppressing { remaining } => self.count_down(remaining),
            SchedulerState::Polling => self.poll(),
        }
    }

    /// Drive `tick` forever on the configured polling period.
    ///
    /// The first tick fires one period after the call, and every tick is
    /// followed by the next regardless of its outcome.
    pub async fn run(mut self) {
        let period = self.context.config().polling_period();
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let outcome = self.tick();
            debug!("Tick outcome: {:?}", outcome);
        }
    }

    fn count_down(&mut self, remaining: u32) -> TickOutcome {
        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            self.indicator.clear();
            self.state = SchedulerState::Polling;
            debug!("Suppression window over, resuming polling");
            TickOutcome::Released
        } else {
            self.state = SchedulerState::Suppressing { remaining };
            TickOutcome::Suppressed { remaining }
        }
    }

    fn poll(&mut self) -> TickOutcome {
        let context = Arc::clone(&self.context);
        let stats = context.stats();

        match self.bus.presence() {
            Ok(true) => ModuleStats::bump(&stats.presence_pulses),
            Ok(false) => return TickOutcome::NoPresence,
            Err(e) => {
                ModuleStats::bump(&stats.bus_errors);
                debug!("Presence check failed: {:?}", e);
                return TickOutcome::BusError;
            }
        }

        let identifier = match self.read_identifier() {
            Ok(identifier) => identifier,
            Err(e) => {
                ModuleStats::bump(&stats.bus_errors);
                debug!("{}", e);
                return TickOutcome::BusError;
            }
        };

        if !identifier.is_present() {
            ModuleStats::bump(&stats.spurious_reads);
            debug!("Zero family code, discarding read");
            return TickOutcome::Spurious;
        }

        if let Err(e) = identifier.verify() {
            ModuleStats::bump(&stats.crc_mismatches);
            warn!("Discarding identifier {}: {}", identifier, e);
            return TickOutcome::CrcMismatch;
        }

        // Snapshot must be complete before the signal is raised.
        context.store_snapshot(identifier);
        self.indicator.set();
        self.state = SchedulerState::Suppressing {
            remaining: self.countdown_ticks,
        };
        ModuleStats::bump(&stats.detections);

        let signalled = self.signal.signal();
        if !signalled {
            ModuleStats::bump(&stats.signals_dropped);
        }
        info!(
            "Token {} accepted, holding indicator for {} ticks",
            identifier, self.countdown_ticks
        );

        TickOutcome::Detected { identifier, signalled }
    }

    fn read_identifier(&mut self) -> Result<Identifier, DetectorError> {
        let transient = |e: B::Error| DetectorError::BusTransient(format!("{:?}", e));

        self.bus.write_byte(READ_ROM).map_err(transient)?;

        let mut bytes = [0u8; IDENTIFIER_SIZE];
        for byte in &mut bytes {
            *byte = self.bus.read_byte().map_err(transient)?;
        }
        Ok(Identifier::from_bytes(bytes))
    }
}

impl<B: OneWireBus, I: Indicator> core::fmt::Debug for DetectionScheduler<B, I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DetectionScheduler")
            .field("state", &self.state)
            .field("countdown_ticks", &self.countdown_ticks)
            .finish_non_exhaustive()
    }
}
