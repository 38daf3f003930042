//! Shared module context.
//!
//! One context exists per physical bus. It is built once by
//! [`DetectorAgent::init`](crate::agent::DetectorAgent::init) and handed to
//! both the scheduler (timer context) and the report dispatcher (worker
//! context). The identifier snapshot has a single writer, the scheduler, and
//! is only read by the worker after a detection signal has been received.

use crate::config::DetectorConfig;
use crate::identifier::Identifier;
use crate::protocol::OutboundRecord;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

/// Receives every formatted outbound record.
pub type ReportCallback = Box<dyn Fn(&OutboundRecord) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub ticks: u32,
    pub presence_pulses: u32,
    pub spurious_reads: u32,
    pub crc_mismatches: u32,
    pub bus_errors: u32,
    pub detections: u32,
    pub signals_dropped: u32,
    pub records_emitted: u32,
}

#[derive(Debug, Default)]
pub struct ModuleStats {
    pub(crate) ticks: AtomicU32,
    pub(crate) presence_pulses: AtomicU32,
    pub(crate) spurious_reads: AtomicU32,
    pub(crate) crc_mismatches: AtomicU32,
    pub(crate) bus_errors: AtomicU32,
    pub(crate) detections: AtomicU32,
    pub(crate) signals_dropped: AtomicU32,
    pub(crate) records_emitted: AtomicU32,
}

impl ModuleStats {
    pub(crate) fn bump(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            presence_pulses: self.presence_pulses.load(Ordering::Relaxed),
            spurious_reads: self.spurious_reads.load(Ordering::Relaxed),
            crc_mismatches: self.crc_mismatches.load(Ordering::Relaxed),
            bus_errors: self.bus_errors.load(Ordering::Relaxed),
            detections: self.detections.load(Ordering::Relaxed),
            signals_dropped: self.signals_dropped.load(Ordering::Relaxed),
            records_emitted: self.records_emitted.load(Ordering::Relaxed),
        }
    }
}

pub struct ModuleContext {
    config: DetectorConfig,
    snapshot: Mutex<Identifier>,
    callback: ReportCallback,
    stats: ModuleStats,
}

impl ModuleContext {
    pub fn new(config: DetectorConfig, callback: ReportCallback) -> Self {
        Self {
            config,
            snapshot: Mutex::new(Identifier::default()),
            callback,
            stats: ModuleStats::default(),
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn module_id(&self) -> u8 {
        self.config.module_id
    }

    pub fn stats(&self) -> &ModuleStats {
        &self.stats
    }

    /// Most recently captured valid identifier.
    pub fn snapshot(&self) -> Identifier {
        // Identifier is plain bytes; a poisoned lock still holds a whole frame.
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn store_snapshot(&self, identifier: Identifier) {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = identifier;
    }

    pub(crate) fn emit(&self, record: &OutboundRecord) {
        (self.callback)(record);
        ModuleStats::bump(&self.stats.records_emitted);
    }
}

impl core::fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModuleContext")
            .field("config", &self.config)
            .field("snapshot", &self.snapshot())
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}
