//! Hand-off from the polling timer to the reporting worker.
//!
//! The channel holds at most one pending signal. `signal()` never blocks: if a
//! signal is already outstanding the new one is dropped, so a burst of
//! detections before the worker wakes produces a single record.

use crate::context::ModuleContext;
use crate::protocol::OutboundRecord;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

const SIGNAL_CAPACITY: usize = 1;

/// Create the single-slot signal pair.
pub fn signal_channel() -> (DetectionSignal, mpsc::Receiver<()>) {
    let (tx, rx) = mpsc::channel(SIGNAL_CAPACITY);
    (DetectionSignal { tx }, rx)
}

/// Sending half, owned by the scheduler.
#[derive(Debug, Clone)]
pub struct DetectionSignal {
    tx: mpsc::Sender<()>,
}

impl DetectionSignal {
    /// Raise a pending detection. Returns `false` if the signal was dropped.
    pub fn signal(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                debug!("Detection signal already pending, coalesced");
                false
            }
            Err(TrySendError::Closed(())) => {
                warn!("Report worker gone, detection signal dropped");
                false
            }
        }
    }
}

/// Worker side: waits for a signal, formats the snapshot, calls back.
#[derive(Debug)]
pub struct ReportDispatcher {
    context: Arc<ModuleContext>,
    signals: mpsc::Receiver<()>,
}

impl ReportDispatcher {
    pub fn new(context: Arc<ModuleContext>, signals: mpsc::Receiver<()>) -> Self {
        Self { context, signals }
    }

    /// Worker loop. Only returns once every signal sender has been dropped.
    pub async fn run(mut self) {
        while self.signals.recv().await.is_some() {
            self.dispatch();
        }
        debug!("Detection signal channel closed, report worker exiting");
    }

    /// Build the detection record from the current snapshot and emit it.
    pub fn dispatch(&self) -> OutboundRecord {
        let identifier = self.context.snapshot();
        let record = OutboundRecord::detection(self.context.module_id(), &identifier);

        info!("i-Button detected, ID {}", identifier);

        self.context.emit(&record);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectorConfig;
    use crate::identifier::Identifier;
    use std::sync::Mutex;

    fn context_with_sink() -> (Arc<ModuleContext>, Arc<Mutex<Vec<OutboundRecord>>>) {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let sink_clone = Arc::clone(&sink);
        let context = Arc::new(ModuleContext::new(
            DetectorConfig::default(),
            Box::new(move |record: &OutboundRecord| sink_clone.lock().unwrap().push(record.clone())),
        ));
        (context, sink)
    }

    #[test]
    fn test_second_signal_coalesced() {
        let (signal, mut rx) = signal_channel();
        assert!(signal.signal());
        assert!(!signal.signal());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
        assert!(signal.signal());
    }

    #[test]
    fn test_signal_after_worker_dropped() {
        let (signal, rx) = signal_channel();
        drop(rx);
        assert!(!signal.signal());
    }

    #[test]
    fn test_dispatch_reads_snapshot() {
        let (context, sink) = context_with_sink();
        let id = Identifier::with_check_byte(0x01, [1, 2, 3, 4, 5, 6]);
        context.store_snapshot(id);

        let (_signal, rx) = signal_channel();
        let dispatcher = ReportDispatcher::new(Arc::clone(&context), rx);
        let record = dispatcher.dispatch();

        assert_eq!(record.payload(), id.as_bytes());
        assert!(!record.as_ack);
        assert_eq!(sink.lock().unwrap().len(), 1);
        assert_eq!(context.stats().snapshot().records_emitted, 1);
    }

    #[tokio::test]
    async fn test_worker_exits_when_senders_dropped() {
        let (context, sink) = context_with_sink();
        let (signal, rx) = signal_channel();
        let worker = tokio::spawn(ReportDispatcher::new(context, rx).run());

        assert!(signal.signal());
        drop(signal);
        worker.await.unwrap();

        assert_eq!(sink.lock().unwrap().len(), 1);
    }
}
