//! Module bring-up and the host-facing handle.

use crate::bus::{Indicator, OneWireBus};
use crate::config::DetectorConfig;
use crate::context::{ModuleContext, StatsSnapshot};
use crate::dispatcher::{signal_channel, ReportDispatcher};
use crate::error::DetectorError;
use crate::protocol::{CommandHandler, CommandStatus, OutboundRecord};
use crate::scheduler::DetectionScheduler;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::info;

pub struct DetectorAgent;

impl DetectorAgent {
    /// Bring up the module on the current tokio runtime.
    ///
    /// Initializes the bus, clears the indicator, starts the report worker and
    /// then arms the first polling tick. `callback` receives every outbound
    /// detection record. Fails without arming anything if called outside a
    /// runtime or if the bus cannot be initialized.
    pub fn init<B, I, F>(
        mut bus: B,
        descriptor: B::Descriptor,
        mut indicator: I,
        config: DetectorConfig,
        callback: F,
    ) -> Result<AgentHandle, DetectorError>
    where
        B: OneWireBus + Send + 'static,
        I: Indicator + Send + 'static,
        F: Fn(&OutboundRecord) + Send + Sync + 'static,
    {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| DetectorError::WorkerUnavailable)?;

        bus.init(descriptor)
            .map_err(|e| DetectorError::BusTransient(format!("bus init failed: {:?}", e)))?;
        indicator.clear();

        let module_id = config.module_id;
        let polling_period_ms = config.polling_period_ms;
        let context = Arc::new(ModuleContext::new(config, Box::new(callback)));
        let (signal, signals) = signal_channel();

        let worker = runtime.spawn(ReportDispatcher::new(Arc::clone(&context), signals).run());

        let scheduler = DetectionScheduler::new(bus, indicator, Arc::clone(&context), signal);
        let countdown_ticks = scheduler.countdown_ticks();
        let ticker = runtime.spawn(scheduler.run());

        info!(
            "iButton module {} up: polling every {} ms, {} tick hold after detection",
            module_id, polling_period_ms, countdown_ticks
        );

        Ok(AgentHandle {
            context,
            commands: CommandHandler::new(module_id),
            ticker,
            worker,
        })
    }
}

/// Running module. Dropping the handle leaves both tasks running.
#[derive(Debug)]
pub struct AgentHandle {
    context: Arc<ModuleContext>,
    commands: CommandHandler,
    ticker: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl AgentHandle {
    /// Synchronous host query. `None` for an empty command buffer.
    pub fn handle_command(&self, command: &[u8]) -> Option<OutboundRecord> {
        self.commands.handle(command)
    }

    pub fn register_command<F>(&mut self, code: u8, handler: F) -> Result<(), DetectorError>
    where
        F: Fn(&[u8]) -> CommandStatus + Send + Sync + 'static,
    {
        self.commands.register(code, handler)
    }

    pub fn context(&self) -> &Arc<ModuleContext> {
        &self.context
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.context.stats().snapshot()
    }

    pub fn is_running(&self) -> bool {
        !self.ticker.is_finished() && !self.worker.is_finished()
    }

    /// Stop polling and reporting.
    pub fn shutdown(self) {
        self.ticker.abort();
        self.worker.abort();
        info!("iButton module {} stopped", self.context.module_id());
    }
}
