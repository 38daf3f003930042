//! # iButton Presence Detector
//!
//! Presence-detection and reporting core for a battery-powered peripheral that
//! watches a single-wire bus for a contact token, validates its 64-bit ROM
//! identifier and reports each touch exactly once.
//!
//! ## Features
//!
//! - **Periodic polling**: presence check on a fixed cadence, driven by a tokio interval
//! - **Debounce window**: indicator held and polling suspended for the grant period after a detection
//! - **CRC-8 validation**: Dallas/Maxim 1-Wire ROM check byte
//! - **Single-slot hand-off**: at most one detection pending for the reporting worker
//! - **Host commands**: synchronous request/reply with a per-code dispatch table
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ibutton::{DetectorAgent, DetectorConfig, OutboundRecord};
//! use ibutton::sim::{SimulatedBus, SimulatedIndicator};
//!
//! # async fn run() -> Result<(), ibutton::DetectorError> {
//! let handle = DetectorAgent::init(
//!     SimulatedBus::new(),
//!     0,
//!     SimulatedIndicator::new(),
//!     DetectorConfig::default(),
//!     |record: &OutboundRecord| println!("record: {:02X?}", record.as_bytes()),
//! )?;
//!
//! // Host query with an unknown command code gets an error reply
//! let reply = handle.handle_command(&[0x7F]);
//! assert_eq!(reply.map(|r| r.as_bytes().to_vec()), Some(vec![30, 0]));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`identifier`] - Identifier frame and CRC-8 validation
//! - [`bus`] - Bus and indicator traits the core drives
//! - [`scheduler`] - Per-tick polling and suppression state machine
//! - [`dispatcher`] - Single-slot signal and reporting worker
//! - [`protocol`] - Outbound record layout and command handler
//! - [`agent`] - Initialization and the host-facing handle
//! - [`sim`] - Simulated bus and indicator

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod agent;
pub mod bus;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod identifier;
pub mod protocol;
pub mod scheduler;
pub mod sim;

// Re-export main public types for convenience
pub use agent::{AgentHandle, DetectorAgent};
pub use bus::{Indicator, OneWireBus};
pub use config::DetectorConfig;
pub use error::DetectorError;
pub use identifier::{validate, Identifier, Validity};
pub use protocol::{CommandHandler, CommandStatus, OutboundRecord};
pub use scheduler::{DetectionScheduler, TickOutcome};
