use thiserror::Error;

/// Failure conditions of the detection core.
///
/// Only `UnsupportedCommand` and `MalformedCommand` are ever visible to the
/// host. Detection-path conditions are folded into a tick outcome and retried
/// on the next scheduled tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectorError {
    /// No presence pulse, or the bus driver reported a failed transaction.
    #[error("bus transient: {0}")]
    BusTransient(String),

    /// Trailing check byte does not match the CRC-8 of the first seven bytes.
    #[error("identifier CRC mismatch: expected {expected:#04x}, calculated {calculated:#04x}")]
    IdentifierCrcMismatch { expected: u8, calculated: u8 },

    /// Command byte has no registered handler.
    #[error("unsupported command {0:#04x}")]
    UnsupportedCommand(u8),

    /// Empty command buffer; no reply is produced.
    #[error("malformed command: empty buffer")]
    MalformedCommand,

    #[error("command table full, cannot register {0:#04x}")]
    CommandTableFull(u8),

    #[error("configuration error: {0}")]
    Config(String),

    /// The report worker could not be started or has gone away.
    #[error("report worker unavailable")]
    WorkerUnavailable,
}

impl From<toml::de::Error> for DetectorError {
    fn from(e: toml::de::Error) -> Self {
        DetectorError::Config(e.to_string())
    }
}
