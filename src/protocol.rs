//! Outbound record layout and the synchronous command handler.
//!
//! Every record starts with the module identity tag. An unsolicited detection
//! carries the eight identifier bytes in bus read order; a command reply
//! carries a single status byte.

use crate::error::DetectorError;
use crate::identifier::{Identifier, IDENTIFIER_SIZE};
use heapless::Vec;
use static_assertions::const_assert;
use tracing::{debug, warn};

pub const RECORD_CAPACITY: usize = 32;
pub const MAX_COMMANDS: usize = 16;

const_assert!(RECORD_CAPACITY >= 1 + IDENTIFIER_SIZE);

pub type RecordBuffer = Vec<u8, RECORD_CAPACITY>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandStatus {
    Error = 0,
    Ok = 1,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRecord {
    data: RecordBuffer,
    /// `true` for a reply to a host command, `false` for an unsolicited event
    pub as_ack: bool,
}

impl OutboundRecord {
    /// Unsolicited detection: `[module_id, id[0], .., id[7]]`.
    pub fn detection(module_id: u8, identifier: &Identifier) -> Self {
        let mut data = RecordBuffer::new();
        // Capacity is pinned above tag + frame by the const assertion.
        let _ = data.push(module_id);
        let _ = data.extend_from_slice(identifier.as_bytes());
        Self { data, as_ack: false }
    }

    /// Command reply: `[module_id, status]`.
    pub fn reply(module_id: u8, status: CommandStatus) -> Self {
        let mut data = RecordBuffer::new();
        let _ = data.push(module_id);
        let _ = data.push(status as u8);
        Self { data, as_ack: true }
    }

    pub fn reply_ok(module_id: u8) -> Self {
        Self::reply(module_id, CommandStatus::Ok)
    }

    pub fn reply_error(module_id: u8) -> Self {
        Self::reply(module_id, CommandStatus::Error)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn module_id(&self) -> Option<u8> {
        self.data.first().copied()
    }

    pub fn payload(&self) -> &[u8] {
        self.data.get(1..).unwrap_or(&[])
    }
}

/// Handler for one command code; receives the argument bytes after the code.
pub type CommandFn = Box<dyn Fn(&[u8]) -> CommandStatus + Send + Sync>;

/// Table of host commands keyed by command byte.
///
/// Codes without an entry are answered with an error reply. The handler holds
/// no detection state and may be called from any context.
pub struct CommandHandler {
    module_id: u8,
    commands: Vec<(u8, CommandFn), MAX_COMMANDS>,
}

impl CommandHandler {
    pub fn new(module_id: u8) -> Self {
        Self {
            module_id,
            commands: Vec::new(),
        }
    }

    pub fn module_id(&self) -> u8 {
        self.module_id
    }

    /// Add or replace the handler for `code`.
    pub fn register<F>(&mut self, code: u8, handler: F) -> Result<(), DetectorError>
    where
        F: Fn(&[u8]) -> CommandStatus + Send + Sync + 'static,
    {
        let handler: CommandFn = Box::new(handler);
        if let Some(entry) = self.commands.iter_mut().find(|(c, _)| *c == code) {
            entry.1 = handler;
            return Ok(());
        }
        self.commands
            .push((code, handler))
            .map_err(|_| DetectorError::CommandTableFull(code))
    }

    pub fn is_registered(&self, code: u8) -> bool {
        self.commands.iter().any(|(c, _)| *c == code)
    }

    /// Classify and run a command without building the reply.
    pub fn dispatch(&self, command: &[u8]) -> Result<CommandStatus, DetectorError> {
        let (&code, args) = command.split_first().ok_or(DetectorError::MalformedCommand)?;

        match self.commands.iter().find(|(c, _)| *c == code) {
            Some((_, handler)) => Ok(handler(args)),
            None => Err(DetectorError::UnsupportedCommand(code)),
        }
    }

    /// Handle a host command. `None` means no reply is produced (empty input).
    pub fn handle(&self, command: &[u8]) -> Option<OutboundRecord> {
        match self.dispatch(command) {
            Ok(status) => {
                debug!("Command {:#04x} -> {:?}", command[0], status);
                Some(OutboundRecord::reply(self.module_id, status))
            }
            Err(DetectorError::UnsupportedCommand(code)) => {
                debug!("Unsupported command {:#04x}", code);
                Some(OutboundRecord::reply_error(self.module_id))
            }
            Err(e) => {
                warn!("Command rejected: {}", e);
                None
            }
        }
    }
}

impl core::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let codes: Vec<u8, MAX_COMMANDS> = self.commands.iter().map(|(c, _)| *c).collect();
        f.debug_struct("CommandHandler")
            .field("module_id", &self.module_id)
            .field("commands", &codes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_record_layout() {
        let id = Identifier::from_bytes([0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x0F]);
        let record = OutboundRecord::detection(30, &id);
        assert_eq!(record.as_bytes(), &[30, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x0F]);
        assert_eq!(record.len(), 9);
        assert!(!record.as_ack);
        assert_eq!(record.module_id(), Some(30));
        assert_eq!(record.payload(), id.as_bytes());
    }

    #[test]
    fn test_canned_replies() {
        let ok = OutboundRecord::reply_ok(7);
        assert_eq!(ok.as_bytes(), &[7, 1]);
        assert!(ok.as_ack);

        let err = OutboundRecord::reply_error(7);
        assert_eq!(err.as_bytes(), &[7, 0]);
        assert!(err.as_ack);
    }

    #[test]
    fn test_dispatch_classification() {
        let handler = CommandHandler::new(30);
        assert_eq!(handler.dispatch(&[]), Err(DetectorError::MalformedCommand));
        assert_eq!(handler.dispatch(&[0x42]), Err(DetectorError::UnsupportedCommand(0x42)));
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut handler = CommandHandler::new(30);
        handler.register(0x01, |_| CommandStatus::Error).unwrap();
        handler.register(0x01, |_| CommandStatus::Ok).unwrap();
        assert_eq!(handler.dispatch(&[0x01]), Ok(CommandStatus::Ok));
    }

    #[test]
    fn test_table_full() {
        let mut handler = CommandHandler::new(30);
        for code in 0..MAX_COMMANDS as u8 {
            handler.register(code, |_| CommandStatus::Ok).unwrap();
        }
        let result = handler.register(0xFF, |_| CommandStatus::Ok);
        assert_eq!(result, Err(DetectorError::CommandTableFull(0xFF)));
    }
}
