use ibutton::protocol::*;
use ibutton::sim::{SimulatedBus, SimulatedIndicator};
use ibutton::*;

const MODULE_ID: u8 = 30;

#[test]
fn test_empty_command_produces_no_reply() {
    let handler = CommandHandler::new(MODULE_ID);
    assert!(handler.handle(&[]).is_none());
    assert_eq!(handler.dispatch(&[]), Err(DetectorError::MalformedCommand));
}

#[test]
fn test_unknown_command_gets_error_reply() {
    let handler = CommandHandler::new(MODULE_ID);

    for code in [0x00u8, 0x01, 0x7F, 0xFF] {
        let reply = handler.handle(&[code]).expect("unsupported command must be answered");
        assert_eq!(reply.len(), 2);
        assert_eq!(reply.as_bytes(), &[MODULE_ID, 0]);
        assert!(reply.as_ack);
    }
}

#[test]
fn test_arguments_ignored_for_unknown_command() {
    let handler = CommandHandler::new(MODULE_ID);
    let reply = handler.handle(&[0x10, 0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
    assert_eq!(reply.as_bytes(), &[MODULE_ID, 0]);
}

#[test]
fn test_registered_command_receives_arguments() {
    let mut handler = CommandHandler::new(MODULE_ID);
    handler
        .register(0x01, |args| {
            if args == [0xAA, 0xBB] {
                CommandStatus::Ok
            } else {
                CommandStatus::Error
            }
        })
        .unwrap();

    assert!(handler.is_registered(0x01));
    assert_eq!(handler.handle(&[0x01, 0xAA, 0xBB]).unwrap().as_bytes(), &[MODULE_ID, 1]);
    assert_eq!(handler.handle(&[0x01]).unwrap().as_bytes(), &[MODULE_ID, 0]);
    // Other codes still fall through to the error reply
    assert_eq!(handler.handle(&[0x02]).unwrap().as_bytes(), &[MODULE_ID, 0]);
}

#[tokio::test]
async fn test_agent_handle_answers_commands() {
    let config = DetectorConfig {
        module_id: 0x2A,
        ..DetectorConfig::default()
    };
    let mut handle = DetectorAgent::init(
        SimulatedBus::new(),
        0,
        SimulatedIndicator::new(),
        config,
        |_: &OutboundRecord| {},
    )
    .unwrap();

    assert!(handle.handle_command(&[]).is_none());
    assert_eq!(handle.handle_command(&[0x09]).unwrap().as_bytes(), &[0x2A, 0]);

    handle.register_command(0x09, |_| CommandStatus::Ok).unwrap();
    assert_eq!(handle.handle_command(&[0x09]).unwrap().as_bytes(), &[0x2A, 1]);

    // Commands never touch detection state
    assert_eq!(handle.stats().detections, 0);
    handle.shutdown();
}
