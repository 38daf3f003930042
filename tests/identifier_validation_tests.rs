use ibutton::identifier::*;
use ibutton::DetectorError;

fn reference_frames() -> Vec<Identifier> {
    vec![
        Identifier::from_bytes([0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x0F]),
        Identifier::from_bytes([0x01, 0xA2, 0x3C, 0x55, 0x11, 0x00, 0x00, 0x12]),
        Identifier::from_bytes([0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x3D]),
        Identifier::from_bytes([0x02, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0xB2]),
    ]
}

#[test]
fn test_reference_frames_are_valid() {
    for id in reference_frames() {
        assert_eq!(validate(id.as_bytes()), Validity::Valid, "frame {}", id);
        assert_eq!(id.validity(), Validity::Valid);
        assert!(id.verify().is_ok());
    }
}

#[test]
fn test_any_single_bit_flip_in_body_is_invalid() {
    for id in reference_frames() {
        for byte in 0..IDENTIFIER_SIZE - 1 {
            for bit in 0..8 {
                let mut frame = *id.as_bytes();
                frame[byte] ^= 1 << bit;
                assert_eq!(
                    validate(&frame),
                    Validity::Invalid,
                    "flip of bit {} in byte {} of {} went undetected",
                    bit,
                    byte,
                    id
                );
            }
        }
    }
}

#[test]
fn test_every_wrong_check_byte_is_invalid() {
    let id = Identifier::with_check_byte(0x01, [0xA2, 0x3C, 0x55, 0x11, 0x00, 0x00]);
    let mut frame = *id.as_bytes();

    for check in 0..=u8::MAX {
        frame[IDENTIFIER_SIZE - 1] = check;
        let expected = if check == id.check_byte() {
            Validity::Valid
        } else {
            Validity::Invalid
        };
        assert_eq!(validate(&frame), expected);
    }
}

#[test]
fn test_mismatch_error_carries_values() {
    let frame = Identifier::from_bytes([0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0xEE]);
    match frame.verify() {
        Err(DetectorError::IdentifierCrcMismatch { expected, calculated }) => {
            assert_eq!(expected, 0xEE);
            assert_eq!(calculated, 0x0F);
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_malformed_lengths_are_invalid_not_errors() {
    for len in [0usize, 1, 7, 9, 16] {
        let frame = vec![0x01u8; len];
        assert_eq!(validate(&frame), Validity::Invalid);
    }
}
