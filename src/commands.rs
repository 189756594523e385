//! Command catalog: one encode/decode pair per device operation.
//!
//! Encode functions build the full wire frame with a zero checksum
//! placeholder; the connection task stamps the checksum just before the
//! bytes hit the transport. Decode functions take the validated response
//! frame delivered by the router.

use crate::error::R2000Error;
use crate::frame::{ETX1, ETX2, Frame, HEAD};
use crate::types::{BaudRate, FilterType, PowerOption, Tag, TagInfo, WriteTagResult, bytes_to_hex};

// Command codes
const CMD_SET_POWER: u8 = 0x00;
const CMD_SET_GPIO: u8 = 0x01;
const CMD_SET_ANTS: u8 = 0x08;
const CMD_HARDWARE_VERSION: u8 = 0x0A;
const CMD_FIRMWARE_VERSION: u8 = 0x0B;
const CMD_GET_POWER: u8 = 0x0C;
const CMD_GET_ANTS: u8 = 0x10;
const CMD_QUERY_TAG: u8 = 0x16;
const CMD_START_INVENTORY: u8 = 0x17;
const CMD_STOP_INVENTORY: u8 = 0x18;
const CMD_QUERY_TAG_FILTERED: u8 = 0x19;
const CMD_WRITE_TAG: u8 = 0x1A;
const CMD_SET_BAUD_RATE: u8 = 0x23;
const CMD_SET_AUTO_READ: u8 = 0x24;
const CMD_SET_HEARTBEAT: u8 = 0x30;
const CMD_GET_HEARTBEAT: u8 = 0x31;
const CMD_GET_GPIO: u8 = 0x33;

// Response codes (command code | 0x80)
pub(crate) const RESP_SET_POWER: u8 = 0x80;
pub(crate) const RESP_SET_GPIO: u8 = 0x81;
pub(crate) const RESP_SET_ANTS: u8 = 0x88;
pub(crate) const RESP_HARDWARE_VERSION: u8 = 0x8A;
pub(crate) const RESP_FIRMWARE_VERSION: u8 = 0x8B;
pub(crate) const RESP_GET_POWER: u8 = 0x8C;
pub(crate) const RESP_GET_ANTS: u8 = 0x90;
pub(crate) const RESP_QUERY_TAG: u8 = 0x96;
pub(crate) const RESP_INVENTORY_TAG: u8 = 0x97;
pub(crate) const RESP_STOP_INVENTORY: u8 = 0x98;
pub(crate) const RESP_QUERY_TAG_FILTERED: u8 = 0x99;
pub(crate) const RESP_WRITE_TAG: u8 = 0x9A;
pub(crate) const RESP_SET_BAUD_RATE: u8 = 0xA3;
pub(crate) const RESP_SET_AUTO_READ: u8 = 0xA4;
pub(crate) const RESP_SET_HEARTBEAT: u8 = 0xB0;
pub(crate) const RESP_GET_HEARTBEAT: u8 = 0xB1;
pub(crate) const RESP_GET_GPIO: u8 = 0xB3;

/// Minimum length of a tag report frame (matches the assembler's bypass gate)
const MIN_TAG_REPORT_LEN: usize = 23;

/// Build `[HEAD][code][len][payload][0x00][ETX1][ETX2]` with the checksum
/// slot left for the connection task to stamp.
fn command_frame(code: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 6);
    frame.push(HEAD);
    frame.push(code);
    frame.push(payload.len() as u8);
    frame.extend_from_slice(payload);
    frame.push(0x00);
    frame.push(ETX1);
    frame.push(ETX2);
    frame
}

/// Variable-length payloads must fit the single length byte.
fn checked_frame(code: u8, payload: &[u8]) -> Result<Vec<u8>, R2000Error> {
    if payload.len() > u8::MAX as usize {
        return Err(R2000Error::InvalidParameter(format!(
            "Command payload of {} bytes exceeds the 255-byte frame limit",
            payload.len()
        )));
    }
    Ok(command_frame(code, payload))
}

fn require_len(frame: &Frame, min: usize, what: &str) -> Result<(), R2000Error> {
    if frame.len() < min {
        return Err(R2000Error::InvalidResponse(format!(
            "{} response too short ({} bytes)",
            what,
            frame.len()
        )));
    }
    Ok(())
}

/// Success-flag decode shared by the set-style operations: byte 3 is 1 on
/// success, anything else is a device rejection.
fn success_flag(frame: &Frame, what: &str) -> Result<(), R2000Error> {
    require_len(frame, 7, what)?;
    if frame.byte(3) == 1 {
        Ok(())
    } else {
        Err(R2000Error::InvalidResponse(format!("Failed to {}", what)))
    }
}

/// Access password + filter descriptor + bank/address/length fields shared
/// by the filtered query and write operations.
fn filter_payload(
    password: &[u8],
    filter_type: FilterType,
    filter_data: Option<&[u8]>,
    bank: u8,
    start_addr: u16,
    data_len: u16,
) -> Result<Vec<u8>, R2000Error> {
    if password.len() != 4 {
        return Err(R2000Error::InvalidParameter(format!(
            "Access password must be exactly 4 bytes, got {}",
            password.len()
        )));
    }
    let filter = filter_data.unwrap_or(&[]);
    let mut payload = Vec::with_capacity(12 + filter.len());
    payload.extend_from_slice(password);
    payload.push(filter_type as u8);
    // Filter length must be zero when unfiltered.
    payload.extend_from_slice(&(filter.len() as u16).to_be_bytes());
    payload.extend_from_slice(filter);
    payload.push(bank);
    payload.extend_from_slice(&start_addr.to_be_bytes());
    payload.extend_from_slice(&data_len.to_be_bytes());
    Ok(payload)
}

// ========================================================================
// Antennas
// ========================================================================

pub(crate) fn encode_set_antennas(ants: &[bool; 8]) -> Vec<u8> {
    let mut mask = 0u8;
    for (bit, on) in ants.iter().enumerate() {
        if *on {
            mask |= 1 << bit;
        }
    }
    command_frame(CMD_SET_ANTS, &[mask])
}

pub(crate) fn decode_set_antennas(frame: &Frame) -> Result<(), R2000Error> {
    success_flag(frame, "set antennas")
}

pub(crate) fn encode_get_antennas() -> Vec<u8> {
    command_frame(CMD_GET_ANTS, &[])
}

/// An all-zero bitmask is a failure, never an all-off answer.
pub(crate) fn decode_get_antennas(frame: &Frame) -> Result<[bool; 8], R2000Error> {
    require_len(frame, 7, "get antennas")?;
    let mask = frame.byte(3);
    if mask == 0 {
        return Err(R2000Error::InvalidResponse(
            "Antenna bitmask is zero".into(),
        ));
    }
    let mut ants = [false; 8];
    for (bit, ant) in ants.iter_mut().enumerate() {
        *ant = mask & (1 << bit) != 0;
    }
    Ok(ants)
}

// ========================================================================
// Power
// ========================================================================

pub(crate) fn encode_set_power(write_power: u8, read_power: u8, is_loop: bool) -> Vec<u8> {
    let loop_flag = if is_loop { 0x00 } else { 0x01 };
    command_frame(CMD_SET_POWER, &[loop_flag, read_power, write_power])
}

pub(crate) fn decode_set_power(frame: &Frame) -> Result<(), R2000Error> {
    success_flag(frame, "set power")
}

pub(crate) fn encode_get_power() -> Vec<u8> {
    command_frame(CMD_GET_POWER, &[])
}

pub(crate) fn decode_get_power(frame: &Frame) -> Result<PowerOption, R2000Error> {
    require_len(frame, 9, "get power")?;
    Ok(PowerOption {
        is_loop: frame.byte(3) == 0x00,
        read_power: frame.byte(4),
        write_power: frame.byte(5),
    })
}

// ========================================================================
// GPIO (not supported by the R2000 hardware revision)
// ========================================================================

pub(crate) fn encode_set_gpio(gpios: &[bool; 8]) -> Vec<u8> {
    let mut state = 0u8;
    for (bit, on) in gpios.iter().enumerate() {
        if *on {
            state |= 1 << bit;
        }
    }
    // first byte addresses the pins, second carries their states
    command_frame(CMD_SET_GPIO, &[0xFF, state])
}

pub(crate) fn decode_set_gpio(frame: &Frame) -> Result<(), R2000Error> {
    success_flag(frame, "set GPIO")
}

pub(crate) fn encode_get_gpio() -> Vec<u8> {
    command_frame(CMD_GET_GPIO, &[0x0F])
}

pub(crate) fn decode_get_gpio(frame: &Frame) -> Result<[bool; 8], R2000Error> {
    require_len(frame, 9, "get GPIO")?;
    if frame.byte(3) != 1 {
        return Err(R2000Error::InvalidResponse("Failed to get GPIO".into()));
    }
    let mask = frame.byte(5);
    let mut gpios = [false; 8];
    for (bit, gpio) in gpios.iter_mut().enumerate() {
        *gpio = mask & (1 << bit) != 0;
    }
    Ok(gpios)
}

// ========================================================================
// Versions
// ========================================================================

pub(crate) fn encode_hardware_version() -> Vec<u8> {
    command_frame(CMD_HARDWARE_VERSION, &[])
}

pub(crate) fn decode_hardware_version(frame: &Frame) -> Result<String, R2000Error> {
    decode_version(frame, "hardware version")
}

pub(crate) fn encode_firmware_version() -> Vec<u8> {
    command_frame(CMD_FIRMWARE_VERSION, &[])
}

pub(crate) fn decode_firmware_version(frame: &Frame) -> Result<String, R2000Error> {
    decode_version(frame, "firmware version")
}

fn decode_version(frame: &Frame, what: &str) -> Result<String, R2000Error> {
    require_len(frame, 9, what)?;
    Ok(format!(
        "V{}.{}.{}",
        frame.byte(3),
        frame.byte(4),
        frame.byte(5)
    ))
}

// ========================================================================
// Tag operations
// ========================================================================

pub(crate) fn encode_query_tag() -> Vec<u8> {
    command_frame(CMD_QUERY_TAG, &[])
}

pub(crate) fn encode_query_tag_filtered(
    password: &[u8],
    filter_type: FilterType,
    filter_data: Option<&[u8]>,
    bank: u8,
    start_addr: u16,
    data_len: u16,
) -> Result<Vec<u8>, R2000Error> {
    let payload = filter_payload(password, filter_type, filter_data, bank, start_addr, data_len)?;
    checked_frame(CMD_QUERY_TAG_FILTERED, &payload)
}

pub(crate) fn decode_query_tag_filtered(frame: &Frame) -> Result<TagInfo, R2000Error> {
    require_len(frame, 9, "filtered tag query")?;
    if frame.byte(3) == 0 {
        return Err(R2000Error::InvalidResponse(
            "No tag matched the filter".into(),
        ));
    }
    let len = frame.len();
    Ok(TagInfo {
        epc: bytes_to_hex(&frame.as_bytes()[4..len - 4]),
        ant: frame.byte(len - 4),
    })
}

pub(crate) fn encode_write_tag(
    password: &[u8],
    filter_type: FilterType,
    filter_data: Option<&[u8]>,
    bank: u8,
    start_addr: u16,
    data: &[u8],
) -> Result<Vec<u8>, R2000Error> {
    let mut payload = filter_payload(
        password,
        filter_type,
        filter_data,
        bank,
        start_addr,
        data.len() as u16,
    )?;
    payload.extend_from_slice(data);
    checked_frame(CMD_WRITE_TAG, &payload)
}

pub(crate) fn decode_write_tag(frame: &Frame) -> Result<WriteTagResult, R2000Error> {
    require_len(frame, 8, "write tag")?;
    if frame.byte(3) == 0 {
        return Err(R2000Error::InvalidResponse("Failed to write tag".into()));
    }
    Ok(WriteTagResult {
        ant: frame.byte(4),
        is_success: frame.byte(3) == 1,
    })
}

/// Decode a tag report frame (single query or inventory stream).
///
/// The signal strength arrives as an inverted magnitude; the transform,
/// including the `| 1` step, must match the device calibration bit-for-bit.
pub(crate) fn decode_tag(frame: &Frame) -> Result<Tag, R2000Error> {
    require_len(frame, MIN_TAG_REPORT_LEN, "tag report")?;
    let len = frame.len();
    let raw = u16::from_be_bytes([frame.byte(len - 6), frame.byte(len - 5)]);
    Ok(Tag {
        epc: bytes_to_hex(&frame.as_bytes()[5..len - 6]),
        pc: frame.byte(3) as u16,
        ant: frame.byte(len - 4),
        rssi: (!raw | 1) as f32 / 10.0,
    })
}

// ========================================================================
// Configuration
// ========================================================================

pub(crate) fn encode_set_baud_rate(rate: BaudRate) -> Vec<u8> {
    command_frame(CMD_SET_BAUD_RATE, &[rate as u8])
}

pub(crate) fn decode_set_baud_rate(frame: &Frame) -> Result<(), R2000Error> {
    success_flag(frame, "set baud rate")
}

pub(crate) fn encode_set_auto_read(enabled: bool) -> Vec<u8> {
    command_frame(CMD_SET_AUTO_READ, &[if enabled { 0x01 } else { 0x00 }])
}

pub(crate) fn decode_set_auto_read(frame: &Frame) -> Result<(), R2000Error> {
    success_flag(frame, "set auto read")
}

pub(crate) fn encode_set_heartbeat(interval: u8) -> Vec<u8> {
    command_frame(CMD_SET_HEARTBEAT, &[interval])
}

pub(crate) fn decode_set_heartbeat(frame: &Frame) -> Result<(), R2000Error> {
    success_flag(frame, "set heartbeat")
}

pub(crate) fn encode_get_heartbeat() -> Vec<u8> {
    command_frame(CMD_GET_HEARTBEAT, &[])
}

pub(crate) fn decode_get_heartbeat(frame: &Frame) -> Result<u8, R2000Error> {
    require_len(frame, 8, "get heartbeat")?;
    if frame.byte(3) != 1 {
        return Err(R2000Error::InvalidResponse(
            "Failed to get heartbeat".into(),
        ));
    }
    Ok(frame.byte(4))
}

// ========================================================================
// Inventory
// ========================================================================

pub(crate) fn encode_start_inventory() -> Vec<u8> {
    command_frame(CMD_START_INVENTORY, &[0x00, 0x00])
}

pub(crate) fn encode_stop_inventory() -> Vec<u8> {
    command_frame(CMD_STOP_INVENTORY, &[])
}

pub(crate) fn decode_stop_inventory(frame: &Frame) -> Result<(), R2000Error> {
    success_flag(frame, "stop inventory")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum;

    fn response(bytes: &[u8]) -> Frame {
        Frame::from_bytes(bytes.to_vec())
    }

    // ===================
    // encode tests
    // ===================

    #[test]
    fn encode_set_antennas_bitmask() {
        let mut ants = [false; 8];
        ants[0] = true;
        ants[1] = true;
        let bytes = encode_set_antennas(&ants);
        assert_eq!(bytes, [0xBB, 0x08, 0x01, 0x03, 0x00, 0x0D, 0x0A]);

        let mut bytes = bytes;
        checksum::stamp(&mut bytes);
        assert_eq!(bytes[4], 0x0C);
    }

    #[test]
    fn encode_set_antennas_high_bit() {
        let mut ants = [false; 8];
        ants[7] = true;
        let bytes = encode_set_antennas(&ants);
        assert_eq!(bytes[3], 0x80);
    }

    #[test]
    fn encode_get_antennas_frame() {
        assert_eq!(encode_get_antennas(), [0xBB, 0x10, 0x00, 0x00, 0x0D, 0x0A]);
    }

    #[test]
    fn encode_set_power_loop_flag() {
        let bytes = encode_set_power(30, 30, true);
        assert_eq!(bytes, [0xBB, 0x00, 0x03, 0x00, 0x1E, 0x1E, 0x00, 0x0D, 0x0A]);

        let bytes = encode_set_power(20, 25, false);
        assert_eq!(bytes[3], 0x01);
        assert_eq!(bytes[4], 25); // read power
        assert_eq!(bytes[5], 20); // write power
    }

    #[test]
    fn encode_get_power_frame() {
        assert_eq!(encode_get_power(), [0xBB, 0x0C, 0x00, 0x00, 0x0D, 0x0A]);
    }

    #[test]
    fn encode_version_frames() {
        assert_eq!(
            encode_hardware_version(),
            [0xBB, 0x0A, 0x00, 0x00, 0x0D, 0x0A]
        );
        assert_eq!(
            encode_firmware_version(),
            [0xBB, 0x0B, 0x00, 0x00, 0x0D, 0x0A]
        );
    }

    #[test]
    fn encode_query_tag_frame() {
        assert_eq!(encode_query_tag(), [0xBB, 0x16, 0x00, 0x00, 0x0D, 0x0A]);
    }

    #[test]
    fn encode_start_inventory_frame() {
        assert_eq!(
            encode_start_inventory(),
            [0xBB, 0x17, 0x02, 0x00, 0x00, 0x00, 0x0D, 0x0A]
        );
    }

    #[test]
    fn encode_stop_inventory_frame() {
        assert_eq!(
            encode_stop_inventory(),
            [0xBB, 0x18, 0x00, 0x00, 0x0D, 0x0A]
        );
    }

    #[test]
    fn encode_set_baud_rate_index() {
        let bytes = encode_set_baud_rate(BaudRate::B115200);
        assert_eq!(bytes, [0xBB, 0x23, 0x01, 0x04, 0x00, 0x0D, 0x0A]);
        assert_eq!(encode_set_baud_rate(BaudRate::B9600)[3], 0x00);
    }

    #[test]
    fn encode_set_auto_read_flag() {
        assert_eq!(
            encode_set_auto_read(true),
            [0xBB, 0x24, 0x01, 0x01, 0x00, 0x0D, 0x0A]
        );
        assert_eq!(encode_set_auto_read(false)[3], 0x00);
    }

    #[test]
    fn encode_heartbeat_frames() {
        assert_eq!(
            encode_set_heartbeat(10),
            [0xBB, 0x30, 0x01, 0x0A, 0x00, 0x0D, 0x0A]
        );
        assert_eq!(
            encode_get_heartbeat(),
            [0xBB, 0x31, 0x00, 0x00, 0x0D, 0x0A]
        );
    }

    #[test]
    fn encode_query_filtered_payload_layout() {
        let bytes = encode_query_tag_filtered(
            &[0x00, 0x00, 0x00, 0x00],
            FilterType::Epc,
            Some(&[0x00, 0x11, 0x22, 0x33, 0x44]),
            1,
            2,
            5,
        )
        .unwrap();

        assert_eq!(bytes[0], 0xBB);
        assert_eq!(bytes[1], 0x19);
        assert_eq!(bytes[2], 17); // payload length
        assert_eq!(&bytes[3..7], &[0x00, 0x00, 0x00, 0x00]); // password
        assert_eq!(bytes[7], 0x00); // filter type
        assert_eq!(&bytes[8..10], &[0x00, 0x05]); // filter length
        assert_eq!(&bytes[10..15], &[0x00, 0x11, 0x22, 0x33, 0x44]); // filter data
        assert_eq!(bytes[15], 1); // bank
        assert_eq!(&bytes[16..18], &[0x00, 0x02]); // start address
        assert_eq!(&bytes[18..20], &[0x00, 0x05]); // data length
        assert_eq!(&bytes[20..], &[0x00, 0x0D, 0x0A]);
    }

    #[test]
    fn encode_query_filtered_unfiltered_has_zero_length() {
        let bytes = encode_query_tag_filtered(
            &[0x00, 0x00, 0x00, 0x00],
            FilterType::Tid,
            None,
            1,
            2,
            4,
        )
        .unwrap();
        assert_eq!(bytes[2], 12); // password + type + len + bank + addr + dlen
        assert_eq!(bytes[7], 0x01); // TID filter type
        assert_eq!(&bytes[8..10], &[0x00, 0x00]);
    }

    #[test]
    fn encode_write_tag_appends_data() {
        let data = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77];
        let bytes = encode_write_tag(
            &[0x00, 0x00, 0x00, 0x00],
            FilterType::Epc,
            None,
            1,
            2,
            &data,
        )
        .unwrap();
        assert_eq!(bytes[1], 0x1A);
        assert_eq!(bytes[2], 20);
        assert_eq!(&bytes[10..12], &[0x00, 0x08]); // data length
        assert_eq!(&bytes[12..20], &data);
    }

    #[test]
    fn short_password_rejected_before_encoding() {
        let result = encode_write_tag(
            &[0x00, 0x00, 0x00],
            FilterType::Epc,
            None,
            1,
            2,
            &[0x11, 0x22],
        );
        assert!(matches!(result, Err(R2000Error::InvalidParameter(_))));

        let result = encode_query_tag_filtered(
            &[0x00; 5],
            FilterType::Epc,
            None,
            1,
            2,
            2,
        );
        assert!(matches!(result, Err(R2000Error::InvalidParameter(_))));
    }

    #[test]
    fn oversize_payload_rejected() {
        let filter = vec![0u8; 250];
        let result = encode_write_tag(
            &[0x00, 0x00, 0x00, 0x00],
            FilterType::Epc,
            Some(&filter),
            1,
            0,
            &[0x00; 16],
        );
        assert!(matches!(result, Err(R2000Error::InvalidParameter(_))));
    }

    // ===================
    // decode tests
    // ===================

    #[test]
    fn decode_success_flag_variants() {
        let ok = response(&[0xBB, 0x88, 0x01, 0x01, 0x8A, 0x0D, 0x0A]);
        assert!(decode_set_antennas(&ok).is_ok());

        let rejected = response(&[0xBB, 0x88, 0x01, 0x00, 0x89, 0x0D, 0x0A]);
        assert!(matches!(
            decode_set_antennas(&rejected),
            Err(R2000Error::InvalidResponse(_))
        ));
    }

    #[test]
    fn decode_get_antennas_bitmask() {
        let frame = response(&[0xBB, 0x90, 0x01, 0x09, 0x9A, 0x0D, 0x0A]);
        let ants = decode_get_antennas(&frame).unwrap();
        assert_eq!(
            ants,
            [true, false, false, true, false, false, false, false]
        );
    }

    #[test]
    fn decode_get_antennas_zero_mask_is_failure() {
        let frame = response(&[0xBB, 0x90, 0x01, 0x00, 0x91, 0x0D, 0x0A]);
        assert!(matches!(
            decode_get_antennas(&frame),
            Err(R2000Error::InvalidResponse(_))
        ));
    }

    #[test]
    fn decode_get_power_fields() {
        let frame = response(&[0xBB, 0x8C, 0x03, 0x00, 0x1E, 0x14, 0x00, 0x0D, 0x0A]);
        let power = decode_get_power(&frame).unwrap();
        assert!(power.is_loop);
        assert_eq!(power.read_power, 30);
        assert_eq!(power.write_power, 20);

        let frame = response(&[0xBB, 0x8C, 0x03, 0x01, 0x1E, 0x14, 0x00, 0x0D, 0x0A]);
        assert!(!decode_get_power(&frame).unwrap().is_loop);
    }

    #[test]
    fn decode_version_string() {
        let frame = response(&[0xBB, 0x8B, 0x03, 0x01, 0x02, 0x0B, 0x00, 0x0D, 0x0A]);
        assert_eq!(decode_firmware_version(&frame).unwrap(), "V1.2.11");
    }

    #[test]
    fn decode_get_gpio_states() {
        let frame = response(&[0xBB, 0xB3, 0x03, 0x01, 0x00, 0x05, 0x00, 0x0D, 0x0A]);
        let gpios = decode_get_gpio(&frame).unwrap();
        assert_eq!(
            gpios,
            [true, false, true, false, false, false, false, false]
        );
    }

    #[test]
    fn decode_get_heartbeat_value() {
        let frame = response(&[0xBB, 0xB1, 0x02, 0x01, 0x0A, 0x00, 0x0D, 0x0A]);
        assert_eq!(decode_get_heartbeat(&frame).unwrap(), 10);

        let frame = response(&[0xBB, 0xB1, 0x02, 0x00, 0x0A, 0x00, 0x0D, 0x0A]);
        assert!(decode_get_heartbeat(&frame).is_err());
    }

    /// Build a tag report frame: pc, 12-byte EPC, raw RSSI, antenna.
    fn tag_report(code: u8, pc: u8, epc: &[u8], rssi: [u8; 2], ant: u8) -> Frame {
        let mut bytes = vec![0xBB, code, (epc.len() + 5) as u8, pc, 0x00];
        bytes.extend_from_slice(epc);
        bytes.extend_from_slice(&rssi);
        bytes.push(ant);
        bytes.push(0x00);
        bytes.push(0x0D);
        bytes.push(0x0A);
        Frame::from_bytes(bytes)
    }

    const EPC: [u8; 12] = [
        0xE2, 0x00, 0x00, 0x17, 0x22, 0x09, 0x01, 0x23, 0x19, 0x10, 0x01, 0x23,
    ];

    #[test]
    fn decode_tag_fields() {
        let frame = tag_report(0x97, 0x30, &EPC, [0xE5, 0x9D], 0x02);
        let tag = decode_tag(&frame).unwrap();
        assert_eq!(tag.pc, 0x30);
        assert_eq!(tag.ant, 0x02);
        assert_eq!(tag.epc, "E20000172209012319100123");
        // !0xE59D = 0x1A62, | 1 = 0x1A63 = 6755 -> 675.5
        assert_eq!(tag.rssi, 675.5);
    }

    #[test]
    fn decode_tag_rssi_literals() {
        let frame = tag_report(0x96, 0x30, &EPC, [0x00, 0x00], 0x01);
        assert_eq!(decode_tag(&frame).unwrap().rssi, 6553.5);

        let frame = tag_report(0x96, 0x30, &EPC, [0xFF, 0xFF], 0x01);
        assert_eq!(decode_tag(&frame).unwrap().rssi, 0.1);
    }

    #[test]
    fn decode_tag_rejects_short_report() {
        let frame = response(&[0xBB, 0x96, 0x01, 0x01, 0x98, 0x0D, 0x0A]);
        assert!(matches!(
            decode_tag(&frame),
            Err(R2000Error::InvalidResponse(_))
        ));
    }

    #[test]
    fn decode_query_filtered_epc_substring() {
        // [HEAD][0x99][len][flag][epc...][ant][cksum][ETX]
        let mut bytes = vec![0xBB, 0x99, 0x08, 0x01];
        bytes.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44]);
        bytes.push(0x03); // ant at len-4
        bytes.extend_from_slice(&[0x00, 0x0D, 0x0A]);
        let frame = Frame::from_bytes(bytes);

        let info = decode_query_tag_filtered(&frame).unwrap();
        assert_eq!(info.epc, "0011223344");
        assert_eq!(info.ant, 0x03);
    }

    #[test]
    fn decode_query_filtered_failure_flag() {
        let frame = response(&[0xBB, 0x99, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0D, 0x0A]);
        assert!(matches!(
            decode_query_tag_filtered(&frame),
            Err(R2000Error::InvalidResponse(_))
        ));
    }

    #[test]
    fn decode_write_tag_result() {
        let frame = response(&[0xBB, 0x9A, 0x02, 0x01, 0x02, 0x00, 0x0D, 0x0A]);
        let result = decode_write_tag(&frame).unwrap();
        assert!(result.is_success);
        assert_eq!(result.ant, 0x02);

        let frame = response(&[0xBB, 0x9A, 0x02, 0x00, 0x02, 0x00, 0x0D, 0x0A]);
        assert!(decode_write_tag(&frame).is_err());
    }

    #[test]
    fn decode_stop_inventory_flag() {
        let frame = response(&[0xBB, 0x98, 0x01, 0x01, 0x9A, 0x0D, 0x0A]);
        assert!(decode_stop_inventory(&frame).is_ok());

        let frame = response(&[0xBB, 0x98, 0x01, 0x00, 0x99, 0x0D, 0x0A]);
        assert!(decode_stop_inventory(&frame).is_err());
    }

    #[test]
    fn encode_stamp_verify_roundtrip_for_catalog() {
        let frames = [
            encode_set_antennas(&[true; 8]),
            encode_get_antennas(),
            encode_set_power(30, 30, true),
            encode_get_power(),
            encode_set_gpio(&[false; 8]),
            encode_get_gpio(),
            encode_hardware_version(),
            encode_firmware_version(),
            encode_query_tag(),
            encode_set_baud_rate(BaudRate::B57600),
            encode_set_auto_read(true),
            encode_set_heartbeat(5),
            encode_get_heartbeat(),
            encode_start_inventory(),
            encode_stop_inventory(),
        ];
        for mut frame in frames {
            checksum::stamp(&mut frame);
            assert!(checksum::verify(&frame), "{}", bytes_to_hex(&frame));
        }
    }
}
