//! Vader 5 Pro wire formats: input report decoding and command packet encoding.
//!
//! # Extended report (test mode, interface 1)
//! | Offset | Size | Field                                   |
//! |--------|------|-----------------------------------------|
//! | 0–2    | 3    | magic `5A A5 EF`                        |
//! | 3–10   | 4×i16| LX, LY, RX, RY (LE, Y up = negative)    |
//! | 11     | u8   | dpad nibble + A/B/Select/X              |
//! | 12     | u8   | Y/Start/LB/RB/L3/R3                     |
//! | 13–14  | 2×u8 | extended buttons                        |
//! | 15–16  | 2×u8 | LT, RT                                  |
//! | 17–22  | 3×i16| gyro X/Y/Z (full report only)           |
//! | 23–28  | 3×i16| accel X/Y/Z (full report only)          |
//!
//! # Legacy report
//! | Offset | Size | Field                                   |
//! |--------|------|-----------------------------------------|
//! | 1–4    | 4×u8 | LX, LY, RX, RY centred at 128           |
//! | 5      | u8   | dpad ordinal in the low nibble          |
//! | 6–7    | u16  | buttons (LE, one bit per button)        |
//! | 8–9    | 2×u8 | LT, RT                                  |
//! | 11     | u8   | extended buttons                        |

use crate::state::{
    Dpad, GamepadState, PAD_A, PAD_B, PAD_L3, PAD_LB, PAD_R3, PAD_RB, PAD_SELECT, PAD_START,
    PAD_X, PAD_Y,
};

/// Command packets are always this long, zero padded.
pub const PKT_SIZE: usize = 32;

pub const MAGIC_5A: u8 = 0x5a;
pub const MAGIC_A5: u8 = 0xa5;
pub const MAGIC_EF: u8 = 0xef;

pub const EXT_MIN_SIZE: usize = 17;
pub const EXT_FULL_SIZE: usize = 29;
pub const LEGACY_MIN_SIZE: usize = 12;

const OFF_LX: usize = 3;
const OFF_BTNS: usize = 11;
const OFF_EXT1: usize = 13;
const OFF_EXT2: usize = 14;
const OFF_LT: usize = 15;
const OFF_RT: usize = 16;
const OFF_GYRO: usize = 17;
const OFF_ACCEL: usize = 23;

/// byte[11]: (mask, button)
const B11_BUTTONS: [(u8, u16); 4] = [
    (0x10, PAD_A),
    (0x20, PAD_B),
    (0x40, PAD_SELECT),
    (0x80, PAD_X),
];

/// byte[12]: (mask, button)
const B12_BUTTONS: [(u8, u16); 6] = [
    (0x01, PAD_Y),
    (0x02, PAD_START),
    (0x04, PAD_LB),
    (0x08, PAD_RB),
    (0x40, PAD_L3),
    (0x80, PAD_R3),
];

/// Low nibble of byte[11]: bit0 up, bit1 right, bit2 down, bit3 left.
const DPAD_MAP: [Dpad; 16] = [
    Dpad::None,
    Dpad::Up,
    Dpad::Right,
    Dpad::UpRight,
    Dpad::Down,
    Dpad::None,
    Dpad::DownRight,
    Dpad::None,
    Dpad::Left,
    Dpad::UpLeft,
    Dpad::None,
    Dpad::None,
    Dpad::DownLeft,
    Dpad::None,
    Dpad::None,
    Dpad::None,
];

pub const CMD_TEST_MODE: u8 = 0x11;
pub const CMD_RUMBLE: u8 = 0x12;
const TEST_MODE_LEN: u8 = 0x07;
const RUMBLE_LEN: u8 = 0x06;
const MODE_TEST: u8 = 0x15;
const MODE_NORMAL: u8 = 0x14;
const INIT_LEN: u8 = 0x02;

/// Handshake command ids, in the order the device expects them.
pub const INIT_COMMANDS: [u8; 4] = [0x01, 0xa1, 0x02, 0x04];

pub type Packet = [u8; PKT_SIZE];

fn read_i16(data: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([data[offset], data[offset + 1]])
}

/// Decode any supported input report. Returns `None` for anything else.
pub fn decode(data: &[u8]) -> Option<GamepadState> {
    if data.len() >= 2 && data[0] == MAGIC_5A && data[1] == MAGIC_A5 {
        // Vendor framing: either an extended report or a command response.
        return decode_extended(data);
    }
    decode_legacy(data)
}

pub fn decode_extended(data: &[u8]) -> Option<GamepadState> {
    if data.len() < EXT_MIN_SIZE {
        return None;
    }
    if data[..3] != [MAGIC_5A, MAGIC_A5, MAGIC_EF] {
        return None;
    }

    let b11 = data[OFF_BTNS];
    let b12 = data[OFF_BTNS + 1];

    let mut state = GamepadState {
        left_x: read_i16(data, OFF_LX),
        left_y: read_i16(data, OFF_LX + 2).saturating_neg(),
        right_x: read_i16(data, OFF_LX + 4),
        right_y: read_i16(data, OFF_LX + 6).saturating_neg(),
        left_trigger: data[OFF_LT],
        right_trigger: data[OFF_RT],
        buttons: extended_buttons(b11, b12),
        dpad: DPAD_MAP[usize::from(b11 & 0x0f)],
        ext_buttons: data[OFF_EXT1],
        ext_buttons2: data[OFF_EXT2],
        ..Default::default()
    };

    if data.len() >= EXT_FULL_SIZE {
        state.gyro_x = read_i16(data, OFF_GYRO);
        state.gyro_y = read_i16(data, OFF_GYRO + 2);
        state.gyro_z = read_i16(data, OFF_GYRO + 4);
        state.accel_x = read_i16(data, OFF_ACCEL);
        state.accel_y = read_i16(data, OFF_ACCEL + 2);
        state.accel_z = read_i16(data, OFF_ACCEL + 4);
    }

    Some(state)
}

fn extended_buttons(b11: u8, b12: u8) -> u16 {
    let from = |byte: u8, table: &[(u8, u16)]| {
        table
            .iter()
            .filter(|(mask, _)| byte & mask != 0)
            .fold(0u16, |acc, (_, btn)| acc | btn)
    };
    from(b11, &B11_BUTTONS) | from(b12, &B12_BUTTONS)
}

pub fn decode_legacy(data: &[u8]) -> Option<GamepadState> {
    const AXIS_CENTER: i32 = 128;
    const AXIS_SCALE: i32 = 256;

    if data.len() < LEGACY_MIN_SIZE {
        return None;
    }

    // (0 - 128) * 256 = -32768 .. (255 - 128) * 256 = 32512, always fits.
    let axis = |b: u8| ((i32::from(b) - AXIS_CENTER) * AXIS_SCALE) as i16;

    Some(GamepadState {
        left_x: axis(data[1]),
        left_y: axis(data[2]),
        right_x: axis(data[3]),
        right_y: axis(data[4]),
        dpad: Dpad::from_ordinal(data[5] & 0x0f),
        buttons: u16::from_le_bytes([data[6], data[7]]),
        left_trigger: data[8],
        right_trigger: data[9],
        ext_buttons: data[11],
        ..Default::default()
    })
}

fn packet(command: u8, len: u8) -> Packet {
    let mut pkt = [0u8; PKT_SIZE];
    pkt[0] = MAGIC_5A;
    pkt[1] = MAGIC_A5;
    pkt[2] = command;
    pkt[3] = len;
    pkt
}

/// One handshake packet. The checksum byte is `LEN + CMD`.
pub fn init_packet(command: u8) -> Packet {
    let mut pkt = packet(command, INIT_LEN);
    pkt[4] = INIT_LEN.wrapping_add(command);
    pkt
}

/// All four handshake packets in send order.
pub fn init_sequence() -> [Packet; 4] {
    INIT_COMMANDS.map(init_packet)
}

pub fn test_mode_packet(enable: bool) -> Packet {
    let mut pkt = packet(CMD_TEST_MODE, TEST_MODE_LEN);
    pkt[4] = 0xff;
    pkt[5] = u8::from(enable);
    pkt[6] = 0xff;
    pkt[7] = 0xff;
    pkt[8] = 0xff;
    pkt[9] = if enable { MODE_TEST } else { MODE_NORMAL };
    pkt
}

pub fn rumble_packet(left: u8, right: u8) -> Packet {
    let mut pkt = packet(CMD_RUMBLE, RUMBLE_LEN);
    pkt[4] = left;
    pkt[5] = right;
    pkt
}

/// Responses to commands echo the two magic bytes.
pub fn is_command_response(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == MAGIC_5A && data[1] == MAGIC_A5
}
