//! Normalized controller snapshot and button identifiers.

/// One decoded input snapshot. Every field defaults to neutral.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GamepadState {
    pub left_x: i16,
    pub left_y: i16,
    pub right_x: i16,
    pub right_y: i16,
    pub left_trigger: u8,
    pub right_trigger: u8,

    pub buttons: u16,
    pub dpad: Dpad,
    pub ext_buttons: u8,
    pub ext_buttons2: u8,

    pub gyro_x: i16,
    pub gyro_y: i16,
    pub gyro_z: i16,
    pub accel_x: i16,
    pub accel_y: i16,
    pub accel_z: i16,
}

impl GamepadState {
    /// Both extended-button bytes as one mask, `ext_buttons` in the low byte.
    pub fn ext_mask(&self) -> u16 {
        u16::from(self.ext_buttons) | (u16::from(self.ext_buttons2) << 8)
    }

    pub fn is_pressed(&self, button: ButtonId) -> bool {
        match button {
            ButtonId::Pad(b) => self.buttons & b.mask() != 0,
            ButtonId::Ext(bit) => self.ext_mask() & bit.mask() != 0,
        }
    }
}

/// Hat switch position. Opposing directions are unrepresentable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Dpad {
    #[default]
    None = 0,
    Up = 1,
    UpRight = 2,
    Right = 3,
    DownRight = 4,
    Down = 5,
    DownLeft = 6,
    Left = 7,
    UpLeft = 8,
}

impl Dpad {
    pub const ALL: [Dpad; 9] = [
        Dpad::None,
        Dpad::Up,
        Dpad::UpRight,
        Dpad::Right,
        Dpad::DownRight,
        Dpad::Down,
        Dpad::DownLeft,
        Dpad::Left,
        Dpad::UpLeft,
    ];

    /// Ordinal lookup; anything past `UpLeft` is `None`.
    pub fn from_ordinal(value: u8) -> Dpad {
        Self::ALL.get(usize::from(value)).copied().unwrap_or(Dpad::None)
    }

    pub fn directions(self) -> DpadDirections {
        let (up, right, down, left) = match self {
            Dpad::None => (false, false, false, false),
            Dpad::Up => (true, false, false, false),
            Dpad::UpRight => (true, true, false, false),
            Dpad::Right => (false, true, false, false),
            Dpad::DownRight => (false, true, true, false),
            Dpad::Down => (false, false, true, false),
            Dpad::DownLeft => (false, false, true, true),
            Dpad::Left => (false, false, false, true),
            Dpad::UpLeft => (true, false, false, true),
        };
        DpadDirections {
            up,
            down,
            left,
            right,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DpadDirections {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// Base buttons, bit positions in [`GamepadState::buttons`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PadButton {
    A,
    B,
    X,
    Y,
    LB,
    RB,
    Select,
    Start,
    Mode,
    L3,
    R3,
}

pub const PAD_A: u16 = 1 << 0;
pub const PAD_B: u16 = 1 << 1;
pub const PAD_X: u16 = 1 << 2;
pub const PAD_Y: u16 = 1 << 3;
pub const PAD_LB: u16 = 1 << 4;
pub const PAD_RB: u16 = 1 << 5;
pub const PAD_SELECT: u16 = 1 << 6;
pub const PAD_START: u16 = 1 << 7;
pub const PAD_MODE: u16 = 1 << 8;
pub const PAD_L3: u16 = 1 << 9;
pub const PAD_R3: u16 = 1 << 10;

impl PadButton {
    pub const ALL: [PadButton; 11] = [
        PadButton::A,
        PadButton::B,
        PadButton::X,
        PadButton::Y,
        PadButton::LB,
        PadButton::RB,
        PadButton::Select,
        PadButton::Start,
        PadButton::Mode,
        PadButton::L3,
        PadButton::R3,
    ];

    pub fn mask(self) -> u16 {
        match self {
            PadButton::A => PAD_A,
            PadButton::B => PAD_B,
            PadButton::X => PAD_X,
            PadButton::Y => PAD_Y,
            PadButton::LB => PAD_LB,
            PadButton::RB => PAD_RB,
            PadButton::Select => PAD_SELECT,
            PadButton::Start => PAD_START,
            PadButton::Mode => PAD_MODE,
            PadButton::L3 => PAD_L3,
            PadButton::R3 => PAD_R3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PadButton::A => "A",
            PadButton::B => "B",
            PadButton::X => "X",
            PadButton::Y => "Y",
            PadButton::LB => "LB",
            PadButton::RB => "RB",
            PadButton::Select => "SELECT",
            PadButton::Start => "START",
            PadButton::Mode => "MODE",
            PadButton::L3 => "L3",
            PadButton::R3 => "R3",
        }
    }

    pub fn from_name(name: &str) -> Option<PadButton> {
        match name.to_ascii_uppercase().as_str() {
            "BACK" => Some(PadButton::Select),
            "GUIDE" => Some(PadButton::Mode),
            upper => Self::ALL.into_iter().find(|b| b.name() == upper),
        }
    }
}

/// Raw extended-button bit: 0..=7 in `ext_buttons`, 8..=15 in `ext_buttons2`.
///
/// Labels ("M1", "LM", ...) are assigned by configuration, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtBit(u8);

impl ExtBit {
    pub const COUNT: u8 = 16;

    pub fn new(bit: u8) -> Option<ExtBit> {
        (bit < Self::COUNT).then_some(ExtBit(bit))
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn mask(self) -> u16 {
        1 << self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ButtonId {
    Pad(PadButton),
    Ext(ExtBit),
}
