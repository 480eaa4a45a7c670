//! Remap configuration. Built once at startup, read-only afterwards.

use crate::state::{ButtonId, ExtBit, PadButton};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GyroMode {
    #[default]
    Off,
    Mouse,
    Joystick,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GyroConfig {
    pub mode: GyroMode,
    pub sensitivity_x: f32,
    pub sensitivity_y: f32,
    /// Raw units below which an axis reads as zero.
    pub deadzone: i32,
    /// EMA weight of the previous velocity, 0 = no smoothing.
    pub smoothing: f32,
    /// Response curve exponent; 1.0 is linear.
    pub curve: f32,
    pub invert_x: bool,
    pub invert_y: bool,
}

impl Default for GyroConfig {
    fn default() -> Self {
        Self {
            mode: GyroMode::Off,
            sensitivity_x: 1.0,
            sensitivity_y: 1.0,
            deadzone: 0,
            smoothing: 0.3,
            curve: 1.0,
            invert_x: false,
            invert_y: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StickMode {
    #[default]
    Gamepad,
    Mouse,
    Scroll,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StickConfig {
    pub mode: StickMode,
    pub deadzone: i32,
    pub sensitivity: f32,
}

impl Default for StickConfig {
    fn default() -> Self {
        Self {
            mode: StickMode::Gamepad,
            deadzone: 4000,
            sensitivity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DpadMode {
    #[default]
    Gamepad,
    Arrows,
}

/// What a remapped button does instead of its native meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemapTarget {
    /// Swallow the button.
    Disabled,
    Key(u16),
    MouseButton(u16),
    /// Reserved; suppresses like `Disabled`.
    MouseMove,
}

pub type RemapTable = BTreeMap<ButtonId, RemapTarget>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// Active while the trigger is held past the timeout.
    #[default]
    Hold,
    /// Flips on each trigger release.
    Toggle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub trigger: ButtonId,
    pub tap: Option<RemapTarget>,
    pub hold_timeout: Duration,
    pub activation: Activation,
    pub gyro: Option<GyroConfig>,
    pub left_stick: Option<StickConfig>,
    pub right_stick: Option<StickConfig>,
    pub dpad: Option<DpadMode>,
    pub remap: RemapTable,
}

pub const DEFAULT_HOLD_TIMEOUT: Duration = Duration::from_millis(200);

impl Layer {
    pub fn new(trigger: ButtonId) -> Self {
        Self {
            trigger,
            tap: None,
            hold_timeout: DEFAULT_HOLD_TIMEOUT,
            activation: Activation::Hold,
            gyro: None,
            left_stick: None,
            right_stick: None,
            dpad: None,
            remap: RemapTable::new(),
        }
    }
}

/// Default names for the raw extended-button bits.
///
/// The hardware orders the rear buttons M1, M3, M2, M4 in bits 2..=5.
pub const DEFAULT_EXT_LABELS: [(&str, u8); 10] = [
    ("C", 0),
    ("Z", 1),
    ("M1", 2),
    ("M3", 3),
    ("M2", 4),
    ("M4", 5),
    ("LM", 6),
    ("RM", 7),
    ("O", 8),
    ("HOME", 11),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub gyro: GyroConfig,
    pub left_stick: StickConfig,
    pub right_stick: StickConfig,
    pub dpad: DpadMode,
    pub remap: RemapTable,
    pub layers: BTreeMap<String, Layer>,
    /// Present the virtual pad as an Xbox Elite Series 2.
    pub emulate_elite: bool,
    pub ext_labels: BTreeMap<String, ExtBit>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gyro: GyroConfig::default(),
            left_stick: StickConfig::default(),
            right_stick: StickConfig::default(),
            dpad: DpadMode::default(),
            remap: RemapTable::new(),
            layers: BTreeMap::new(),
            emulate_elite: false,
            ext_labels: default_ext_labels(),
        }
    }
}

pub fn default_ext_labels() -> BTreeMap<String, ExtBit> {
    DEFAULT_EXT_LABELS
        .iter()
        .filter_map(|&(name, bit)| Some((name.to_string(), ExtBit::new(bit)?)))
        .collect()
}

impl Config {
    /// Resolve a button name: base buttons first, then ext labels.
    pub fn button_by_name(&self, name: &str) -> Option<ButtonId> {
        if let Some(pad) = PadButton::from_name(name) {
            return Some(ButtonId::Pad(pad));
        }
        let upper = name.to_ascii_uppercase();
        self.ext_labels.get(&upper).copied().map(ButtonId::Ext)
    }

    /// Label for an ext bit, if any.
    pub fn ext_label(&self, bit: ExtBit) -> Option<&str> {
        self.ext_labels
            .iter()
            .find(|(_, b)| **b == bit)
            .map(|(name, _)| name.as_str())
    }

    /// Display name: pad name, ext label, or `EXT<n>` for unlabelled bits.
    pub fn button_name(&self, button: ButtonId) -> String {
        match button {
            ButtonId::Pad(pad) => pad.name().to_string(),
            ButtonId::Ext(bit) => self
                .ext_label(bit)
                .map(str::to_string)
                .unwrap_or_else(|| format!("EXT{}", bit.index())),
        }
    }

    /// Buttons consumed by layer triggers.
    pub fn layer_triggers(&self) -> impl Iterator<Item = ButtonId> + '_ {
        self.layers.values().map(|l| l.trigger)
    }
}
