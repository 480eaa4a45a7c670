//! TOML config file. Deserialised into loose `File*` structs, then resolved
//! against names and defaults into a [`Config`].
//!
//! ```toml
//! emulate_elite = false
//! dpad = "gamepad"
//!
//! [remap]
//! M1 = "KEY_SPACE"
//! M2 = "mouse_left"
//!
//! [gyro]
//! mode = "off"
//! sensitivity = 1.5
//!
//! [stick.right]
//! mode = "mouse"
//! deadzone = 4000
//!
//! [layer.aim]
//! trigger = "LB"
//! tap = "KEY_R"
//! hold_timeout = 200
//! gyro = { mode = "mouse" }
//! remap = { B = "KEY_B" }
//! ```

use crate::config::{
    Activation, Config, DpadMode, GyroConfig, GyroMode, Layer, RemapTable, StickConfig, StickMode,
};
use crate::error::{Error, Result};
use crate::keycodes::parse_remap_target;
use crate::state::{ButtonId, ExtBit};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    emulate_elite: Option<bool>,
    dpad: Option<DpadMode>,
    #[serde(default)]
    remap: BTreeMap<String, String>,
    gyro: Option<FileGyro>,
    #[serde(default)]
    stick: FileSticks,
    #[serde(default)]
    ext_labels: BTreeMap<String, u8>,
    #[serde(default)]
    layer: BTreeMap<String, FileLayer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSticks {
    left: Option<FileStick>,
    right: Option<FileStick>,
}

/// Every field optional; missing ones come from the config being overridden.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileGyro {
    mode: Option<GyroMode>,
    /// Sets both axes; the per-axis keys win when given too.
    sensitivity: Option<f32>,
    sensitivity_x: Option<f32>,
    sensitivity_y: Option<f32>,
    deadzone: Option<i32>,
    smoothing: Option<f32>,
    curve: Option<f32>,
    invert_x: Option<bool>,
    invert_y: Option<bool>,
}

impl FileGyro {
    fn apply(&self, base: GyroConfig) -> GyroConfig {
        let both = self.sensitivity;
        GyroConfig {
            mode: self.mode.unwrap_or(base.mode),
            sensitivity_x: self.sensitivity_x.or(both).unwrap_or(base.sensitivity_x),
            sensitivity_y: self.sensitivity_y.or(both).unwrap_or(base.sensitivity_y),
            deadzone: self.deadzone.unwrap_or(base.deadzone),
            smoothing: self.smoothing.unwrap_or(base.smoothing),
            curve: self.curve.unwrap_or(base.curve),
            invert_x: self.invert_x.unwrap_or(base.invert_x),
            invert_y: self.invert_y.unwrap_or(base.invert_y),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileStick {
    mode: Option<StickMode>,
    deadzone: Option<i32>,
    sensitivity: Option<f32>,
}

impl FileStick {
    fn apply(&self, base: StickConfig) -> StickConfig {
        StickConfig {
            mode: self.mode.unwrap_or(base.mode),
            deadzone: self.deadzone.unwrap_or(base.deadzone),
            sensitivity: self.sensitivity.unwrap_or(base.sensitivity),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileLayer {
    trigger: String,
    tap: Option<String>,
    /// Milliseconds.
    hold_timeout: Option<u64>,
    activation: Option<Activation>,
    dpad: Option<DpadMode>,
    gyro: Option<FileGyro>,
    left_stick: Option<FileStick>,
    right_stick: Option<FileStick>,
    #[serde(default)]
    remap: BTreeMap<String, String>,
}

/// Load `path`. A missing file means defaults.
pub fn load(path: &Path) -> Result<Config> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        Err(e) => return Err(e.into()),
    };
    let config = parse(&text).map_err(|e| match e {
        Error::Config(msg) => Error::Config(format!("{}: {msg}", path.display())),
        other => other,
    })?;
    log::info!("Loaded config from {}", path.display());
    Ok(config)
}

pub fn parse(text: &str) -> Result<Config> {
    let file: FileConfig = toml::from_str(text)
        .map_err(|e| Error::Config(e.to_string()))?;
    resolve(file)
}

fn resolve(file: FileConfig) -> Result<Config> {
    let mut config = Config::default();

    for (name, bit) in file.ext_labels {
        let bit = ExtBit::new(bit)
            .ok_or_else(|| Error::Config(format!("ext label {name}: bit {bit} out of range")))?;
        config.ext_labels.insert(name.to_ascii_uppercase(), bit);
    }

    config.emulate_elite = file.emulate_elite.unwrap_or(config.emulate_elite);
    config.dpad = file.dpad.unwrap_or(config.dpad);
    if let Some(gyro) = &file.gyro {
        config.gyro = gyro.apply(config.gyro);
    }
    if let Some(stick) = &file.stick.left {
        config.left_stick = stick.apply(config.left_stick);
    }
    if let Some(stick) = &file.stick.right {
        config.right_stick = stick.apply(config.right_stick);
    }
    config.remap = resolve_remaps(&config, &file.remap)?;

    for (name, raw) in &file.layer {
        let layer = resolve_layer(&config, name, raw)?;
        config.layers.insert(name.clone(), layer);
    }
    Ok(config)
}

fn button(config: &Config, name: &str) -> Result<ButtonId> {
    config
        .button_by_name(name)
        .ok_or_else(|| Error::Config(format!("unknown button {name:?}")))
}

fn resolve_remaps(config: &Config, raw: &BTreeMap<String, String>) -> Result<RemapTable> {
    raw.iter()
        .map(|(from, to)| {
            let target = parse_remap_target(to)
                .ok_or_else(|| Error::Config(format!("{from}: unknown key {to:?}")))?;
            Ok((button(config, from)?, target))
        })
        .collect()
}

fn resolve_layer(config: &Config, name: &str, raw: &FileLayer) -> Result<Layer> {
    let in_layer = |e: Error| match e {
        Error::Config(msg) => Error::Config(format!("layer {name}: {msg}")),
        other => other,
    };

    let mut layer = Layer::new(button(config, &raw.trigger).map_err(in_layer)?);
    if let Some(tap) = &raw.tap {
        let target = parse_remap_target(tap)
            .ok_or_else(|| Error::Config(format!("layer {name}: unknown tap key {tap:?}")))?;
        layer.tap = Some(target);
    }
    if let Some(ms) = raw.hold_timeout {
        layer.hold_timeout = Duration::from_millis(ms);
    }
    layer.activation = raw.activation.unwrap_or_default();
    layer.dpad = raw.dpad;
    layer.gyro = raw.gyro.as_ref().map(|g| g.apply(config.gyro));
    layer.left_stick = raw.left_stick.as_ref().map(|s| s.apply(config.left_stick));
    layer.right_stick = raw.right_stick.as_ref().map(|s| s.apply(config.right_stick));
    layer.remap = resolve_remaps(config, &raw.remap).map_err(in_layer)?;
    Ok(layer)
}
