//! Gyro and stick shaping: deadzones, response curve, smoothing and
//! sub-pixel carry for relative output.

use crate::config::{GyroConfig, GyroMode, StickConfig};
use crate::state::GamepadState;

/// Raw gyro units per pixel at sensitivity 1.0.
pub const GYRO_MOUSE_SCALE: f32 = 1.0 / 64.0;

/// Pixels per cycle per unit of stick deflection at sensitivity 1.0.
pub const STICK_MOUSE_SCALE: f32 = 1.0 / 2048.0;

/// Wheel notches per cycle per unit of stick deflection at sensitivity 1.0.
pub const SCROLL_SCALE: f32 = 1.0 / 262_144.0;

pub const MAX_SMOOTHING: f32 = 0.95;

const AXIS_MAX: f32 = i16::MAX as f32;

/// Carries the fractional part of relative motion between cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SubPixel {
    remainder: f32,
}

impl SubPixel {
    /// Add `delta` and take out whatever whole units have built up.
    pub fn push(&mut self, delta: f32) -> i32 {
        self.remainder += delta;
        let whole = self.remainder.trunc();
        self.remainder -= whole;
        whole as i32
    }

    #[cfg(test)]
    pub fn remainder(&self) -> f32 {
        self.remainder
    }
}

/// Values with magnitude below `deadzone` read as zero.
pub fn apply_deadzone(value: i32, deadzone: i32) -> i32 {
    if value.abs() < deadzone {
        0
    } else {
        value
    }
}

/// Power curve over the range left after the deadzone. Sign is kept.
pub fn apply_curve(value: i32, deadzone: i32, exponent: f32) -> f32 {
    if value == 0 || exponent == 1.0 {
        return value as f32;
    }
    let deadzone = deadzone.max(0) as f32;
    let range = AXIS_MAX - deadzone;
    if range <= 0.0 {
        return value as f32;
    }
    let norm = ((value.abs() as f32 - deadzone) / range).clamp(0.0, 1.0);
    let shaped = norm.powf(exponent) * range + deadzone;
    shaped.copysign(value as f32)
}

fn clamp_axis(value: f32) -> i16 {
    value.clamp(i16::MIN as f32, AXIS_MAX) as i16
}

/// Cross-frame gyro filter state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GyroState {
    pub vel_x: f32,
    pub vel_y: f32,
    pub accum_x: SubPixel,
    pub accum_y: SubPixel,
}

impl GyroState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[cfg(test)]
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GyroOutput {
    None,
    Mouse { dx: i32, dy: i32 },
    /// Replaces the right stick for this cycle.
    Stick { x: i16, y: i16 },
}

/// Yaw (Z) drives horizontal output, pitch (X) vertical. Both are negated
/// to match the hardware orientation.
fn shaped_axes(cfg: &GyroConfig, state: &GamepadState) -> (f32, f32) {
    let shape = |raw: i16, invert: bool| {
        let mut v = -i32::from(raw);
        if invert {
            v = -v;
        }
        let v = apply_deadzone(v, cfg.deadzone);
        apply_curve(v, cfg.deadzone, cfg.curve)
    };
    (
        shape(state.gyro_z, cfg.invert_x),
        shape(state.gyro_x, cfg.invert_y),
    )
}

pub fn process_gyro(cfg: &GyroConfig, state: &GamepadState, gyro: &mut GyroState) -> GyroOutput {
    match cfg.mode {
        GyroMode::Off => {
            gyro.reset();
            GyroOutput::None
        }
        GyroMode::Mouse => {
            let (h, v) = shaped_axes(cfg, state);
            let raw_x = h * GYRO_MOUSE_SCALE * cfg.sensitivity_x;
            let raw_y = v * GYRO_MOUSE_SCALE * cfg.sensitivity_y;

            let smoothing = cfg.smoothing.clamp(0.0, MAX_SMOOTHING);
            gyro.vel_x = gyro.vel_x * smoothing + raw_x * (1.0 - smoothing);
            gyro.vel_y = gyro.vel_y * smoothing + raw_y * (1.0 - smoothing);

            GyroOutput::Mouse {
                dx: gyro.accum_x.push(gyro.vel_x),
                dy: gyro.accum_y.push(gyro.vel_y),
            }
        }
        GyroMode::Joystick => {
            // Stick output has no memory; drop any mouse residue.
            gyro.reset();
            let (h, v) = shaped_axes(cfg, state);
            GyroOutput::Stick {
                x: clamp_axis(h * cfg.sensitivity_x),
                y: clamp_axis(v * cfg.sensitivity_y),
            }
        }
    }
}

/// Relative pointer motion proportional to current deflection. Stick up
/// moves the pointer up.
pub fn stick_mouse(cfg: &StickConfig, x: i16, y: i16) -> (i32, i32) {
    let scale = STICK_MOUSE_SCALE * cfg.sensitivity;
    let x = apply_deadzone(i32::from(x), cfg.deadzone) as f32;
    let y = apply_deadzone(i32::from(y), cfg.deadzone) as f32;
    ((x * scale) as i32, (-y * scale) as i32)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollState {
    pub vertical: SubPixel,
    pub horizontal: SubPixel,
}

impl ScrollState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Returns `(vertical, horizontal)` wheel notches for this cycle.
pub fn stick_scroll(cfg: &StickConfig, x: i16, y: i16, scroll: &mut ScrollState) -> (i32, i32) {
    let scale = SCROLL_SCALE * cfg.sensitivity;
    let x = apply_deadzone(i32::from(x), cfg.deadzone) as f32;
    let y = apply_deadzone(i32::from(y), cfg.deadzone) as f32;
    (
        scroll.vertical.push(-y * scale),
        scroll.horizontal.push(x * scale),
    )
}
