//! What the engine hands to an output sink each cycle.

use crate::config::RemapTarget;
use crate::state::{Dpad, GamepadState};
use std::io;

/// Level state of the virtual gamepad. The sink diffs it against what it
/// emitted last time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VirtualPadState {
    pub left_x: i16,
    pub left_y: i16,
    pub right_x: i16,
    pub right_y: i16,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub buttons: u16,
    pub ext_buttons: u16,
    pub dpad: Dpad,
}

impl VirtualPadState {
    pub fn passthrough(state: &GamepadState) -> Self {
        Self {
            left_x: state.left_x,
            left_y: state.left_y,
            right_x: state.right_x,
            right_y: state.right_y,
            left_trigger: state.left_trigger,
            right_trigger: state.right_trigger,
            buttons: state.buttons,
            ext_buttons: state.ext_mask(),
            dpad: state.dpad,
        }
    }
}

/// Discrete events, emitted in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEvent {
    Key { code: u16, pressed: bool },
    MouseButton { code: u16, pressed: bool },
    MouseMove { dx: i32, dy: i32 },
    Scroll { vertical: i32, horizontal: i32 },
}

impl OutputEvent {
    /// The edge a remap target produces, if it produces one at all.
    pub fn for_target(target: RemapTarget, pressed: bool) -> Option<OutputEvent> {
        match target {
            RemapTarget::Key(code) => Some(OutputEvent::Key { code, pressed }),
            RemapTarget::MouseButton(code) => Some(OutputEvent::MouseButton { code, pressed }),
            RemapTarget::Disabled | RemapTarget::MouseMove => None,
        }
    }

    /// Press immediately followed by release.
    pub fn pulse(target: RemapTarget) -> impl Iterator<Item = OutputEvent> {
        Self::for_target(target, true)
            .into_iter()
            .chain(Self::for_target(target, false))
    }

    /// Key and mouse-button edges, as opposed to continuous motion.
    pub fn is_transition(&self) -> bool {
        matches!(
            self,
            OutputEvent::Key { .. } | OutputEvent::MouseButton { .. }
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmittedFrame {
    pub pad: VirtualPadState,
    pub events: Vec<OutputEvent>,
    /// Passthrough level state differs from the previous cycle.
    pub pad_changed: bool,
}

impl EmittedFrame {
    pub fn transitions(&self) -> impl Iterator<Item = &OutputEvent> {
        self.events.iter().filter(|e| e.is_transition())
    }

    pub fn mouse_motion(&self) -> (i32, i32) {
        self.events.iter().fold((0, 0), |(x, y), e| match e {
            OutputEvent::MouseMove { dx, dy } => (x + dx, y + dy),
            _ => (x, y),
        })
    }

    pub fn scroll(&self) -> (i32, i32) {
        self.events.iter().fold((0, 0), |(v, h), e| match e {
            OutputEvent::Scroll {
                vertical,
                horizontal,
            } => (v + vertical, h + horizontal),
            _ => (v, h),
        })
    }

    /// Nothing for a sink to do.
    pub fn is_idle(&self) -> bool {
        !self.pad_changed && self.events.is_empty()
    }
}

/// Receives frames and turns them into OS input events, terminated by a sync.
pub trait OutputSink {
    fn emit(&mut self, frame: &EmittedFrame) -> io::Result<()>;
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Keeps every frame it was given.
    #[derive(Default)]
    pub struct RecordingSink {
        pub frames: Vec<EmittedFrame>,
    }

    impl OutputSink for RecordingSink {
        fn emit(&mut self, frame: &EmittedFrame) -> io::Result<()> {
            self.frames.push(frame.clone());
            Ok(())
        }
    }
}
