use crate::frame::{EmittedFrame, OutputEvent, OutputSink, VirtualPadState};
use crate::hidraw::{PRODUCT_ID, VENDOR_ID};
use crate::keycodes::{all_keys, all_mouse_buttons, is_gamepad_code};
use crate::state::{ExtBit, PadButton};
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{
    AbsInfo, AbsoluteAxisType, AttributeSet, BusType, EventType, InputEvent, InputId, Key,
    RelativeAxisType, UinputAbsSetup,
};

const STICK_MIN: i32 = -32768;
const STICK_MAX: i32 = 32767;
const STICK_FUZZ: i32 = 16;
const STICK_FLAT: i32 = 128;
const TRIGGER_MAX: i32 = 255;

const ELITE_VENDOR_ID: u16 = 0x045e;
const ELITE_PRODUCT_ID: u16 = 0x0b00;

const PAD_CODES: [(PadButton, Key); 11] = [
    (PadButton::A, Key::BTN_SOUTH),
    (PadButton::B, Key::BTN_EAST),
    (PadButton::X, Key::BTN_WEST),
    (PadButton::Y, Key::BTN_NORTH),
    (PadButton::LB, Key::BTN_TL),
    (PadButton::RB, Key::BTN_TR),
    (PadButton::Select, Key::BTN_SELECT),
    (PadButton::Start, Key::BTN_START),
    (PadButton::Mode, Key::BTN_MODE),
    (PadButton::L3, Key::BTN_THUMBL),
    (PadButton::R3, Key::BTN_THUMBR),
];

/// Output code per ext bit. Elite layout puts the paddles (M1, M2, M3, M4 at
/// bits 2, 4, 3, 5) on TRIGGER_HAPPY5..8 and packs C/Z/LM/RM below them.
pub fn ext_codes(emulate_elite: bool) -> [Key; ExtBit::COUNT as usize] {
    let happy = |n: u16| Key::new(Key::BTN_TRIGGER_HAPPY1.code() + n - 1);
    let mut codes = [Key::BTN_TRIGGER_HAPPY1; ExtBit::COUNT as usize];
    for (bit, code) in codes.iter_mut().enumerate() {
        let n = match (emulate_elite, bit) {
            (true, 0) => 1,
            (true, 1) => 2,
            (true, 6) => 3,
            (true, 7) => 4,
            (true, 2) => 5,
            (true, 4) => 6,
            (true, 3) => 7,
            (true, 5) => 8,
            (_, bit) => bit as u16 + 1,
        };
        *code = happy(n);
    }
    codes
}

fn key_event(code: u16, pressed: bool) -> InputEvent {
    InputEvent::new(EventType::KEY, code, i32::from(pressed))
}

fn abs_event(axis: AbsoluteAxisType, value: i32) -> InputEvent {
    InputEvent::new(EventType::ABSOLUTE, axis.0, value)
}

fn rel_event(axis: RelativeAxisType, value: i32) -> InputEvent {
    InputEvent::new(EventType::RELATIVE, axis.0, value)
}

fn syn() -> InputEvent {
    InputEvent::new(EventType::SYNCHRONIZATION, 0, 0)
}

/// Events that take the virtual gamepad from `last` to `next`.
pub fn pad_diff(last: &VirtualPadState, next: &VirtualPadState, ext: &[Key]) -> Vec<InputEvent> {
    let mut events = Vec::new();

    for (axis, old, new) in [
        (AbsoluteAxisType::ABS_X, last.left_x, next.left_x),
        (AbsoluteAxisType::ABS_Y, last.left_y, next.left_y),
        (AbsoluteAxisType::ABS_RX, last.right_x, next.right_x),
        (AbsoluteAxisType::ABS_RY, last.right_y, next.right_y),
    ] {
        if old != new {
            events.push(abs_event(axis, i32::from(new)));
        }
    }
    for (axis, old, new) in [
        (AbsoluteAxisType::ABS_Z, last.left_trigger, next.left_trigger),
        (AbsoluteAxisType::ABS_RZ, last.right_trigger, next.right_trigger),
    ] {
        if old != new {
            events.push(abs_event(axis, i32::from(new)));
        }
    }

    let changed = last.buttons ^ next.buttons;
    for (button, key) in PAD_CODES {
        if changed & button.mask() != 0 {
            events.push(key_event(key.code(), next.buttons & button.mask() != 0));
        }
    }

    let changed = last.ext_buttons ^ next.ext_buttons;
    for (bit, key) in ext.iter().enumerate() {
        let mask = 1u16 << bit;
        if changed & mask != 0 {
            events.push(key_event(key.code(), next.ext_buttons & mask != 0));
        }
    }

    let (old, new) = (last.dpad.directions(), next.dpad.directions());
    for (was, now, key) in [
        (old.up, new.up, Key::BTN_DPAD_UP),
        (old.down, new.down, Key::BTN_DPAD_DOWN),
        (old.left, new.left, Key::BTN_DPAD_LEFT),
        (old.right, new.right, Key::BTN_DPAD_RIGHT),
    ] {
        if was != now {
            events.push(key_event(key.code(), now));
        }
    }
    events
}

/// Split discrete events between the gamepad and the mouse/keyboard device.
pub fn route_events(
    events: &[OutputEvent],
    pad: &mut Vec<InputEvent>,
    input: &mut Vec<InputEvent>,
) {
    for ev in events {
        match *ev {
            OutputEvent::Key { code, pressed } if is_gamepad_code(code) => {
                pad.push(key_event(code, pressed))
            }
            OutputEvent::Key { code, pressed } | OutputEvent::MouseButton { code, pressed } => {
                input.push(key_event(code, pressed))
            }
            OutputEvent::MouseMove { dx, dy } => {
                if dx != 0 {
                    input.push(rel_event(RelativeAxisType::REL_X, dx));
                }
                if dy != 0 {
                    input.push(rel_event(RelativeAxisType::REL_Y, dy));
                }
            }
            OutputEvent::Scroll {
                vertical,
                horizontal,
            } => {
                if vertical != 0 {
                    input.push(rel_event(RelativeAxisType::REL_WHEEL, vertical));
                }
                if horizontal != 0 {
                    input.push(rel_event(RelativeAxisType::REL_HWHEEL, horizontal));
                }
            }
        }
    }
}

/// Virtual gamepad plus a virtual mouse/keyboard for remapped output.
pub struct VirtualPad {
    pad: VirtualDevice,
    input: VirtualDevice,
    ext: [Key; ExtBit::COUNT as usize],
    last: VirtualPadState,
}

impl VirtualPad {
    pub fn new(emulate_elite: bool) -> std::io::Result<Self> {
        let stick = |axis: AbsoluteAxisType| -> UinputAbsSetup {
            UinputAbsSetup::new(
                axis,
                AbsInfo::new(0, STICK_MIN, STICK_MAX, STICK_FUZZ, STICK_FLAT, 0),
            )
        };
        let trigger = |axis: AbsoluteAxisType| -> UinputAbsSetup {
            UinputAbsSetup::new(axis, AbsInfo::new(0, 0, TRIGGER_MAX, 0, 0, 0))
        };

        let ext = ext_codes(emulate_elite);

        let mut pad_keys = AttributeSet::<Key>::new();
        for (_, key) in PAD_CODES {
            pad_keys.insert(key);
        }
        for key in ext {
            pad_keys.insert(key);
        }
        for key in [
            Key::BTN_DPAD_UP,
            Key::BTN_DPAD_DOWN,
            Key::BTN_DPAD_LEFT,
            Key::BTN_DPAD_RIGHT,
        ] {
            pad_keys.insert(key);
        }
        for key in all_keys().filter(|k| is_gamepad_code(k.code())) {
            pad_keys.insert(key);
        }

        let (name, id) = if emulate_elite {
            (
                "Xbox Elite Series 2",
                InputId::new(BusType::BUS_USB, ELITE_VENDOR_ID, ELITE_PRODUCT_ID, 1),
            )
        } else {
            (
                "Flydigi Vader 5 Pro (vader5d)",
                InputId::new(BusType::BUS_USB, VENDOR_ID, PRODUCT_ID, 1),
            )
        };

        let pad = VirtualDeviceBuilder::new()?
            .name(name)
            .input_id(id)
            .with_keys(&pad_keys)?
            .with_absolute_axis(&stick(AbsoluteAxisType::ABS_X))?
            .with_absolute_axis(&stick(AbsoluteAxisType::ABS_Y))?
            .with_absolute_axis(&stick(AbsoluteAxisType::ABS_RX))?
            .with_absolute_axis(&stick(AbsoluteAxisType::ABS_RY))?
            .with_absolute_axis(&trigger(AbsoluteAxisType::ABS_Z))?
            .with_absolute_axis(&trigger(AbsoluteAxisType::ABS_RZ))?
            .build()?;

        let mut input_keys = AttributeSet::<Key>::new();
        for key in all_keys().filter(|k| !is_gamepad_code(k.code())) {
            input_keys.insert(key);
        }
        for key in all_mouse_buttons() {
            input_keys.insert(key);
        }
        let mut rel = AttributeSet::<RelativeAxisType>::new();
        rel.insert(RelativeAxisType::REL_X);
        rel.insert(RelativeAxisType::REL_Y);
        rel.insert(RelativeAxisType::REL_WHEEL);
        rel.insert(RelativeAxisType::REL_HWHEEL);

        let input = VirtualDeviceBuilder::new()?
            .name("vader5d Mouse/Keyboard")
            .input_id(InputId::new(BusType::BUS_VIRTUAL, VENDOR_ID, PRODUCT_ID, 1))
            .with_keys(&input_keys)?
            .with_relative_axes(&rel)?
            .build()?;

        log::info!("Created virtual devices ({name})");

        Ok(Self {
            pad,
            input,
            ext,
            last: VirtualPadState::default(),
        })
    }
}

impl OutputSink for VirtualPad {
    fn emit(&mut self, frame: &EmittedFrame) -> std::io::Result<()> {
        let mut pad_events = pad_diff(&self.last, &frame.pad, &self.ext);
        let mut input_events = Vec::new();
        route_events(&frame.events, &mut pad_events, &mut input_events);

        if !pad_events.is_empty() {
            pad_events.push(syn());
            self.pad.emit(&pad_events)?;
        }
        self.last = frame.pad;
        if !input_events.is_empty() {
            input_events.push(syn());
            self.input.emit(&input_events)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Dpad, PAD_A, PAD_Y};

    fn summary(events: &[InputEvent]) -> Vec<(EventType, u16, i32)> {
        events
            .iter()
            .map(|e| (e.event_type(), e.code(), e.value()))
            .collect()
    }

    #[test]
    fn ext_codes_default_layout() {
        let codes = ext_codes(false);
        assert_eq!(codes[0], Key::BTN_TRIGGER_HAPPY1);
        assert_eq!(codes[2], Key::BTN_TRIGGER_HAPPY3);
        assert_eq!(codes[15].code(), Key::BTN_TRIGGER_HAPPY1.code() + 15);
    }

    #[test]
    fn elite_paddles() {
        let codes = ext_codes(true);
        assert_eq!(codes[2], Key::BTN_TRIGGER_HAPPY5); // M1
        assert_eq!(codes[4], Key::BTN_TRIGGER_HAPPY6); // M2
        assert_eq!(codes[3], Key::BTN_TRIGGER_HAPPY7); // M3
        assert_eq!(codes[5], Key::BTN_TRIGGER_HAPPY8); // M4
        let mut all: Vec<u16> = codes.iter().map(|k| k.code()).collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), codes.len());
    }

    #[test]
    fn diff_only_emits_changes() {
        let last = VirtualPadState {
            left_x: 100,
            buttons: PAD_A,
            ..Default::default()
        };
        let next = VirtualPadState {
            left_x: 100,
            right_y: -7,
            right_trigger: 200,
            buttons: PAD_Y,
            ext_buttons: 1 << 2,
            dpad: Dpad::UpLeft,
            ..Default::default()
        };
        let ev = summary(&pad_diff(&last, &next, &ext_codes(false)));
        assert_eq!(
            ev,
            vec![
                (EventType::ABSOLUTE, AbsoluteAxisType::ABS_RY.0, -7),
                (EventType::ABSOLUTE, AbsoluteAxisType::ABS_RZ.0, 200),
                (EventType::KEY, Key::BTN_SOUTH.code(), 0),
                (EventType::KEY, Key::BTN_NORTH.code(), 1),
                (EventType::KEY, Key::BTN_TRIGGER_HAPPY3.code(), 1),
                (EventType::KEY, Key::BTN_DPAD_UP.code(), 1),
                (EventType::KEY, Key::BTN_DPAD_LEFT.code(), 1),
            ]
        );
        assert!(pad_diff(&next, &next, &ext_codes(false)).is_empty());
    }

    #[test]
    fn gamepad_keys_go_to_the_pad() {
        let mut pad = Vec::new();
        let mut input = Vec::new();
        route_events(
            &[
                OutputEvent::Key {
                    code: Key::BTN_SOUTH.code(),
                    pressed: true,
                },
                OutputEvent::Key {
                    code: Key::KEY_SPACE.code(),
                    pressed: true,
                },
                OutputEvent::MouseButton {
                    code: Key::BTN_LEFT.code(),
                    pressed: false,
                },
                OutputEvent::MouseMove { dx: 3, dy: 0 },
                OutputEvent::Scroll {
                    vertical: -1,
                    horizontal: 0,
                },
            ],
            &mut pad,
            &mut input,
        );
        assert_eq!(
            summary(&pad),
            vec![(EventType::KEY, Key::BTN_SOUTH.code(), 1)]
        );
        assert_eq!(
            summary(&input),
            vec![
                (EventType::KEY, Key::KEY_SPACE.code(), 1),
                (EventType::KEY, Key::BTN_LEFT.code(), 0),
                (EventType::RELATIVE, RelativeAxisType::REL_X.0, 3),
                (EventType::RELATIVE, RelativeAxisType::REL_WHEEL.0, -1),
            ]
        );
    }
}
