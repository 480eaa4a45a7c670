use crate::config::RemapTarget;
use evdev::Key;

const KEY_TABLE: &[(&str, Key)] = &[
    ("KEY_ESC", Key::KEY_ESC),
    ("KEY_1", Key::KEY_1),
    ("KEY_2", Key::KEY_2),
    ("KEY_3", Key::KEY_3),
    ("KEY_4", Key::KEY_4),
    ("KEY_5", Key::KEY_5),
    ("KEY_6", Key::KEY_6),
    ("KEY_7", Key::KEY_7),
    ("KEY_8", Key::KEY_8),
    ("KEY_9", Key::KEY_9),
    ("KEY_0", Key::KEY_0),
    ("KEY_MINUS", Key::KEY_MINUS),
    ("KEY_EQUAL", Key::KEY_EQUAL),
    ("KEY_BACKSPACE", Key::KEY_BACKSPACE),
    ("KEY_TAB", Key::KEY_TAB),
    ("KEY_Q", Key::KEY_Q),
    ("KEY_W", Key::KEY_W),
    ("KEY_E", Key::KEY_E),
    ("KEY_R", Key::KEY_R),
    ("KEY_T", Key::KEY_T),
    ("KEY_Y", Key::KEY_Y),
    ("KEY_U", Key::KEY_U),
    ("KEY_I", Key::KEY_I),
    ("KEY_O", Key::KEY_O),
    ("KEY_P", Key::KEY_P),
    ("KEY_ENTER", Key::KEY_ENTER),
    ("KEY_LEFTCTRL", Key::KEY_LEFTCTRL),
    ("KEY_A", Key::KEY_A),
    ("KEY_S", Key::KEY_S),
    ("KEY_D", Key::KEY_D),
    ("KEY_F", Key::KEY_F),
    ("KEY_G", Key::KEY_G),
    ("KEY_H", Key::KEY_H),
    ("KEY_J", Key::KEY_J),
    ("KEY_K", Key::KEY_K),
    ("KEY_L", Key::KEY_L),
    ("KEY_LEFTSHIFT", Key::KEY_LEFTSHIFT),
    ("KEY_Z", Key::KEY_Z),
    ("KEY_X", Key::KEY_X),
    ("KEY_C", Key::KEY_C),
    ("KEY_V", Key::KEY_V),
    ("KEY_B", Key::KEY_B),
    ("KEY_N", Key::KEY_N),
    ("KEY_M", Key::KEY_M),
    ("KEY_RIGHTSHIFT", Key::KEY_RIGHTSHIFT),
    ("KEY_LEFTALT", Key::KEY_LEFTALT),
    ("KEY_SPACE", Key::KEY_SPACE),
    ("KEY_CAPSLOCK", Key::KEY_CAPSLOCK),
    ("KEY_F1", Key::KEY_F1),
    ("KEY_F2", Key::KEY_F2),
    ("KEY_F3", Key::KEY_F3),
    ("KEY_F4", Key::KEY_F4),
    ("KEY_F5", Key::KEY_F5),
    ("KEY_F6", Key::KEY_F6),
    ("KEY_F7", Key::KEY_F7),
    ("KEY_F8", Key::KEY_F8),
    ("KEY_F9", Key::KEY_F9),
    ("KEY_F10", Key::KEY_F10),
    ("KEY_F11", Key::KEY_F11),
    ("KEY_F12", Key::KEY_F12),
    ("KEY_F13", Key::KEY_F13),
    ("KEY_F14", Key::KEY_F14),
    ("KEY_F15", Key::KEY_F15),
    ("KEY_F16", Key::KEY_F16),
    ("KEY_RIGHTCTRL", Key::KEY_RIGHTCTRL),
    ("KEY_RIGHTALT", Key::KEY_RIGHTALT),
    ("KEY_LEFTMETA", Key::KEY_LEFTMETA),
    ("KEY_RIGHTMETA", Key::KEY_RIGHTMETA),
    ("KEY_HOME", Key::KEY_HOME),
    ("KEY_UP", Key::KEY_UP),
    ("KEY_PAGEUP", Key::KEY_PAGEUP),
    ("KEY_LEFT", Key::KEY_LEFT),
    ("KEY_RIGHT", Key::KEY_RIGHT),
    ("KEY_END", Key::KEY_END),
    ("KEY_DOWN", Key::KEY_DOWN),
    ("KEY_PAGEDOWN", Key::KEY_PAGEDOWN),
    ("KEY_INSERT", Key::KEY_INSERT),
    ("KEY_DELETE", Key::KEY_DELETE),
    ("KEY_VOLUMEUP", Key::KEY_VOLUMEUP),
    ("KEY_VOLUMEDOWN", Key::KEY_VOLUMEDOWN),
    ("KEY_MUTE", Key::KEY_MUTE),
    ("BTN_SOUTH", Key::BTN_SOUTH),
    ("BTN_EAST", Key::BTN_EAST),
    ("BTN_NORTH", Key::BTN_NORTH),
    ("BTN_WEST", Key::BTN_WEST),
    ("BTN_TL", Key::BTN_TL),
    ("BTN_TR", Key::BTN_TR),
    ("BTN_TL2", Key::BTN_TL2),
    ("BTN_TR2", Key::BTN_TR2),
    ("BTN_SELECT", Key::BTN_SELECT),
    ("BTN_START", Key::BTN_START),
    ("BTN_MODE", Key::BTN_MODE),
    ("BTN_THUMBL", Key::BTN_THUMBL),
    ("BTN_THUMBR", Key::BTN_THUMBR),
];

const MOUSE_TABLE: &[(&str, Key)] = &[
    ("BTN_LEFT", Key::BTN_LEFT),
    ("BTN_RIGHT", Key::BTN_RIGHT),
    ("BTN_MIDDLE", Key::BTN_MIDDLE),
    ("BTN_SIDE", Key::BTN_SIDE),
    ("BTN_EXTRA", Key::BTN_EXTRA),
    ("BTN_FORWARD", Key::BTN_FORWARD),
    ("BTN_BACK", Key::BTN_BACK),
    ("mouse_left", Key::BTN_LEFT),
    ("mouse_right", Key::BTN_RIGHT),
    ("mouse_middle", Key::BTN_MIDDLE),
];

/// Parse a config value such as `"KEY_SPACE"`, `"mouse_left"` or `"disabled"`.
pub fn parse_remap_target(value: &str) -> Option<RemapTarget> {
    match value {
        "disabled" | "none" => return Some(RemapTarget::Disabled),
        "mouse_move" => return Some(RemapTarget::MouseMove),
        _ => {}
    }
    if let Some((_, key)) = MOUSE_TABLE.iter().find(|(n, _)| *n == value) {
        return Some(RemapTarget::MouseButton(key.code()));
    }
    KEY_TABLE
        .iter()
        .find(|(n, _)| *n == value)
        .map(|(_, key)| RemapTarget::Key(key.code()))
}

/// Every keyboard/gamepad key a remap can produce.
pub fn all_keys() -> impl Iterator<Item = Key> {
    KEY_TABLE.iter().map(|(_, key)| *key)
}

pub fn all_mouse_buttons() -> impl Iterator<Item = Key> {
    MOUSE_TABLE.iter().map(|(_, key)| *key)
}

/// Codes in the joystick/gamepad block belong on the virtual pad, not the keyboard.
pub fn is_gamepad_code(code: u16) -> bool {
    const TRIGGER_HAPPY_COUNT: u16 = 40;
    let happy = Key::BTN_TRIGGER_HAPPY1.code();
    (Key::BTN_TRIGGER.code()..=Key::BTN_THUMBR.code()).contains(&code)
        || (Key::BTN_DPAD_UP.code()..=Key::BTN_DPAD_RIGHT.code()).contains(&code)
        || (happy..happy + TRIGGER_HAPPY_COUNT).contains(&code)
}
