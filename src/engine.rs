//! Per-cycle remap pipeline: layers, button remaps with suppression, dpad
//! arrows, gyro and stick modes.

use crate::config::{Config, DpadMode, GyroConfig, Layer, RemapTarget, StickConfig, StickMode};
use crate::frame::{EmittedFrame, OutputEvent, VirtualPadState};
use crate::layer::LayerState;
use crate::motion::{self, GyroOutput, GyroState, ScrollState};
use crate::state::{ButtonId, Dpad, DpadDirections, GamepadState};
use evdev::Key;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// Gyro/stick/dpad settings after layer overrides, resolved once per cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Effective {
    pub gyro: GyroConfig,
    pub left_stick: StickConfig,
    pub right_stick: StickConfig,
    pub dpad: DpadMode,
}

impl Effective {
    pub fn resolve(config: &Config, layer: Option<&Layer>) -> Self {
        Self {
            gyro: layer.and_then(|l| l.gyro).unwrap_or(config.gyro),
            left_stick: layer
                .and_then(|l| l.left_stick)
                .unwrap_or(config.left_stick),
            right_stick: layer
                .and_then(|l| l.right_stick)
                .unwrap_or(config.right_stick),
            dpad: layer.and_then(|l| l.dpad).unwrap_or(config.dpad),
        }
    }
}

/// Everything the engine carries from one cycle to the next.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub prev: GamepadState,
    pub layers: LayerState,
    pub gyro: GyroState,
    pub scroll: ScrollState,
    pub suppressed_buttons: u16,
    pub suppressed_ext: u16,
    pub prev_suppressed_buttons: u16,
    pub prev_suppressed_ext: u16,
    /// Arrow keys currently held down for the dpad.
    pub arrows: DpadDirections,
    /// Remap targets currently pressed, keyed by the physical button.
    pub held: BTreeMap<ButtonId, RemapTarget>,
    last_pad: VirtualPadState,
}

fn mapping(config: &Config, layer: Option<&Layer>, button: ButtonId) -> Option<RemapTarget> {
    layer
        .and_then(|l| l.remap.get(&button))
        .or_else(|| config.remap.get(&button))
        .copied()
}

fn mask_of(buttons: impl Iterator<Item = ButtonId>) -> (u16, u16) {
    buttons.fold((0, 0), |(pad, ext), b| match b {
        ButtonId::Pad(p) => (pad | p.mask(), ext),
        ButtonId::Ext(e) => (pad, ext | e.mask()),
    })
}

impl SessionState {
    pub fn process(&mut self, config: &Config, state: &GamepadState, now: Instant) -> EmittedFrame {
        let mut events = Vec::new();

        self.layers.update(config, state, &self.prev, now, &mut events);
        let layer = self.layers.active(config).map(|(_, l)| l);
        let eff = Effective::resolve(config, layer);

        let remapped: BTreeSet<ButtonId> = config
            .remap
            .keys()
            .chain(layer.into_iter().flat_map(|l| l.remap.keys()))
            .copied()
            .collect();

        self.prev_suppressed_buttons = self.suppressed_buttons;
        self.prev_suppressed_ext = self.suppressed_ext;
        (self.suppressed_buttons, self.suppressed_ext) =
            mask_of(remapped.iter().copied().chain(config.layer_triggers()));

        self.process_remaps(config, layer, &remapped, state, &mut events);

        let mut pad = VirtualPadState::passthrough(state);
        pad.buttons &= !self.suppressed_buttons;
        pad.ext_buttons &= !self.suppressed_ext;

        self.process_dpad(eff.dpad, state, &mut pad, &mut events);
        self.process_motion(&eff, state, &mut pad, &mut events);

        let pad_changed = self.pad_changed(&pad);
        self.prev = *state;
        self.last_pad = pad;

        EmittedFrame {
            pad,
            events,
            pad_changed,
        }
    }

    fn process_remaps(
        &mut self,
        config: &Config,
        layer: Option<&Layer>,
        remapped: &BTreeSet<ButtonId>,
        state: &GamepadState,
        events: &mut Vec<OutputEvent>,
    ) {
        // Release first, with the target the press went out as.
        for (button, target) in std::mem::take(&mut self.held) {
            if state.is_pressed(button) && mapping(config, layer, button) == Some(target) {
                self.held.insert(button, target);
            } else {
                events.extend(OutputEvent::for_target(target, false));
            }
        }

        for &button in remapped {
            if self.layers.in_progress(config, button) || self.held.contains_key(&button) {
                continue;
            }
            if !state.is_pressed(button) || self.prev.is_pressed(button) {
                continue;
            }
            let Some(target) = mapping(config, layer, button) else {
                continue;
            };
            if let Some(ev) = OutputEvent::for_target(target, true) {
                events.push(ev);
                self.held.insert(button, target);
            }
        }
    }

    fn process_dpad(
        &mut self,
        mode: DpadMode,
        state: &GamepadState,
        pad: &mut VirtualPadState,
        events: &mut Vec<OutputEvent>,
    ) {
        let want = match mode {
            DpadMode::Arrows => {
                pad.dpad = Dpad::None;
                state.dpad.directions()
            }
            DpadMode::Gamepad => DpadDirections::default(),
        };
        let have = self.arrows;
        for (now, before, key) in [
            (want.up, have.up, Key::KEY_UP),
            (want.down, have.down, Key::KEY_DOWN),
            (want.left, have.left, Key::KEY_LEFT),
            (want.right, have.right, Key::KEY_RIGHT),
        ] {
            if now != before {
                events.push(OutputEvent::Key {
                    code: key.code(),
                    pressed: now,
                });
            }
        }
        self.arrows = want;
    }

    fn process_motion(
        &mut self,
        eff: &Effective,
        state: &GamepadState,
        pad: &mut VirtualPadState,
        events: &mut Vec<OutputEvent>,
    ) {
        let (mut dx, mut dy) = (0i32, 0i32);
        let (mut wheel_v, mut wheel_h) = (0i32, 0i32);

        let sticks = [
            (&eff.left_stick, state.left_x, state.left_y, &mut pad.left_x, &mut pad.left_y),
            (&eff.right_stick, state.right_x, state.right_y, &mut pad.right_x, &mut pad.right_y),
        ];
        for (cfg, x, y, out_x, out_y) in sticks {
            match cfg.mode {
                StickMode::Gamepad => continue,
                StickMode::Mouse => {
                    let (mx, my) = motion::stick_mouse(cfg, x, y);
                    dx = dx.saturating_add(mx);
                    dy = dy.saturating_add(my);
                }
                StickMode::Scroll => {
                    let (v, h) = motion::stick_scroll(cfg, x, y, &mut self.scroll);
                    wheel_v = wheel_v.saturating_add(v);
                    wheel_h = wheel_h.saturating_add(h);
                }
            }
            *out_x = 0;
            *out_y = 0;
        }
        if eff.left_stick.mode != StickMode::Scroll && eff.right_stick.mode != StickMode::Scroll {
            self.scroll.reset();
        }

        match motion::process_gyro(&eff.gyro, state, &mut self.gyro) {
            GyroOutput::None => {}
            GyroOutput::Mouse { dx: gx, dy: gy } => {
                dx = dx.saturating_add(gx);
                dy = dy.saturating_add(gy);
            }
            GyroOutput::Stick { x, y } => {
                pad.right_x = x;
                pad.right_y = y;
            }
        }

        if dx != 0 || dy != 0 {
            events.push(OutputEvent::MouseMove { dx, dy });
        }
        if wheel_v != 0 || wheel_h != 0 {
            events.push(OutputEvent::Scroll {
                vertical: wheel_v,
                horizontal: wheel_h,
            });
        }
    }

    /// Buttons compare against the previous report masked with the previous
    /// cycle's suppression, so a button whose suppression flips produces one
    /// clean edge.
    fn pad_changed(&self, pad: &VirtualPadState) -> bool {
        let prev_buttons = self.prev.buttons & !self.prev_suppressed_buttons;
        let prev_ext = self.prev.ext_mask() & !self.prev_suppressed_ext;
        let last = &self.last_pad;
        pad.buttons != prev_buttons
            || pad.ext_buttons != prev_ext
            || (pad.left_x, pad.left_y, pad.right_x, pad.right_y)
                != (last.left_x, last.left_y, last.right_x, last.right_y)
            || (pad.left_trigger, pad.right_trigger) != (last.left_trigger, last.right_trigger)
            || pad.dpad != last.dpad
    }

    /// Release everything held and centre the pad, e.g. when the device goes away.
    pub fn release_all(&mut self) -> EmittedFrame {
        let mut events: Vec<OutputEvent> = std::mem::take(&mut self.held)
            .into_values()
            .filter_map(|t| OutputEvent::for_target(t, false))
            .collect();
        let mut pad = VirtualPadState::default();
        self.process_dpad(
            DpadMode::Gamepad,
            &GamepadState::default(),
            &mut pad,
            &mut events,
        );

        let pad_changed = pad != self.last_pad;
        *self = Self::default();
        EmittedFrame {
            pad,
            events,
            pad_changed,
        }
    }
}

/// Owns the configuration and the session state for one connected device.
pub struct RemapEngine {
    config: Config,
    session: SessionState,
}

impl RemapEngine {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session: SessionState::default(),
        }
    }

    pub fn process(&mut self, state: &GamepadState, now: Instant) -> EmittedFrame {
        self.session.process(&self.config, state, now)
    }

    pub fn release_all(&mut self) -> EmittedFrame {
        self.session.release_all()
    }

    #[cfg(test)]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[cfg(test)]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn active_layer(&self) -> Option<&str> {
        self.session.layers.active(&self.config).map(|(name, _)| name)
    }

    fn effective(&self) -> Effective {
        let layer = self.session.layers.active(&self.config).map(|(_, l)| l);
        Effective::resolve(&self.config, layer)
    }

    pub fn effective_gyro(&self) -> GyroConfig {
        self.effective().gyro
    }

    pub fn effective_left_stick(&self) -> StickConfig {
        self.effective().left_stick
    }

    pub fn effective_right_stick(&self) -> StickConfig {
        self.effective().right_stick
    }

    pub fn effective_dpad(&self) -> DpadMode {
        self.effective().dpad
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Activation, GyroMode};
    use crate::state::{ExtBit, PadButton, PAD_A, PAD_B, PAD_LB, PAD_X};
    use proptest::prelude::*;
    use std::time::Duration;

    fn space() -> u16 {
        Key::KEY_SPACE.code()
    }

    fn pad(b: PadButton) -> ButtonId {
        ButtonId::Pad(b)
    }

    fn buttons(mask: u16) -> GamepadState {
        GamepadState {
            buttons: mask,
            ..Default::default()
        }
    }

    fn key(code: u16, pressed: bool) -> OutputEvent {
        OutputEvent::Key { code, pressed }
    }

    struct Clock(Instant);

    impl Clock {
        fn at(&self, ms: u64) -> Instant {
            self.0 + Duration::from_millis(ms)
        }
    }

    #[test]
    fn remapped_a_sends_space_and_stays_off_pad() {
        let mut cfg = Config::default();
        cfg.remap.insert(pad(PadButton::A), RemapTarget::Key(space()));
        let mut engine = RemapEngine::new(cfg);
        let clock = Clock(Instant::now());

        let f = engine.process(&buttons(PAD_A), clock.at(0));
        assert_eq!(f.events, vec![key(space(), true)]);
        assert_eq!(f.pad.buttons & PAD_A, 0);

        for ms in 1..10 {
            let f = engine.process(&buttons(PAD_A), clock.at(ms));
            assert!(f.events.is_empty());
            assert_eq!(f.pad.buttons & PAD_A, 0);
        }

        let f = engine.process(&buttons(0), clock.at(10));
        assert_eq!(f.events, vec![key(space(), false)]);
    }

    #[test]
    fn unmapped_buttons_pass_through() {
        let mut cfg = Config::default();
        cfg.remap.insert(pad(PadButton::A), RemapTarget::Disabled);
        let mut engine = RemapEngine::new(cfg);
        let f = engine.process(&buttons(PAD_A | PAD_B), Instant::now());
        assert!(f.events.is_empty());
        assert_eq!(f.pad.buttons, PAD_B);
        assert!(f.pad_changed);
    }

    #[test]
    fn ext_buttons_can_be_remapped() {
        let mut cfg = Config::default();
        let m1 = cfg.button_by_name("M1").unwrap();
        cfg.remap
            .insert(m1, RemapTarget::MouseButton(Key::BTN_LEFT.code()));
        let mut engine = RemapEngine::new(cfg);
        let state = GamepadState {
            ext_buttons: 0x04 | 0x01,
            ..Default::default()
        };
        let f = engine.process(&state, Instant::now());
        assert_eq!(
            f.events,
            vec![OutputEvent::MouseButton {
                code: Key::BTN_LEFT.code(),
                pressed: true
            }]
        );
        assert_eq!(f.pad.ext_buttons, 0x01);
        let z = ExtBit::new(2).unwrap();
        assert_eq!(engine.session().suppressed_ext, z.mask());
    }

    fn aim_config() -> Config {
        let mut cfg = Config::default();
        let mut layer = Layer::new(pad(PadButton::LB));
        layer.tap = Some(RemapTarget::Key(Key::KEY_R.code()));
        layer.hold_timeout = Duration::from_millis(200);
        layer
            .remap
            .insert(pad(PadButton::B), RemapTarget::Key(Key::KEY_B.code()));
        layer.gyro = Some(GyroConfig {
            mode: GyroMode::Mouse,
            smoothing: 0.0,
            ..Default::default()
        });
        cfg.layers.insert("aim".into(), layer);
        cfg
    }

    #[test]
    fn tap_emits_only_the_tap_action() {
        let mut engine = RemapEngine::new(aim_config());
        let clock = Clock(Instant::now());
        let mut all = Vec::new();
        for (mask, t) in [(PAD_LB, 0), (PAD_LB | PAD_B, 100), (PAD_B, 150), (0, 160)] {
            all.extend(engine.process(&buttons(mask), clock.at(t)).events);
        }
        let r = Key::KEY_R.code();
        assert_eq!(all, vec![key(r, true), key(r, false)]);
    }

    #[test]
    fn hold_applies_layer_remaps_and_no_tap() {
        let mut engine = RemapEngine::new(aim_config());
        let clock = Clock(Instant::now());
        let b = Key::KEY_B.code();

        for t in [0, 200] {
            let frame = engine.process(&buttons(PAD_LB), clock.at(t));
            assert!(frame.events.is_empty());
        }
        assert_eq!(engine.active_layer(), Some("aim"));
        assert_eq!(engine.effective_gyro().mode, GyroMode::Mouse);

        let f = engine.process(&buttons(PAD_LB | PAD_B), clock.at(250));
        assert_eq!(f.events, vec![key(b, true)]);
        assert_eq!(f.pad.buttons, 0);

        let f = engine.process(&buttons(PAD_LB), clock.at(300));
        assert_eq!(f.events, vec![key(b, false)]);

        let f = engine.process(&buttons(0), clock.at(400));
        assert!(f.events.is_empty());
        assert_eq!(engine.active_layer(), None);
        assert_eq!(engine.effective_gyro().mode, GyroMode::Off);
    }

    #[test]
    fn layer_ending_releases_layer_key_once() {
        let mut engine = RemapEngine::new(aim_config());
        let clock = Clock(Instant::now());
        let b = Key::KEY_B.code();

        engine.process(&buttons(PAD_LB), clock.at(0));
        engine.process(&buttons(PAD_LB), clock.at(200));
        engine.process(&buttons(PAD_LB | PAD_B), clock.at(210));

        // Trigger released while B is still held: layer ends, KEY_B goes up,
        // B shows up on the pad exactly once.
        let f = engine.process(&buttons(PAD_B), clock.at(220));
        assert_eq!(f.events, vec![key(b, false)]);
        assert_eq!(f.pad.buttons, PAD_B);
        assert!(f.pad_changed);

        let f = engine.process(&buttons(PAD_B), clock.at(230));
        assert!(f.events.is_empty());
        assert_eq!(f.pad.buttons, PAD_B);
        assert!(!f.pad_changed);
    }

    #[test]
    fn layer_trigger_is_not_passed_through() {
        let mut engine = RemapEngine::new(aim_config());
        let f = engine.process(&buttons(PAD_LB | PAD_X), Instant::now());
        assert_eq!(f.pad.buttons, PAD_X);
    }

    #[test]
    fn base_remap_on_trigger_is_skipped_while_pending() {
        let mut cfg = aim_config();
        cfg.remap
            .insert(pad(PadButton::LB), RemapTarget::Key(Key::KEY_L.code()));
        let mut engine = RemapEngine::new(cfg);
        let f = engine.process(&buttons(PAD_LB), Instant::now());
        assert!(f.events.is_empty());
    }

    #[test]
    fn dpad_arrows_edges_only() {
        let cfg = Config {
            dpad: DpadMode::Arrows,
            ..Default::default()
        };
        let mut engine = RemapEngine::new(cfg);
        let now = Instant::now();
        let with = |d| GamepadState {
            dpad: d,
            ..Default::default()
        };
        let up = Key::KEY_UP.code();
        let right = Key::KEY_RIGHT.code();

        let f = engine.process(&with(Dpad::Up), now);
        assert_eq!(f.events, vec![key(up, true)]);
        assert_eq!(f.pad.dpad, Dpad::None);

        assert!(engine.process(&with(Dpad::Up), now).events.is_empty());

        let f = engine.process(&with(Dpad::UpRight), now);
        assert_eq!(f.events, vec![key(right, true)]);

        let f = engine.process(&with(Dpad::Right), now);
        assert_eq!(f.events, vec![key(up, false)]);

        let f = engine.process(&with(Dpad::None), now);
        assert_eq!(f.events, vec![key(right, false)]);
    }

    #[test]
    fn leaving_arrow_mode_releases_keys() {
        let mut cfg = Config::default();
        let mut layer = Layer::new(pad(PadButton::LB));
        layer.hold_timeout = Duration::ZERO;
        layer.dpad = Some(DpadMode::Arrows);
        cfg.layers.insert("nav".into(), layer);
        let mut engine = RemapEngine::new(cfg);
        let now = Instant::now();

        let held = GamepadState {
            buttons: PAD_LB,
            dpad: Dpad::Down,
            ..Default::default()
        };
        let f = engine.process(&held, now);
        assert_eq!(f.events, vec![key(Key::KEY_DOWN.code(), true)]);

        let released = GamepadState {
            dpad: Dpad::Down,
            ..Default::default()
        };
        let f = engine.process(&released, now);
        assert_eq!(f.events, vec![key(Key::KEY_DOWN.code(), false)]);
        assert_eq!(f.pad.dpad, Dpad::Down);
    }

    #[test]
    fn gyro_off_accumulates_nothing() {
        let mut engine = RemapEngine::new(Config::default());
        let state = GamepadState {
            gyro_x: 9000,
            gyro_y: -4000,
            gyro_z: 12000,
            ..Default::default()
        };
        let now = Instant::now();
        let mut total = (0, 0);
        for _ in 0..10 {
            let (x, y) = engine.process(&state, now).mouse_motion();
            total = (total.0 + x, total.1 + y);
            assert!(engine.session().gyro.is_zero());
        }
        assert_eq!(total, (0, 0));
    }

    #[test]
    fn gyro_joystick_replaces_right_stick_for_one_cycle() {
        let cfg = Config {
            gyro: GyroConfig {
                mode: GyroMode::Joystick,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut engine = RemapEngine::new(cfg);
        let state = GamepadState {
            right_x: 1111,
            gyro_z: -500,
            ..Default::default()
        };
        let f = engine.process(&state, Instant::now());
        assert_eq!(f.pad.right_x, 500);
        assert_eq!(f.pad.right_y, 0);
    }

    #[test]
    fn mouse_stick_is_centred_on_pad() {
        let cfg = Config {
            right_stick: StickConfig {
                mode: StickMode::Mouse,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut engine = RemapEngine::new(cfg);
        let state = GamepadState {
            right_x: 20480,
            left_x: 300,
            ..Default::default()
        };
        let f = engine.process(&state, Instant::now());
        assert_eq!(f.mouse_motion(), (10, 0));
        assert_eq!((f.pad.right_x, f.pad.right_y), (0, 0));
        assert_eq!(f.pad.left_x, 300);
    }

    #[test]
    fn hold_layer_turns_right_stick_into_mouse() {
        let mut cfg = Config::default();
        let mut layer = Layer::new(pad(PadButton::LB));
        layer.right_stick = Some(StickConfig {
            mode: StickMode::Mouse,
            ..Default::default()
        });
        cfg.layers.insert("point".into(), layer);
        let mut engine = RemapEngine::new(cfg);
        let clock = Clock(Instant::now());
        let stick = |mask| GamepadState {
            buttons: mask,
            right_x: 20480,
            ..Default::default()
        };

        // still deciding between tap and hold: stick stays on the pad
        let f = engine.process(&stick(PAD_LB), clock.at(0));
        assert_eq!(f.pad.right_x, 20480);
        assert_eq!(f.mouse_motion(), (0, 0));

        let f = engine.process(&stick(PAD_LB), clock.at(200));
        assert_eq!(engine.active_layer(), Some("point"));
        assert_eq!(engine.effective_right_stick().mode, StickMode::Mouse);
        assert_eq!(f.pad.right_x, 0);
        assert_eq!(f.mouse_motion(), (10, 0));

        let f = engine.process(&stick(0), clock.at(250));
        assert_eq!(engine.active_layer(), None);
        assert_eq!(f.pad.right_x, 20480);
        assert_eq!(f.mouse_motion(), (0, 0));
    }

    #[test]
    fn scroll_stick_emits_whole_notches() {
        let cfg = Config {
            left_stick: StickConfig {
                mode: StickMode::Scroll,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut engine = RemapEngine::new(cfg);
        let state = GamepadState {
            left_y: 16384,
            ..Default::default()
        };
        let now = Instant::now();
        let notches: i32 = (0..16)
            .map(|_| engine.process(&state, now).scroll().0)
            .sum();
        assert_eq!(notches, -1);
    }

    #[test]
    fn release_all_lets_go_of_everything() {
        let mut cfg = Config::default();
        cfg.remap.insert(pad(PadButton::A), RemapTarget::Key(space()));
        cfg.dpad = DpadMode::Arrows;
        let mut engine = RemapEngine::new(cfg);
        let state = GamepadState {
            buttons: PAD_A | PAD_B,
            dpad: Dpad::Left,
            left_x: 9000,
            ..Default::default()
        };
        engine.process(&state, Instant::now());
        let f = engine.release_all();
        assert!(f.events.contains(&key(space(), false)));
        assert!(f.events.contains(&key(Key::KEY_LEFT.code(), false)));
        assert_eq!(f.pad, VirtualPadState::default());
        assert!(f.pad_changed);
        assert!(engine.session().held.is_empty());
    }

    fn remap_config() -> Config {
        let mut cfg = aim_config();
        cfg.remap.insert(pad(PadButton::A), RemapTarget::Key(space()));
        cfg.remap.insert(
            pad(PadButton::X),
            RemapTarget::MouseButton(Key::BTN_RIGHT.code()),
        );
        cfg.dpad = DpadMode::Arrows;
        let mut toggle = Layer::new(pad(PadButton::Y));
        toggle.activation = Activation::Toggle;
        toggle
            .remap
            .insert(pad(PadButton::A), RemapTarget::Key(Key::KEY_ENTER.code()));
        cfg.layers.insert("menu".into(), toggle);
        cfg
    }

    proptest! {
        #[test]
        fn prop_same_state_twice_has_no_transitions(
            buttons in 0u16..0x800,
            ext in any::<u8>(),
            dpad in 0u8..9,
        ) {
            let mut engine = RemapEngine::new(remap_config());
            let state = GamepadState {
                buttons,
                ext_buttons: ext,
                dpad: Dpad::from_ordinal(dpad),
                ..Default::default()
            };
            let now = Instant::now();
            engine.process(&state, now);
            let f = engine.process(&state, now);
            prop_assert_eq!(f.transitions().count(), 0);
        }

        #[test]
        fn prop_presses_and_releases_balance(
            steps in proptest::collection::vec((0u16..0x800, 0u64..300), 1..60),
        ) {
            let mut engine = RemapEngine::new(remap_config());
            let t0 = Instant::now();
            let mut t = 0;
            let mut down: BTreeMap<(bool, u16), i32> = BTreeMap::new();
            let mut frames: Vec<EmittedFrame> = Vec::new();
            for (mask, dt) in steps {
                t += dt;
                frames.push(engine.process(&buttons(mask), t0 + Duration::from_millis(t)));
                prop_assert!(engine.session().layers.active_count(engine.config()) <= 1);
            }
            frames.push(engine.release_all());
            for ev in frames.iter().flat_map(|f| f.events.iter()) {
                let (id, pressed) = match *ev {
                    OutputEvent::Key { code, pressed } => ((true, code), pressed),
                    OutputEvent::MouseButton { code, pressed } => ((false, code), pressed),
                    _ => continue,
                };
                let n = down.entry(id).or_insert(0);
                *n += if pressed { 1 } else { -1 };
                // never released twice, never pressed twice
                prop_assert!(*n == 0 || *n == 1, "unbalanced {:?}", id);
            }
            prop_assert!(down.values().all(|&n| n == 0));
        }
    }
}
