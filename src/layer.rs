//! Tap / hold / toggle layer activation.
//!
//! At most one layer is active at a time. A trigger press is ignored while
//! some other layer is active, so exclusivity never depends on ordering.

use crate::config::{Activation, Config, Layer};
use crate::frame::OutputEvent;
use crate::state::{ButtonId, GamepadState};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// A held hold-layer trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapHoldState {
    pub press_time: Instant,
    pub activated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerState {
    pub tap_hold: BTreeMap<String, TapHoldState>,
    pub toggled: BTreeSet<String>,
}

impl LayerState {
    #[cfg(test)]
    fn is_active(&self, name: &str) -> bool {
        self.toggled.contains(name) || self.tap_hold.get(name).is_some_and(|t| t.activated)
    }

    pub fn any_active(&self) -> bool {
        !self.toggled.is_empty() || self.tap_hold.values().any(|t| t.activated)
    }

    fn other_active(&self, name: &str) -> bool {
        self.toggled.iter().any(|n| n != name)
            || self
                .tap_hold
                .iter()
                .any(|(n, t)| n != name && t.activated)
    }

    /// The active layer, toggles checked before holds.
    pub fn active<'c>(&self, config: &'c Config) -> Option<(&'c str, &'c Layer)> {
        config
            .layers
            .iter()
            .find(|(name, _)| self.toggled.contains(name.as_str()))
            .or_else(|| {
                config
                    .layers
                    .iter()
                    .find(|(name, _)| {
                        self.tap_hold
                            .get(name.as_str())
                            .is_some_and(|t| t.activated)
                    })
            })
            .map(|(name, layer)| (name.as_str(), layer))
    }

    /// Number of layers currently considered active.
    #[cfg(test)]
    pub fn active_count(&self, config: &Config) -> usize {
        config.layers.keys().filter(|n| self.is_active(n)).count()
    }

    /// `button` is a trigger whose press is being tracked by the tap-hold logic.
    pub fn in_progress(&self, config: &Config, button: ButtonId) -> bool {
        self.tap_hold
            .keys()
            .filter_map(|name| config.layers.get(name))
            .any(|layer| layer.trigger == button)
    }

    /// Advance every layer's state machine by one cycle. Tap actions are
    /// appended to `events`.
    pub fn update(
        &mut self,
        config: &Config,
        state: &GamepadState,
        prev: &GamepadState,
        now: Instant,
        events: &mut Vec<OutputEvent>,
    ) {
        for (name, layer) in &config.layers {
            let pressed = state.is_pressed(layer.trigger);
            let was_pressed = prev.is_pressed(layer.trigger);

            match layer.activation {
                Activation::Toggle => {
                    if !was_pressed || pressed {
                        continue;
                    }
                    if self.toggled.remove(name) {
                        log::debug!("layer {name} toggled off");
                    } else if !self.any_active() {
                        self.tap_hold.clear();
                        self.toggled.insert(name.clone());
                        log::debug!("layer {name} toggled on");
                    }
                }
                Activation::Hold => {
                    self.update_hold(name, layer, pressed, was_pressed, now, events)
                }
            }
        }
    }

    fn update_hold(
        &mut self,
        name: &str,
        layer: &Layer,
        pressed: bool,
        was_pressed: bool,
        now: Instant,
        events: &mut Vec<OutputEvent>,
    ) {
        if pressed && !was_pressed && !self.any_active() && !self.tap_hold.contains_key(name) {
            self.tap_hold.insert(
                name.to_string(),
                TapHoldState {
                    press_time: now,
                    activated: false,
                },
            );
        }

        let Some(th) = self.tap_hold.get(name).copied() else {
            return;
        };
        let held_long = now.saturating_duration_since(th.press_time) >= layer.hold_timeout;

        if !pressed {
            self.tap_hold.remove(name);
            if th.activated {
                log::debug!("layer {name} released");
            } else if !held_long && !self.other_active(name) {
                if let Some(tap) = layer.tap {
                    events.extend(OutputEvent::pulse(tap));
                }
            }
        } else if !th.activated && held_long {
            if self.other_active(name) {
                self.tap_hold.remove(name);
            } else if let Some(entry) = self.tap_hold.get_mut(name) {
                entry.activated = true;
                log::debug!("layer {name} activated");
            }
        }
    }
}
