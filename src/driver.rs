//! One read → remap → emit step, plus the `--debug` counters.

use crate::engine::RemapEngine;
use crate::error::Result;
use crate::frame::{EmittedFrame, OutputSink};
use crate::session::{DeviceHandle, DeviceSession};
use std::time::{Duration, Instant};

/// Read one report and, if there was one, push the resulting frame to `sink`.
/// Idle frames are not emitted.
pub fn pump_once<H: DeviceHandle, S: OutputSink>(
    session: &mut DeviceSession<H>,
    engine: &mut RemapEngine,
    sink: &mut S,
    now: Instant,
) -> Result<Option<EmittedFrame>> {
    let Some(state) = session.read_state()? else {
        return Ok(None);
    };
    let frame = engine.process(&state, now);
    if !frame.is_idle() {
        sink.emit(&frame)?;
    }
    Ok(Some(frame))
}

const SUMMARY_INTERVAL: Duration = Duration::from_secs(1);

/// Counters behind the once-per-second debug line.
#[derive(Debug)]
pub struct Stats {
    since: Instant,
    pub reports: u32,
    pub pad_updates: u32,
    pub transitions: u32,
    pub motion: (i64, i64),
    pub scroll: (i64, i64),
}

impl Stats {
    pub fn new(now: Instant) -> Self {
        Self {
            since: now,
            reports: 0,
            pad_updates: 0,
            transitions: 0,
            motion: (0, 0),
            scroll: (0, 0),
        }
    }

    pub fn record(&mut self, frame: &EmittedFrame) {
        self.reports += 1;
        if frame.pad_changed {
            self.pad_updates += 1;
        }
        self.transitions += frame.transitions().count() as u32;
        let (dx, dy) = frame.mouse_motion();
        self.motion.0 += i64::from(dx);
        self.motion.1 += i64::from(dy);
        let (v, h) = frame.scroll();
        self.scroll.0 += i64::from(v);
        self.scroll.1 += i64::from(h);
    }

    /// The summary line once a second has passed, resetting the counters.
    pub fn take_summary(&mut self, now: Instant, layer: Option<&str>) -> Option<String> {
        if now.saturating_duration_since(self.since) < SUMMARY_INTERVAL {
            return None;
        }
        let line = format!(
            "reports={} pad={} keys={} mouse({:+},{:+}) wheel({:+},{:+}) layer={}",
            self.reports,
            self.pad_updates,
            self.transitions,
            self.motion.0,
            self.motion.1,
            self.scroll.0,
            self.scroll.1,
            layer.unwrap_or("-"),
        );
        *self = Self::new(now);
        Some(line)
    }
}
