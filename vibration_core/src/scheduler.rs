//! Envelope playback: a 128-point curve turned into scheduled gain ramps.
//!
//! ```text
//!            schedule()                 clock ≥ start
//!   Idle ─────────────────▶ Scheduled ───────────────▶ Playing
//!    ▲                          │                        │
//!    │         stop()           │        deadline        │
//!    └──────────────────────────┴────────────────────────┤
//!                                     Loop    → schedule() again
//!                                     OneShot → teardown, Idle
//! ```
//!
//! The only timer is a single [`Deferred`] that the frame loop polls.  Both
//! the re-arm on expiry and every explicit stop go through this scheduler, so
//! a stage change and an expiring timer can never leave two ramp schedules
//! running against the envelope gain.

use log::debug;

use crate::envelope::{EnvelopeCurve, NUM_POINTS};
use crate::graph::{AudioGraph, GainId};
use crate::record::VibrationRecord;

/// Length of the click-free tail applied by [`EnvelopeScheduler::stop`].
pub const RELEASE_SECONDS: f64 = 0.1;

/// Default time for one pass through the curve.
pub const DEFAULT_DURATION: f64 = 2.0;

// ════════════════════════════════════════════════════════════════════════════
// Deferred — one cancellable callback slot
// ════════════════════════════════════════════════════════════════════════════

/// A single-shot deadline on the audio clock.  Arming replaces any previous
/// deadline; cancelling is always safe.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Deferred {
    deadline: Option<f64>,
}

impl Deferred {
    pub fn arm(&mut self, at: f64) {
        self.deadline = Some(at);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<f64> {
        self.deadline
    }

    /// Consume the deadline if it has passed.
    pub fn fire(&mut self, now: f64) -> bool {
        match self.deadline {
            Some(at) if now >= at => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Scheduler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Scheduled,
    Playing,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlaybackMode {
    /// Replay the live curve until stopped.
    Loop,
    /// Play a saved record once, then silence everything.
    OneShot(VibrationRecord),
}

/// What the frame loop must do after a poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    Nothing,
    /// Loop mode re-armed with the live curve.
    Rearmed,
    /// A one-shot finished; oscillators must be torn down.
    Finished,
}

// ════════════════════════════════════════════════════════════════════════════
// EnvelopeScheduler
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct EnvelopeScheduler {
    gain:     GainId,
    duration: f64,
    state:    SchedulerState,
    mode:     PlaybackMode,
    start:    f64,
    timer:    Deferred,
}

impl EnvelopeScheduler {
    /// `gain` is the envelope gain node; `duration` is clamped to a positive
    /// value so the ramp spacing is always defined.
    pub fn new(gain: GainId, duration: f64) -> Self {
        let duration = if duration.is_finite() && duration > 0.0 { duration } else { DEFAULT_DURATION };
        EnvelopeScheduler {
            gain,
            duration,
            state: SchedulerState::Idle,
            mode:  PlaybackMode::Loop,
            start: 0.0,
            timer: Deferred::default(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn timer(&self) -> &Deferred {
        &self.timer
    }

    pub fn is_running(&self) -> bool {
        self.state != SchedulerState::Idle
    }

    /// Enter `Scheduled`: wipe pending automation, pin the gain at zero,
    /// emit one ramp per curve point and arm the expiry.
    pub fn schedule(&mut self, graph: &mut dyn AudioGraph, curve: &EnvelopeCurve, mode: PlaybackMode) {
        let step = self.duration / NUM_POINTS as f64;
        let now = graph.schedule_curve(self.gain, curve.values(), step);

        self.start = now;
        self.mode = mode;
        self.timer.arm(now + self.duration);
        self.state = SchedulerState::Scheduled;
        debug!("envelope scheduled at {:.3}s ({})", now, self.mode_label());
    }

    /// Cancel everything and fade out over [`RELEASE_SECONDS`] from wherever
    /// the gain currently is.  A no-op when already idle.
    pub fn stop(&mut self, graph: &mut dyn AudioGraph) {
        if self.state == SchedulerState::Idle {
            return;
        }
        self.timer.cancel();
        self.release(graph);
        self.state = SchedulerState::Idle;
        debug!("envelope stopped");
    }

    /// Advance with the clock.  `live` is the curve used when looping.
    pub fn poll(&mut self, graph: &mut dyn AudioGraph, live: &EnvelopeCurve) -> PollOutcome {
        let now = graph.now();
        if self.state == SchedulerState::Scheduled && now > self.start {
            self.state = SchedulerState::Playing;
        }
        if !self.timer.fire(now) {
            return PollOutcome::Nothing;
        }
        match self.mode {
            PlaybackMode::Loop => {
                self.schedule(graph, live, PlaybackMode::Loop);
                PollOutcome::Rearmed
            }
            PlaybackMode::OneShot(_) => {
                self.release(graph);
                self.state = SchedulerState::Idle;
                debug!("one-shot envelope finished");
                PollOutcome::Finished
            }
        }
    }

    fn release(&mut self, graph: &mut dyn AudioGraph) {
        graph.release_gain(self.gain, RELEASE_SECONDS);
    }

    fn mode_label(&self) -> &'static str {
        match self.mode {
            PlaybackMode::Loop       => "loop",
            PlaybackMode::OneShot(_) => "one-shot",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
