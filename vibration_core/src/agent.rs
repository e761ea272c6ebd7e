//! Decorative agents drifting behind the menus.
//!
//! Ephemeral agents follow the energy of whatever the user is editing: the
//! active frequency sets how far they may swerve each frame.  Durable agents
//! carry a saved record and pulse through its envelope curve forever.

use std::f32::consts::TAU;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::envelope::EnvelopeCurve;
use crate::geometry::{map_range, Bounds, Point, Screen};
use crate::params::{Modulation, ParameterModel, WaveformType, MODULATOR_FREQ_MAX, PRIMITIVE_FREQ_MAX};
use crate::record::VibrationRecord;
use crate::stage::{Stage, SubMenu};
use crate::vibe::TargetVibration;

pub const POOL_SIZE:     usize = 75;
pub const GRID_COLS:     usize = 15;
pub const GRID_ROWS:     usize = 5;
pub const BOUNDS_MARGIN: f32   = 100.0;
pub const BASE_SIZE:     f32   = 30.0;
/// Saved glyphs draw at this multiple of `BASE_SIZE × curve value`.
pub const SAVED_SCALE:   f32   = 1.75;

// ════════════════════════════════════════════════════════════════════════════
// Agent
// ════════════════════════════════════════════════════════════════════════════

/// Record-derived playback attached to a durable agent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SavedPulse {
    pub record: VibrationRecord,
    curve:      EnvelopeCurve,
    cursor:     usize,
}

impl SavedPulse {
    pub fn new(record: VibrationRecord) -> Self {
        SavedPulse { record, curve: record.envelope_curve(), cursor: 0 }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Curve value under the cursor.
    pub fn value(&self) -> f32 {
        self.curve.at(self.cursor)
    }

    fn advance(&mut self) {
        self.cursor = (self.cursor + 1) % self.curve.len();
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Agent {
    pub position: Point,
    pub velocity: Point,
    /// Diameter of an ephemeral agent.
    pub size:     f32,
    /// Packed ARGB.
    pub colour:   u32,
    pub saved:    Option<SavedPulse>,
}

impl Agent {
    pub fn is_durable(&self) -> bool {
        self.saved.is_some()
    }

    /// Diameter to draw this frame.
    pub fn diameter(&self) -> f32 {
        match &self.saved {
            Some(p) => SAVED_SCALE * BASE_SIZE * p.value(),
            None    => self.size,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Motion policy
// ════════════════════════════════════════════════════════════════════════════

/// Which parameters drive the walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionSource {
    /// Primitive frequency drives both angle and speed.
    Primitive,
    /// Carrier drives the angle, modulator the speed.
    Modulated(Modulation),
}

impl MotionSource {
    pub fn for_wave(wave: WaveformType) -> Self {
        match wave.modulation() {
            None    => MotionSource::Primitive,
            Some(m) => MotionSource::Modulated(m),
        }
    }

    /// `(angle_range, speed_range)` from live parameters.
    pub fn ranges(&self, params: &ParameterModel) -> (f32, f32) {
        match self {
            MotionSource::Primitive => motion_ranges(params.primitive.frequency, None),
            MotionSource::Modulated(m) => {
                let v = params.modulated(*m);
                motion_ranges(v.carrier_frequency, Some(v.frequency))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionPolicy {
    pub source:         MotionSource,
    pub step_scale:     f32,
    /// Size follows the live envelope gain.
    pub tracks_envelope: bool,
}

/// Stage → motion policy for ephemeral agents.
pub fn motion_policy(stage: Stage) -> MotionPolicy {
    let policy = |source, step_scale| MotionPolicy { source, step_scale, tracks_envelope: false };
    match stage {
        Stage::SelectMode | Stage::Primitive | Stage::Synthesis(SubMenu::Menu) => {
            policy(MotionSource::Primitive, 2.0)
        }
        Stage::Synthesis(SubMenu::Am) => policy(MotionSource::Modulated(Modulation::Am), 4.0),
        Stage::Synthesis(SubMenu::Fm) => policy(MotionSource::Modulated(Modulation::Fm), 2.0),
        Stage::Envelope(wave) => MotionPolicy {
            tracks_envelope: true,
            ..policy(MotionSource::for_wave(wave), 2.0)
        },
    }
}

/// Angle range spans `[0, 2π]` over the carrier range; speed spans `[1, 5]`
/// over the modulator range, or over the carrier range when there is none.
fn motion_ranges(carrier: f32, modulator: Option<f32>) -> (f32, f32) {
    let angle = map_range(carrier, 0.0, PRIMITIVE_FREQ_MAX, 0.0, TAU);
    let speed = match modulator {
        Some(f) => map_range(f, 0.0, MODULATOR_FREQ_MAX, 1.0, 5.0),
        None    => map_range(carrier, 0.0, PRIMITIVE_FREQ_MAX, 1.0, 5.0),
    };
    (angle, speed)
}

/// One step of a random walk inside `bounds`.
///
/// Velocity is redrawn from `±angle_range` (x) and `±speed_range` (y), the
/// position moves by `step_scale × velocity`, and any axis that leaves the
/// bounds is clamped back with its velocity reflected.  An empty or
/// non-finite range contributes zero velocity.
pub fn bounded_random_walk<R: Rng + ?Sized>(
    position:    &mut Point,
    velocity:    &mut Point,
    angle_range: f32,
    speed_range: f32,
    step_scale:  f32,
    bounds:      &Bounds,
    rng:         &mut R,
) {
    velocity.x = symmetric(rng, angle_range);
    velocity.y = symmetric(rng, speed_range);
    position.x += step_scale * velocity.x;
    position.y += step_scale * velocity.y;

    if position.x < bounds.min.x || position.x > bounds.max.x {
        position.x = position.x.clamp(bounds.min.x, bounds.max.x);
        velocity.x = -velocity.x;
    }
    if position.y < bounds.min.y || position.y > bounds.max.y {
        position.y = position.y.clamp(bounds.min.y, bounds.max.y);
        velocity.y = -velocity.y;
    }
}

fn symmetric<R: Rng + ?Sized>(rng: &mut R, range: f32) -> f32 {
    let r = range.abs();
    if r.is_finite() && r > 0.0 {
        rng.gen_range(-r..r)
    } else {
        0.0
    }
}

fn below<R: Rng + ?Sized>(rng: &mut R, max: f32) -> f32 {
    if max.is_finite() && max > 0.0 {
        rng.gen_range(0.0..max)
    } else {
        0.0
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AgentSimulation
// ════════════════════════════════════════════════════════════════════════════

pub struct AgentSimulation {
    agents:    Vec<Agent>,
    pool_size: usize,
    rng:       SmallRng,
}

impl AgentSimulation {
    pub fn new(pool_size: usize, seed: u64) -> Self {
        AgentSimulation {
            agents: Vec::new(),
            pool_size,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn durable_count(&self) -> usize {
        self.agents.iter().filter(|a| a.is_durable()).count()
    }

    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    /// Centres of every durable agent, keyed by agent index.
    pub fn glyphs(&self) -> Vec<(usize, Point)> {
        self.agents
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_durable())
            .map(|(i, a)| (i, a.position))
            .collect()
    }

    pub fn saved_record(&self, index: usize) -> Option<VibrationRecord> {
        self.agents.get(index).and_then(|a| a.saved).map(|p| p.record)
    }

    /// Drop every ephemeral agent and lay a fresh pool on the grid.  Durable
    /// agents are kept, unchanged and first.
    pub fn regenerate(&mut self, screen: &Screen, params: &ParameterModel, target: TargetVibration) {
        self.agents.retain(|a| a.is_durable());
        let x_step = screen.width / GRID_COLS as f32;
        let y_step = screen.height / GRID_ROWS as f32;
        let max_v = params.primitive.frequency;
        for i in 0..self.pool_size {
            // x advances a fifth of a column per agent.
            let x = i as f32 * x_step / GRID_ROWS as f32;
            let row = i % GRID_ROWS;
            let velocity = Point::new(below(&mut self.rng, max_v), below(&mut self.rng, max_v));
            self.agents.push(Agent {
                position: Point::new(x, row as f32 * y_step),
                velocity,
                size:     BASE_SIZE,
                colour:   target.colour(),
                saved:    None,
            });
        }
    }

    /// Add a durable agent for `record` somewhere inside the margin.
    pub fn add_saved(&mut self, record: VibrationRecord, screen: &Screen, target: TargetVibration) {
        let b = screen.inset(BOUNDS_MARGIN);
        let x = if b.max.x > b.min.x { self.rng.gen_range(b.min.x..b.max.x) } else { b.min.x };
        let y = if b.max.y > b.min.y { self.rng.gen_range(b.min.y..b.max.y) } else { b.min.y };
        let durable = Agent {
            position: Point::new(x, y),
            velocity: Point::default(),
            size:     BASE_SIZE,
            colour:   target.colour(),
            saved:    Some(SavedPulse::new(record)),
        };
        let at = self.durable_count();
        self.agents.insert(at, durable);
    }

    /// Advance every agent one frame.  Each durable cursor moves exactly once.
    pub fn update(&mut self, stage: Stage, params: &ParameterModel, envelope_gain: f32, screen: &Screen) {
        let bounds = screen.inset(BOUNDS_MARGIN);
        let policy = motion_policy(stage);
        let (angle, speed) = policy.source.ranges(params);

        for agent in &mut self.agents {
            match agent.saved.as_mut() {
                Some(pulse) => {
                    let r = pulse.record;
                    let (a, s) = motion_ranges(
                        r.base_frequency(),
                        r.waveform_type().modulation().map(|_| r.modulator_frequency()),
                    );
                    let scale = pulse.value();
                    bounded_random_walk(
                        &mut agent.position, &mut agent.velocity, a, s, scale, &bounds, &mut self.rng,
                    );
                    pulse.advance();
                }
                None => {
                    agent.size = if policy.tracks_envelope { envelope_gain * BASE_SIZE } else { BASE_SIZE };
                    bounded_random_walk(
                        &mut agent.position,
                        &mut agent.velocity,
                        angle,
                        speed,
                        policy.step_scale,
                        &bounds,
                        &mut self.rng,
                    );
                }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
