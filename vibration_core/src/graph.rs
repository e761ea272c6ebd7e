//! The audio-graph interface the core drives, and a software implementation.
//!
//! The core only ever talks to [`AudioGraph`].  [`SoftwareGraph`] implements
//! it in-process with sample-accurate gain automation; the binary wraps one
//! behind a `cpal` stream, and tests drive one directly with a manual clock.
//!
//! Node ids are never reused, so a stale handle simply stops matching
//! anything; every operation on an unknown id is a no-op.

use std::collections::HashMap;

use crate::params::Shape;

// ════════════════════════════════════════════════════════════════════════════
// Handles and routing
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OscillatorId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GainId(pub u32);

/// Something that produces a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Node {
    Oscillator(OscillatorId),
    Gain(GainId),
}

/// Where a signal can be connected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sink {
    /// The speakers.
    Destination,
    /// The audio input of a gain node.
    Gain(GainId),
    /// Summed onto a gain node's gain parameter (amplitude modulation).
    GainParam(GainId),
    /// Summed onto an oscillator's frequency (frequency modulation).
    Frequency(OscillatorId),
}

// ════════════════════════════════════════════════════════════════════════════
// AudioGraph
// ════════════════════════════════════════════════════════════════════════════

/// Oscillator and gain primitives with scheduled gain automation.
///
/// Times are absolute seconds on the graph's own clock ([`AudioGraph::now`]).
pub trait AudioGraph {
    fn now(&self) -> f64;

    fn create_oscillator(&mut self, shape: Shape, frequency: f32) -> OscillatorId;
    /// Change a live oscillator in place (no restart, no phase reset).
    fn update_oscillator(&mut self, id: OscillatorId, shape: Shape, frequency: f32);
    fn start_oscillator(&mut self, id: OscillatorId);
    /// Stop and release an oscillator.  Stopped oscillators cannot restart.
    fn stop_oscillator(&mut self, id: OscillatorId);

    fn create_gain(&mut self, value: f32) -> GainId;
    fn destroy_gain(&mut self, id: GainId);
    /// Set a gain immediately, dropping any automation.
    fn set_gain(&mut self, id: GainId, value: f32);

    fn connect(&mut self, from: Node, to: Sink);
    fn disconnect(&mut self, from: Node);

    /// Current value of a gain parameter, automation included.
    fn gain_value(&self, id: GainId) -> f32;
    fn cancel_scheduled_values(&mut self, id: GainId, time: f64);
    fn set_value_at_time(&mut self, id: GainId, value: f32, time: f64);
    fn linear_ramp_to_value_at_time(&mut self, id: GainId, value: f32, time: f64);

    // ── Batched automation ────────────────────────────────────────────────
    //
    // Each runs against a single clock reading.  A graph shared with an audio
    // thread overrides them to hold its lock for the whole batch.

    /// Drop pending automation on `id`, pin it at zero now, then ramp through
    /// `values` one point every `step` seconds.  Returns the start time.
    fn schedule_curve(&mut self, id: GainId, values: &[f32], step: f64) -> f64 {
        let now = self.now();
        self.cancel_scheduled_values(id, now);
        self.set_value_at_time(id, 0.0, now);
        for (i, v) in values.iter().enumerate() {
            self.linear_ramp_to_value_at_time(id, *v, now + i as f64 * step);
        }
        now
    }

    /// Hold `id` at its current value and ramp it to zero over `seconds`.
    /// Returns the time the release starts.
    fn release_gain(&mut self, id: GainId, seconds: f64) -> f64 {
        let now = self.now();
        let current = self.gain_value(id);
        self.cancel_scheduled_values(id, now);
        self.set_value_at_time(id, current, now);
        self.linear_ramp_to_value_at_time(id, 0.0, now + seconds);
        now
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AutomatedParam
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamEvent {
    SetValue   { value: f32, time: f64 },
    LinearRamp { value: f32, time: f64 },
}

impl ParamEvent {
    pub fn time(&self) -> f64 {
        match self {
            ParamEvent::SetValue { time, .. } | ParamEvent::LinearRamp { time, .. } => *time,
        }
    }

    pub fn value(&self) -> f32 {
        match self {
            ParamEvent::SetValue { value, .. } | ParamEvent::LinearRamp { value, .. } => *value,
        }
    }
}

/// A parameter with a time-ordered list of set/ramp events.
///
/// A ramp interpolates linearly from the previous event (value and time) to
/// its own target; before the first event the base value holds.
#[derive(Clone, Debug, PartialEq)]
pub struct AutomatedParam {
    base:   f32,
    events: Vec<ParamEvent>,
}

impl AutomatedParam {
    pub fn new(value: f32) -> Self {
        AutomatedParam { base: value, events: Vec::new() }
    }

    pub fn events(&self) -> &[ParamEvent] {
        &self.events
    }

    pub fn set(&mut self, value: f32) {
        self.base = value;
        self.events.clear();
    }

    pub fn value_at(&self, t: f64) -> f32 {
        let mut prev_value = self.base;
        let mut prev_time = self.events.first().map_or(t, |e| e.time().min(t));
        for e in &self.events {
            if e.time() <= t {
                prev_value = e.value();
                prev_time = e.time();
                continue;
            }
            return match *e {
                ParamEvent::LinearRamp { value, time } => {
                    let span = time - prev_time;
                    if span <= 0.0 {
                        value
                    } else {
                        let k = ((t - prev_time) / span) as f32;
                        prev_value + (value - prev_value) * k
                    }
                }
                ParamEvent::SetValue { .. } => prev_value,
            };
        }
        prev_value
    }

    /// Insert keeping time order; equal times keep insertion order.
    pub fn schedule(&mut self, event: ParamEvent) {
        let at = self.events.iter().position(|e| e.time() > event.time()).unwrap_or(self.events.len());
        self.events.insert(at, event);
    }

    /// Drop every event at or after `t`.
    pub fn cancel_from(&mut self, t: f64) {
        self.events.retain(|e| e.time() < t);
    }

    /// Fold events that can no longer influence values at or after `t` into
    /// the base value.
    pub fn prune(&mut self, t: f64) {
        while self.events.len() >= 2 && self.events[1].time() <= t {
            self.base = self.events[0].value();
            self.events.remove(0);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SoftwareGraph
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
struct OscNode {
    shape:     Shape,
    frequency: f32,
    phase:     f32,
    started:   bool,
}

/// Maximum gain-chain depth followed when evaluating a sample.
const MAX_DEPTH: usize = 8;

/// In-process audio graph.  The clock advances only when samples are rendered
/// or when [`SoftwareGraph::advance`] is called.
///
/// Rendering runs on the audio thread, so the per-sample path neither
/// allocates nor scans the edge list: sink → sources lookups come from
/// `inputs`, rebuilt only when the wiring changes.
#[derive(Clone, Debug)]
pub struct SoftwareGraph {
    sample_rate: f32,
    clock:       f64,
    next_id:     u32,
    oscillators: HashMap<OscillatorId, OscNode>,
    gains:       HashMap<GainId, AutomatedParam>,
    edges:       Vec<(Node, Sink)>,
    inputs:      HashMap<Sink, Vec<Node>>,
    /// Per-sample oscillator frequencies, reused from sample to sample.
    scratch:     Vec<(OscillatorId, f32)>,
    rewires:     u64,
}

impl SoftwareGraph {
    pub fn new(sample_rate: f32) -> Self {
        SoftwareGraph {
            sample_rate: sample_rate.max(1.0),
            clock:       0.0,
            next_id:     0,
            oscillators: HashMap::new(),
            gains:       HashMap::new(),
            edges:       Vec::new(),
            inputs:      HashMap::new(),
            scratch:     Vec::new(),
            rewires:     0,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Move the clock forward without rendering (silent mode, tests).
    pub fn advance(&mut self, seconds: f64) {
        self.clock += seconds.max(0.0);
        self.prune();
    }

    /// Automation events scheduled on a gain, for inspection.
    pub fn gain_events(&self, id: GainId) -> &[ParamEvent] {
        self.gains.get(&id).map(|p| p.events()).unwrap_or(&[])
    }

    pub fn oscillator_count(&self) -> usize {
        self.oscillators.len()
    }

    pub fn gain_count(&self) -> usize {
        self.gains.len()
    }

    pub fn is_connected(&self, from: Node, to: Sink) -> bool {
        self.edges.contains(&(from, to))
    }

    pub fn oscillator(&self, id: OscillatorId) -> Option<(Shape, f32)> {
        self.oscillators.get(&id).map(|o| (o.shape, o.frequency))
    }

    /// How many times the sink → sources map has been rebuilt.
    pub fn rewire_count(&self) -> u64 {
        self.rewires
    }

    /// Render mono samples into `out`, advancing the clock.
    pub fn render(&mut self, out: &mut [f32]) {
        let dt = 1.0 / self.sample_rate as f64;
        for sample in out.iter_mut() {
            *sample = self.input_sum(Sink::Destination, self.clock, 0).clamp(-1.0, 1.0);
            self.step_phases(self.clock);
            self.clock += dt;
        }
        self.prune();
    }

    fn alloc(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn rewire(&mut self) {
        self.inputs.clear();
        for (from, to) in &self.edges {
            self.inputs.entry(*to).or_default().push(*from);
        }
        self.rewires += 1;
    }

    fn prune(&mut self) {
        let t = self.clock;
        for p in self.gains.values_mut() {
            p.prune(t);
        }
    }

    fn output(&self, node: Node, t: f64, depth: usize) -> f32 {
        if depth > MAX_DEPTH {
            return 0.0;
        }
        match node {
            Node::Oscillator(id) => match self.oscillators.get(&id) {
                Some(o) if o.started => o.shape.sample(o.phase),
                _ => 0.0,
            },
            Node::Gain(id) => match self.gains.get(&id) {
                Some(p) => {
                    let g = p.value_at(t) + self.input_sum(Sink::GainParam(id), t, depth + 1);
                    g * self.input_sum(Sink::Gain(id), t, depth + 1)
                }
                None => 0.0,
            },
        }
    }

    fn input_sum(&self, sink: Sink, t: f64, depth: usize) -> f32 {
        self.inputs
            .get(&sink)
            .map_or(0.0, |sources| sources.iter().map(|from| self.output(*from, t, depth)).sum())
    }

    /// Frequencies are read for every oscillator before any phase moves, so
    /// FM sees the modulator's phase from the same sample.
    fn step_phases(&mut self, t: f64) {
        let mut freqs = std::mem::take(&mut self.scratch);
        freqs.clear();
        freqs.extend(
            self.oscillators
                .iter()
                .filter(|(_, o)| o.started)
                .map(|(id, o)| (*id, o.frequency + self.input_sum(Sink::Frequency(*id), t, 0))),
        );
        let step = std::f32::consts::TAU / self.sample_rate;
        for (id, f) in &freqs {
            if let Some(o) = self.oscillators.get_mut(id) {
                o.phase = (o.phase + f * step).rem_euclid(std::f32::consts::TAU);
            }
        }
        self.scratch = freqs;
    }
}

impl AudioGraph for SoftwareGraph {
    fn now(&self) -> f64 {
        self.clock
    }

    fn create_oscillator(&mut self, shape: Shape, frequency: f32) -> OscillatorId {
        let id = OscillatorId(self.alloc());
        self.oscillators.insert(id, OscNode { shape, frequency, phase: 0.0, started: false });
        id
    }

    fn update_oscillator(&mut self, id: OscillatorId, shape: Shape, frequency: f32) {
        if let Some(o) = self.oscillators.get_mut(&id) {
            o.shape = shape;
            o.frequency = frequency;
        }
    }

    fn start_oscillator(&mut self, id: OscillatorId) {
        if let Some(o) = self.oscillators.get_mut(&id) {
            o.started = true;
        }
    }

    fn stop_oscillator(&mut self, id: OscillatorId) {
        self.oscillators.remove(&id);
        self.edges.retain(|(from, to)| {
            *from != Node::Oscillator(id) && *to != Sink::Frequency(id)
        });
        self.rewire();
    }

    fn create_gain(&mut self, value: f32) -> GainId {
        let id = GainId(self.alloc());
        self.gains.insert(id, AutomatedParam::new(value));
        id
    }

    fn destroy_gain(&mut self, id: GainId) {
        self.gains.remove(&id);
        self.edges.retain(|(from, to)| {
            *from != Node::Gain(id) && *to != Sink::Gain(id) && *to != Sink::GainParam(id)
        });
        self.rewire();
    }

    fn set_gain(&mut self, id: GainId, value: f32) {
        if let Some(p) = self.gains.get_mut(&id) {
            p.set(value);
        }
    }

    fn connect(&mut self, from: Node, to: Sink) {
        if !self.edges.contains(&(from, to)) {
            self.edges.push((from, to));
            self.rewire();
        }
    }

    fn disconnect(&mut self, from: Node) {
        let before = self.edges.len();
        self.edges.retain(|(f, _)| *f != from);
        if self.edges.len() != before {
            self.rewire();
        }
    }

    fn gain_value(&self, id: GainId) -> f32 {
        self.gains.get(&id).map_or(0.0, |p| p.value_at(self.clock))
    }

    fn cancel_scheduled_values(&mut self, id: GainId, time: f64) {
        if let Some(p) = self.gains.get_mut(&id) {
            p.cancel_from(time);
        }
    }

    fn set_value_at_time(&mut self, id: GainId, value: f32, time: f64) {
        if let Some(p) = self.gains.get_mut(&id) {
            p.schedule(ParamEvent::SetValue { value, time });
        }
    }

    fn linear_ramp_to_value_at_time(&mut self, id: GainId, value: f32, time: f64) {
        if let Some(p) = self.gains.get_mut(&id) {
            p.schedule(ParamEvent::LinearRamp { value, time });
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
