//! The handful of graph nodes the core owns.
//!
//! Two gains live for the whole session (master → speakers, envelope →
//! master).  At most one carrier and one modulator exist at a time, plus the
//! depth gain between them and, for AM, the gain the modulator rides on.
//! [`Voices::teardown`] is idempotent and always leaves every optional handle
//! `None`, so a following `start` can never double-attach.

use log::debug;

use crate::graph::{AudioGraph, GainId, Node, OscillatorId, Sink};
use crate::params::{Modulation, ParameterModel, Shape, WaveformType};
use crate::record::VibrationRecord;

/// Master output level.
pub const MASTER_LEVEL: f32 = 0.9;

/// Which gain a new voice feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Straight into the master gain.
    Direct,
    /// Through the envelope gain driven by the scheduler.
    Enveloped,
}

// ════════════════════════════════════════════════════════════════════════════
// VoicePatch
// ════════════════════════════════════════════════════════════════════════════

/// Everything needed to build a voice in the graph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoicePatch {
    pub waveform:            WaveformType,
    pub carrier_shape:       Shape,
    pub carrier_frequency:   f32,
    pub modulator_shape:     Shape,
    pub modulator_frequency: f32,
    pub depth:               f32,
}

impl VoicePatch {
    /// The live configuration of `waveform`.
    pub fn from_params(params: &ParameterModel, waveform: WaveformType) -> Self {
        match waveform.modulation() {
            None => VoicePatch {
                waveform,
                carrier_shape:       params.primitive.shape,
                carrier_frequency:   params.primitive.frequency,
                modulator_shape:     Shape::Sine,
                modulator_frequency: 0.0,
                depth:               0.0,
            },
            Some(m) => {
                let v = params.modulated(m);
                VoicePatch {
                    waveform,
                    carrier_shape:       v.carrier_shape,
                    carrier_frequency:   v.carrier_frequency,
                    modulator_shape:     v.shape,
                    modulator_frequency: v.frequency,
                    depth:               v.depth,
                }
            }
        }
    }

    /// A saved record.  Records carry no shape or depth, so replay uses sine
    /// waves and the current depth for the record's modulation.
    pub fn from_record(record: &VibrationRecord, params: &ParameterModel) -> Self {
        VoicePatch {
            waveform:            record.waveform_type(),
            carrier_shape:       Shape::Sine,
            carrier_frequency:   record.base_frequency(),
            modulator_shape:     Shape::Sine,
            modulator_frequency: record.modulator_frequency(),
            depth:               record
                .waveform_type()
                .modulation()
                .map_or(0.0, |m| params.modulated(m).depth),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Voices
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct Voices {
    master:    GainId,
    envelope:  GainId,
    carrier:   Option<OscillatorId>,
    modulator: Option<OscillatorId>,
    depth:     Option<GainId>,
    am_gain:   Option<GainId>,
    active:    Option<WaveformType>,
}

impl Voices {
    /// Build the permanent master and envelope gains.
    pub fn new(graph: &mut dyn AudioGraph) -> Self {
        let master = graph.create_gain(MASTER_LEVEL);
        graph.connect(Node::Gain(master), Sink::Destination);
        let envelope = graph.create_gain(0.0);
        graph.connect(Node::Gain(envelope), Sink::Gain(master));
        Voices {
            master,
            envelope,
            carrier:   None,
            modulator: None,
            depth:     None,
            am_gain:   None,
            active:    None,
        }
    }

    pub fn envelope(&self) -> GainId {
        self.envelope
    }

    pub fn carrier(&self) -> Option<OscillatorId> {
        self.carrier
    }

    pub fn modulator(&self) -> Option<OscillatorId> {
        self.modulator
    }

    pub fn is_active(&self) -> bool {
        self.carrier.is_some()
    }

    /// Which waveform is currently sounding, if any.
    pub fn active(&self) -> Option<WaveformType> {
        self.active
    }

    /// Build and start a voice, replacing whatever was playing.
    pub fn start(&mut self, graph: &mut dyn AudioGraph, patch: &VoicePatch, route: Route) {
        self.teardown(graph);

        let out = match route {
            Route::Direct    => Sink::Gain(self.master),
            Route::Enveloped => Sink::Gain(self.envelope),
        };

        let carrier = graph.create_oscillator(patch.carrier_shape, patch.carrier_frequency);
        self.carrier = Some(carrier);

        match patch.waveform.modulation() {
            None => graph.connect(Node::Oscillator(carrier), out),
            Some(m) => {
                let modulator = graph.create_oscillator(patch.modulator_shape, patch.modulator_frequency);
                let depth = graph.create_gain(patch.depth);
                graph.connect(Node::Oscillator(modulator), Sink::Gain(depth));
                match m {
                    Modulation::Am => {
                        let am = graph.create_gain(1.0);
                        graph.connect(Node::Oscillator(carrier), Sink::Gain(am));
                        graph.connect(Node::Gain(depth), Sink::GainParam(am));
                        graph.connect(Node::Gain(am), out);
                        self.am_gain = Some(am);
                    }
                    Modulation::Fm => {
                        graph.connect(Node::Gain(depth), Sink::Frequency(carrier));
                        graph.connect(Node::Oscillator(carrier), out);
                    }
                }
                graph.start_oscillator(modulator);
                self.modulator = Some(modulator);
                self.depth = Some(depth);
            }
        }

        graph.start_oscillator(carrier);
        self.active = Some(patch.waveform);
        debug!("voice started: {} via {:?}", patch.waveform.name(), route);
    }

    /// Push changed parameters into live oscillators without recreating them.
    pub fn retune(&mut self, graph: &mut dyn AudioGraph, patch: &VoicePatch) {
        if self.active != Some(patch.waveform) {
            return;
        }
        if let Some(c) = self.carrier {
            graph.update_oscillator(c, patch.carrier_shape, patch.carrier_frequency);
        }
        if let Some(m) = self.modulator {
            graph.update_oscillator(m, patch.modulator_shape, patch.modulator_frequency);
        }
        if let Some(d) = self.depth {
            graph.set_gain(d, patch.depth);
        }
    }

    /// Detach the voice from the permanent gains first, then stop every
    /// oscillator and drop every per-voice node.  Safe to call when nothing
    /// is playing.  Returns whether anything was torn down.
    pub fn teardown(&mut self, graph: &mut dyn AudioGraph) -> bool {
        let outputs = [
            self.carrier.map(Node::Oscillator),
            self.am_gain.map(Node::Gain),
            self.modulator.map(Node::Oscillator),
            self.depth.map(Node::Gain),
        ];
        for node in outputs.into_iter().flatten() {
            graph.disconnect(node);
        }

        let mut any = false;
        if let Some(c) = self.carrier.take() {
            graph.stop_oscillator(c);
            any = true;
        }
        if let Some(m) = self.modulator.take() {
            graph.stop_oscillator(m);
            any = true;
        }
        if let Some(d) = self.depth.take() {
            graph.destroy_gain(d);
            any = true;
        }
        if let Some(a) = self.am_gain.take() {
            graph.destroy_gain(a);
            any = true;
        }
        self.active = None;
        any
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SoftwareGraph;

    fn patch(p: &ParameterModel, w: WaveformType) -> VoicePatch {
        VoicePatch::from_params(p, w)
    }

    #[test]
    fn permanent_gains_wired_at_start() {
        let mut g = SoftwareGraph::new(48_000.0);
        let v = Voices::new(&mut g);
        assert!(g.is_connected(Node::Gain(v.master), Sink::Destination));
        assert!(g.is_connected(Node::Gain(v.envelope()), Sink::Gain(v.master)));
        assert!((g.gain_value(v.master) - MASTER_LEVEL).abs() < 1e-6);
        assert_eq!(g.gain_value(v.envelope()), 0.0);
    }

    #[test]
    fn teardown_is_idempotent() {
        let mut g = SoftwareGraph::new(48_000.0);
        let mut v = Voices::new(&mut g);
        let p = ParameterModel::default();
        v.start(&mut g, &patch(&p, WaveformType::Am), Route::Direct);
        assert_eq!(g.oscillator_count(), 2);
        assert!(v.teardown(&mut g));
        assert!(!v.teardown(&mut g));
        assert_eq!(g.oscillator_count(), 0);
        assert_eq!(g.gain_count(), 2);
        assert!(v.carrier().is_none() && v.modulator().is_none());
    }

    #[test]
    fn teardown_detaches_am_voice_from_envelope() {
        let mut g = SoftwareGraph::new(1_000.0);
        let mut v = Voices::new(&mut g);
        let p = ParameterModel::default();
        v.start(&mut g, &patch(&p, WaveformType::Am), Route::Enveloped);
        let am = v.am_gain.unwrap();
        let carrier = v.carrier().unwrap();
        assert!(g.is_connected(Node::Gain(am), Sink::Gain(v.envelope())));

        v.teardown(&mut g);
        assert!(!g.is_connected(Node::Gain(am), Sink::Gain(v.envelope())));
        assert!(!g.is_connected(Node::Oscillator(carrier), Sink::Gain(am)));
        // Only the permanent chain is left: envelope → master → speakers.
        g.set_gain(v.envelope(), 1.0);
        let mut buf = [1.0; 8];
        g.render(&mut buf);
        assert!(buf.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn restart_never_double_attaches() {
        let mut g = SoftwareGraph::new(48_000.0);
        let mut v = Voices::new(&mut g);
        let p = ParameterModel::default();
        for w in [WaveformType::Primitive, WaveformType::Fm, WaveformType::Fm, WaveformType::Am] {
            v.start(&mut g, &patch(&p, w), Route::Enveloped);
        }
        assert_eq!(g.oscillator_count(), 2);
        assert_eq!(g.gain_count(), 4);
    }

    #[test]
    fn fm_modulator_feeds_carrier_frequency() {
        let mut g = SoftwareGraph::new(48_000.0);
        let mut v = Voices::new(&mut g);
        let p = ParameterModel::default();
        v.start(&mut g, &patch(&p, WaveformType::Fm), Route::Enveloped);
        let carrier = v.carrier().unwrap();
        assert!(g.is_connected(Node::Oscillator(carrier), Sink::Gain(v.envelope())));
    }

    #[test]
    fn retune_updates_in_place() {
        let mut g = SoftwareGraph::new(48_000.0);
        let mut v = Voices::new(&mut g);
        let mut p = ParameterModel::default();
        v.start(&mut g, &patch(&p, WaveformType::Primitive), Route::Direct);
        let id = v.carrier().unwrap();
        p.primitive.frequency = 150.0;
        p.primitive.shape = Shape::Sawtooth;
        v.retune(&mut g, &patch(&p, WaveformType::Primitive));
        assert_eq!(v.carrier(), Some(id));
        assert_eq!(g.oscillator(id), Some((Shape::Sawtooth, 150.0)));
    }

    #[test]
    fn retune_ignores_other_waveform() {
        let mut g = SoftwareGraph::new(48_000.0);
        let mut v = Voices::new(&mut g);
        let mut p = ParameterModel::default();
        v.start(&mut g, &patch(&p, WaveformType::Primitive), Route::Direct);
        let id = v.carrier().unwrap();
        p.am.carrier_frequency = 199.0;
        v.retune(&mut g, &patch(&p, WaveformType::Am));
        assert_eq!(g.oscillator(id), Some((Shape::Sine, 20.0)));
    }
}
