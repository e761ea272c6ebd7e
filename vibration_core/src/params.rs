//! Synthesis parameters and the gesture-driven setters that mutate them.
//!
//! Every setter takes a raw pixel coordinate and remaps it linearly into the
//! parameter's declared range, clamping at both ends, so off-screen drags
//! land on the nearest legal value.  Setters return `true` when the stored value
//! actually changed so callers can push the change into live oscillators.

use std::f32::consts::{PI, TAU};

use crate::geometry::{map_clamped, Rect};

pub const PRIMITIVE_FREQ_MAX: f32 = 200.0;
pub const MODULATOR_FREQ_MAX: f32 = 20.0;
pub const AM_DEPTH_MAX:       f32 = 1.0;
pub const FM_DEPTH_MAX:       f32 = 100.0;

// ════════════════════════════════════════════════════════════════════════════
// Shape
// ════════════════════════════════════════════════════════════════════════════

/// Oscillator waveform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Shape {
    #[default]
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

impl Shape {
    pub const ALL: [Shape; 4] = [Shape::Sine, Shape::Square, Shape::Triangle, Shape::Sawtooth];

    pub fn name(&self) -> &'static str {
        match self {
            Shape::Sine     => "sine",
            Shape::Square   => "square",
            Shape::Triangle => "triangle",
            Shape::Sawtooth => "sawtooth",
        }
    }

    /// Value in `[-1, 1]` at phase angle `t` (radians, any magnitude).
    pub fn sample(&self, t: f32) -> f32 {
        match self {
            Shape::Sine     => t.sin(),
            Shape::Square   => if t.sin() >= 0.0 { 1.0 } else { -1.0 },
            Shape::Triangle => t.sin().asin() * 2.0 / PI,
            Shape::Sawtooth => t.rem_euclid(TAU) / TAU * 2.0 - 1.0,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Voice kinds
// ════════════════════════════════════════════════════════════════════════════

/// Which synthesis path a saved record or envelope playback uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WaveformType {
    #[default]
    Primitive,
    Am,
    Fm,
}

impl WaveformType {
    pub const ALL: [WaveformType; 3] = [WaveformType::Primitive, WaveformType::Am, WaveformType::Fm];

    pub fn name(&self) -> &'static str {
        match self {
            WaveformType::Primitive => "primitive",
            WaveformType::Am        => "am",
            WaveformType::Fm        => "fm",
        }
    }

    pub fn modulation(&self) -> Option<Modulation> {
        match self {
            WaveformType::Primitive => None,
            WaveformType::Am        => Some(Modulation::Am),
            WaveformType::Fm        => Some(Modulation::Fm),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Modulation {
    Am,
    Fm,
}

impl Modulation {
    pub fn waveform(&self) -> WaveformType {
        match self {
            Modulation::Am => WaveformType::Am,
            Modulation::Fm => WaveformType::Fm,
        }
    }

    pub fn depth_max(&self) -> f32 {
        match self {
            Modulation::Am => AM_DEPTH_MAX,
            Modulation::Fm => FM_DEPTH_MAX,
        }
    }
}

/// A frequency control a gesture can drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Knob {
    Primitive,
    Carrier(Modulation),
    Modulator(Modulation),
}

impl Knob {
    pub fn max(&self) -> f32 {
        match self {
            Knob::Primitive | Knob::Carrier(_) => PRIMITIVE_FREQ_MAX,
            Knob::Modulator(_)                 => MODULATOR_FREQ_MAX,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Voice / ModulatedVoice
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct Voice {
    pub frequency:          f32,
    pub shape:              Shape,
    pub oscillator_created: bool,
    pub playing:            bool,
}

impl Default for Voice {
    fn default() -> Self {
        Voice { frequency: 20.0, shape: Shape::Sine, oscillator_created: false, playing: false }
    }
}

/// Carrier + modulator pair used by both AM and FM.
#[derive(Clone, Debug, PartialEq)]
pub struct ModulatedVoice {
    pub depth:              f32,
    pub carrier_frequency:  f32,
    pub carrier_shape:      Shape,
    /// Modulator frequency.
    pub frequency:          f32,
    /// Modulator shape.
    pub shape:              Shape,
    pub oscillator_created: bool,
    pub playing:            bool,
}

impl ModulatedVoice {
    /// Carrier 20 Hz, modulator 5 Hz, both sine.  For AM, `depth` is the
    /// swing the modulator adds to a unity carrier gain, so AM is true
    /// amplitude modulation in [0, 1] rather than a modulator summed straight
    /// onto the carrier; for FM it is the frequency deviation in Hz.
    pub fn new(depth: f32) -> Self {
        ModulatedVoice {
            depth,
            carrier_frequency:  20.0,
            carrier_shape:      Shape::Sine,
            frequency:          5.0,
            shape:              Shape::Sine,
            oscillator_created: false,
            playing:            false,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ParameterModel
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct ParameterModel {
    pub primitive: Voice,
    pub am:        ModulatedVoice,
    pub fm:        ModulatedVoice,
}

impl Default for ParameterModel {
    fn default() -> Self {
        ParameterModel {
            primitive: Voice::default(),
            am:        ModulatedVoice::new(0.5),
            fm:        ModulatedVoice::new(20.0),
        }
    }
}

impl ParameterModel {
    pub fn modulated(&self, m: Modulation) -> &ModulatedVoice {
        match m {
            Modulation::Am => &self.am,
            Modulation::Fm => &self.fm,
        }
    }

    pub fn modulated_mut(&mut self, m: Modulation) -> &mut ModulatedVoice {
        match m {
            Modulation::Am => &mut self.am,
            Modulation::Fm => &mut self.fm,
        }
    }

    pub fn frequency(&self, knob: Knob) -> f32 {
        match knob {
            Knob::Primitive    => self.primitive.frequency,
            Knob::Carrier(m)   => self.modulated(m).carrier_frequency,
            Knob::Modulator(m) => self.modulated(m).frequency,
        }
    }

    /// Set a frequency from a horizontal pixel position.
    ///
    /// The mapping is inverted: the left screen edge is the top of the range.
    pub fn set_frequency(&mut self, knob: Knob, x: f32, width: f32) -> bool {
        let value = map_clamped(x, 0.0, width, knob.max(), 0.0);
        let slot = match knob {
            Knob::Primitive    => &mut self.primitive.frequency,
            Knob::Carrier(m)   => &mut self.modulated_mut(m).carrier_frequency,
            Knob::Modulator(m) => &mut self.modulated_mut(m).frequency,
        };
        replace(slot, value)
    }

    /// Select a waveform.  For AM/FM the carrier follows the modulator shape.
    pub fn set_shape(&mut self, voice: WaveformType, shape: Shape) -> bool {
        match voice.modulation() {
            None => {
                let changed = self.primitive.shape != shape;
                self.primitive.shape = shape;
                changed
            }
            Some(m) => {
                let v = self.modulated_mut(m);
                let changed = v.shape != shape || v.carrier_shape != shape;
                v.shape = shape;
                v.carrier_shape = shape;
                changed
            }
        }
    }

    /// Set modulation depth from a position across `slider`, left = 0.
    pub fn set_depth(&mut self, m: Modulation, x: f32, slider: &Rect) -> bool {
        let value = map_clamped(x, slider.x, slider.x + slider.w, 0.0, m.depth_max());
        replace(&mut self.modulated_mut(m).depth, value)
    }

    /// Clear every `playing` / `oscillator_created` flag after a teardown.
    pub fn mark_silent(&mut self) {
        self.primitive.playing = false;
        self.primitive.oscillator_created = false;
        for v in [&mut self.am, &mut self.fm] {
            v.playing = false;
            v.oscillator_created = false;
        }
    }
}

fn replace(slot: &mut f32, value: f32) -> bool {
    let changed = (*slot - value).abs() > f32::EPSILON;
    *slot = value;
    changed
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn primitive_frequency_maps_inversely() {
        let mut p = ParameterModel::default();
        assert!(p.set_frequency(Knob::Primitive, 0.0, 1000.0));
        assert_approx_eq!(p.primitive.frequency, 200.0);
        p.set_frequency(Knob::Primitive, 750.0, 1000.0);
        assert_approx_eq!(p.primitive.frequency, 50.0);
    }

    #[test]
    fn frequencies_never_leave_their_range() {
        let mut p = ParameterModel::default();
        for x in [-500.0, -1.0, 0.0, 640.0, 1280.0, 1281.0, 9000.0] {
            for knob in [
                Knob::Primitive,
                Knob::Carrier(Modulation::Am),
                Knob::Modulator(Modulation::Fm),
            ] {
                p.set_frequency(knob, x, 1280.0);
                let f = p.frequency(knob);
                assert!(f >= 0.0 && f <= knob.max(), "{:?} at x={} gave {}", knob, x, f);
            }
        }
    }

    #[test]
    fn modulator_range_is_twenty_hz() {
        let mut p = ParameterModel::default();
        p.set_frequency(Knob::Modulator(Modulation::Am), 0.0, 800.0);
        assert_approx_eq!(p.am.frequency, 20.0);
    }

    #[test]
    fn depth_clamped_to_band() {
        let mut p = ParameterModel::default();
        let slider = Rect::new(100.0, 0.0, 300.0, 60.0);
        p.set_depth(Modulation::Am, 10_000.0, &slider);
        assert_approx_eq!(p.am.depth, AM_DEPTH_MAX);
        p.set_depth(Modulation::Fm, -10.0, &slider);
        assert_approx_eq!(p.fm.depth, 0.0);
        p.set_depth(Modulation::Fm, 250.0, &slider);
        assert_approx_eq!(p.fm.depth, 50.0);
    }

    #[test]
    fn am_depth_is_a_unit_swing_and_fm_depth_is_hertz() {
        let p = ParameterModel::default();
        assert_approx_eq!(p.am.depth, AM_DEPTH_MAX / 2.0);
        assert_approx_eq!(p.fm.depth, 20.0);
        assert_approx_eq!(p.am.carrier_frequency, 20.0);
        assert_approx_eq!(p.am.frequency, 5.0);
    }

    #[test]
    fn modulated_shape_drives_carrier() {
        let mut p = ParameterModel::default();
        assert!(p.set_shape(WaveformType::Fm, Shape::Triangle));
        assert_eq!(p.fm.carrier_shape, Shape::Triangle);
        assert_eq!(p.am.shape, Shape::Sine);
        assert!(!p.set_shape(WaveformType::Fm, Shape::Triangle));
    }

    #[test]
    fn unchanged_value_reports_false() {
        let mut p = ParameterModel::default();
        p.set_frequency(Knob::Primitive, 100.0, 1000.0);
        assert!(!p.set_frequency(Knob::Primitive, 100.0, 1000.0));
    }

    #[test]
    fn shapes_stay_in_unit_range() {
        for s in Shape::ALL {
            for i in 0..200 {
                let v = s.sample(i as f32 * 0.1 - 7.0);
                assert!((-1.0..=1.0).contains(&v), "{} gave {}", s.name(), v);
            }
        }
    }
}
