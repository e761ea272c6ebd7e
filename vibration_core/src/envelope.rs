//! The 128-point amplitude curve and the gestures that sculpt it.

use crate::geometry::{lerp, map_clamped, map_range};

/// Samples per curve.
pub const NUM_POINTS: usize = 128;

/// Half-width of the sculpting kernel, in samples.
pub const SCULPT_RADIUS: usize = 8;

/// Amplitude over a fixed duration, every value in `[0, 1]`.
///
/// Backed by a plain array, so every copy is a deep copy: a saved record can
/// never alias the live curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopeCurve([f32; NUM_POINTS]);

impl Default for EnvelopeCurve {
    fn default() -> Self {
        EnvelopeCurve::default_adsr()
    }
}

impl EnvelopeCurve {
    /// Build from raw values, clamping each into `[0, 1]`.
    pub fn from_values(values: [f32; NUM_POINTS]) -> Self {
        let mut c = EnvelopeCurve(values);
        for v in c.0.iter_mut() {
            *v = clamp_unit(*v);
        }
        c
    }

    /// Attack over the first 10%, decay to zero over the next 70%, then flat
    /// zero for sustain and release.
    ///
    /// The sustain level is 0 and the release segment ramps from 0 to 0;
    /// both are kept as they are.
    pub fn default_adsr() -> Self {
        let n = NUM_POINTS as f32;
        let mut values = [0.0; NUM_POINTS];
        for (i, v) in values.iter_mut().enumerate() {
            let x = i as f32;
            *v = if x < n * 0.1 {
                map_range(x, 0.0, n * 0.1, 0.0, 1.0)
            } else if x < n * 0.8 {
                map_range(x, n * 0.1, n * 0.8, 1.0, 0.0)
            } else if x < n * 0.9 {
                0.0
            } else {
                map_range(x, n * 0.9, n, 0.0, 0.0)
            };
        }
        EnvelopeCurve::from_values(values)
    }

    pub fn values(&self) -> &[f32; NUM_POINTS] {
        &self.0
    }

    pub fn len(&self) -> usize {
        NUM_POINTS
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Value at `i`, wrapping around the curve.
    pub fn at(&self, i: usize) -> f32 {
        self.0[i % NUM_POINTS]
    }

    /// Pull the samples around `index` toward `target`.
    ///
    /// Each sample within `radius` moves `factor * 0.5` of the way, where
    /// `factor = 1 - |i - index| / radius`.  Out-of-range indices are clamped
    /// onto the curve and results stay in `[0, 1]`.
    pub fn sculpt(&mut self, index: usize, target: f32, radius: usize) {
        let index = index.min(NUM_POINTS - 1);
        let target = clamp_unit(target);
        let r = radius.max(1) as f32;
        let lo = index.saturating_sub(radius);
        let hi = (index + radius).min(NUM_POINTS - 1);
        for i in lo..=hi {
            let factor = 1.0 - (index as f32 - i as f32).abs() / r;
            self.0[i] = clamp_unit(lerp(self.0[i], target, factor * 0.5));
        }
    }

    /// Sculpt from a pointer position over a drawing area.
    ///
    /// `x` spans the curve across `[0, width]`; `y` maps `top` → 1 and
    /// `bottom` → 0.  Any position, including off-canvas, is accepted.
    pub fn sculpt_at(&mut self, x: f32, y: f32, width: f32, top: f32, bottom: f32) {
        let idx = map_range(x, 0.0, width, 0.0, NUM_POINTS as f32).floor();
        let index = if idx.is_nan() || idx < 0.0 { 0 } else { (idx as usize).min(NUM_POINTS - 1) };
        let value = map_clamped(y, top, bottom, 1.0, 0.0);
        self.sculpt(index, value, SCULPT_RADIUS);
    }
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
