//! Saved sound configurations.

use log::info;

use crate::envelope::EnvelopeCurve;
use crate::params::{ParameterModel, WaveformType};

/// An immutable snapshot of one voice plus its envelope.
///
/// Fields are private: once built a record only hands out copies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VibrationRecord {
    waveform_type:       WaveformType,
    envelope_curve:      EnvelopeCurve,
    base_frequency:      f32,
    modulator_frequency: f32,
}

impl VibrationRecord {
    pub fn new(
        waveform_type:       WaveformType,
        envelope_curve:      EnvelopeCurve,
        base_frequency:      f32,
        modulator_frequency: f32,
    ) -> Self {
        VibrationRecord { waveform_type, envelope_curve, base_frequency, modulator_frequency }
    }

    /// Capture the live configuration of `waveform` together with `curve`.
    /// The primitive voice has no modulator, so its modulator frequency is 0.
    pub fn capture(params: &ParameterModel, waveform: WaveformType, curve: &EnvelopeCurve) -> Self {
        match waveform.modulation() {
            None => VibrationRecord::new(waveform, *curve, params.primitive.frequency, 0.0),
            Some(m) => {
                let v = params.modulated(m);
                VibrationRecord::new(waveform, *curve, v.carrier_frequency, v.frequency)
            }
        }
    }

    pub fn waveform_type(&self) -> WaveformType {
        self.waveform_type
    }

    pub fn envelope_curve(&self) -> EnvelopeCurve {
        self.envelope_curve
    }

    pub fn base_frequency(&self) -> f32 {
        self.base_frequency
    }

    pub fn modulator_frequency(&self) -> f32 {
        self.modulator_frequency
    }
}

/// Every record saved this session, oldest first.
#[derive(Clone, Debug, Default)]
pub struct RecordStore {
    records: Vec<VibrationRecord>,
}

impl RecordStore {
    pub fn save(&mut self, record: VibrationRecord) -> usize {
        self.records.push(record);
        info!(
            "saved vibration #{}: {} base={:.1}Hz mod={:.1}Hz",
            self.records.len(),
            record.waveform_type().name(),
            record.base_frequency(),
            record.modulator_frequency(),
        );
        self.records.len() - 1
    }

    pub fn get(&self, i: usize) -> Option<&VibrationRecord> {
        self.records.get(i)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VibrationRecord> {
        self.records.iter()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
