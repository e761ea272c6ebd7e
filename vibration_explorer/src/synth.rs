//! Audio output: a `cpal` stream rendering the shared [`SoftwareGraph`].
//!
//! The frame loop drives the graph through [`SharedGraph`], which implements
//! [`AudioGraph`] by locking the same graph the audio callback renders.  The
//! lock is held for one graph call (frame loop) or one callback buffer (audio
//! thread), never longer.
//!
//! No output device is not an error: [`Synth::open`] falls back to a silent
//! graph whose clock follows the frame loop instead of the sound card.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use log::{error, info, warn};

use vibration_core::graph::{AudioGraph, GainId, Node, OscillatorId, Sink, SoftwareGraph};
use vibration_core::params::Shape;

/// Sample rate of the silent fallback graph.
pub const SILENT_SAMPLE_RATE: f32 = 48_000.0;

// ════════════════════════════════════════════════════════════════════════════
// SharedGraph
// ════════════════════════════════════════════════════════════════════════════

/// Cloneable handle to the one graph shared with the audio thread.
#[derive(Clone, Debug)]
pub struct SharedGraph(Arc<Mutex<SoftwareGraph>>);

impl SharedGraph {
    pub fn new(sample_rate: f32) -> Self {
        SharedGraph(Arc::new(Mutex::new(SoftwareGraph::new(sample_rate))))
    }

    /// A panic on the other side leaves the graph usable; keep going with it.
    fn lock(&self) -> MutexGuard<'_, SoftwareGraph> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn render(&self, out: &mut [f32]) {
        self.lock().render(out);
    }

    pub fn advance(&self, seconds: f64) {
        self.lock().advance(seconds);
    }

    pub fn oscillator_count(&self) -> usize {
        self.lock().oscillator_count()
    }
}

impl AudioGraph for SharedGraph {
    fn now(&self) -> f64 {
        self.lock().now()
    }

    fn create_oscillator(&mut self, shape: Shape, frequency: f32) -> OscillatorId {
        self.lock().create_oscillator(shape, frequency)
    }

    fn update_oscillator(&mut self, id: OscillatorId, shape: Shape, frequency: f32) {
        self.lock().update_oscillator(id, shape, frequency)
    }

    fn start_oscillator(&mut self, id: OscillatorId) {
        self.lock().start_oscillator(id)
    }

    fn stop_oscillator(&mut self, id: OscillatorId) {
        self.lock().stop_oscillator(id)
    }

    fn create_gain(&mut self, value: f32) -> GainId {
        self.lock().create_gain(value)
    }

    fn destroy_gain(&mut self, id: GainId) {
        self.lock().destroy_gain(id)
    }

    fn set_gain(&mut self, id: GainId, value: f32) {
        self.lock().set_gain(id, value)
    }

    fn connect(&mut self, from: Node, to: Sink) {
        self.lock().connect(from, to)
    }

    fn disconnect(&mut self, from: Node) {
        self.lock().disconnect(from)
    }

    fn gain_value(&self, id: GainId) -> f32 {
        self.lock().gain_value(id)
    }

    fn cancel_scheduled_values(&mut self, id: GainId, time: f64) {
        self.lock().cancel_scheduled_values(id, time)
    }

    fn set_value_at_time(&mut self, id: GainId, value: f32, time: f64) {
        self.lock().set_value_at_time(id, value, time)
    }

    fn linear_ramp_to_value_at_time(&mut self, id: GainId, value: f32, time: f64) {
        self.lock().linear_ramp_to_value_at_time(id, value, time)
    }

    // The audio thread cannot render between the clock read and the last ramp.

    fn schedule_curve(&mut self, id: GainId, values: &[f32], step: f64) -> f64 {
        self.lock().schedule_curve(id, values, step)
    }

    fn release_gain(&mut self, id: GainId, seconds: f64) -> f64 {
        self.lock().release_gain(id, seconds)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Synth
// ════════════════════════════════════════════════════════════════════════════

pub struct Synth {
    graph:  SharedGraph,
    /// `None` when running silent.
    stream: Option<Stream>,
}

impl Synth {
    /// Open the default output device, or fall back to a silent graph.
    pub fn open() -> Self {
        match open_stream() {
            Ok((graph, stream)) => Synth { graph, stream: Some(stream) },
            Err(e) => {
                warn!("[synth] no audio output ({:#}); running silent", e);
                Synth::silent()
            }
        }
    }

    pub fn silent() -> Self {
        Synth { graph: SharedGraph::new(SILENT_SAMPLE_RATE), stream: None }
    }

    pub fn is_live(&self) -> bool {
        self.stream.is_some()
    }

    /// Handle for the frame loop.
    pub fn graph(&self) -> SharedGraph {
        self.graph.clone()
    }

    /// Keep a silent graph's clock moving with wall time.  A live graph is
    /// clocked by the device.
    pub fn follow_clock(&self, seconds: f64) {
        if !self.is_live() {
            self.graph.advance(seconds);
        }
    }
}

fn open_stream() -> anyhow::Result<(SharedGraph, Stream)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("no default output device"))?;
    let supported = device
        .default_output_config()
        .context("querying default output config")?;

    let sample_rate = supported.sample_rate().0 as f32;
    let graph = SharedGraph::new(sample_rate);
    let config: StreamConfig = supported.config();

    let stream = match supported.sample_format() {
        SampleFormat::F32 => build::<f32>(&device, &config, graph.clone()),
        SampleFormat::I16 => build::<i16>(&device, &config, graph.clone()),
        SampleFormat::U16 => build::<u16>(&device, &config, graph.clone()),
        other             => Err(anyhow!("unsupported sample format {:?}", other)),
    }?;
    stream.play().context("starting output stream")?;

    info!(
        "[synth] {} @ {} Hz, {} ch",
        device.name().unwrap_or_default(),
        sample_rate,
        config.channels
    );
    Ok((graph, stream))
}

fn build<T>(device: &cpal::Device, config: &StreamConfig, graph: SharedGraph) -> anyhow::Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut mono: Vec<f32> = Vec::new();

    let err_fn = |err| error!("[synth] stream error: {}", err);

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _| {
                let frames = data.len() / channels.max(1);
                mono.resize(frames, 0.0);
                graph.render(&mut mono);
                write_data(data, channels, &mono);
            },
            err_fn,
            None,
        )
        .context("building output stream")
}

/// Copy mono samples to every channel of an interleaved buffer.
fn write_data<T>(output: &mut [T], channels: usize, mono: &[f32])
where
    T: SizedSample + FromSample<f32>,
{
    for (frame, value) in output.chunks_mut(channels.max(1)).zip(mono) {
        let sample: T = T::from_sample(*value);
        for out in frame.iter_mut() {
            *out = sample;
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
