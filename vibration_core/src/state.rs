//! The single owned application state and its per-frame update.
//!
//! One call to [`ApplicationState::tick`] per display frame, in this order:
//!
//! ```text
//!   1. frame += 1
//!   2. agents step (stage policy, live envelope gain)
//!   3. landmark frame → GestureDetector
//!   4. stage::evaluate → at most one Action
//!   5. no action → route pinch input into parameters / envelope
//!   6. playback cadence (Primitive, AM/FM, Envelope)
//!   7. scheduler poll (loop re-arm or one-shot finish)
//!   8. fade alpha += 3
//! ```
//!
//! Every navigation goes through [`ApplicationState::transition`], which is
//! the only place audio is torn down on a screen change.

use log::{debug, info};

use crate::agent::{AgentSimulation, POOL_SIZE};
use crate::envelope::EnvelopeCurve;
use crate::geometry::{Point, Screen};
use crate::gesture::{GestureDetector, HandLandmarks, HandState, PinchEvent, PINCH_THRESHOLD};
use crate::graph::AudioGraph;
use crate::layout::Layout;
use crate::params::{Knob, ParameterModel, WaveformType};
use crate::record::{RecordStore, VibrationRecord};
use crate::scheduler::{EnvelopeScheduler, PlaybackMode, PollOutcome, DEFAULT_DURATION};
use crate::stage::{self, Action, Stage};
use crate::vibe::TargetVibration;
use crate::voices::{Route, VoicePatch, Voices};

/// Alpha gained per frame while a screen fades in.
pub const FADE_STEP: u8 = 3;
/// Fully faded in; only now do targets accept selections.
pub const MAX_ALPHA: u8 = 255;
/// Frames between playback toggles.
pub const PLAY_PERIOD: u64 = 120;
/// Frames between restart attempts after a modulated voice was switched off.
pub const RESTART_PERIOD: u64 = 10;

// ════════════════════════════════════════════════════════════════════════════
// ExplorerSettings
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct ExplorerSettings {
    pub screen:            Screen,
    /// Seconds for one pass through the envelope curve.
    pub envelope_duration: f64,
    pub pool_size:         usize,
    pub seed:              u64,
    pub pinch_threshold:   f32,
}

impl Default for ExplorerSettings {
    fn default() -> Self {
        ExplorerSettings {
            screen:            Screen::default(),
            envelope_duration: DEFAULT_DURATION,
            pool_size:         POOL_SIZE,
            seed:              0x5EED,
            pinch_threshold:   PINCH_THRESHOLD,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ApplicationState
// ════════════════════════════════════════════════════════════════════════════

pub struct ApplicationState {
    settings:           ExplorerSettings,
    layout:             Layout,
    stage:              Stage,
    /// Envelope wave restored when the envelope screen is re-entered.
    last_wave:          WaveformType,
    frame:              u64,
    alpha:              u8,
    gestures:           GestureDetector,
    params:             ParameterModel,
    envelope:           EnvelopeCurve,
    records:            RecordStore,
    agents:             AgentSimulation,
    target:             TargetVibration,
    voices:             Voices,
    scheduler:          EnvelopeScheduler,
    /// A modulated voice was switched off by the cadence and waits for the
    /// next restart boundary.
    modulated_disabled: bool,
}

impl ApplicationState {
    /// Build the state and the permanent master/envelope gains in `graph`.
    pub fn new(settings: ExplorerSettings, graph: &mut dyn AudioGraph) -> Self {
        let voices = Voices::new(graph);
        let scheduler = EnvelopeScheduler::new(voices.envelope(), settings.envelope_duration);
        let mut agents = AgentSimulation::new(settings.pool_size, settings.seed);
        let target = TargetVibration::random(agents.rng());
        let params = ParameterModel::default();
        agents.regenerate(&settings.screen, &params, target);
        info!("target vibration: {}", target.name());

        ApplicationState {
            layout: Layout::new(settings.screen),
            gestures: GestureDetector::new(settings.pinch_threshold),
            settings,
            stage: Stage::SelectMode,
            last_wave: WaveformType::Primitive,
            frame: 0,
            alpha: 0,
            params,
            envelope: EnvelopeCurve::default_adsr(),
            records: RecordStore::default(),
            agents,
            target,
            voices,
            scheduler,
            modulated_disabled: false,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn settings(&self) -> &ExplorerSettings {
        &self.settings
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn last_wave(&self) -> WaveformType {
        self.last_wave
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn alpha(&self) -> u8 {
        self.alpha
    }

    pub fn is_fully_visible(&self) -> bool {
        self.alpha == MAX_ALPHA
    }

    pub fn hands(&self) -> &HandState {
        self.gestures.state()
    }

    pub fn params(&self) -> &ParameterModel {
        &self.params
    }

    pub fn envelope(&self) -> &EnvelopeCurve {
        &self.envelope
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn agents(&self) -> &AgentSimulation {
        &self.agents
    }

    pub fn target(&self) -> TargetVibration {
        self.target
    }

    pub fn voices(&self) -> &Voices {
        &self.voices
    }

    pub fn scheduler(&self) -> &EnvelopeScheduler {
        &self.scheduler
    }

    pub fn envelope_playing(&self) -> bool {
        self.scheduler.is_running()
    }

    // ── Frame update ──────────────────────────────────────────────────────

    pub fn tick(&mut self, hands: &[HandLandmarks], graph: &mut dyn AudioGraph) {
        self.frame += 1;

        let gain = graph.gain_value(self.voices.envelope());
        self.agents.update(self.stage, &self.params, gain, &self.settings.screen);

        let events = self.gestures.update(hands, self.frame);
        let pinch_started = events.iter().any(|e| matches!(e, PinchEvent::Started { .. }));

        let glyphs = self.agents.glyphs();
        let action = stage::evaluate(
            self.stage,
            &self.layout,
            self.gestures.state(),
            self.is_fully_visible(),
            self.last_wave,
            &glyphs,
        );

        match action {
            Some(Action::Replay(_)) if !pinch_started => self.route_input(graph),
            Some(a) => self.apply(a, graph),
            None    => self.route_input(graph),
        }

        self.playback(graph);

        if self.scheduler.poll(graph, &self.envelope) == PollOutcome::Finished {
            self.voices.teardown(graph);
            self.params.mark_silent();
        }

        self.alpha = self.alpha.saturating_add(FADE_STEP).min(MAX_ALPHA);
    }

    fn apply(&mut self, action: Action, graph: &mut dyn AudioGraph) {
        match action {
            Action::Goto(to) => self.transition(to, graph),
            Action::SelectWave(wave) => {
                debug!("envelope wave -> {}", wave.name());
                self.silence(graph);
                self.last_wave = wave;
                self.stage = Stage::Envelope(wave);
            }
            Action::Save => self.save(graph),
            Action::Replay(index) => {
                if let Some(record) = self.agents.saved_record(index) {
                    debug!("replaying saved agent {}", index);
                    self.silence(graph);
                    let patch = VoicePatch::from_record(&record, &self.params);
                    self.voices.start(graph, &patch, Route::Enveloped);
                    self.scheduler.schedule(graph, &record.envelope_curve(), PlaybackMode::OneShot(record));
                }
            }
        }
    }

    /// Leave the current screen: fade out, stop the envelope, tear down
    /// every oscillator and drop any held pinch.
    pub fn transition(&mut self, to: Stage, graph: &mut dyn AudioGraph) {
        info!("stage {:?} -> {:?}", self.stage, to);
        self.alpha = 0;
        self.silence(graph);
        self.modulated_disabled = false;
        self.gestures.release_all();
        if let Stage::Envelope(wave) = to {
            self.last_wave = wave;
        }
        self.stage = to;
    }

    fn silence(&mut self, graph: &mut dyn AudioGraph) {
        self.scheduler.stop(graph);
        self.voices.teardown(graph);
        self.params.mark_silent();
    }

    fn save(&mut self, graph: &mut dyn AudioGraph) {
        let record = VibrationRecord::capture(&self.params, self.last_wave, &self.envelope);
        self.records.save(record);
        self.transition(Stage::SelectMode, graph);

        let screen = self.settings.screen;
        self.agents.add_saved(record, &screen, self.target);
        self.target = TargetVibration::random(self.agents.rng());
        self.agents.regenerate(&screen, &self.params, self.target);
        self.envelope = EnvelopeCurve::default_adsr();
        info!("new target vibration: {}", self.target.name());
    }

    // ── Input routing ─────────────────────────────────────────────────────

    fn route_input(&mut self, graph: &mut dyn AudioGraph) {
        let hands = self.gestures.state().clone();
        let width = self.settings.screen.width;
        let mut changed = false;

        match self.stage {
            Stage::Primitive => {
                if let Some(p) = hands.pinch_position() {
                    if self.layout.primitive_band().contains(&p) {
                        changed |= self.params.set_frequency(Knob::Primitive, p.x, width);
                    }
                }
                changed |= self.pick_shape(WaveformType::Primitive, &hands);
            }
            Stage::Synthesis(sub) => {
                if let Some(m) = sub.modulation() {
                    let carrier = self.layout.carrier_band();
                    let modulator = self.layout.modulator_band();
                    let slider = self.layout.depth_slider();
                    for p in hands.pinching_positions() {
                        if carrier.contains(&p) {
                            changed |= self.params.set_frequency(Knob::Carrier(m), p.x, width);
                        } else if modulator.contains(&p) {
                            changed |= self.params.set_frequency(Knob::Modulator(m), p.x, width);
                        } else if slider.contains(&p) {
                            changed |= self.params.set_depth(m, p.x, &slider);
                        }
                    }
                    changed |= self.pick_shape(m.waveform(), &hands);
                }
            }
            Stage::Envelope(_) => {
                if let Some(p) = hands.pinch_position() {
                    self.sculpt(p);
                }
            }
            Stage::SelectMode => {}
        }

        if changed {
            if let Some(wave) = self.stage.edited_voice() {
                self.voices.retune(graph, &VoicePatch::from_params(&self.params, wave));
            }
        }
    }

    fn pick_shape(&mut self, voice: WaveformType, hands: &HandState) -> bool {
        let boxes = self.layout.shape_boxes(voice);
        let mut changed = false;
        for p in hands.pinching_positions() {
            if let Some((shape, _)) = boxes.iter().find(|(_, r)| r.contains(&p)) {
                changed |= self.params.set_shape(voice, *shape);
            }
        }
        changed
    }

    fn sculpt(&mut self, p: Point) {
        if !self.layout.is_in_envelope_band(&p) {
            return;
        }
        let (top, bottom) = self.layout.envelope_value_range();
        self.envelope.sculpt_at(p.x, p.y, self.settings.screen.width, top, bottom);
    }

    // ── Playback cadence ──────────────────────────────────────────────────

    fn playback(&mut self, graph: &mut dyn AudioGraph) {
        let f = self.frame;
        match self.stage {
            Stage::Primitive if f % PLAY_PERIOD == 0 => {
                if self.params.primitive.playing {
                    self.voices.teardown(graph);
                    self.params.mark_silent();
                } else {
                    let patch = VoicePatch::from_params(&self.params, WaveformType::Primitive);
                    self.voices.start(graph, &patch, Route::Direct);
                    self.params.primitive.playing = true;
                    self.params.primitive.oscillator_created = true;
                }
            }
            Stage::Synthesis(sub) => {
                let Some(m) = sub.modulation() else { return };
                let due = if self.modulated_disabled { f % RESTART_PERIOD == 0 } else { f % PLAY_PERIOD == 0 };
                if !due {
                    return;
                }
                if self.params.modulated(m).playing {
                    self.voices.teardown(graph);
                    self.params.mark_silent();
                    self.modulated_disabled = true;
                } else {
                    let patch = VoicePatch::from_params(&self.params, m.waveform());
                    self.voices.start(graph, &patch, Route::Direct);
                    let v = self.params.modulated_mut(m);
                    v.playing = true;
                    v.oscillator_created = true;
                    self.params.primitive.playing = true;
                    self.modulated_disabled = false;
                }
            }
            Stage::Envelope(wave) if f % PLAY_PERIOD == 0 && !self.scheduler.is_running() => {
                self.voices.teardown(graph);
                let patch = VoicePatch::from_params(&self.params, wave);
                self.voices.start(graph, &patch, Route::Enveloped);
                self.params.mark_silent();
                match wave.modulation() {
                    None    => self.params.primitive.playing = true,
                    Some(m) => {
                        self.params.modulated_mut(m).playing = true;
                        self.params.primitive.playing = true;
                    }
                }
                self.scheduler.schedule(graph, &self.envelope, PlaybackMode::Loop);
            }
            _ => {}
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ParamEvent, SoftwareGraph};
    use crate::scheduler::{SchedulerState, RELEASE_SECONDS};
    use crate::stage::SubMenu;
    use assert_approx_eq::assert_approx_eq;
    use pretty_assertions::assert_eq;

    const DT: f64 = 1.0 / 60.0;

    fn pinch(at: Point) -> HandLandmarks {
        HandLandmarks::new(at, Point::new(at.x + 10.0, at.y))
    }

    fn setup() -> (ApplicationState, SoftwareGraph) {
        let mut g = SoftwareGraph::new(48_000.0);
        let s = ApplicationState::new(ExplorerSettings { pool_size: 10, ..Default::default() }, &mut g);
        (s, g)
    }

    fn run(s: &mut ApplicationState, g: &mut SoftwareGraph, hands: &[HandLandmarks], frames: usize) {
        for _ in 0..frames {
            s.tick(hands, g);
            g.advance(DT);
        }
    }

    /// Tick with no hands until the screen has faded in.
    fn fade_in(s: &mut ApplicationState, g: &mut SoftwareGraph) {
        while !s.is_fully_visible() {
            run(s, g, &[], 1);
        }
    }

    fn goto(s: &mut ApplicationState, g: &mut SoftwareGraph, target: Point) {
        fade_in(s, g);
        run(s, g, &[pinch(target)], 1);
        run(s, g, &[], 1);
    }

    #[test]
    fn starts_home_and_fades_in() {
        let (mut s, mut g) = setup();
        assert_eq!(s.stage(), Stage::SelectMode);
        run(&mut s, &mut g, &[], 84);
        assert_eq!(s.alpha(), 252);
        assert!(!s.is_fully_visible());
        run(&mut s, &mut g, &[], 1);
        assert!(s.is_fully_visible());
        run(&mut s, &mut g, &[], 10);
        assert_eq!(s.alpha(), MAX_ALPHA);
    }

    #[test]
    fn no_selection_while_fading() {
        let (mut s, mut g) = setup();
        let c = s.layout().synthesis_circle().centre;
        run(&mut s, &mut g, &[pinch(c)], 50);
        assert_eq!(s.stage(), Stage::SelectMode);
    }

    #[test]
    fn navigation_resets_alpha_and_fires_once() {
        let (mut s, mut g) = setup();
        fade_in(&mut s, &mut g);
        let c = s.layout().synthesis_circle().centre;
        run(&mut s, &mut g, &[pinch(c)], 1);
        assert_eq!(s.stage(), Stage::Synthesis(SubMenu::Menu));
        assert_eq!(s.alpha(), FADE_STEP);
        // A held pinch does nothing until the new screen has faded in.
        run(&mut s, &mut g, &[pinch(c)], 20);
        assert_eq!(s.stage(), Stage::Synthesis(SubMenu::Menu));
    }

    #[test]
    fn primitive_cadence_toggles_every_120_frames() {
        let (mut s, mut g) = setup();
        let synth = s.layout().synthesis_circle().centre;
        goto(&mut s, &mut g, synth);
        let prim = s.layout().wave_circle(WaveformType::Primitive).centre;
        goto(&mut s, &mut g, prim);
        assert_eq!(s.stage(), Stage::Primitive);

        while s.frame() % PLAY_PERIOD != PLAY_PERIOD - 1 {
            run(&mut s, &mut g, &[], 1);
        }
        let was = s.params().primitive.playing;
        run(&mut s, &mut g, &[], 1);
        assert_eq!(s.params().primitive.playing, !was);
        assert_eq!(s.voices().is_active(), !was);
        run(&mut s, &mut g, &[], PLAY_PERIOD as usize);
        assert_eq!(s.params().primitive.playing, was);
    }

    #[test]
    fn primitive_drag_retunes_live_oscillator() {
        let (mut s, mut g) = setup();
        let synth = s.layout().synthesis_circle().centre;
        goto(&mut s, &mut g, synth);
        let prim = s.layout().wave_circle(WaveformType::Primitive).centre;
        goto(&mut s, &mut g, prim);
        while !s.voices().is_active() {
            run(&mut s, &mut g, &[], 1);
        }
        let osc = s.voices().carrier().unwrap();
        let w = s.settings().screen.width;
        let h = s.settings().screen.height;
        run(&mut s, &mut g, &[pinch(Point::new(w / 4.0, h / 2.0))], 1);
        assert_approx_eq!(s.params().primitive.frequency, 150.0);
        assert_eq!(s.voices().carrier(), Some(osc));
        assert_approx_eq!(g.oscillator(osc).unwrap().1, 150.0);
    }

    #[test]
    fn back_tears_down_audio() {
        let (mut s, mut g) = setup();
        let synth = s.layout().synthesis_circle().centre;
        goto(&mut s, &mut g, synth);
        let am = s.layout().wave_circle(WaveformType::Am).centre;
        goto(&mut s, &mut g, am);
        while !s.voices().is_active() {
            run(&mut s, &mut g, &[], 1);
        }
        assert_eq!(g.oscillator_count(), 2);
        fade_in(&mut s, &mut g);
        let back = s.layout().back_button().centre();
        run(&mut s, &mut g, &[pinch(back)], 1);
        assert_eq!(s.stage(), Stage::Synthesis(SubMenu::Menu));
        assert_eq!(g.oscillator_count(), 0);
        assert!(!s.params().am.playing && !s.params().primitive.playing);
        assert_eq!(s.alpha(), FADE_STEP);
    }

    #[test]
    fn envelope_loops_and_stops_with_release() {
        let (mut s, mut g) = setup();
        let env = s.layout().envelope_circle().centre;
        goto(&mut s, &mut g, env);
        assert_eq!(s.stage(), Stage::Envelope(WaveformType::Primitive));
        while !s.envelope_playing() {
            run(&mut s, &mut g, &[], 1);
        }
        // Two full passes: the loop re-arms rather than going idle.
        run(&mut s, &mut g, &[], 250);
        assert!(s.envelope_playing());
        assert_ne!(s.scheduler().state(), SchedulerState::Idle);

        fade_in(&mut s, &mut g);
        let back = s.layout().back_button().centre();
        let gain = s.voices().envelope();
        let level = g.gain_value(gain);
        let now = g.now();
        run(&mut s, &mut g, &[pinch(back)], 1);
        assert_eq!(s.stage(), Stage::SelectMode);
        assert!(!s.envelope_playing());
        let tail: Vec<_> = g.gain_events(gain).iter().filter(|e| e.time() >= now).copied().collect();
        assert_eq!(tail.len(), 2, "{:?}", tail);
        assert_approx_eq!(tail[0].value(), level, 1e-6);
        assert_eq!(
            tail[1],
            ParamEvent::LinearRamp { value: 0.0, time: now + RELEASE_SECONDS }
        );
    }

    #[test]
    fn switching_wave_stops_playback_without_fade() {
        let (mut s, mut g) = setup();
        let env = s.layout().envelope_circle().centre;
        goto(&mut s, &mut g, env);
        while !s.envelope_playing() {
            run(&mut s, &mut g, &[], 1);
        }
        fade_in(&mut s, &mut g);
        // Keep the pinch off a cadence frame so nothing restarts this tick.
        while s.frame() % PLAY_PERIOD == PLAY_PERIOD - 1 {
            run(&mut s, &mut g, &[], 1);
        }
        let fm = s.layout().envelope_wave_circle(WaveformType::Fm).centre;
        run(&mut s, &mut g, &[pinch(fm)], 1);
        assert_eq!(s.stage(), Stage::Envelope(WaveformType::Fm));
        assert!(!s.envelope_playing());
        assert!(s.is_fully_visible());
        assert_eq!(g.oscillator_count(), 0);
    }

    #[test]
    fn save_records_and_regenerates() {
        let (mut s, mut g) = setup();
        let env = s.layout().envelope_circle().centre;
        goto(&mut s, &mut g, env);

        // Sculpt the middle of the curve upward.
        let w = s.settings().screen.width;
        let h = s.settings().screen.height;
        run(&mut s, &mut g, &[pinch(Point::new(w / 2.0, 0.36 * h))], 5);
        let sculpted = *s.envelope();
        assert_ne!(sculpted, EnvelopeCurve::default_adsr());

        fade_in(&mut s, &mut g);
        let save = s.layout().save_button().centre();
        run(&mut s, &mut g, &[pinch(save)], 1);

        assert_eq!(s.stage(), Stage::SelectMode);
        assert_eq!(s.records().len(), 1);
        assert_eq!(s.records().get(0).unwrap().envelope_curve(), sculpted);
        assert_eq!(*s.envelope(), EnvelopeCurve::default_adsr());
        assert_eq!(s.agents().durable_count(), 1);
        assert_eq!(s.agents().agents().len(), 11);
        assert!(s.agents().agents()[0].is_durable());
    }

    #[test]
    fn saved_glyph_replays_once() {
        let (mut s, mut g) = setup();
        let env = s.layout().envelope_circle().centre;
        goto(&mut s, &mut g, env);
        fade_in(&mut s, &mut g);
        let save = s.layout().save_button().centre();
        run(&mut s, &mut g, &[pinch(save)], 1);
        fade_in(&mut s, &mut g);

        let (index, _) = s.agents().glyphs()[0];
        s.apply(Action::Replay(index), &mut g);
        assert!(s.envelope_playing());
        assert_eq!(s.voices().active(), Some(WaveformType::Primitive));
        assert!(s.voices().is_active());

        run(&mut s, &mut g, &[], (DEFAULT_DURATION / DT) as usize + 5);
        assert!(!s.envelope_playing());
        assert!(!s.voices().is_active());
        assert_eq!(g.oscillator_count(), 0);
    }

    #[test]
    fn sculpt_ignores_pinch_outside_band() {
        let (mut s, mut g) = setup();
        let env = s.layout().envelope_circle().centre;
        goto(&mut s, &mut g, env);
        let w = s.settings().screen.width;
        run(&mut s, &mut g, &[pinch(Point::new(w / 2.0, 5.0))], 3);
        assert_eq!(*s.envelope(), EnvelopeCurve::default_adsr());
    }
}
