//! Top-level frame loop.
//!
//! `run` wires the collaborators around one [`ApplicationState`]:
//!
//! ```text
//!   landmark source ──mpsc──► newest frame ─┐
//!                                           ▼
//!   window input ─► SimInput      ApplicationState::tick ──► SharedGraph ◄── cpal callback
//!                                           │
//!                                           ▼
//!                                   render ─► Raster ─► window
//! ```

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Instant;

use anyhow::anyhow;
use log::info;

use vibration_core::agent::POOL_SIZE;
use vibration_core::geometry::Screen;
use vibration_core::gesture::{LandmarkFrame, PINCH_THRESHOLD};
use vibration_core::render::render;
use vibration_core::scheduler::DEFAULT_DURATION;
use vibration_core::state::{ApplicationState, ExplorerSettings};

use crate::landmarks::{spawn_landmark_source, SimInput, SourceEvent};
use crate::synth::Synth;
use crate::visualizer::Visualizer;

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Configuration for the full application.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub width:             usize,
    pub height:            usize,
    /// Seconds per envelope pass.
    pub envelope_duration: f64,
    /// Ephemeral agents on screen.
    pub agents:            usize,
    pub seed:              u64,
    /// Skip the audio device entirely.
    pub mute:              bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            width:             1280,
            height:            800,
            envelope_duration: DEFAULT_DURATION,
            agents:            POOL_SIZE,
            seed:              0x5EED,
            mute:              false,
        }
    }
}

impl AppConfig {
    pub fn settings(&self) -> ExplorerSettings {
        ExplorerSettings {
            screen:            Screen::new(self.width as f32, self.height as f32),
            envelope_duration: self.envelope_duration,
            pool_size:         self.agents,
            seed:              self.seed,
            pinch_threshold:   PINCH_THRESHOLD,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Landmark draining
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drain {
    Running,
    Quit,
}

/// Empty the channel without blocking, keeping only the newest frame in
/// `hands`.  A source that has gone away leaves no hands.
pub fn drain_latest(rx: &Receiver<SourceEvent>, hands: &mut LandmarkFrame) -> Drain {
    loop {
        match rx.try_recv() {
            Ok(SourceEvent::Frame(frame))   => *hands = frame,
            Ok(SourceEvent::Quit)           => return Drain::Quit,
            Err(TryRecvError::Empty)        => return Drain::Running,
            Err(TryRecvError::Disconnected) => {
                hands.clear();
                return Drain::Running;
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// Creates the window, the landmark source (mouse simulation by default,
/// hardware with `--features leap`) and the audio output, then ticks and
/// draws at ~60 fps until the window closes.
pub fn run(cfg: AppConfig) -> anyhow::Result<()> {
    // ── Landmark source ───────────────────────────────────────────────────
    let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();
    let frames = spawn_source(sim_rx, &cfg);

    // ── Window (owns the sim input sender) ───────────────────────────────
    let mut vis = Visualizer::new(cfg.width, cfg.height, sim_tx)
        .map_err(|e| anyhow!("opening {}x{} window: {}", cfg.width, cfg.height, e))?;

    // ── Audio ─────────────────────────────────────────────────────────────
    let synth = if cfg.mute { Synth::silent() } else { Synth::open() };
    let mut graph = synth.graph();

    // ── App state ─────────────────────────────────────────────────────────
    let mut state = ApplicationState::new(cfg.settings(), &mut graph);
    let mut hands = LandmarkFrame::new();
    let mut last = Instant::now();

    info!(
        "running {}x{}, envelope {:.1}s, {} agents, audio {}",
        cfg.width,
        cfg.height,
        cfg.envelope_duration,
        cfg.agents,
        if synth.is_live() { "live" } else { "silent" }
    );

    // ── Main loop ─────────────────────────────────────────────────────────
    while vis.is_open() {
        if !vis.poll_input() {
            break;
        }
        if drain_latest(&frames, &mut hands) == Drain::Quit {
            break;
        }

        let now = Instant::now();
        synth.follow_clock((now - last).as_secs_f64());
        last = now;

        state.tick(&hands, &mut graph);

        render(&state, vis.canvas());
        vis.present();
    }

    info!("saved {} vibration(s) this session", state.records().len());
    Ok(())
}

#[cfg(not(feature = "leap"))]
fn spawn_source(sim_rx: Receiver<SimInput>, cfg: &AppConfig) -> Receiver<SourceEvent> {
    use crate::landmarks::SimLandmarkSource;
    spawn_landmark_source(SimLandmarkSource::new(sim_rx, cfg.width as f32))
}

#[cfg(feature = "leap")]
fn spawn_source(sim_rx: Receiver<SimInput>, cfg: &AppConfig) -> Receiver<SourceEvent> {
    use crate::landmarks::LeapLandmarkSource;
    use log::warn;
    // Keyboard quit still works through the window; pointer input is unused.
    drop(sim_rx);
    warn!("[landmarks] mouse simulation disabled, reading LeapMotion");
    spawn_landmark_source(LeapLandmarkSource { width: cfg.width as f32, height: cfg.height as f32 })
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vibration_core::geometry::Point;
    use vibration_core::gesture::HandLandmarks;
    use vibration_core::stage::{Stage, SubMenu};

    use crate::synth::SharedGraph;
    use crate::visualizer::Raster;

    fn frame(x: f32) -> LandmarkFrame {
        vec![HandLandmarks::new(Point::new(x, 0.0), Point::new(x + 80.0, 0.0))]
    }

    #[test]
    fn newest_frame_wins() {
        let (tx, rx) = mpsc::channel();
        for x in [1.0, 2.0, 3.0] {
            tx.send(SourceEvent::Frame(frame(x))).ok();
        }
        let mut hands = LandmarkFrame::new();
        assert_eq!(drain_latest(&rx, &mut hands), Drain::Running);
        assert_eq!(hands, frame(3.0));
        // Nothing new: the last frame is kept.
        assert_eq!(drain_latest(&rx, &mut hands), Drain::Running);
        assert_eq!(hands, frame(3.0));
    }

    #[test]
    fn quit_stops_the_loop() {
        let (tx, rx) = mpsc::channel();
        tx.send(SourceEvent::Frame(frame(1.0))).ok();
        tx.send(SourceEvent::Quit).ok();
        let mut hands = LandmarkFrame::new();
        assert_eq!(drain_latest(&rx, &mut hands), Drain::Quit);
    }

    #[test]
    fn lost_source_clears_hands() {
        let (tx, rx) = mpsc::channel();
        tx.send(SourceEvent::Frame(frame(1.0))).ok();
        drop(tx);
        let mut hands = LandmarkFrame::new();
        assert_eq!(drain_latest(&rx, &mut hands), Drain::Running);
        assert!(hands.is_empty());
    }

    #[test]
    fn config_maps_to_settings() {
        let cfg = AppConfig { width: 800, height: 600, agents: 10, ..AppConfig::default() };
        let s = cfg.settings();
        assert_eq!(s.screen, Screen::new(800.0, 600.0));
        assert_eq!(s.pool_size, 10);
        assert_eq!(s.envelope_duration, DEFAULT_DURATION);
    }

    /// One headless frame loop: shared graph in, raster out.
    #[test]
    fn headless_frames_render_and_navigate() {
        let cfg = AppConfig { width: 640, height: 400, agents: 15, ..AppConfig::default() };
        let mut graph = SharedGraph::new(48_000.0);
        let mut state = ApplicationState::new(cfg.settings(), &mut graph);
        let mut raster = Raster::new(cfg.width, cfg.height);

        let synthesis = state.layout().synthesis_circle().centre;
        let pinch = vec![HandLandmarks::new(synthesis, Point::new(synthesis.x + 5.0, synthesis.y))];
        for _ in 0..90 {
            state.tick(&[], &mut graph);
        }
        state.tick(&pinch, &mut graph);
        render(&state, &mut raster);

        assert_eq!(state.stage(), Stage::Synthesis(SubMenu::Menu));
        assert!(raster.pixels().iter().any(|p| *p != 0xFF00_0000));
    }
}
