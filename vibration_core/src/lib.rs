//! # vibration_core
//!
//! Interaction core of the vibration explorer: hand landmarks come in, audio
//! graph commands and a drawn scene go out.  Everything here runs on the
//! caller's frame loop; the audio engine and the drawing surface are traits
//! ([`graph::AudioGraph`], [`render::Canvas`]) so the whole core is testable
//! headless.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Where | Action |
//! |---|---|---|
//! | Pinch | Menu circle | Enter that stage (screen fades in again) |
//! | Pinch | Back button | Return to the parent menu, audio torn down |
//! | Pinch | Save button (envelope) | Store a record, spawn a saved agent, go home |
//! | Pinch-start | Saved agent (home) | Replay its record once |
//! | Pinch + drag | Waveform band | Frequency ← horizontal position (left = high) |
//! | Pinch | Shape box | Select sine / square / triangle / sawtooth |
//! | Pinch + drag | Depth slider | Modulation depth |
//! | Pinch + drag | Envelope band | Sculpt the 128-point envelope curve |
//! | Pinch | Wave circle (envelope) | Switch the enveloped voice |
//!
//! ## Stages
//!
//! ```text
//!   SelectMode ──► Synthesis(Menu) ──► Primitive
//!       │                 ├──────────► Synthesis(Am)
//!       │                 └──────────► Synthesis(Fm)
//!       └────────► Envelope(wave) ──save──► SelectMode
//! ```

pub mod geometry;
pub mod gesture;
pub mod params;
pub mod envelope;
pub mod graph;
pub mod voices;
pub mod record;
pub mod scheduler;
pub mod layout;
pub mod vibe;
pub mod stage;
pub mod agent;
pub mod state;
pub mod render;
