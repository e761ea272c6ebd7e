//! # vibration_explorer
//!
//! Window, audio and hand-tracking frontends for [`vibration_core`].
//!
//! ## Feature flags
//!
//! * (default) — **Simulation mode**: the mouse plays one or two hands.
//! * `leap` — **Hardware mode**: polls a real LeapMotion controller via LeapC.
//!
//! ### Simulation controls
//!
//! | Input | Hand |
//! |---|---|
//! | Pointer | Index fingertip of hand 0 |
//! | Left button (hold) | Hand 0 pinches |
//! | `M` | Toggle hand 1, mirrored across the vertical centre line |
//! | Right button (hold) | Hand 1 pinches |
//! | `Esc` / `Q` | Quit |

pub mod landmarks;
pub mod synth;
pub mod visualizer;
pub mod app;
