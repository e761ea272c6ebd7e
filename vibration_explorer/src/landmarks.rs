//! Landmark sources — LeapMotion hardware or a mouse-driven simulation.
//!
//! Every source runs on its own thread and sends whole [`LandmarkFrame`]s over
//! an `mpsc` channel.  The frame loop never learns which kind produced them:
//! the simulation builds the same index-tip / thumb-tip pairs a tracker would.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use log::debug;
use vibration_core::geometry::{map_range, Point};
use vibration_core::gesture::{HandLandmarks, LandmarkFrame};

// ════════════════════════════════════════════════════════════════════════════
// SourceEvent
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum SourceEvent {
    /// Hands seen this frame, at most two.
    Frame(LandmarkFrame),
    /// The user asked to leave.
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// LandmarkSource trait — unified interface for hw and sim
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`SourceEvent`]s over a channel.
pub trait LandmarkSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<SourceEvent>);
}

/// Spawn a landmark source on its own thread and return the receiving end.
pub fn spawn_landmark_source<S: LandmarkSource>(source: S) -> Receiver<SourceEvent> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// SimLandmarkSource — mouse simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Thumb offset of an open simulated hand; well outside the pinch threshold.
pub const OPEN_SPREAD:   f32 = 80.0;
/// Thumb offset of a pinching simulated hand.
pub const PINCH_SPREAD:  f32 = 10.0;

/// Raw input from the window, sent once per frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimInput {
    /// Pointer position and button state.  `None` when the pointer is outside
    /// the window.
    Pointer { at: Option<Point>, left: bool, right: bool },
    /// Show or hide the mirrored second hand (M).
    ToggleMirror,
    Quit,
}

/// Translates [`SimInput`] into landmark frames.
///
/// Hand 0 follows the pointer and pinches with the left button.  With the
/// mirror on, hand 1 sits at the horizontally mirrored position and pinches
/// with the right button, so two-hand behaviour can be tried with one mouse.
pub struct SimLandmarkSource {
    rx:       Receiver<SimInput>,
    width:    f32,
    mirrored: bool,
}

impl SimLandmarkSource {
    pub fn new(rx: Receiver<SimInput>, width: f32) -> Self {
        SimLandmarkSource { rx, width, mirrored: false }
    }
}

impl LandmarkSource for SimLandmarkSource {
    fn run(mut self: Box<Self>, tx: Sender<SourceEvent>) {
        while let Ok(input) = self.rx.recv() {
            let event = match input {
                SimInput::Pointer { at, left, right } => {
                    SourceEvent::Frame(sim_frame(at, left, right, self.mirrored, self.width))
                }
                SimInput::ToggleMirror => {
                    self.mirrored = !self.mirrored;
                    debug!("[landmarks] mirrored hand {}", if self.mirrored { "on" } else { "off" });
                    continue;
                }
                SimInput::Quit => {
                    let _ = tx.send(SourceEvent::Quit);
                    return;
                }
            };
            if tx.send(event).is_err() {
                return;
            }
        }
    }
}

/// One simulated frame.  No pointer means no hands.
pub fn sim_frame(at: Option<Point>, left: bool, right: bool, mirrored: bool, width: f32) -> LandmarkFrame {
    let Some(p) = at else { return Vec::new() };
    let hand = |tip: Point, pinching: bool| {
        let spread = if pinching { PINCH_SPREAD } else { OPEN_SPREAD };
        HandLandmarks::new(tip, Point::new(tip.x + spread, tip.y))
    };
    let mut frame = vec![hand(p, left)];
    if mirrored {
        frame.push(hand(Point::new(width - p.x, p.y), right));
    }
    frame
}

// ════════════════════════════════════════════════════════════════════════════
// LeapLandmarkSource — real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Interaction box of the controller in millimetres: x across, y height.
pub const LEAP_X_RANGE: (f32, f32) = (-200.0, 200.0);
pub const LEAP_Y_RANGE: (f32, f32) = (80.0, 400.0);

/// Project a Leap position (mm) onto the screen; higher hands sit nearer the
/// top edge.
pub fn leap_to_screen(x: f32, y: f32, width: f32, height: f32) -> Point {
    Point::new(
        map_range(x, LEAP_X_RANGE.0, LEAP_X_RANGE.1, 0.0, width),
        map_range(y, LEAP_Y_RANGE.1, LEAP_Y_RANGE.0, 0.0, height),
    )
}

/// Landmark source backed by a real LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
/// Thumb and index distal tips are projected with [`leap_to_screen`]; the
/// pinch test itself happens in the core, as for any other source.
#[cfg(feature = "leap")]
pub struct LeapLandmarkSource {
    pub width:  f32,
    pub height: f32,
}

#[cfg(feature = "leap")]
impl LandmarkSource for LeapLandmarkSource {
    fn run(self: Box<Self>, tx: Sender<SourceEvent>) {
        use leaprs::*;
        use log::error;

        let mut connection = match Connection::create(ConnectionConfig::default()) {
            Ok(c)  => c,
            Err(e) => {
                error!("[landmarks] cannot create LeapC connection: {:?}", e);
                return;
            }
        };
        if let Err(e) = connection.open() {
            error!("[landmarks] cannot open LeapMotion device: {:?}", e);
            return;
        }

        loop {
            let msg = match connection.poll(100) {
                Ok(m)  => m,
                Err(_) => continue,
            };

            if let Event::Tracking(frame) = msg.event() {
                let hands: LandmarkFrame = frame
                    .hands()
                    .filter_map(|hand| {
                        let digits: Vec<_> = hand.digits().collect();
                        if digits.len() < 2 { return None; }
                        let thumb = digits[0].distal().next_joint();
                        let index = digits[1].distal().next_joint();
                        Some(HandLandmarks::new(
                            leap_to_screen(index.x, index.y, self.width, self.height),
                            leap_to_screen(thumb.x, thumb.y, self.width, self.height),
                        ))
                    })
                    .take(2)
                    .collect();
                if tx.send(SourceEvent::Frame(hands)).is_err() {
                    return;
                }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
