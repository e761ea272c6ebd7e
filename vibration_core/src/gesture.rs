//! Pinch detection over raw hand-landmark frames.
//!
//! The tracker (camera + pose model, LeapMotion, or the mouse simulator)
//! delivers a [`LandmarkFrame`] whenever it has one.  [`GestureDetector`]
//! turns that into per-slot pinch state, a single active ("pinched") hand and
//! a list of [`PinchEvent`] transitions for the current frame.  Nothing is
//! queued or debounced beyond the raw distance threshold.

use crate::geometry::Point;

/// Fingertip-to-thumb distance (pixels) at or below which a hand pinches.
pub const PINCH_THRESHOLD: f32 = 35.0;

/// Number of hands the detector tracks.  Extra hands in a frame are ignored.
pub const MAX_HANDS: usize = 2;

// ════════════════════════════════════════════════════════════════════════════
// Landmark input
// ════════════════════════════════════════════════════════════════════════════

/// The two keypoints of a tracked hand the core cares about.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandLandmarks {
    pub index_finger_tip: Point,
    pub thumb_tip:        Point,
}

impl HandLandmarks {
    pub fn new(index_finger_tip: Point, thumb_tip: Point) -> Self {
        HandLandmarks { index_finger_tip, thumb_tip }
    }

    pub fn pinch_distance(&self) -> f32 {
        self.index_finger_tip.distance(&self.thumb_tip)
    }
}

/// Zero, one or two hands as reported by the tracker for one frame.
pub type LandmarkFrame = Vec<HandLandmarks>;

// ════════════════════════════════════════════════════════════════════════════
// HandState
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HandSlot {
    pub is_pinching:      bool,
    /// Frame number at which the current (or most recent) pinch began.
    pub last_pinch_start: Option<u64>,
    /// Index fingertip this frame; `None` when the hand is not tracked.
    pub screen_position:  Option<Point>,
}

/// Per-slot pinch state plus which slot currently holds focus.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HandState {
    pub slots:    [HandSlot; MAX_HANDS],
    pinched_hand: Option<usize>,
}

impl HandState {
    /// The hand currently driving selection and drags.
    pub fn pinched_hand(&self) -> Option<usize> {
        self.pinched_hand
    }

    /// `-1` when no hand is pinching, otherwise the slot index.
    pub fn pinched_hand_index(&self) -> i32 {
        self.pinched_hand.map_or(-1, |i| i as i32)
    }

    pub fn any_pinching(&self) -> bool {
        self.slots.iter().any(|s| s.is_pinching)
    }

    /// Cursor of the active hand, if it is pinching and tracked.
    pub fn pinch_position(&self) -> Option<Point> {
        self.pinched_hand.and_then(|i| self.slots[i].screen_position)
    }

    /// Cursors of every tracked hand, pinching or not.
    pub fn positions(&self) -> impl Iterator<Item = Point> + '_ {
        self.slots.iter().filter_map(|s| s.screen_position)
    }

    /// Cursors of every hand that is pinching right now.
    pub fn pinching_positions(&self) -> impl Iterator<Item = Point> + '_ {
        self.slots
            .iter()
            .filter(|s| s.is_pinching)
            .filter_map(|s| s.screen_position)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PinchEvent
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinchEvent {
    Started  { slot: usize },
    Released { slot: usize },
}

// ════════════════════════════════════════════════════════════════════════════
// GestureDetector
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct GestureDetector {
    threshold: f32,
    state:     HandState,
}

impl Default for GestureDetector {
    fn default() -> Self {
        GestureDetector::new(PINCH_THRESHOLD)
    }
}

impl GestureDetector {
    pub fn new(threshold: f32) -> Self {
        GestureDetector { threshold, state: HandState::default() }
    }

    pub fn state(&self) -> &HandState {
        &self.state
    }

    /// Process one landmark frame.
    ///
    /// Slots are processed in order, so when both hands pinch the later one
    /// ends up holding focus.  A slot with no hand this frame counts as not
    /// pinching.
    pub fn update(&mut self, hands: &[HandLandmarks], frame: u64) -> Vec<PinchEvent> {
        let mut events = Vec::new();

        for slot in 0..MAX_HANDS {
            let hand = hands.get(slot);
            let was_pinching = self.state.slots[slot].is_pinching;
            let pinching = hand.map_or(false, |h| h.pinch_distance() <= self.threshold);

            let s = &mut self.state.slots[slot];
            s.screen_position = hand.map(|h| h.index_finger_tip);
            s.is_pinching = pinching;

            if pinching {
                if !was_pinching {
                    s.last_pinch_start = Some(frame);
                    events.push(PinchEvent::Started { slot });
                }
                self.state.pinched_hand = Some(slot);
            } else {
                if was_pinching {
                    events.push(PinchEvent::Released { slot });
                }
                if self.state.pinched_hand == Some(slot) {
                    self.state.pinched_hand = self.other_pinching(slot);
                }
            }
        }

        events
    }

    /// Drop every pinch, e.g. after a navigation so a held pinch cannot fire
    /// on the freshly shown screen.  Cursor positions are kept.
    pub fn release_all(&mut self) {
        for s in &mut self.state.slots {
            s.is_pinching = false;
        }
        self.state.pinched_hand = None;
    }

    fn other_pinching(&self, slot: usize) -> Option<usize> {
        (0..MAX_HANDS).find(|&i| i != slot && self.state.slots[i].is_pinching)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn hand(x: f32, y: f32, gap: f32) -> HandLandmarks {
        HandLandmarks::new(Point::new(x, y), Point::new(x + gap, y))
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut g = GestureDetector::default();
        g.update(&[hand(100.0, 100.0, 35.0)], 1);
        assert!(g.state().slots[0].is_pinching);
        g.update(&[hand(100.0, 100.0, 35.01)], 2);
        assert!(!g.state().slots[0].is_pinching);
    }

    #[test]
    fn pinch_state_follows_distance_every_frame() {
        let mut g = GestureDetector::default();
        for (frame, gap) in [10.0, 80.0, 0.0, 36.0, 34.0].iter().enumerate() {
            g.update(&[hand(0.0, 0.0, *gap)], frame as u64);
            assert_eq!(g.state().slots[0].is_pinching, *gap <= PINCH_THRESHOLD);
        }
    }

    #[test]
    fn no_hands_is_no_input() {
        let mut g = GestureDetector::default();
        let events = g.update(&[], 1);
        assert!(events.is_empty());
        assert_eq!(g.state().pinched_hand_index(), -1);
        assert!(g.state().positions().next().is_none());
    }

    #[test]
    fn pinched_index_is_minus_one_iff_nobody_pinches() {
        let mut g = GestureDetector::default();
        let frames = [
            vec![hand(0.0, 0.0, 10.0), hand(50.0, 0.0, 100.0)],
            vec![hand(0.0, 0.0, 10.0), hand(50.0, 0.0, 10.0)],
            vec![hand(0.0, 0.0, 100.0), hand(50.0, 0.0, 10.0)],
            vec![hand(0.0, 0.0, 10.0), hand(50.0, 0.0, 100.0)],
            vec![hand(0.0, 0.0, 100.0)],
            vec![],
        ];
        for (n, f) in frames.iter().enumerate() {
            g.update(f, n as u64);
            let idx = g.state().pinched_hand_index();
            assert!((-1..=1).contains(&idx));
            assert_eq!(idx == -1, !g.state().any_pinching(), "frame {}", n);
        }
    }

    #[test]
    fn last_processed_pinching_hand_wins() {
        let mut g = GestureDetector::default();
        g.update(&[hand(0.0, 0.0, 5.0), hand(50.0, 0.0, 5.0)], 1);
        assert_eq!(g.state().pinched_hand(), Some(1));
    }

    #[test]
    fn releasing_active_hand_hands_focus_to_other() {
        let mut g = GestureDetector::default();
        g.update(&[hand(0.0, 0.0, 5.0), hand(50.0, 0.0, 5.0)], 1);
        // Slot 1 (the focus owner) lets go while slot 0 keeps pinching.
        g.update(&[hand(0.0, 0.0, 5.0), hand(50.0, 0.0, 90.0)], 2);
        assert_eq!(g.state().pinched_hand(), Some(0));
    }

    #[test]
    fn vanished_hand_does_not_stay_active() {
        let mut g = GestureDetector::default();
        g.update(&[hand(0.0, 0.0, 5.0)], 1);
        let events = g.update(&[], 2);
        assert_eq!(events, vec![PinchEvent::Released { slot: 0 }]);
        assert_eq!(g.state().pinched_hand(), None);
        assert_eq!(g.state().slots[0].screen_position, None);
    }

    #[test]
    fn events_mark_transitions_only() {
        let mut g = GestureDetector::default();
        assert_eq!(g.update(&[hand(0.0, 0.0, 5.0)], 7), vec![PinchEvent::Started { slot: 0 }]);
        assert!(g.update(&[hand(0.0, 0.0, 5.0)], 8).is_empty());
        assert_eq!(g.state().slots[0].last_pinch_start, Some(7));
    }

    #[test]
    fn release_all_clears_focus() {
        let mut g = GestureDetector::default();
        g.update(&[hand(10.0, 20.0, 5.0)], 1);
        g.release_all();
        assert_eq!(g.state().pinched_hand_index(), -1);
        assert_eq!(g.state().slots[0].screen_position, Some(Point::new(10.0, 20.0)));
    }

    #[test]
    fn third_hand_ignored() {
        let mut g = GestureDetector::default();
        g.update(&[hand(0.0, 0.0, 90.0), hand(0.0, 0.0, 90.0), hand(0.0, 0.0, 1.0)], 1);
        assert!(!g.state().any_pinching());
    }
}
