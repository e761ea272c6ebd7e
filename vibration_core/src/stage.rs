//! The screen the user is on, the targets each screen offers, and which
//! action (if any) the current hands trigger.
//!
//! | Stage                | Targets                                   | Back to         |
//! |----------------------|-------------------------------------------|-----------------|
//! | SelectMode (1)       | synthesis, envelope, saved glyphs         | —               |
//! | Primitive (2)        | shape boxes                               | Synthesis(Menu) |
//! | Synthesis(Menu) (3)  | primitive, am, fm                         | SelectMode      |
//! | Synthesis(Am/Fm) (3) | shape boxes, depth slider                 | Synthesis(Menu) |
//! | Envelope(wave) (4)   | primitive/am/fm wave selector, save       | SelectMode      |
//!
//! [`evaluate`] is a pure function of the stage and the hand state and
//! returns at most one [`Action`]; the caller applies it.

use crate::geometry::{Circle, Point, Rect};
use crate::gesture::HandState;
use crate::layout::{Layout, GLYPH_HIT_RADIUS};
use crate::params::{Modulation, WaveformType};

// ════════════════════════════════════════════════════════════════════════════
// Stage
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubMenu {
    Menu,
    Am,
    Fm,
}

impl SubMenu {
    pub fn modulation(&self) -> Option<Modulation> {
        match self {
            SubMenu::Menu => None,
            SubMenu::Am   => Some(Modulation::Am),
            SubMenu::Fm   => Some(Modulation::Fm),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    SelectMode,
    Primitive,
    Synthesis(SubMenu),
    Envelope(WaveformType),
}

impl Stage {
    /// Numeric screen id, 1 to 4.
    pub fn id(&self) -> u8 {
        match self {
            Stage::SelectMode   => 1,
            Stage::Primitive    => 2,
            Stage::Synthesis(_) => 3,
            Stage::Envelope(_)  => 4,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Stage::SelectMode               => "Move your hands around to interact, pinch to select, and start creating",
            Stage::Primitive                => "Primitive",
            Stage::Synthesis(SubMenu::Menu) => "Synthesis",
            Stage::Synthesis(SubMenu::Am)   => "AM",
            Stage::Synthesis(SubMenu::Fm)   => "FM",
            Stage::Envelope(_)              => "Envelope",
        }
    }

    /// Where the back button leads; `None` on the home screen.
    pub fn back(&self) -> Option<Stage> {
        match self {
            Stage::SelectMode                                  => None,
            Stage::Primitive | Stage::Synthesis(SubMenu::Am) |
            Stage::Synthesis(SubMenu::Fm)                      => Some(Stage::Synthesis(SubMenu::Menu)),
            Stage::Synthesis(SubMenu::Menu) | Stage::Envelope(_) => Some(Stage::SelectMode),
        }
    }

    pub fn has_save(&self) -> bool {
        matches!(self, Stage::Envelope(_))
    }

    /// The voice whose parameters this screen edits.
    pub fn edited_voice(&self) -> Option<WaveformType> {
        match self {
            Stage::Primitive              => Some(WaveformType::Primitive),
            Stage::Synthesis(SubMenu::Am) => Some(WaveformType::Am),
            Stage::Synthesis(SubMenu::Fm) => Some(WaveformType::Fm),
            _                             => None,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Actions and targets
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Navigate; always a full transition.
    Goto(Stage),
    /// Switch the envelope screen's wave (no fade).
    SelectWave(WaveformType),
    /// Save the current envelope configuration and return home.
    Save,
    /// Replay the saved agent at this index once.
    Replay(usize),
}

/// A labelled circular hit target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Target {
    pub label:  &'static str,
    pub circle: Circle,
    pub action: Action,
}

/// Circular targets shown on `stage`.  `last_wave` is the envelope wave the
/// envelope circle returns to.
pub fn targets(stage: Stage, layout: &Layout, last_wave: WaveformType) -> Vec<Target> {
    match stage {
        Stage::SelectMode => vec![
            Target {
                label:  "synthesis",
                circle: layout.synthesis_circle(),
                action: Action::Goto(Stage::Synthesis(SubMenu::Menu)),
            },
            Target {
                label:  "envelope",
                circle: layout.envelope_circle(),
                action: Action::Goto(Stage::Envelope(last_wave)),
            },
        ],
        Stage::Synthesis(SubMenu::Menu) => WaveformType::ALL
            .iter()
            .map(|w| Target {
                label:  w.name(),
                circle: layout.wave_circle(*w),
                action: Action::Goto(match w {
                    WaveformType::Primitive => Stage::Primitive,
                    WaveformType::Am        => Stage::Synthesis(SubMenu::Am),
                    WaveformType::Fm        => Stage::Synthesis(SubMenu::Fm),
                }),
            })
            .collect(),
        Stage::Envelope(_) => WaveformType::ALL
            .iter()
            .map(|w| Target {
                label:  w.name(),
                circle: layout.envelope_wave_circle(*w),
                action: Action::SelectWave(*w),
            })
            .collect(),
        Stage::Primitive | Stage::Synthesis(_) => Vec::new(),
    }
}

/// Any tracked hand inside the circle.
pub fn is_hovered(circle: &Circle, hands: &HandState) -> bool {
    hands.positions().any(|p| circle.contains(&p))
}

/// The focused pinching hand inside the circle.
pub fn is_selected(circle: &Circle, hands: &HandState) -> bool {
    hands.pinch_position().map_or(false, |p| circle.contains(&p))
}

/// Any pinching hand inside the button.
pub fn is_pressed(button: &Rect, hands: &HandState) -> bool {
    hands.pinching_positions().any(|p| button.contains(&p))
}

/// Decide what, if anything, happens this tick.
///
/// Nothing fires unless the screen has fully faded in.  Targets are checked
/// before buttons, buttons before saved glyphs; the first hit wins.
pub fn evaluate(
    stage:        Stage,
    layout:       &Layout,
    hands:        &HandState,
    fully_visible: bool,
    last_wave:    WaveformType,
    glyphs:       &[(usize, Point)],
) -> Option<Action> {
    if !fully_visible || !hands.any_pinching() {
        return None;
    }

    for t in targets(stage, layout, last_wave) {
        if !is_hovered(&t.circle, hands) || !is_selected(&t.circle, hands) {
            continue;
        }
        if let (Stage::Envelope(current), Action::SelectWave(w)) = (stage, t.action) {
            if current == w {
                continue;
            }
        }
        return Some(t.action);
    }

    if let Some(to) = stage.back() {
        if is_pressed(&layout.back_button(), hands) {
            return Some(Action::Goto(to));
        }
    }

    if stage.has_save() && is_pressed(&layout.save_button(), hands) {
        return Some(Action::Save);
    }

    if stage == Stage::SelectMode {
        let hit = Circle { centre: Point::default(), r: GLYPH_HIT_RADIUS };
        for (i, centre) in glyphs {
            if is_selected(&Circle { centre: *centre, ..hit }, hands) {
                return Some(Action::Replay(*i));
            }
        }
    }

    None
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
