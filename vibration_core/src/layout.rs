//! Where every hit target sits, derived from the screen size.

use crate::geometry::{Band, Circle, Point, Rect, Screen};
use crate::params::{Shape, WaveformType};

/// Radius of every menu circle.
pub const MENU_RADIUS: f32 = 80.0;

/// Half-height of the horizontal frequency bands.
pub const BAND_HALF_HEIGHT: f32 = 100.0;

/// How close a pinch must land to a saved glyph to replay it.
pub const GLYPH_HIT_RADIUS: f32 = 40.0;

// ── Shape selector ────────────────────────────────────────────────────────

pub const SHAPE_BOX_W:     f32 = 100.0;
pub const SHAPE_BOX_H:     f32 = 80.0;
pub const SHAPE_BOX_PITCH: f32 = 120.0;
pub const SHAPE_BOX_Y:     f32 = 150.0;

// ── Buttons ───────────────────────────────────────────────────────────────

pub const BUTTON_SIZE: f32 = 100.0;
pub const BUTTON_Y:    f32 = 150.0;

/// Screen-space geometry of every on-screen target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Layout {
    pub screen: Screen,
}

impl Layout {
    pub fn new(screen: Screen) -> Self {
        Layout { screen }
    }

    fn w(&self) -> f32 {
        self.screen.width
    }

    fn h(&self) -> f32 {
        self.screen.height
    }

    // ── Menu circles ──────────────────────────────────────────────────────

    pub fn synthesis_circle(&self) -> Circle {
        Circle::new(self.w() / 3.0, self.h() / 2.0, MENU_RADIUS)
    }

    pub fn envelope_circle(&self) -> Circle {
        Circle::new(2.0 * self.w() / 3.0, self.h() / 2.0, MENU_RADIUS)
    }

    /// The synthesis-menu circle for `wave`.
    pub fn wave_circle(&self, wave: WaveformType) -> Circle {
        let x = match wave {
            WaveformType::Primitive => self.w() / 4.0,
            WaveformType::Am        => self.w() / 2.0,
            WaveformType::Fm        => 3.0 * self.w() / 4.0,
        };
        Circle::new(x, self.h() / 2.0, MENU_RADIUS)
    }

    /// The same circles, dropped to the bottom of the envelope screen.
    pub fn envelope_wave_circle(&self, wave: WaveformType) -> Circle {
        let c = self.wave_circle(wave);
        Circle::new(c.centre.x, self.h() - 2.0 * MENU_RADIUS - 20.0, MENU_RADIUS)
    }

    // ── Buttons ───────────────────────────────────────────────────────────

    pub fn back_button(&self) -> Rect {
        Rect::new(50.0, BUTTON_Y, BUTTON_SIZE, BUTTON_SIZE)
    }

    pub fn save_button(&self) -> Rect {
        Rect::new(self.w() - 120.0, BUTTON_Y, BUTTON_SIZE, BUTTON_SIZE)
    }

    // ── Parameter inputs ──────────────────────────────────────────────────

    /// Four shape boxes, sine first.  FM's row starts 40 px further right.
    pub fn shape_boxes(&self, voice: WaveformType) -> [(Shape, Rect); 4] {
        let start = match voice {
            WaveformType::Fm => self.w() / 2.0 - 200.0,
            _                => self.w() / 2.0 - 240.0,
        };
        let mut boxes = [(Shape::Sine, Rect::new(0.0, 0.0, 0.0, 0.0)); 4];
        for (i, shape) in Shape::ALL.iter().enumerate() {
            let x = start + i as f32 * SHAPE_BOX_PITCH;
            boxes[i] = (*shape, Rect::new(x, SHAPE_BOX_Y, SHAPE_BOX_W, SHAPE_BOX_H));
        }
        boxes
    }

    pub fn depth_slider(&self) -> Rect {
        Rect::new(self.w() / 2.0 + 260.0, 160.0, 300.0, 60.0)
    }

    pub fn primitive_band(&self) -> Band {
        Band { centre: self.h() / 2.0, half_height: BAND_HALF_HEIGHT }
    }

    /// Carrier waveform row on the AM/FM screens.
    pub fn carrier_band(&self) -> Band {
        Band { centre: self.h() / 4.0 + 130.0, half_height: BAND_HALF_HEIGHT }
    }

    /// Modulator waveform row on the AM/FM screens.
    pub fn modulator_band(&self) -> Band {
        Band { centre: self.h() / 2.0 + 130.0, half_height: BAND_HALF_HEIGHT }
    }

    /// Rows a pinch must be inside to sculpt the envelope (exclusive).
    pub fn envelope_drag_band(&self) -> (f32, f32) {
        (0.3 * self.h(), 0.7 * self.h())
    }

    /// Rows that map to curve values 1 and 0 respectively.
    pub fn envelope_value_range(&self) -> (f32, f32) {
        (0.35 * self.h(), 0.65 * self.h())
    }

    /// Baseline for the AM product waveform.
    pub fn am_product_row(&self) -> f32 {
        3.0 * self.h() / 4.0 + 130.0
    }

    /// Top and bottom rows of the FM result waveform.
    pub fn fm_result_rows(&self) -> (f32, f32) {
        (self.h() - 250.0 + 130.0, self.h() - 150.0 + 130.0)
    }

    pub fn is_in_envelope_band(&self, p: &Point) -> bool {
        let (top, bottom) = self.envelope_drag_band();
        p.y > top && p.y < bottom
    }
}

impl Default for Layout {
    fn default() -> Self {
        Layout::new(Screen::default())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
