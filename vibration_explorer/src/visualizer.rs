//! Software-rendered window using `minifb`.
//!
//! [`Raster`] is the pixel buffer and implements the core's
//! [`Canvas`]; [`Visualizer`] owns the window, presents the raster and turns
//! mouse/keyboard state into [`SimInput`] for the simulated hands.
//!
//! Keys: `M` toggles the mirrored second hand, `Esc` / `Q` quit.

use std::sync::mpsc::Sender;
use std::time::Duration;

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};
use vibration_core::geometry::{Point, Rect};
use vibration_core::render::Canvas;

use crate::landmarks::SimInput;

const BG_COLOR: u32 = 0xFF00_0000;
/// Glyph cell: 3×5 pixels plus one column of spacing, before scaling.
const GLYPH_W: usize = 3;
const GLYPH_H: usize = 5;
const ADVANCE: usize = GLYPH_W + 1;

// ════════════════════════════════════════════════════════════════════════════
// Raster — ARGB pixel buffer with alpha blending
// ════════════════════════════════════════════════════════════════════════════

pub struct Raster {
    width:  usize,
    height: usize,
    buf:    Vec<u32>,
}

impl Raster {
    pub fn new(width: usize, height: usize) -> Self {
        Raster { width, height, buf: vec![BG_COLOR; width * height] }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.buf
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.buf[y * self.width + x])
    }

    /// Source-over blend of `colour` into one pixel; off-buffer writes are
    /// dropped.
    fn plot(&mut self, x: i32, y: i32, colour: u32) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let a = colour >> 24;
        if a == 0 {
            return;
        }
        let i = y as usize * self.width + x as usize;
        if a == 0xFF {
            self.buf[i] = colour;
            return;
        }
        // Integer source-over per channel, rounded; the buffer stays opaque.
        let under = self.buf[i];
        let mix = |shift: u32| {
            let d = (under >> shift) & 0xFF;
            let s = (colour >> shift) & 0xFF;
            ((d * (255 - a) + s * a + 127) / 255) << shift
        };
        self.buf[i] = 0xFF00_0000 | mix(16) | mix(8) | mix(0);
    }

    fn span(&mut self, x0: i32, x1: i32, y: i32, colour: u32) {
        for x in x0..=x1 {
            self.plot(x, y, colour);
        }
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, colour: u32) {
        for row in y..y + h {
            self.span(x, x + w - 1, row, colour);
        }
    }

    /// Square brush of side `weight` centred on a pixel.
    fn stamp(&mut self, x: i32, y: i32, weight: i32, colour: u32) {
        if weight <= 1 {
            self.plot(x, y, colour);
        } else {
            let r = weight / 2;
            self.fill_rect(x - r, y - r, weight, weight, colour);
        }
    }

    /// Bresenham line.
    fn line(&mut self, a: Point, b: Point, weight: i32, colour: u32) {
        let (mut x0, mut y0) = (a.x.round() as i32, a.y.round() as i32);
        let (x1, y1) = (b.x.round() as i32, b.y.round() as i32);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.stamp(x0, y0, weight, colour);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn draw_label(&mut self, text: &str, x: i32, y: i32, scale: i32, colour: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = glyph_rows(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..GLYPH_W {
                    if bits & (1 << (GLYPH_W - 1 - col)) != 0 {
                        let px = cx + col as i32 * scale;
                        let py = y + row as i32 * scale;
                        self.fill_rect(px, py, scale, scale, colour);
                    }
                }
            }
            cx += ADVANCE as i32 * scale;
        }
    }
}

/// Pixel scale for a nominal text size; 6 size units per font pixel.
pub fn text_scale(size: f32) -> i32 {
    ((size / 6.0).round() as i32).max(1)
}

/// Width in pixels of `text` drawn at `scale`, without trailing spacing.
pub fn text_width(text: &str, scale: i32) -> i32 {
    let n = text.chars().count() as i32;
    if n == 0 { 0 } else { (n * ADVANCE as i32 - 1) * scale }
}

impl Canvas for Raster {
    fn clear(&mut self, colour: u32) {
        self.buf.fill(colour | 0xFF00_0000);
    }

    fn fill_ellipse(&mut self, centre: Point, diameter: f32, colour: u32) {
        let r = diameter / 2.0;
        if r <= 0.0 {
            return;
        }
        let cy = centre.y.round() as i32;
        let ri = r.ceil() as i32;
        for dy in -ri..=ri {
            let h = r * r - (dy * dy) as f32;
            if h < 0.0 {
                continue;
            }
            let half = h.sqrt();
            let x0 = (centre.x - half).round() as i32;
            let x1 = (centre.x + half).round() as i32;
            self.span(x0, x1, cy + dy, colour);
        }
    }

    fn stroke_ellipse(&mut self, centre: Point, diameter: f32, weight: f32, colour: u32) {
        let r = diameter / 2.0;
        if r <= 0.0 {
            return;
        }
        let inner = (r - weight.max(1.0)).max(0.0);
        let (cx, cy) = (centre.x.round() as i32, centre.y.round() as i32);
        let ri = r.ceil() as i32;
        for dy in -ri..=ri {
            for dx in -ri..=ri {
                let d = ((dx * dx + dy * dy) as f32).sqrt();
                if d <= r && d > inner {
                    self.plot(cx + dx, cy + dy, colour);
                }
            }
        }
    }

    fn polyline(&mut self, points: &[Point], weight: f32, colour: u32) {
        let w = weight.round().max(1.0) as i32;
        for pair in points.windows(2) {
            self.line(pair[0], pair[1], w, colour);
        }
        if let [only] = points {
            self.stamp(only.x.round() as i32, only.y.round() as i32, w, colour);
        }
    }

    fn stroke_rect(&mut self, rect: &Rect, weight: f32, colour: u32) {
        let (x, y) = (rect.x.round() as i32, rect.y.round() as i32);
        let (w, h) = (rect.w.round() as i32, rect.h.round() as i32);
        let t = (weight.round() as i32).max(1).min(w.min(h) / 2).max(1);
        self.fill_rect(x, y, w, t, colour);
        self.fill_rect(x, y + h - t, w, t, colour);
        self.fill_rect(x, y + t, t, h - 2 * t, colour);
        self.fill_rect(x + w - t, y + t, t, h - 2 * t, colour);
    }

    fn text(&mut self, text: &str, centre: Point, size: f32, colour: u32) {
        let scale = text_scale(size);
        let x = centre.x.round() as i32 - text_width(text, scale) / 2;
        let y = centre.y.round() as i32 - (GLYPH_H as i32 * scale) / 2;
        self.draw_label(text, x, y, scale, colour);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window: Window,
    raster: Raster,
    sim_tx: Sender<SimInput>,
}

impl Visualizer {
    pub fn new(width: usize, height: usize, sim_tx: Sender<SimInput>) -> Result<Self, String> {
        let mut window = Window::new(
            "Vibration Explorer",
            width, height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| e.to_string())?;

        window.limit_update_rate(Some(Duration::from_millis(16))); // ~60fps

        Ok(Visualizer { window, raster: Raster::new(width, height), sim_tx })
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    /// Forward this frame's pointer and keys to the simulated hands.
    /// Returns false when the user asked to quit.
    pub fn poll_input(&mut self) -> bool {
        if !self.window.is_open() {
            return false;
        }

        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);

        if one_shot(Key::Escape) || one_shot(Key::Q) {
            let _ = self.sim_tx.send(SimInput::Quit);
            return false;
        }
        if one_shot(Key::M) {
            let _ = self.sim_tx.send(SimInput::ToggleMirror);
        }

        let at = self
            .window
            .get_mouse_pos(MouseMode::Discard)
            .map(|(x, y)| Point::new(x, y));
        let left = self.window.get_mouse_down(MouseButton::Left);
        let right = self.window.get_mouse_down(MouseButton::Right);
        let _ = self.sim_tx.send(SimInput::Pointer { at, left, right });

        true
    }

    pub fn canvas(&mut self) -> &mut Raster {
        &mut self.raster
    }

    pub fn present(&mut self) {
        let (w, h) = (self.raster.width(), self.raster.height());
        self.window.update_with_buffer(self.raster.pixels(), w, h).ok();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

/// One octal digit per row, top row first; bit 2 of a digit is the left
/// column.  Upper case draws with the lower-case entry.
const FONT: &[(char, u16)] = &[
    ('0', 0o75557), ('1', 0o26227), ('2', 0o71747), ('3', 0o71717), ('4', 0o55711), ('5', 0o74717),
    ('6', 0o74757), ('7', 0o71111), ('8', 0o75757), ('9', 0o75717), ('a', 0o75755), ('b', 0o65656),
    ('c', 0o74447), ('d', 0o65556), ('e', 0o74747), ('f', 0o74744), ('g', 0o74557), ('h', 0o55755),
    ('i', 0o72227), ('j', 0o11157), ('k', 0o55655), ('l', 0o44447), ('m', 0o57555), ('n', 0o75555),
    ('o', 0o75557), ('p', 0o75744), ('q', 0o75571), ('r', 0o65655), ('s', 0o74717), ('t', 0o72222),
    ('u', 0o55557), ('v', 0o55522), ('w', 0o55575), ('x', 0o55255), ('y', 0o55722), ('z', 0o71247),
    ('?', 0o71302), ('<', 0o12421), ('>', 0o42124), (',', 0o00024), ('.', 0o00002), ('-', 0o00700),
    (' ', 0o00000),
];

/// Unknown characters draw as a centred dot.
const MISSING_GLYPH: u16 = 0o00200;

fn glyph_rows(c: char) -> [u8; GLYPH_H] {
    let key = c.to_ascii_lowercase();
    let code = FONT.iter().find(|(k, _)| *k == key).map_or(MISSING_GLYPH, |(_, g)| *g);
    let mut rows = [0u8; GLYPH_H];
    for (i, row) in rows.iter_mut().enumerate() {
        *row = ((code >> (3 * (GLYPH_H - 1 - i))) & 0o7) as u8;
    }
    rows
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RED: u32 = 0xFFFF_0000;

    fn lit(r: &Raster) -> usize {
        r.pixels().iter().filter(|p| **p != BG_COLOR).count()
    }

    #[test]
    fn translucent_colour_blends_over_background() {
        let mut r = Raster::new(4, 4);
        r.fill_ellipse(Point::new(1.0, 1.0), 1.0, 0x80FF_FFFF);
        assert_eq!(r.pixel(1, 1), Some(0xFF80_8080));
    }

    #[test]
    fn zero_alpha_draws_nothing() {
        let mut r = Raster::new(20, 20);
        r.fill_ellipse(Point::new(10.0, 10.0), 10.0, 0x00FF_FFFF);
        r.text("hello", Point::new(10.0, 10.0), 6.0, 0x00FF_FFFF);
        assert_eq!(lit(&r), 0);
    }

    #[test]
    fn filled_circle_covers_its_centre_not_its_corners() {
        let mut r = Raster::new(40, 40);
        r.fill_ellipse(Point::new(20.0, 20.0), 20.0, RED);
        assert_eq!(r.pixel(20, 20), Some(RED));
        assert_eq!(r.pixel(11, 11), Some(BG_COLOR));
        assert_eq!(r.pixel(29, 20), Some(RED));
    }

    #[test]
    fn stroked_circle_is_hollow() {
        let mut r = Raster::new(40, 40);
        r.stroke_ellipse(Point::new(20.0, 20.0), 30.0, 2.0, RED);
        assert_eq!(r.pixel(20, 20), Some(BG_COLOR));
        assert_eq!(r.pixel(34, 20), Some(RED));
    }

    #[test]
    fn polyline_reaches_both_ends() {
        let mut r = Raster::new(30, 30);
        r.polyline(&[Point::new(2.0, 2.0), Point::new(20.0, 9.0), Point::new(25.0, 25.0)], 1.0, RED);
        assert_eq!(r.pixel(2, 2), Some(RED));
        assert_eq!(r.pixel(20, 9), Some(RED));
        assert_eq!(r.pixel(25, 25), Some(RED));
    }

    #[test]
    fn off_screen_geometry_is_clipped() {
        let mut r = Raster::new(10, 10);
        r.polyline(&[Point::new(-50.0, -50.0), Point::new(50.0, 50.0)], 3.0, RED);
        r.fill_ellipse(Point::new(-100.0, 5.0), 30.0, RED);
        r.stroke_rect(&Rect::new(-5.0, -5.0, 100.0, 100.0), 1.0, RED);
        assert!(lit(&r) > 0);
    }

    #[test]
    fn rect_outline_leaves_inside_clear() {
        let mut r = Raster::new(20, 20);
        r.stroke_rect(&Rect::new(2.0, 2.0, 10.0, 10.0), 1.0, RED);
        assert_eq!(r.pixel(2, 2), Some(RED));
        assert_eq!(r.pixel(11, 11), Some(RED));
        assert_eq!(r.pixel(6, 6), Some(BG_COLOR));
    }

    #[test]
    fn text_is_centred() {
        assert_eq!(text_scale(24.0), 4);
        assert_eq!(text_width("ab", 1), 7);
        let mut r = Raster::new(40, 20);
        r.text("i", Point::new(20.0, 10.0), 6.0, RED);
        // 'i' is a full-width top bar at scale 1, centred on x = 20
        assert_eq!(r.pixel(19, 8), Some(RED));
        assert_eq!(r.pixel(21, 8), Some(RED));
        assert_eq!(r.pixel(18, 8), Some(BG_COLOR));
    }

    #[test]
    fn translucent_colour_mixes_with_what_is_underneath() {
        let mut r = Raster::new(4, 4);
        r.clear(0xFF00_00FF);
        r.fill_ellipse(Point::new(1.0, 1.0), 1.0, 0x40FF_0000);
        // a quarter red over blue, rounded per channel
        assert_eq!(r.pixel(1, 1), Some(0xFF40_00BF));
    }

    #[test]
    fn glyphs_ignore_case_and_fall_back_to_a_dot() {
        assert_eq!(glyph_rows('A'), glyph_rows('a'));
        assert_eq!(glyph_rows('t'), [0b111, 0b010, 0b010, 0b010, 0b010]);
        assert_eq!(glyph_rows('~'), [0b000, 0b000, 0b010, 0b000, 0b000]);
    }

    #[test]
    fn clear_is_opaque() {
        let mut r = Raster::new(2, 2);
        r.clear(0x0012_3456);
        assert_eq!(r.pixel(0, 0), Some(0xFF12_3456));
    }
}
