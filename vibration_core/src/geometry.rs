//! Screen-space primitives shared by hit-testing, motion and drawing.

// ════════════════════════════════════════════════════════════════════════════
// Point
// ════════════════════════════════════════════════════════════════════════════

/// A position in window pixels (origin top-left, y grows downward).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Point { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Hit shapes
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub centre: Point,
    pub r:      f32,
}

impl Circle {
    pub const fn new(x: f32, y: f32, r: f32) -> Self {
        Circle { centre: Point::new(x, y), r }
    }

    /// Strictly inside: a point on the rim does not count.
    pub fn contains(&self, p: &Point) -> bool {
        self.centre.distance(p) < self.r
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Rect { x, y, w, h }
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.x > self.x && p.x < self.x + self.w && p.y > self.y && p.y < self.y + self.h
    }

    pub fn centre(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

/// Horizontal band `centre ± half_height`, open at both edges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Band {
    pub centre:      f32,
    pub half_height: f32,
}

impl Band {
    pub fn contains(&self, p: &Point) -> bool {
        p.y > self.centre - self.half_height && p.y < self.centre + self.half_height
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Screen
// ════════════════════════════════════════════════════════════════════════════

/// Logical drawing surface; equal to the window size in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Screen {
    pub width:  f32,
    pub height: f32,
}

impl Screen {
    pub const fn new(width: f32, height: f32) -> Self {
        Screen { width, height }
    }

    /// The rectangle agents are confined to: `margin` pixels in from each edge.
    pub fn inset(&self, margin: f32) -> Bounds {
        Bounds {
            min: Point::new(margin, margin),
            max: Point::new(
                (self.width - margin).max(margin),
                (self.height - margin).max(margin),
            ),
        }
    }
}

impl Default for Screen {
    fn default() -> Self {
        Screen::new(1280.0, 800.0)
    }
}

/// Axis-aligned closed region used for clamping motion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

// ════════════════════════════════════════════════════════════════════════════
// Range helpers
// ════════════════════════════════════════════════════════════════════════════

/// Linear remap of `v` from `[a0, a1]` onto `[b0, b1]` (unclamped).
///
/// A degenerate source range maps everything to `b0` instead of dividing by
/// zero.
pub fn map_range(v: f32, a0: f32, a1: f32, b0: f32, b1: f32) -> f32 {
    let span = a1 - a0;
    if span.abs() < f32::EPSILON {
        return b0;
    }
    b0 + (v - a0) / span * (b1 - b0)
}

/// Remap then clamp into the target range, whichever way round it runs.
pub fn map_clamped(v: f32, a0: f32, a1: f32, b0: f32, b1: f32) -> f32 {
    let lo = b0.min(b1);
    let hi = b0.max(b1);
    let m = map_range(v, a0, a1, b0, b1);
    if m.is_nan() { lo } else { m.clamp(lo, hi) }
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn circle_rim_is_outside() {
        let c = Circle::new(0.0, 0.0, 10.0);
        assert!(c.contains(&Point::new(9.9, 0.0)));
        assert!(!c.contains(&Point::new(10.0, 0.0)));
    }

    #[test]
    fn rect_edges_are_outside() {
        let r = Rect::new(50.0, 150.0, 100.0, 100.0);
        assert!(r.contains(&Point::new(100.0, 200.0)));
        assert!(!r.contains(&Point::new(50.0, 200.0)));
        assert!(!r.contains(&Point::new(100.0, 250.0)));
    }

    #[test]
    fn map_range_inverts() {
        assert_approx_eq!(map_range(0.0, 0.0, 1000.0, 200.0, 0.0), 200.0);
        assert_approx_eq!(map_range(250.0, 0.0, 1000.0, 200.0, 0.0), 150.0);
    }

    #[test]
    fn map_range_degenerate_source() {
        assert_eq!(map_range(5.0, 3.0, 3.0, 7.0, 9.0), 7.0);
    }

    #[test]
    fn map_clamped_off_screen() {
        assert_eq!(map_clamped(-50.0, 0.0, 1000.0, 200.0, 0.0), 200.0);
        assert_eq!(map_clamped(5000.0, 0.0, 1000.0, 200.0, 0.0), 0.0);
    }

    #[test]
    fn inset_never_inverts() {
        let b = Screen::new(150.0, 150.0).inset(100.0);
        assert!(b.max.x >= b.min.x);
        assert!(b.max.y >= b.min.y);
    }
}
