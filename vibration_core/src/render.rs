//! Scene composition: what each stage draws, expressed against a [`Canvas`].
//!
//! The core never touches pixels.  A frontend implements [`Canvas`] and calls
//! [`render`] once per frame after [`ApplicationState::tick`].  Draw order:
//!
//! ```text
//!   background → agents → stage scene (policy table) → hand cursors
//! ```
//!
//! Stage scenes fade in with the view alpha; agents and cursors do not.

use std::f32::consts::TAU;

use crate::envelope::EnvelopeCurve;
use crate::geometry::{map_range, Point, Rect};
use crate::params::{ModulatedVoice, Shape, WaveformType};
use crate::stage::{self, Stage, SubMenu};
use crate::state::ApplicationState;
use crate::vibe::argb;

pub const BACKGROUND: u32 = argb(255, 0, 0, 0);
pub const WHITE:      u32 = argb(255, 255, 255, 255);
pub const RED:        u32 = argb(255, 255, 100, 100);
pub const GREEN:      u32 = argb(255, 100, 255, 100);
pub const BLUE:       u32 = argb(255, 100, 100, 255);
pub const PURPLE:     u32 = argb(255, 200, 100, 255);
pub const AM_PRODUCT: u32 = argb(255, 255, 200, 200);
pub const BUTTON:     u32 = argb(255, 200, 200, 200);
pub const DIM:        u32 = argb(255, 80, 80, 80);

pub const TITLE_SIZE:  f32 = 24.0;
pub const PROMPT_SIZE: f32 = 18.0;
pub const LABEL_SIZE:  f32 = 16.0;

/// Vertical extent of the single-voice waveforms.
pub const WAVE_HEIGHT: f32 = 40.0;
/// Vertical extent of the AM product.
pub const AM_WAVE_HEIGHT: f32 = 26.0;

const CURSOR_DIAMETER: f32 = 25.0;
const HALO_DIAMETER:   f32 = 35.0;
const ICON_POINTS:     usize = 20;

// ════════════════════════════════════════════════════════════════════════════
// Canvas — the drawing surface a frontend provides
// ════════════════════════════════════════════════════════════════════════════

/// Immediate-mode drawing surface.  Colours are packed ARGB; alpha is
/// honoured by blending.
pub trait Canvas {
    fn clear(&mut self, colour: u32);
    fn fill_ellipse(&mut self, centre: Point, diameter: f32, colour: u32);
    fn stroke_ellipse(&mut self, centre: Point, diameter: f32, weight: f32, colour: u32);
    fn polyline(&mut self, points: &[Point], weight: f32, colour: u32);
    fn stroke_rect(&mut self, rect: &Rect, weight: f32, colour: u32);
    /// Text centred on `centre`.
    fn text(&mut self, text: &str, centre: Point, size: f32, colour: u32);
}

/// Scale the alpha channel of `colour` by `alpha / 255`.
pub fn faded(colour: u32, alpha: u8) -> u32 {
    let a = (colour >> 24) * alpha as u32 / 255;
    (a << 24) | (colour & 0x00FF_FFFF)
}

// ════════════════════════════════════════════════════════════════════════════
// Entry point and policy table
// ════════════════════════════════════════════════════════════════════════════

type Scene = fn(&ApplicationState, &mut dyn Canvas);

/// Stage → scene.
pub fn scene_for(stage: Stage) -> Scene {
    match stage {
        Stage::SelectMode               => select_mode_scene,
        Stage::Primitive                => primitive_scene,
        Stage::Synthesis(SubMenu::Menu) => synthesis_menu_scene,
        Stage::Synthesis(SubMenu::Am)   => am_scene,
        Stage::Synthesis(SubMenu::Fm)   => fm_scene,
        Stage::Envelope(_)              => envelope_scene,
    }
}

pub fn render(state: &ApplicationState, canvas: &mut dyn Canvas) {
    canvas.clear(BACKGROUND);
    draw_agents(state, canvas);
    scene_for(state.stage())(state, canvas);
    draw_cursors(state, canvas);
}

// ════════════════════════════════════════════════════════════════════════════
// Scenes
// ════════════════════════════════════════════════════════════════════════════

fn select_mode_scene(s: &ApplicationState, c: &mut dyn Canvas) {
    header(s, c, &s.target().prompt());
    menu_circles(s, c);
}

fn primitive_scene(s: &ApplicationState, c: &mut dyn Canvas) {
    header(s, c, "Try compressing or stretching the wave...");
    let l = s.layout();
    let v = &s.params().primitive;
    let points = waveform_points(v.shape, v.frequency, l.primitive_band().centre, l.screen.width);
    c.polyline(&points, 3.0, faded(WHITE, s.alpha()));
    shape_boxes(s, c, WaveformType::Primitive);
    back_button(s, c);
}

fn synthesis_menu_scene(s: &ApplicationState, c: &mut dyn Canvas) {
    header(s, c, &s.target().prompt());
    menu_circles(s, c);
    back_button(s, c);
}

fn am_scene(s: &ApplicationState, c: &mut dyn Canvas) {
    let v = &s.params().am;
    modulated_scene(s, c, v, WaveformType::Am);
    let points = am_points(v, s.layout().am_product_row(), s.layout().screen.width);
    c.polyline(&points, 1.0, faded(AM_PRODUCT, s.alpha()));
}

fn fm_scene(s: &ApplicationState, c: &mut dyn Canvas) {
    let v = &s.params().fm;
    modulated_scene(s, c, v, WaveformType::Fm);
    let (top, bottom) = s.layout().fm_result_rows();
    let points = fm_points(v, top, bottom, s.layout().screen.width);
    c.polyline(&points, 1.0, faded(WHITE, s.alpha()));
}

fn modulated_scene(s: &ApplicationState, c: &mut dyn Canvas, v: &ModulatedVoice, wave: WaveformType) {
    header(s, c, &s.target().prompt());
    let l = s.layout();
    let w = l.screen.width;
    let carrier = waveform_points(v.carrier_shape, v.carrier_frequency, l.carrier_band().centre, w);
    let modulator = waveform_points(v.shape, v.frequency, l.modulator_band().centre, w);
    c.polyline(&carrier, 3.0, faded(RED, s.alpha()));
    c.polyline(&modulator, 3.0, faded(GREEN, s.alpha()));
    shape_boxes(s, c, wave);
    depth_slider(s, c, v, wave);
    back_button(s, c);
}

fn envelope_scene(s: &ApplicationState, c: &mut dyn Canvas) {
    header(s, c, &s.target().envelope_prompt());
    let (top, bottom) = s.layout().envelope_value_range();
    let points = envelope_points(s.envelope(), s.layout().screen.width, top, bottom);
    c.polyline(&points, 2.0, faded(PURPLE, s.alpha()));
    menu_circles(s, c);
    back_button(s, c);
    button(s, c, &s.layout().save_button(), "Save");
}

// ════════════════════════════════════════════════════════════════════════════
// Widgets
// ════════════════════════════════════════════════════════════════════════════

fn header(s: &ApplicationState, c: &mut dyn Canvas, prompt: &str) {
    let x = s.layout().screen.width / 2.0;
    let colour = faded(WHITE, s.alpha());
    c.text(s.stage().title(), Point::new(x, 50.0), TITLE_SIZE, colour);
    c.text(prompt, Point::new(x, 90.0), PROMPT_SIZE, colour);
}

/// Highlight colour of a menu circle, keyed by its label.
pub fn accent(label: &str) -> u32 {
    match label {
        "primitive"         => RED,
        "synthesis" | "am"  => GREEN,
        _                   => BLUE,
    }
}

/// Menu circles are lit while hovered, except on the envelope screen where
/// the lit circle is the chosen wave.
fn menu_circles(s: &ApplicationState, c: &mut dyn Canvas) {
    let stage = s.stage();
    for t in stage::targets(stage, s.layout(), s.last_wave()) {
        let lit = match (stage, t.action) {
            (Stage::Envelope(current), stage::Action::SelectWave(w)) => current == w,
            _ => stage::is_hovered(&t.circle, s.hands()),
        };
        let colour = faded(if lit { accent(t.label) } else { WHITE }, s.alpha());
        c.fill_ellipse(t.circle.centre, 2.0 * t.circle.r, faded(BACKGROUND, s.alpha()));
        c.stroke_ellipse(t.circle.centre, 2.0 * t.circle.r, 1.0, colour);
        c.text(t.label, t.circle.centre, LABEL_SIZE, colour);
    }
}

fn shape_boxes(s: &ApplicationState, c: &mut dyn Canvas, voice: WaveformType) {
    let current = match voice.modulation() {
        None    => s.params().primitive.shape,
        Some(m) => s.params().modulated(m).shape,
    };
    for (shape, rect) in s.layout().shape_boxes(voice) {
        let edge = if shape == current { WHITE } else { DIM };
        c.stroke_rect(&rect, 1.0, faded(edge, s.alpha()));
        c.polyline(&shape_icon(shape, &rect), 1.0, faded(WHITE, s.alpha()));
    }
}

fn depth_slider(s: &ApplicationState, c: &mut dyn Canvas, v: &ModulatedVoice, wave: WaveformType) {
    let slider = s.layout().depth_slider();
    let max = wave.modulation().map_or(1.0, |m| m.depth_max());
    let x = map_range(v.depth, 0.0, max, slider.x, slider.x + slider.w);
    let colour = faded(BUTTON, s.alpha());
    c.stroke_rect(&slider, 1.0, colour);
    c.polyline(&[Point::new(x, slider.y), Point::new(x, slider.y + slider.h)], 3.0, colour);
    c.text("depth", Point::new(slider.centre().x, slider.y + slider.h + 15.0), LABEL_SIZE, colour);
}

fn back_button(s: &ApplicationState, c: &mut dyn Canvas) {
    button(s, c, &s.layout().back_button(), "<-");
}

fn button(s: &ApplicationState, c: &mut dyn Canvas, rect: &Rect, label: &str) {
    c.stroke_rect(rect, 1.0, faded(BUTTON, s.alpha()));
    c.text(label, rect.centre(), PROMPT_SIZE, faded(WHITE, s.alpha()));
}

fn draw_agents(s: &ApplicationState, c: &mut dyn Canvas) {
    for a in s.agents().agents() {
        let d = a.diameter();
        let edge = if a.is_durable() { WHITE } else { BACKGROUND };
        c.fill_ellipse(a.position, d, a.colour);
        c.stroke_ellipse(a.position, d, 2.0, edge);
    }
}

fn draw_cursors(s: &ApplicationState, c: &mut dyn Canvas) {
    for slot in &s.hands().slots {
        let Some(p) = slot.screen_position else { continue };
        if slot.is_pinching {
            c.fill_ellipse(p, HALO_DIAMETER, PURPLE);
        }
        c.fill_ellipse(p, CURSOR_DIAMETER, WHITE);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Waveform geometry
// ════════════════════════════════════════════════════════════════════════════

/// One vertex per pixel column; `frequency / 5` cycles across the screen.
pub fn waveform_points(shape: Shape, frequency: f32, row: f32, width: f32) -> Vec<Point> {
    let cycles = frequency / 5.0;
    columns(width)
        .map(|x| {
            let t = map_range(x, 0.0, width, 0.0, TAU * cycles);
            Point::new(x, row + shape.sample(t) * WAVE_HEIGHT)
        })
        .collect()
}

/// Carrier scaled by `1 + modulator · depth / 10`.
pub fn am_points(v: &ModulatedVoice, row: f32, width: f32) -> Vec<Point> {
    let carrier_cycles = v.carrier_frequency / 10.0;
    let mod_cycles = v.frequency / 10.0;
    columns(width)
        .map(|x| {
            let t = map_range(x, 0.0, width, 0.0, TAU * carrier_cycles);
            let mt = map_range(x, 0.0, width, 0.0, TAU * mod_cycles);
            let gain = 1.0 + v.shape.sample(mt) * v.depth / 10.0;
            Point::new(x, row + v.carrier_shape.sample(t) * gain * AM_WAVE_HEIGHT)
        })
        .collect()
}

/// Phase-modulated carrier drawn between rows `top` (value −1) and `bottom`.
pub fn fm_points(v: &ModulatedVoice, top: f32, bottom: f32, width: f32) -> Vec<Point> {
    columns(width)
        .map(|x| {
            let t = x / width;
            let deviation = v.depth / 4.0 * cycle_sample(v.shape, t * v.frequency);
            let phase = t / 10.0 * TAU * v.carrier_frequency + deviation;
            let value = cycle_sample(v.carrier_shape, phase / TAU);
            Point::new(x, map_range(value, -1.0, 1.0, top, bottom))
        })
        .collect()
}

/// Curve value 0 sits on `bottom`, 1 on `top`.
pub fn envelope_points(curve: &EnvelopeCurve, width: f32, top: f32, bottom: f32) -> Vec<Point> {
    let n = curve.len() as f32;
    curve
        .values()
        .iter()
        .enumerate()
        .map(|(i, v)| Point::new(map_range(i as f32, 0.0, n, 0.0, width), map_range(*v, 0.0, 1.0, bottom, top)))
        .collect()
}

/// One period of `shape`, inset into its box.
pub fn shape_icon(shape: Shape, rect: &Rect) -> Vec<Point> {
    (0..ICON_POINTS)
        .map(|j| {
            let t = map_range(j as f32, 0.0, (ICON_POINTS - 1) as f32, 0.0, TAU);
            Point::new(rect.x + 30.0 + j as f32 * 2.0, rect.y + 40.0 + shape.sample(t) * 20.0)
        })
        .collect()
}

/// Sample by cycle count rather than angle; triangle starts at −1.
fn cycle_sample(shape: Shape, cycles: f32) -> f32 {
    let p = cycles.rem_euclid(1.0);
    match shape {
        Shape::Sine     => (cycles * TAU).sin(),
        Shape::Square   => if p < 0.5 { 1.0 } else { -1.0 },
        Shape::Sawtooth => p * 2.0 - 1.0,
        Shape::Triangle => if p < 0.5 { 4.0 * p - 1.0 } else { 3.0 - 4.0 * p },
    }
}

fn columns(width: f32) -> impl Iterator<Item = f32> {
    (0..width.max(0.0) as usize).map(|x| x as f32)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Screen;
    use crate::gesture::HandLandmarks;
    use crate::graph::SoftwareGraph;
    use crate::state::{ExplorerSettings, MAX_ALPHA};
    use assert_approx_eq::assert_approx_eq;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Clear,
        Fill(Point, f32, u32),
        Stroke(Point, f32, u32),
        Line(usize, u32),
        Rect(Rect, u32),
        Text(String, u32),
    }

    #[derive(Default)]
    struct Recorder {
        ops: Vec<Op>,
    }

    impl Canvas for Recorder {
        fn clear(&mut self, _: u32) {
            self.ops.push(Op::Clear);
        }
        fn fill_ellipse(&mut self, centre: Point, diameter: f32, colour: u32) {
            self.ops.push(Op::Fill(centre, diameter, colour));
        }
        fn stroke_ellipse(&mut self, centre: Point, diameter: f32, _: f32, colour: u32) {
            self.ops.push(Op::Stroke(centre, diameter, colour));
        }
        fn polyline(&mut self, points: &[Point], _: f32, colour: u32) {
            self.ops.push(Op::Line(points.len(), colour));
        }
        fn stroke_rect(&mut self, rect: &Rect, _: f32, colour: u32) {
            self.ops.push(Op::Rect(*rect, colour));
        }
        fn text(&mut self, text: &str, _: Point, _: f32, colour: u32) {
            self.ops.push(Op::Text(text.to_string(), colour));
        }
    }

    impl Recorder {
        fn texts(&self) -> Vec<String> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Text(t, _) => Some(t.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    fn setup() -> (ApplicationState, SoftwareGraph) {
        let mut g = SoftwareGraph::new(48_000.0);
        let s = ApplicationState::new(ExplorerSettings::default(), &mut g);
        (s, g)
    }

    fn shown(s: &ApplicationState) -> Recorder {
        let mut r = Recorder::default();
        render(s, &mut r);
        r
    }

    fn hover(at: Point) -> HandLandmarks {
        HandLandmarks::new(at, Point::new(at.x + 100.0, at.y))
    }

    fn pinch(at: Point) -> HandLandmarks {
        HandLandmarks::new(at, Point::new(at.x + 10.0, at.y))
    }

    #[test]
    fn home_shows_title_prompt_and_menu() {
        let (s, _) = setup();
        let r = shown(&s);
        assert_eq!(r.ops[0], Op::Clear);
        let texts = r.texts();
        assert_eq!(texts[0], Stage::SelectMode.title());
        assert_eq!(texts[1], s.target().prompt());
        assert!(texts.contains(&"synthesis".to_string()));
        assert!(texts.contains(&"envelope".to_string()));
        assert!(!texts.contains(&"Save".to_string()));
    }

    #[test]
    fn scene_fades_with_view_alpha() {
        let (s, _) = setup();
        assert_eq!(s.alpha(), 0);
        let r = shown(&s);
        for op in &r.ops {
            if let Op::Text(_, colour) = op {
                assert_eq!(colour >> 24, 0);
            }
        }
    }

    #[test]
    fn agents_draw_under_the_scene() {
        let (s, _) = setup();
        let r = shown(&s);
        let n = s.agents().agents().len();
        assert_eq!(r.ops[1..=2 * n].iter().filter(|op| matches!(op, Op::Fill(..))).count(), n);
    }

    #[test]
    fn hovered_circle_is_lit() {
        let (mut s, mut g) = setup();
        for _ in 0..100 {
            s.tick(&[], &mut g);
        }
        let centre = s.layout().envelope_circle().centre;
        s.tick(&[hover(centre)], &mut g);
        let r = shown(&s);
        let lit = faded(BLUE, s.alpha());
        assert!(r.ops.contains(&Op::Text("envelope".to_string(), lit)));
        assert!(r.ops.contains(&Op::Text("synthesis".to_string(), faded(WHITE, s.alpha()))));
    }

    #[test]
    fn pinching_hand_gets_a_halo() {
        let (mut s, mut g) = setup();
        let at = Point::new(40.0, 700.0);
        s.tick(&[pinch(at), hover(Point::new(900.0, 700.0))], &mut g);
        let r = shown(&s);
        let tail = &r.ops[r.ops.len() - 3..];
        assert_eq!(tail[0], Op::Fill(at, HALO_DIAMETER, PURPLE));
        assert_eq!(tail[1], Op::Fill(at, CURSOR_DIAMETER, WHITE));
        assert!(matches!(tail[2], Op::Fill(_, d, WHITE) if d == CURSOR_DIAMETER));
    }

    #[test]
    fn every_stage_has_a_titled_scene() {
        let (mut s, mut g) = setup();
        for stage in [
            Stage::SelectMode,
            Stage::Primitive,
            Stage::Synthesis(SubMenu::Menu),
            Stage::Synthesis(SubMenu::Am),
            Stage::Synthesis(SubMenu::Fm),
            Stage::Envelope(WaveformType::Am),
        ] {
            s.transition(stage, &mut g);
            let texts = shown(&s).texts();
            assert_eq!(texts[0], stage.title());
            assert_eq!(texts.contains(&"<-".to_string()), stage.back().is_some());
            assert_eq!(texts.contains(&"Save".to_string()), stage.has_save());
        }
    }

    #[test]
    fn envelope_scene_uses_word_article_and_lights_chosen_wave() {
        let (mut s, mut g) = setup();
        s.transition(Stage::Envelope(WaveformType::Fm), &mut g);
        for _ in 0..90 {
            s.tick(&[], &mut g);
        }
        assert_eq!(s.alpha(), MAX_ALPHA);
        let r = shown(&s);
        let texts = r.texts();
        assert_eq!(texts[1], s.target().envelope_prompt());
        assert!(r.ops.contains(&Op::Text("fm".to_string(), BLUE)));
        assert!(r.ops.contains(&Op::Text("am".to_string(), WHITE)));
        assert!(r.ops.contains(&Op::Line(128, PURPLE)));
    }

    #[test]
    fn modulated_scene_draws_voices_and_result() {
        let (mut s, mut g) = setup();
        s.transition(Stage::Synthesis(SubMenu::Fm), &mut g);
        let r = shown(&s);
        let width = Screen::default().width as usize;
        let full = r.ops.iter().filter(|op| matches!(op, Op::Line(n, _) if *n == width)).count();
        assert_eq!(full, 3);
        // one depth marker and four shape icons
        let short = r.ops.iter().filter(|op| matches!(op, Op::Line(n, _) if *n < width)).count();
        assert_eq!(short, 5);
    }

    #[test]
    fn envelope_points_span_value_range() {
        let mut values = [0.0; 128];
        values[64] = 1.0;
        let pts = envelope_points(&EnvelopeCurve::from_values(values), 1280.0, 280.0, 520.0);
        assert_eq!(pts.len(), 128);
        assert_approx_eq!(pts[0].x, 0.0);
        assert_approx_eq!(pts[0].y, 520.0);
        assert_approx_eq!(pts[64].x, 640.0);
        assert_approx_eq!(pts[64].y, 280.0);
    }

    #[test]
    fn am_product_stays_inside_modulated_extent() {
        let mut v = ModulatedVoice::new(1.0);
        v.carrier_frequency = 80.0;
        v.frequency = 7.0;
        v.shape = Shape::Square;
        let pts = am_points(&v, 400.0, 800.0);
        let reach = AM_WAVE_HEIGHT * (1.0 + 1.0 / 10.0) + 1e-3;
        assert_eq!(pts.len(), 800);
        assert!(pts.iter().all(|p| (p.y - 400.0).abs() <= reach));
    }

    #[test]
    fn fm_result_stays_between_rows() {
        for shape in Shape::ALL {
            let mut v = ModulatedVoice::new(100.0);
            v.carrier_shape = shape;
            v.shape = shape;
            let pts = fm_points(&v, 680.0, 780.0, 640.0);
            assert!(pts.iter().all(|p| p.y >= 680.0 - 1e-3 && p.y <= 780.0 + 1e-3), "{}", shape.name());
        }
    }

    #[test]
    fn waveform_cycles_follow_frequency() {
        // 5 Hz is one cycle: the sine crosses the row at both ends and the middle
        let pts = waveform_points(Shape::Sine, 5.0, 100.0, 400.0);
        assert_approx_eq!(pts[0].y, 100.0);
        assert_approx_eq!(pts[100].y, 140.0, 1e-3);
        assert_approx_eq!(pts[200].y, 100.0, 1e-3);
    }

    #[test]
    fn faded_scales_only_alpha() {
        assert_eq!(faded(RED, 255), RED);
        assert_eq!(faded(RED, 0), RED & 0x00FF_FFFF);
        assert_eq!(faded(argb(102, 1, 2, 3), 128) >> 24, 51);
    }
}
