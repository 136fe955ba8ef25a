// ============================================================================
// GAUGE VIEW
// ============================================================================
//
// Software renderer for the dial. It only consumes `GaugeEvent`s and never
// touches the controller, so any other front end can replace it.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;

use rusttype::{point, Font, PositionedGlyph, Scale};
use thiserror::Error;
use tracing::warn;

use crate::config::{Color, GaugeConfig, ViewConfig};
use crate::controller::GaugeEvent;
use crate::format::{format_display_value, format_scale_label};
use crate::scale::BreakpointScale;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("failed to read font {path}: {source}")]
    FontRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} is not a usable font")]
    FontParse(PathBuf),
}

/// Differences smaller than this snap instead of easing forever.
const SNAP_EPSILON: f64 = 1e-3;

// ============================================================================
// VIEW STATE
// ============================================================================

/// Drawn state of one gauge, eased toward whatever the controller last
/// published.
pub struct GaugeView {
    config: ViewConfig,
    start_angle: f64,
    total_angle: f64,
    labels: Vec<ScaleLabel>,
    font: Option<Font<'static>>,
    needle_angle: f64,
    target_angle: f64,
    progress: f64,
    target_progress: f64,
    displayed_value: f64,
    is_animating: bool,
    flash: f64,
}

struct ScaleLabel {
    angle: f64,
    text: String,
    is_middle: bool,
}

impl GaugeView {
    pub fn new(
        config: ViewConfig,
        gauge: &GaugeConfig,
        scale: &BreakpointScale,
    ) -> Result<Self, ViewError> {
        let font = match &config.font_path {
            Some(path) => Some(load_font(path)?),
            None => {
                warn!("no font configured; labels and readout will not be drawn");
                None
            }
        };

        let count = scale.breakpoints().len();
        let labels = scale
            .label_positions()
            .enumerate()
            .map(|(i, (fraction, value))| ScaleLabel {
                angle: gauge.angle_for(fraction),
                text: format_scale_label(value),
                is_middle: count % 2 != 0 && i == count / 2,
            })
            .collect();

        Ok(Self {
            config,
            start_angle: gauge.start_angle,
            total_angle: gauge.total_angle,
            labels,
            font,
            needle_angle: gauge.start_angle,
            target_angle: gauge.start_angle,
            progress: 0.0,
            target_progress: 0.0,
            displayed_value: 0.0,
            is_animating: false,
            flash: 0.0,
        })
    }

    pub fn apply(&mut self, event: GaugeEvent) {
        match event {
            GaugeEvent::State(state) => {
                self.target_angle = state.needle_angle;
                self.target_progress = state.progress;
                self.displayed_value = state.displayed_value;
                self.is_animating = state.is_animating;
            }
            GaugeEvent::Pulse(pulse) => {
                self.flash = self.flash.max(pulse.intensity);
            }
        }
    }

    /// Applies everything queued on `receiver` without blocking.
    pub fn apply_pending(&mut self, receiver: &Receiver<GaugeEvent>) {
        while let Ok(event) = receiver.try_recv() {
            self.apply(event);
        }
    }

    /// Advances the drawn needle, arc and flash by one frame.
    pub fn update(&mut self) {
        let smoothing = self.config.needle_smoothing;
        self.needle_angle = approach(self.needle_angle, self.target_angle, smoothing);
        self.progress = approach(self.progress, self.target_progress, smoothing).clamp(0.0, 1.0);
        self.flash *= self.config.pulse_flash_decay;
        if self.flash < SNAP_EPSILON {
            self.flash = 0.0;
        }
    }

    pub fn readout(&self) -> String {
        format_display_value(self.displayed_value)
    }

    pub fn needle_angle(&self) -> f64 {
        self.needle_angle
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn flash(&self) -> f64 {
        self.flash
    }

    pub fn is_animating(&self) -> bool {
        self.is_animating
    }

    pub fn render(&self, frame: &mut [u8], width: usize, height: usize) {
        let mut canvas = Canvas::new(frame, width, height);
        self.build_scene(width, height).render(&mut canvas, self.font.as_ref());
    }

    fn build_scene(&self, width: usize, height: usize) -> Scene {
        let cfg = &self.config;
        let size = width.min(height) as f64;
        let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
        let radius = size * cfg.radius_ratio;
        let track_radius = radius + size * cfg.progress_track_offset_ratio;
        let track_width = size * cfg.progress_track_width_ratio;

        let mut scene = Scene::default();
        scene.add(DrawCommand::Clear(cfg.background_color));
        scene.add(DrawCommand::Disc {
            cx,
            cy,
            radius: size * cfg.background_ratio / 2.0,
            top: cfg.dial_color.mix(cfg.background_color, 0.15),
            bottom: cfg.dial_color,
        });

        // Full track, then the progress arc over it
        scene.add(DrawCommand::Arc {
            cx,
            cy,
            radius: track_radius,
            width: track_width,
            start_angle: self.start_angle,
            sweep: 360.0,
            color: cfg.track_color,
        });
        if self.progress > 0.0 {
            scene.add(DrawCommand::Arc {
                cx,
                cy,
                radius: track_radius,
                width: track_width,
                start_angle: self.start_angle,
                sweep: self.progress * self.total_angle,
                color: cfg.progress_color,
            });
        }

        self.add_scale_labels(&mut scene, cx, cy, track_radius, size);

        let needle_length = radius * cfg.needle_length_ratio;
        let rad = self.needle_angle.to_radians();
        scene.add(DrawCommand::Line {
            x0: cx,
            y0: cy,
            x1: cx + rad.cos() * needle_length,
            y1: cy + rad.sin() * needle_length,
            width: size * cfg.needle_width_ratio,
            color: cfg.needle_color,
        });
        scene.add(DrawCommand::Disc {
            cx,
            cy,
            radius: size * cfg.hub_size_ratio / 2.0,
            top: cfg.hub_color.mix(cfg.pulse_color, self.flash),
            bottom: cfg.hub_color.mix(cfg.pulse_color, self.flash),
        });

        scene.add(DrawCommand::Text {
            x: cx,
            y: cy + size / 2.0 - size * cfg.text_padding_ratio,
            text: self.readout(),
            font_size: (size * cfg.readout_text_size_ratio) as f32,
            color: cfg.text_color,
        });
        scene
    }

    fn add_scale_labels(&self, scene: &mut Scene, cx: f64, cy: f64, track_radius: f64, size: f64) {
        let font_size = (size * self.config.scale_text_size_ratio) as f32;
        let edge_radius = track_radius - self.config.scale_label_spacing;
        for label in &self.labels {
            let rad = label.angle.to_radians();
            let (edge_x, edge_y) = (cx + edge_radius * rad.cos(), cy + edge_radius * rad.sin());
            let half_width = self
                .font
                .as_ref()
                .map(|font| {
                    calculate_text_width(&label.text, font, Scale::uniform(font_size)) as f64 / 2.0
                })
                .unwrap_or(0.0);
            // Labels hug the rim: shift inward by half their width
            let normalized = label.angle.rem_euclid(360.0);
            let x = if label.is_middle {
                edge_x
            } else if normalized > 90.0 && normalized < 270.0 {
                edge_x + half_width
            } else {
                edge_x - half_width
            };
            scene.add(DrawCommand::Text {
                x,
                y: edge_y,
                text: label.text.clone(),
                font_size,
                color: self.config.text_color,
            });
        }
    }
}

fn load_font(path: &Path) -> Result<Font<'static>, ViewError> {
    let bytes = std::fs::read(path).map_err(|source| ViewError::FontRead {
        path: path.to_path_buf(),
        source,
    })?;
    Font::try_from_vec(bytes).ok_or_else(|| ViewError::FontParse(path.to_path_buf()))
}

fn approach(current: f64, target: f64, factor: f64) -> f64 {
    if (target - current).abs() < SNAP_EPSILON {
        target
    } else {
        current + (target - current) * factor
    }
}

// ============================================================================
// RETAINED MODE ABSTRACTIONS
// ============================================================================

#[derive(Clone, Debug)]
enum DrawCommand {
    Clear(Color),
    /// Filled circle with a vertical gradient.
    Disc {
        cx: f64,
        cy: f64,
        radius: f64,
        top: Color,
        bottom: Color,
    },
    /// Round-capped stroke along a circle, angles in degrees.
    Arc {
        cx: f64,
        cy: f64,
        radius: f64,
        width: f64,
        start_angle: f64,
        sweep: f64,
        color: Color,
    },
    Line {
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        width: f64,
        color: Color,
    },
    Text {
        x: f64,
        y: f64,
        text: String,
        font_size: f32,
        color: Color,
    },
}

#[derive(Default)]
struct Scene {
    commands: Vec<DrawCommand>,
}

impl Scene {
    fn add(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    fn render(&self, canvas: &mut Canvas, font: Option<&Font<'static>>) {
        for command in &self.commands {
            match command {
                DrawCommand::Clear(color) => canvas.clear(*color),
                DrawCommand::Disc {
                    cx,
                    cy,
                    radius,
                    top,
                    bottom,
                } => draw_disc(canvas, *cx, *cy, *radius, *top, *bottom),
                DrawCommand::Arc {
                    cx,
                    cy,
                    radius,
                    width,
                    start_angle,
                    sweep,
                    color,
                } => draw_arc(canvas, *cx, *cy, *radius, *width, *start_angle, *sweep, *color),
                DrawCommand::Line {
                    x0,
                    y0,
                    x1,
                    y1,
                    width,
                    color,
                } => draw_thick_line_aa(canvas, *x0, *y0, *x1, *y1, *width, *color),
                DrawCommand::Text {
                    x,
                    y,
                    text,
                    font_size,
                    color,
                } => {
                    if let Some(font) = font {
                        draw_text(canvas, *x, *y, text, font, Scale::uniform(*font_size), *color);
                    }
                }
            }
        }
    }
}

// ============================================================================
// DRAWING PRIMITIVES
// ============================================================================

struct Canvas<'a> {
    frame: &'a mut [u8],
    width: usize,
    height: usize,
}

impl<'a> Canvas<'a> {
    fn new(frame: &'a mut [u8], width: usize, height: usize) -> Self {
        Self { frame, width, height }
    }

    fn clear(&mut self, color: Color) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[color.r, color.g, color.b, 0xff]);
        }
    }

    fn blend(&mut self, x: i32, y: i32, color: Color, alpha: f32) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = (y as usize * self.width + x as usize) * 4;
        if idx + 4 > self.frame.len() {
            return;
        }
        let a = alpha.clamp(0.0, 1.0);
        let src = [color.r, color.g, color.b];
        for (channel, &s) in self.frame[idx..idx + 3].iter_mut().zip(src.iter()) {
            *channel = (s as f32 * a + *channel as f32 * (1.0 - a)).round() as u8;
        }
        self.frame[idx + 3] = 0xff;
    }

    /// Pixel bounds of a box around (`cx`, `cy`), clipped to the canvas.
    fn bounds(&self, cx: f64, cy: f64, reach: f64) -> (i32, i32, i32, i32) {
        let max_x = self.width as i32 - 1;
        let max_y = self.height as i32 - 1;
        (
            ((cx - reach).floor() as i32).clamp(0, max_x.max(0)),
            ((cx + reach).ceil() as i32).clamp(0, max_x.max(0)),
            ((cy - reach).floor() as i32).clamp(0, max_y.max(0)),
            ((cy + reach).ceil() as i32).clamp(0, max_y.max(0)),
        )
    }
}

fn draw_disc(canvas: &mut Canvas, cx: f64, cy: f64, radius: f64, top: Color, bottom: Color) {
    let (min_x, max_x, min_y, max_y) = canvas.bounds(cx, cy, radius + 1.0);
    for y in min_y..=max_y {
        let shade = top.mix(bottom, (y as f64 - (cy - radius)) / (2.0 * radius).max(1.0));
        for x in min_x..=max_x {
            let dist = ((x as f64 - cx).powi(2) + (y as f64 - cy).powi(2)).sqrt();
            let aa = (radius - dist + 0.5).clamp(0.0, 1.0);
            if aa > 0.0 {
                canvas.blend(x, y, shade, aa as f32);
            }
        }
    }
}

fn draw_arc(
    canvas: &mut Canvas,
    cx: f64,
    cy: f64,
    radius: f64,
    width: f64,
    start_angle: f64,
    sweep: f64,
    color: Color,
) {
    if sweep <= 0.0 {
        return;
    }
    let half = width / 2.0;
    let (min_x, max_x, min_y, max_y) = canvas.bounds(cx, cy, radius + half + 1.0);
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let (dx, dy) = (x as f64 - cx, y as f64 - cy);
            let dist = (dx * dx + dy * dy).sqrt();
            let aa = (half - (dist - radius).abs() + 0.5).clamp(0.0, 1.0);
            if aa <= 0.0 {
                continue;
            }
            let angle = dy.atan2(dx).to_degrees();
            if (angle - start_angle).rem_euclid(360.0) <= sweep.min(360.0) {
                canvas.blend(x, y, color, aa as f32);
            }
        }
    }
    if sweep < 360.0 {
        for angle in [start_angle, start_angle + sweep] {
            let rad = angle.to_radians();
            draw_disc(canvas, cx + rad.cos() * radius, cy + rad.sin() * radius, half, color, color);
        }
    }
}

/// Anti-aliased stroke with round ends.
fn draw_thick_line_aa(
    canvas: &mut Canvas,
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    width: f64,
    color: Color,
) {
    let half = width / 2.0;
    let reach = half + 1.0;
    let min_x = (x0.min(x1) - reach).floor() as i32;
    let max_x = (x0.max(x1) + reach).ceil() as i32;
    let min_y = (y0.min(y1) - reach).floor() as i32;
    let max_y = (y0.max(y1) + reach).ceil() as i32;
    let (dx, dy) = (x1 - x0, y1 - y0);
    let len_sq = (dx * dx + dy * dy).max(f64::EPSILON);
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let (px, py) = (x as f64 - x0, y as f64 - y0);
            let t = ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0);
            let (lx, ly) = (x0 + t * dx, y0 + t * dy);
            let dist = ((lx - x as f64).powi(2) + (ly - y as f64).powi(2)).sqrt();
            let aa = (half - dist + 0.5).clamp(0.0, 1.0);
            if aa > 0.01 {
                canvas.blend(x, y, color, aa as f32);
            }
        }
    }
}

fn calculate_text_width(text: &str, font: &Font, scale: Scale) -> i32 {
    let (min_x, max_x) = font
        .layout(text, scale, point(0.0, 0.0))
        .filter_map(|g| g.pixel_bounding_box())
        .fold((i32::MAX, i32::MIN), |(min_x, max_x), bb| {
            (min_x.min(bb.min.x), max_x.max(bb.max.x))
        });
    if min_x < max_x {
        max_x - min_x
    } else {
        0
    }
}

/// Draws `text` centred on (`x`, `y`).
fn draw_text(
    canvas: &mut Canvas,
    x: f64,
    y: f64,
    text: &str,
    font: &Font,
    scale: Scale,
    color: Color,
) {
    let v_metrics = font.v_metrics(scale);
    let glyphs: Vec<PositionedGlyph> = font
        .layout(text, scale, point(0.0, v_metrics.ascent))
        .collect();
    let (min_x, max_x, min_y, max_y) = glyphs.iter().filter_map(|g| g.pixel_bounding_box()).fold(
        (i32::MAX, i32::MIN, i32::MAX, i32::MIN),
        |(min_x, max_x, min_y, max_y), bb| {
            (
                min_x.min(bb.min.x),
                max_x.max(bb.max.x),
                min_y.min(bb.min.y),
                max_y.max(bb.max.y),
            )
        },
    );
    if min_x >= max_x || min_y >= max_y {
        return;
    }
    let offset_x = x.round() as i32 - (max_x - min_x) / 2;
    let offset_y = y.round() as i32 - (max_y - min_y) / 2;
    for glyph in &glyphs {
        if let Some(bb) = glyph.pixel_bounding_box() {
            glyph.draw(|gx, gy, coverage| {
                let px = offset_x + gx as i32 + bb.min.x - min_x;
                let py = offset_y + gy as i32 + bb.min.y - min_y;
                canvas.blend(px, py, color, coverage);
            });
        }
    }
}
