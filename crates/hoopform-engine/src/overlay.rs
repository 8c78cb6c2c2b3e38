//! Annotated overlay rendering.
//!
//! Draws the fused skeleton over a copy of the source image: connection
//! lines, joint markers, the ball, and angle callouts anchored to joints.
//! A connection or marker whose joint is absent is skipped. Rendering has
//! no effect on the analysis.

use ab_glyph::{FontVec, PxScale};
use hoopform_models::{AngleName, AngleSet, JointName, Point2, Side, Skeleton};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut, text_size,
};
use imageproc::rect::Rect;
use tracing::debug;

use crate::config::OverlayConfig;
use crate::error::{EngineError, EngineResult};

/// Fixed joint-pair connection list.
pub const SKELETON_CONNECTIONS: &[(JointName, JointName)] = &[
    (JointName::Nose, JointName::LeftEye),
    (JointName::Nose, JointName::RightEye),
    (JointName::LeftEye, JointName::LeftEar),
    (JointName::RightEye, JointName::RightEar),
    (JointName::LeftShoulder, JointName::RightShoulder),
    (JointName::LeftShoulder, JointName::LeftElbow),
    (JointName::LeftElbow, JointName::LeftWrist),
    (JointName::RightShoulder, JointName::RightElbow),
    (JointName::RightElbow, JointName::RightWrist),
    (JointName::LeftShoulder, JointName::LeftHip),
    (JointName::RightShoulder, JointName::RightHip),
    (JointName::LeftHip, JointName::RightHip),
    (JointName::LeftHip, JointName::LeftKnee),
    (JointName::LeftKnee, JointName::LeftAnkle),
    (JointName::RightHip, JointName::RightKnee),
    (JointName::RightKnee, JointName::RightAnkle),
];

/// Box size used when no font is configured.
const PLAIN_BOX: (u32, u32) = (48, 18);
const BOX_PADDING: u32 = 4;

/// Synthetic torso anchor: midpoint of the hip midpoint and the shoulder
/// midpoint. Falls back to `hip_center` when a hip is missing.
pub fn core_anchor(skeleton: &Skeleton) -> Option<Point2> {
    let hips = skeleton
        .midpoint(JointName::LeftHip, JointName::RightHip)
        .or_else(|| skeleton.position(JointName::HipCenter))?;
    let shoulders = skeleton.midpoint(JointName::LeftShoulder, JointName::RightShoulder)?;
    Some(hips.midpoint(&shoulders))
}

/// Text label pinned to a skeleton point.
#[derive(Debug, Clone, PartialEq)]
pub struct Callout {
    pub anchor: Point2,
    pub label: String,
}

/// Angle callouts for a frame. Undefined angles get no callout.
pub fn callouts(skeleton: &Skeleton, angles: &AngleSet, side: Option<Side>) -> Vec<Callout> {
    let side = side.unwrap_or(Side::Right);
    let release_anchor = skeleton
        .position(JointName::BallPosition)
        .or_else(|| skeleton.position(side.wrist()));

    let candidates = [
        (AngleName::Elbow, skeleton.position(side.elbow())),
        (AngleName::Knee, skeleton.position(side.knee())),
        (AngleName::Release, release_anchor),
        (AngleName::Hip, core_anchor(skeleton)),
    ];

    candidates
        .into_iter()
        .filter_map(|(name, anchor)| {
            let value = angles.get(name)?;
            Some(Callout {
                anchor: anchor?,
                label: format!("{} {:.0}°", name, value),
            })
        })
        .collect()
}

/// Skeleton overlay renderer.
pub struct OverlayRenderer {
    config: OverlayConfig,
    font: Option<FontVec>,
}

impl std::fmt::Debug for OverlayRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayRenderer")
            .field("config", &self.config)
            .field("font", &self.font.is_some())
            .finish()
    }
}

impl OverlayRenderer {
    /// Create a renderer, loading the configured font if any.
    pub fn new(config: OverlayConfig) -> EngineResult<Self> {
        let font = match &config.font_path {
            Some(path) => Some(load_font(std::fs::read(path)?)?),
            None => None,
        };
        Ok(Self { config, font })
    }

    /// Create a renderer from in-memory font bytes.
    pub fn with_font_bytes(config: OverlayConfig, bytes: Vec<u8>) -> EngineResult<Self> {
        Ok(Self {
            config,
            font: Some(load_font(bytes)?),
        })
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Render onto a copy of `image`.
    pub fn render(
        &self,
        image: &RgbImage,
        skeleton: &Skeleton,
        angles: &AngleSet,
        side: Option<Side>,
    ) -> RgbImage {
        let mut canvas = image.clone();
        let (w, h) = canvas.dimensions();
        if w == 0 || h == 0 {
            return canvas;
        }

        let line = Rgb(self.config.skeleton_color);
        let mut drawn = 0usize;
        for (a, b) in SKELETON_CONNECTIONS {
            let (Some(pa), Some(pb)) = (skeleton.position(*a), skeleton.position(*b)) else {
                continue;
            };
            self.thick_line(&mut canvas, to_pixel(pa, w, h), to_pixel(pb, w, h), line);
            drawn += 1;
        }

        let marker = Rgb(self.config.joint_color);
        for (name, joint) in skeleton.iter() {
            let color = if name == JointName::BallPosition {
                Rgb(self.config.ball_color)
            } else {
                marker
            };
            let radius = if name == JointName::BallPosition {
                self.config.marker_radius * 2
            } else {
                self.config.marker_radius
            };
            let (x, y) = to_pixel(joint.position(), w, h);
            draw_filled_circle_mut(&mut canvas, (x as i32, y as i32), radius.max(1), color);
        }

        let notes = callouts(skeleton, angles, side);
        for callout in &notes {
            self.draw_callout(&mut canvas, callout);
        }

        debug!(
            connections = drawn,
            joints = skeleton.len(),
            callouts = notes.len(),
            "Rendered overlay"
        );
        canvas
    }

    fn thick_line(&self, canvas: &mut RgbImage, a: (f32, f32), b: (f32, f32), color: Rgb<u8>) {
        let thickness = self.config.line_thickness.max(1);
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let len = (dx * dx + dy * dy).sqrt();
        // Unit normal; degenerate segments draw as a single point
        let (nx, ny) = if len > 0.0 { (-dy / len, dx / len) } else { (0.0, 0.0) };
        let half = (thickness - 1) as f32 / 2.0;
        for i in 0..thickness {
            let o = i as f32 - half;
            draw_line_segment_mut(
                canvas,
                (a.0 + nx * o, a.1 + ny * o),
                (b.0 + nx * o, b.1 + ny * o),
                color,
            );
        }
    }

    fn draw_callout(&self, canvas: &mut RgbImage, callout: &Callout) {
        let (w, h) = canvas.dimensions();
        let color = Rgb(self.config.callout_color);
        let scale = PxScale::from(self.config.font_scale);

        let (box_w, box_h) = match &self.font {
            Some(font) => {
                let (tw, th) = text_size(scale, font, &callout.label);
                (tw + 2 * BOX_PADDING, th + 2 * BOX_PADDING)
            }
            None => PLAIN_BOX,
        };
        let box_w = box_w.min(w).max(1);
        let box_h = box_h.min(h).max(1);

        let (ax, ay) = to_pixel(callout.anchor, w, h);
        let (ox, oy) = self.config.callout_offset;
        let bx = (ax as i32 + ox).clamp(0, (w - box_w) as i32);
        let by = (ay as i32 + oy).clamp(0, (h - box_h) as i32);

        // Leader from the anchor to the nearest box edge midpoint
        let target_x = if (bx as f32) > ax { bx as f32 } else { (bx + box_w as i32) as f32 };
        let target_y = by as f32 + box_h as f32 / 2.0;
        draw_line_segment_mut(canvas, (ax, ay), (target_x, target_y), color);
        draw_hollow_rect_mut(canvas, Rect::at(bx, by).of_size(box_w, box_h), color);

        if let Some(font) = &self.font {
            draw_text_mut(
                canvas,
                color,
                bx + BOX_PADDING as i32,
                by + BOX_PADDING as i32,
                scale,
                font,
                &callout.label,
            );
        }
    }
}

fn load_font(bytes: Vec<u8>) -> EngineResult<FontVec> {
    FontVec::try_from_vec(bytes).map_err(|e| EngineError::Font(e.to_string()))
}

fn to_pixel(p: Point2, width: u32, height: u32) -> (f32, f32) {
    let x = (p.x * width as f64).clamp(0.0, (width - 1) as f64);
    let y = (p.y * height as f64).clamp(0.0, (height - 1) as f64);
    (x as f32, y as f32)
}
