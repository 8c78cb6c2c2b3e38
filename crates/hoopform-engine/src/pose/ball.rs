//! Heuristic basketball locator.
//!
//! Independent of every pose backend: samples the frame in HSV space,
//! collects pixels inside the orange band of a basketball and reports the
//! centroid of the blob as `ball_position`. Confidence combines how
//! disc-like the matched region is with how much support it has.
//! No plausible ball means `None`, never an error.

use hoopform_models::{Joint, NormalizedRect, Point2, Side, Skeleton};
use image::RgbImage;
use std::f64::consts::FRAC_PI_4;
use tracing::debug;

use crate::config::BallLocatorConfig;

/// Source tag of joints produced by the locator.
pub const BALL_SOURCE: &str = "ball_locator";

/// Colour-blob ball locator.
#[derive(Debug, Clone)]
pub struct BallLocator {
    config: BallLocatorConfig,
}

impl BallLocator {
    pub fn new(config: BallLocatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BallLocatorConfig {
        &self.config
    }

    /// Search window around the shooting wrist, if the wrist is known.
    pub fn search_region(&self, skeleton: &Skeleton, side: Side) -> Option<NormalizedRect> {
        let wrist = skeleton.position(side.wrist())?;
        let region = NormalizedRect::around(wrist, self.config.search_radius);
        region.is_valid().then_some(region)
    }

    /// Locate the ball, optionally restricted to `region`.
    pub fn locate(&self, image: &RgbImage, region: Option<NormalizedRect>) -> Option<Joint> {
        if !self.config.enabled {
            return None;
        }
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return None;
        }

        let (x0, y0, x1, y1) = region
            .unwrap_or_else(NormalizedRect::full)
            .to_pixel_bounds(width, height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        let stride = self.config.stride.max(1) as usize;
        let mut count = 0usize;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0u32;
        let mut max_y = 0u32;

        for y in (y0..y1).step_by(stride) {
            for x in (x0..x1).step_by(stride) {
                let [r, g, b] = image.get_pixel(x, y).0;
                if !self.is_ball_colour(r, g, b) {
                    continue;
                }
                count += 1;
                sum_x += x as f64;
                sum_y += y as f64;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }

        if count < self.config.min_pixels.max(1) {
            debug!(samples = count, "No plausible ball blob");
            return None;
        }

        // Samples inside the blob's bounding box on the stride grid
        let box_w = ((max_x - min_x) as usize / stride + 1) as f64;
        let box_h = ((max_y - min_y) as usize / stride + 1) as f64;
        let fill = count as f64 / (box_w * box_h);
        let roundness = (1.0 - (fill - FRAC_PI_4).abs() / FRAC_PI_4).clamp(0.0, 1.0);
        let support = (count as f64 / (self.config.min_pixels.max(1) * 4) as f64).min(1.0);
        let confidence = roundness * support;

        if confidence < self.config.min_confidence {
            debug!(samples = count, confidence, "Ball blob below confidence cutoff");
            return None;
        }

        let center = Point2::new(
            (sum_x / count as f64 + 0.5) / width as f64,
            (sum_y / count as f64 + 0.5) / height as f64,
        );
        debug!(
            x = center.x,
            y = center.y,
            confidence,
            samples = count,
            "Located ball"
        );
        Joint::new(center, confidence, BALL_SOURCE)
    }

    fn is_ball_colour(&self, r: u8, g: u8, b: u8) -> bool {
        let (h, s, v) = rgb_to_hsv(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);
        h >= self.config.hue_min
            && h <= self.config.hue_max
            && s >= self.config.min_saturation
            && v >= self.config.min_value
    }
}

/// Convert RGB (0-1) to HSV with hue in degrees.
fn rgb_to_hsv(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max == 0.0 { 0.0 } else { delta / max };

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta) % 6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    (h, s, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
    use imageproc::rect::Rect;

    const ORANGE: Rgb<u8> = Rgb([230, 100, 20]);
    const COURT: Rgb<u8> = Rgb([40, 40, 50]);

    fn frame_with_ball(cx: i32, cy: i32, radius: i32) -> RgbImage {
        let mut img = RgbImage::from_pixel(200, 160, COURT);
        draw_filled_circle_mut(&mut img, (cx, cy), radius, ORANGE);
        img
    }

    #[test]
    fn test_rgb_to_hsv() {
        let (h, s, v) = rgb_to_hsv(1.0, 0.0, 0.0);
        assert_eq!((h, s, v), (0.0, 1.0, 1.0));
        let (h, _, _) = rgb_to_hsv(0.0, 0.0, 1.0);
        assert!((h - 240.0).abs() < 1e-9);
        let (h, _, _) = rgb_to_hsv(230.0 / 255.0, 100.0 / 255.0, 20.0 / 255.0);
        assert!(h > 20.0 && h < 25.0);
    }

    #[test]
    fn test_locates_orange_disc() {
        let locator = BallLocator::new(BallLocatorConfig::default());
        let ball = locator.locate(&frame_with_ball(120, 80, 15), None).unwrap();
        let p = ball.position();
        assert!((p.x - 0.6).abs() < 0.02, "x = {}", p.x);
        assert!((p.y - 0.5).abs() < 0.02, "y = {}", p.y);
        assert!(ball.confidence() > 0.8);
        assert!(ball.sources().contains(BALL_SOURCE));
    }

    #[test]
    fn test_empty_court_is_absent() {
        let locator = BallLocator::new(BallLocatorConfig::default());
        let img = RgbImage::from_pixel(200, 160, COURT);
        assert!(locator.locate(&img, None).is_none());
    }

    #[test]
    fn test_region_excludes_ball() {
        let locator = BallLocator::new(BallLocatorConfig::default());
        let img = frame_with_ball(160, 40, 12);
        let region = NormalizedRect::new(0.0, 0.5, 0.5, 0.5);
        assert!(locator.locate(&img, Some(region)).is_none());
        assert!(locator.locate(&img, None).is_some());
    }

    #[test]
    fn test_thin_stripe_is_not_a_ball() {
        let locator = BallLocator::new(BallLocatorConfig::default());
        let mut img = RgbImage::from_pixel(200, 160, COURT);
        // One long horizontal stripe fills its bounding box completely
        draw_filled_rect_mut(&mut img, Rect::at(0, 70).of_size(200, 2), ORANGE);
        let result = locator.locate(&img, None);
        assert!(result.map_or(true, |j| j.confidence() < 0.8));
    }

    #[test]
    fn test_disabled_locator() {
        let config = BallLocatorConfig {
            enabled: false,
            ..Default::default()
        };
        let locator = BallLocator::new(config);
        assert!(locator.locate(&frame_with_ball(100, 80, 15), None).is_none());
    }

    #[test]
    fn test_search_region_follows_wrist() {
        let locator = BallLocator::new(BallLocatorConfig::default());
        let mut skeleton = Skeleton::new();
        skeleton.insert(
            Side::Right.wrist(),
            Joint::new(Point2::new(0.6, 0.5), 0.9, "test").unwrap(),
        );
        let region = locator.search_region(&skeleton, Side::Right).unwrap();
        assert!(region.contains(Point2::new(0.6, 0.5)));
        assert!(locator.search_region(&skeleton, Side::Left).is_none());

        let ball = locator
            .locate(&frame_with_ball(120, 80, 15), Some(region))
            .unwrap();
        assert!((ball.position().x - 0.6).abs() < 0.02);
    }
}
