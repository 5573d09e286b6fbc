// ============================================================================
// DISPLAY ↔ IMAGE COORDINATE MAPPING
// ============================================================================
//
// Strokes are recorded in display space (the on-screen, scaled canvas) but
// every effect renders against the image's native pixel grid, so the mapping
// between the two spaces has to be exact: a round trip through it must not
// drift. Scale factors are kept independent per axis so strokes stay
// pixel-accurate even if the display box is later resized non-uniformly.

use serde::{Deserialize, Serialize};

/// Fraction of the viewport the display box may occupy on initial sizing.
pub const DISPLAY_MAX_WIDTH_FRAC: f32 = 0.80;
pub const DISPLAY_MAX_HEIGHT_FRAC: f32 = 0.65;

/// A point in either display or image space (the mapping functions document
/// which space they expect).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

pub fn pt(x: f32, y: f32) -> Point {
    Point { x, y }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle with float coordinates (display space).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Build a rectangle from two opposite corners in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self {
            x,
            y,
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }
}

/// An integer crop region in image space, clamped to the image bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Zero-area regions are rejected by the crop tool (silent no-op).
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Converts between display coordinates and the image's native pixel grid.
///
/// The two axes scale independently: `scale_x = image_w / display_w`,
/// `scale_y = image_h / display_h`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewMapping {
    pub display: Size,
    pub image_width: u32,
    pub image_height: u32,
}

impl ViewMapping {
    pub fn new(display: Size, image_width: u32, image_height: u32) -> Self {
        Self { display, image_width, image_height }
    }

    pub fn scale_x(&self) -> f32 {
        self.image_width as f32 / self.display.width
    }

    pub fn scale_y(&self) -> f32 {
        self.image_height as f32 / self.display.height
    }

    /// Display-space point → image-space point.
    pub fn to_image(&self, p: Point) -> Point {
        Point {
            x: p.x * self.scale_x(),
            y: p.y * self.scale_y(),
        }
    }

    /// Image-space point → display-space point. Inverse of [`to_image`].
    ///
    /// [`to_image`]: ViewMapping::to_image
    pub fn to_display(&self, p: Point) -> Point {
        Point {
            x: p.x / self.scale_x(),
            y: p.y / self.scale_y(),
        }
    }

    /// Map a display-space rectangle to an integer image-space crop region,
    /// clamped to the image bounds.
    pub fn crop_rect(&self, rect: Rect) -> CropRect {
        let min = self.to_image(pt(rect.x, rect.y));
        let max = self.to_image(pt(rect.x + rect.width, rect.y + rect.height));

        let x0 = (min.x.round().max(0.0) as u32).min(self.image_width);
        let y0 = (min.y.round().max(0.0) as u32).min(self.image_height);
        let x1 = (max.x.round().max(0.0) as u32).min(self.image_width);
        let y1 = (max.y.round().max(0.0) as u32).min(self.image_height);

        CropRect {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }
}

/// Initial display box for an image: fits within 80% of the viewport width by
/// 65% of its height, scaled down uniformly (aspect preserved), never
/// upscaled beyond native size.
pub fn fit_display_size(image_width: u32, image_height: u32, viewport: Size) -> Size {
    let max_w = viewport.width * DISPLAY_MAX_WIDTH_FRAC;
    let max_h = viewport.height * DISPLAY_MAX_HEIGHT_FRAC;
    let iw = image_width.max(1) as f32;
    let ih = image_height.max(1) as f32;

    let scale = (max_w / iw).min(max_h / ih).min(1.0);
    Size::new(iw * scale, ih * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_exact_within_tolerance() {
        let mapping = ViewMapping::new(Size::new(640.0, 416.0), 1000, 800);
        for &(x, y) in &[(0.0, 0.0), (12.5, 97.3), (639.0, 415.0), (320.25, 200.75)] {
            let p = pt(x, y);
            let rt = mapping.to_display(mapping.to_image(p));
            assert!((rt.x - p.x).abs() < 1e-6, "x drift: {} vs {}", rt.x, p.x);
            assert!((rt.y - p.y).abs() < 1e-6, "y drift: {} vs {}", rt.y, p.y);
        }
    }

    #[test]
    fn axes_scale_independently() {
        let mapping = ViewMapping::new(Size::new(500.0, 200.0), 1000, 800);
        let p = mapping.to_image(pt(250.0, 100.0));
        assert_eq!(p.x, 500.0);
        assert_eq!(p.y, 400.0);
    }

    #[test]
    fn fit_never_upscales() {
        let d = fit_display_size(100, 80, Size::new(1920.0, 1080.0));
        assert_eq!(d.width, 100.0);
        assert_eq!(d.height, 80.0);
    }

    #[test]
    fn fit_preserves_aspect_ratio() {
        let d = fit_display_size(4000, 2000, Size::new(1000.0, 1000.0));
        // Limited by width: 80% of 1000 = 800 → scale 0.2
        assert!((d.width - 800.0).abs() < 1e-3);
        assert!((d.height - 400.0).abs() < 1e-3);
        let ratio = d.width / d.height;
        assert!((ratio - 2.0).abs() < 1e-5);
    }

    #[test]
    fn fit_limited_by_height() {
        let d = fit_display_size(1000, 4000, Size::new(1000.0, 1000.0));
        // 65% of 1000 = 650 → scale 0.1625
        assert!((d.height - 650.0).abs() < 1e-3);
        assert!((d.width - 162.5).abs() < 1e-3);
    }

    #[test]
    fn crop_rect_clamps_to_image_bounds() {
        let mapping = ViewMapping::new(Size::new(1000.0, 800.0), 1000, 800);
        let r = mapping.crop_rect(Rect::new(-50.0, -50.0, 2000.0, 2000.0));
        assert_eq!(r, CropRect { x: 0, y: 0, width: 1000, height: 800 });
    }

    #[test]
    fn zero_area_crop_is_degenerate() {
        let mapping = ViewMapping::new(Size::new(1000.0, 800.0), 1000, 800);
        let r = mapping.crop_rect(Rect::new(10.0, 10.0, 0.0, 50.0));
        assert!(r.is_degenerate());
    }

    #[test]
    fn from_corners_normalizes_order() {
        let r = Rect::from_corners(pt(90.0, 20.0), pt(10.0, 80.0));
        assert_eq!(r, Rect::new(10.0, 20.0, 80.0, 60.0));
    }
}
