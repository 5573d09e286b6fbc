// ============================================================================
// STROKE MASK RASTERIZATION
// ============================================================================
//
// A stroke's clip region is its polyline thickened by the brush radius. The
// region is rasterized as a binary coverage mask in image space: a pixel is
// covered when its centre lies within the brush radius of any segment of the
// polyline. Coverage is hard-edged (0 or 255) so that erase strokes restore
// source bytes exactly, and so compositing stays byte-deterministic.
//
// Because display axes may scale independently, a circular display-space
// brush becomes an ellipse in image space; the distance test runs in a
// normalized space where that ellipse is the unit circle.

use image::GrayImage;
use rayon::prelude::*;

use crate::geometry::{Point, ViewMapping, pt};
use crate::stroke::Stroke;

/// Rasterize `stroke` into a full-size binary coverage mask for an
/// `image_width` × `image_height` buffer. Covered pixels are 255.
pub fn stroke_mask(stroke: &Stroke, image_width: u32, image_height: u32) -> GrayImage {
    let mut mask = GrayImage::new(image_width, image_height);
    if stroke.points.is_empty() || image_width == 0 || image_height == 0 {
        return mask;
    }

    let mapping = ViewMapping::new(stroke.display, image_width, image_height);
    let rx = (stroke.radius * mapping.scale_x()).max(1e-3);
    let ry = (stroke.radius * mapping.scale_y()).max(1e-3);

    // Polyline in normalized space (brush ellipse → unit circle).
    let norm: Vec<Point> = stroke
        .points
        .iter()
        .map(|&p| {
            let ip = mapping.to_image(p);
            pt(ip.x / rx, ip.y / ry)
        })
        .collect();

    // Bounding box of the thickened path, in pixels.
    let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
    let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
    for &p in &stroke.points {
        let ip = mapping.to_image(p);
        min_x = min_x.min(ip.x - rx);
        min_y = min_y.min(ip.y - ry);
        max_x = max_x.max(ip.x + rx);
        max_y = max_y.max(ip.y + ry);
    }
    let x0 = (min_x.floor().max(0.0)) as u32;
    let y0 = (min_y.floor().max(0.0)) as u32;
    let x1 = (max_x.ceil().max(0.0) as u32).min(image_width.saturating_sub(1));
    let y1 = (max_y.ceil().max(0.0) as u32).min(image_height.saturating_sub(1));
    if x0 > x1 || y0 > y1 {
        return mask;
    }

    let w = image_width as usize;
    mask.as_mut()
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as u32;
            if y < y0 || y > y1 {
                return;
            }
            let qy = (y as f32 + 0.5) / ry;
            for x in x0..=x1 {
                let q = pt((x as f32 + 0.5) / rx, qy);
                if distance_sq_to_polyline(q, &norm) <= 1.0 {
                    row[x as usize] = 255;
                }
            }
        });

    mask
}

/// Squared distance from `p` to the nearest point of the polyline `pts`.
/// A one-point polyline degenerates to point distance.
fn distance_sq_to_polyline(p: Point, pts: &[Point]) -> f32 {
    let mut best = f32::MAX;
    if pts.len() == 1 {
        let dx = p.x - pts[0].x;
        let dy = p.y - pts[0].y;
        return dx * dx + dy * dy;
    }
    for seg in pts.windows(2) {
        best = best.min(distance_sq_to_segment(p, seg[0], seg[1]));
        if best == 0.0 {
            break;
        }
    }
    best
}

fn distance_sq_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let apx = p.x - a.x;
    let apy = p.y - a.y;
    let len_sq = abx * abx + aby * aby;
    let t = if len_sq <= f32::EPSILON {
        0.0
    } else {
        ((apx * abx + apy * aby) / len_sq).clamp(0.0, 1.0)
    };
    let dx = apx - t * abx;
    let dy = apy - t * aby;
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::stroke::Effect;

    fn stroke(points: Vec<Point>, radius: f32, display: Size) -> Stroke {
        Stroke {
            effect: Effect::Blur,
            radius,
            display,
            points,
        }
    }

    #[test]
    fn dab_covers_a_disc_around_the_point() {
        // 1:1 display mapping, single dab at (50, 50), radius 10.
        let s = stroke(vec![pt(50.0, 50.0)], 10.0, Size::new(100.0, 100.0));
        let mask = stroke_mask(&s, 100, 100);
        assert_eq!(mask.get_pixel(50, 50)[0], 255);
        assert_eq!(mask.get_pixel(42, 50)[0], 255);
        // Well outside the radius.
        assert_eq!(mask.get_pixel(70, 50)[0], 0);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn segment_covers_pixels_between_endpoints() {
        let s = stroke(
            vec![pt(10.0, 50.0), pt(90.0, 50.0)],
            4.0,
            Size::new(100.0, 100.0),
        );
        let mask = stroke_mask(&s, 100, 100);
        for x in 12..88 {
            assert_eq!(mask.get_pixel(x, 50)[0], 255, "uncovered at x={}", x);
        }
        assert_eq!(mask.get_pixel(50, 60)[0], 0);
    }

    #[test]
    fn display_scale_maps_brush_into_image_space() {
        // Display is half the image size, so a display radius of 5 covers an
        // image radius of 10.
        let s = stroke(vec![pt(25.0, 25.0)], 5.0, Size::new(50.0, 50.0));
        let mask = stroke_mask(&s, 100, 100);
        assert_eq!(mask.get_pixel(50, 50)[0], 255);
        assert_eq!(mask.get_pixel(42, 50)[0], 255);
        assert_eq!(mask.get_pixel(65, 50)[0], 0);
    }

    #[test]
    fn off_image_stroke_yields_empty_mask() {
        let s = stroke(vec![pt(-500.0, -500.0)], 3.0, Size::new(100.0, 100.0));
        let mask = stroke_mask(&s, 100, 100);
        assert!(mask.as_raw().iter().all(|&v| v == 0));
    }

    #[test]
    fn mask_is_binary() {
        let s = stroke(
            vec![pt(20.0, 20.0), pt(40.0, 35.0), pt(60.0, 20.0)],
            6.0,
            Size::new(100.0, 100.0),
        );
        let mask = stroke_mask(&s, 100, 100);
        assert!(mask.as_raw().iter().all(|&v| v == 0 || v == 255));
        assert!(mask.as_raw().iter().any(|&v| v == 255));
    }
}
