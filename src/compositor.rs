// ============================================================================
// COMPOSITOR — flatten base image + stroke effects, back to front
// ============================================================================
//
// The composite is a pure left-fold over the stroke list: the source is the
// base layer, then each stroke in recorded order copies its effect buffer
// through its mask. Later strokes paint on top of earlier ones, so the
// last-applied effect wins in overlap regions. Erase strokes copy the
// original source through their mask instead of an effect buffer, restoring
// whatever was underneath the effects applied before them.
//
// Identical inputs produce byte-identical output; undo relies on this.

use image::{GrayImage, RgbaImage};
use rayon::prelude::*;

use crate::effects::EffectBuffers;
use crate::mask::stroke_mask;
use crate::stroke::{Effect, Stroke};

/// Render the flattened raster for `source` with `strokes` applied in order.
///
/// Strokes whose effect buffer is unavailable (generation failed for this
/// session) are skipped; the session refuses to record them in the first
/// place, so this only matters for replay of foreign stroke lists.
pub fn composite<'a, I>(source: &RgbaImage, buffers: &EffectBuffers, strokes: I) -> RgbaImage
where
    I: IntoIterator<Item = &'a Stroke>,
{
    let mut out = source.clone();
    let (w, h) = source.dimensions();

    for stroke in strokes {
        let layer: &RgbaImage = match stroke.effect {
            Effect::Pixelate => match &buffers.pixelated {
                Some(buf) => buf,
                None => continue,
            },
            Effect::Blur => match &buffers.blurred {
                Some(buf) => buf,
                None => continue,
            },
            Effect::Erase => source,
        };
        let mask = stroke_mask(stroke, w, h);
        blit_masked(&mut out, layer, &mask);
    }

    out
}

/// Copy `layer` into `out` wherever `mask` is set. Straight byte copy, no
/// blending — coverage is binary.
fn blit_masked(out: &mut RgbaImage, layer: &RgbaImage, mask: &GrayImage) {
    debug_assert_eq!(out.dimensions(), layer.dimensions());
    let w = out.width() as usize;
    let stride = w * 4;
    let layer_raw = layer.as_raw();
    let mask_raw = mask.as_raw();

    out.as_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            let mask_row = y * w;
            let layer_row = y * stride;
            for x in 0..w {
                if mask_raw[mask_row + x] != 0 {
                    let i = x * 4;
                    row[i..i + 4].copy_from_slice(&layer_raw[layer_row + i..layer_row + i + 4]);
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Size, pt};
    use image::Rgba;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8, 255])
        })
    }

    fn dab(effect: Effect, x: f32, y: f32, radius: f32) -> Stroke {
        Stroke {
            effect,
            radius,
            display: Size::new(100.0, 100.0),
            points: vec![pt(x, y)],
        }
    }

    #[test]
    fn no_strokes_is_the_identity() {
        let src = gradient(100, 100);
        let buffers = EffectBuffers::generate(&src);
        assert_eq!(composite(&src, &buffers, &[]), src);
    }

    #[test]
    fn composite_is_deterministic() {
        let src = gradient(100, 100);
        let buffers = EffectBuffers::generate(&src);
        let strokes = vec![
            dab(Effect::Pixelate, 30.0, 30.0, 10.0),
            dab(Effect::Blur, 60.0, 60.0, 12.0),
        ];
        let a = composite(&src, &buffers, &strokes);
        let b = composite(&src, &buffers, &strokes);
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn stroke_changes_only_masked_pixels() {
        let src = gradient(100, 100);
        let buffers = EffectBuffers::generate(&src);
        let stroke = dab(Effect::Pixelate, 50.0, 50.0, 8.0);
        let out = composite(&src, &buffers, std::slice::from_ref(&stroke));

        let mask = stroke_mask(&stroke, 100, 100);
        let pixelated = buffers.pixelated.as_ref().unwrap();
        for y in 0..100 {
            for x in 0..100 {
                if mask.get_pixel(x, y)[0] != 0 {
                    assert_eq!(out.get_pixel(x, y), pixelated.get_pixel(x, y));
                } else {
                    assert_eq!(out.get_pixel(x, y), src.get_pixel(x, y));
                }
            }
        }
    }

    #[test]
    fn erase_restores_source_exactly() {
        let src = gradient(100, 100);
        let buffers = EffectBuffers::generate(&src);
        // Pixelate a region, then erase a sub-region of it.
        let strokes = vec![
            dab(Effect::Pixelate, 50.0, 50.0, 15.0),
            dab(Effect::Erase, 50.0, 50.0, 6.0),
        ];
        let out = composite(&src, &buffers, &strokes);
        let erase_mask = stroke_mask(&strokes[1], 100, 100);
        for y in 0..100 {
            for x in 0..100 {
                if erase_mask.get_pixel(x, y)[0] != 0 {
                    assert_eq!(out.get_pixel(x, y), src.get_pixel(x, y));
                }
            }
        }
    }

    #[test]
    fn later_stroke_wins_in_overlap() {
        let src = gradient(100, 100);
        let buffers = EffectBuffers::generate(&src);
        let strokes = vec![
            dab(Effect::Pixelate, 50.0, 50.0, 10.0),
            dab(Effect::Blur, 50.0, 50.0, 10.0),
        ];
        let out = composite(&src, &buffers, &strokes);
        let blurred = buffers.blurred.as_ref().unwrap();
        let blur_mask = stroke_mask(&strokes[1], 100, 100);
        for y in 0..100 {
            for x in 0..100 {
                if blur_mask.get_pixel(x, y)[0] != 0 {
                    assert_eq!(out.get_pixel(x, y), blurred.get_pixel(x, y));
                }
            }
        }
    }

    #[test]
    fn unavailable_buffer_skips_the_stroke() {
        let src = gradient(50, 50);
        let mut buffers = EffectBuffers::generate(&src);
        buffers.blurred = None;
        let out = composite(&src, &buffers, &[dab(Effect::Blur, 25.0, 25.0, 8.0)]);
        assert_eq!(out, src);
    }
}
