// ============================================================================
// EFFECT BUFFER GENERATION — whole-image pixelate / blur derivatives
// ============================================================================
//
// Effects are not computed per stroke. Instead two whole-image derivatives of
// the working source are generated up front — a mosaic (pixelated) version
// and a Gaussian-blurred version — and strokes sample from them through
// their masks. Both are pure functions of the source pixels and are
// regenerated whenever the working source changes (load, crop commit, crop
// undo); stale buffers are never reused.

use image::RgbaImage;
use rayon::prelude::*;

use crate::error::EditorError;
use crate::log_warn;
use crate::stroke::Effect;

/// Mosaic block size in source pixels.
pub const PIXELATE_BLOCK: u32 = 25;

/// Blur radius in source pixels. The Gaussian stddev is half the radius,
/// kernel truncated at 3σ.
pub const BLUR_RADIUS: f32 = 20.0;

/// Refuse to allocate effect buffers beyond this pixel count (≈268 MP).
const MAX_EFFECT_PIXELS: u64 = 1 << 28;

/// The derived rasters strokes sample from. A buffer that failed to generate
/// is `None`: that effect is unavailable for the session, everything else
/// keeps working (erase needs no buffer — it samples the source itself).
#[derive(Debug, Clone)]
pub struct EffectBuffers {
    pub pixelated: Option<RgbaImage>,
    pub blurred: Option<RgbaImage>,
}

impl EffectBuffers {
    /// Generate both derivatives of `source`. Individual failures are logged
    /// and leave the corresponding buffer unavailable rather than failing
    /// the whole session.
    pub fn generate(source: &RgbaImage) -> Self {
        let pixelated = match pixelate(source, PIXELATE_BLOCK) {
            Ok(img) => Some(img),
            Err(e) => {
                log_warn!("pixelate buffer unavailable: {}", e);
                None
            }
        };
        let blurred = match gaussian_blur(source, BLUR_RADIUS / 2.0) {
            Ok(img) => Some(img),
            Err(e) => {
                log_warn!("blur buffer unavailable: {}", e);
                None
            }
        };
        Self { pixelated, blurred }
    }

    /// Whether a stroke with `effect` can currently render.
    pub fn available(&self, effect: Effect) -> bool {
        match effect {
            Effect::Pixelate => self.pixelated.is_some(),
            Effect::Blur => self.blurred.is_some(),
            Effect::Erase => true,
        }
    }
}

fn check_dimensions(source: &RgbaImage) -> Result<(), EditorError> {
    let (w, h) = source.dimensions();
    if w == 0 || h == 0 {
        return Err(EditorError::Effect(format!("empty image ({}x{})", w, h)));
    }
    if w as u64 * h as u64 > MAX_EFFECT_PIXELS {
        return Err(EditorError::Effect(format!(
            "image too large for effect buffers ({}x{})",
            w, h
        )));
    }
    Ok(())
}

/// Mosaic pixelation: every `block`-sized square takes the colour of its
/// centre pixel (nearest-neighbour, no interpolation), producing visible
/// square blocks anchored at the image origin.
pub fn pixelate(source: &RgbaImage, block: u32) -> Result<RgbaImage, EditorError> {
    check_dimensions(source)?;
    let bs = block.max(1);
    let w = source.width();
    let h = source.height();

    let src_raw = source.as_raw();
    let stride = w as usize * 4;
    let mut dst_raw = vec![0u8; src_raw.len()];

    dst_raw
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row_out)| {
            // Sample from the centre of each block.
            let by = ((y as u32 / bs) * bs + bs / 2).min(h - 1) as usize;
            for x in 0..w as usize {
                let bx = ((x as u32 / bs) * bs + bs / 2).min(w - 1) as usize;
                let si = by * stride + bx * 4;
                let pi = x * 4;
                row_out[pi..pi + 4].copy_from_slice(&src_raw[si..si + 4]);
            }
        });

    RgbaImage::from_raw(w, h, dst_raw)
        .ok_or_else(|| EditorError::Effect("pixelate produced invalid buffer".into()))
}

/// Separable Gaussian blur of the whole image, row-parallel per pass.
pub fn gaussian_blur(source: &RgbaImage, sigma: f32) -> Result<RgbaImage, EditorError> {
    check_dimensions(source)?;
    let w = source.width() as usize;
    let h = source.height() as usize;

    let kernel = build_gaussian_kernel(sigma);
    let radius = kernel.len() / 2;
    let src_raw = source.as_raw();

    // f32 working buffer, 4 interleaved channels.
    let pixel_count = w * h * 4;
    let buf_in: Vec<f32> = src_raw.iter().map(|&b| b as f32).collect();

    // --- Horizontal pass (parallel by row) ---
    let mut buf_h = vec![0.0f32; pixel_count];
    buf_h.par_chunks_mut(w * 4).enumerate().for_each(|(y, row_out)| {
        let row_in_start = y * w * 4;
        for x in 0..w {
            let mut acc = [0.0f32; 4];
            for (ki, &kv) in kernel.iter().enumerate() {
                let sx = (x as isize + ki as isize - radius as isize)
                    .max(0)
                    .min(w as isize - 1) as usize;
                let idx = row_in_start + sx * 4;
                for c in 0..4 {
                    acc[c] += buf_in[idx + c] * kv;
                }
            }
            let out_idx = x * 4;
            row_out[out_idx..out_idx + 4].copy_from_slice(&acc);
        }
    });

    // --- Vertical pass (parallel by row) ---
    let mut buf_v = vec![0.0f32; pixel_count];
    buf_v.par_chunks_mut(w * 4).enumerate().for_each(|(y, row_out)| {
        for x in 0..w {
            let mut acc = [0.0f32; 4];
            for (ki, &kv) in kernel.iter().enumerate() {
                let sy = (y as isize + ki as isize - radius as isize)
                    .max(0)
                    .min(h as isize - 1) as usize;
                let idx = sy * w * 4 + x * 4;
                for c in 0..4 {
                    acc[c] += buf_h[idx + c] * kv;
                }
            }
            let out_idx = x * 4;
            row_out[out_idx..out_idx + 4].copy_from_slice(&acc);
        }
    });

    let dst_raw: Vec<u8> = buf_v
        .iter()
        .map(|&v| v.round().clamp(0.0, 255.0) as u8)
        .collect();
    RgbaImage::from_raw(w as u32, h as u32, dst_raw)
        .ok_or_else(|| EditorError::Effect("blur produced invalid buffer".into()))
}

/// Build a normalized 1-D Gaussian kernel truncated at ceil(3*sigma).
fn build_gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as usize;
    if radius == 0 {
        return vec![1.0];
    }
    let len = radius * 2 + 1;
    let mut kernel = vec![0.0f32; len];
    let s2 = 2.0 * sigma * sigma;
    let mut sum = 0.0f32;
    for (i, k) in kernel.iter_mut().enumerate() {
        let x = i as f32 - radius as f32;
        let v = (-x * x / s2).exp();
        *k = v;
        sum += v;
    }
    let inv = 1.0 / sum;
    for v in &mut kernel {
        *v *= inv;
    }
    kernel
}
