//! Mark-density measurement for a single bubble region.
//!
//! Scan illumination is not uniform across a sheet, so marked pixels are
//! classified against the mean of their 11-px neighborhood rather than a
//! single global threshold. An absolute dark floor backs the local test so
//! that a region filled edge to edge still reads as marked. A 3x3 opening
//! suppresses single-pixel speckle before counting.

use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::open;

use crate::config::SamplerConfig;

/// Fraction of mark-classified pixels inside `bbox` (`[x, y, w, h]` in
/// canonical-canvas pixels), in `[0, 1]`.
///
/// The bbox is clamped to the image; a region that clamps to nothing
/// yields 0.0 so template/canvas mismatches degrade instead of failing.
pub fn fill_ratio(canonical: &RgbImage, bbox: [i64; 4], cfg: &SamplerConfig) -> f32 {
    let (img_w, img_h) = canonical.dimensions();
    let [x, y, w, h] = bbox;

    let x0 = x.clamp(0, img_w as i64) as u32;
    let y0 = y.clamp(0, img_h as i64) as u32;
    let x1 = x.saturating_add(w).clamp(0, img_w as i64) as u32;
    let y1 = y.saturating_add(h).clamp(0, img_h as i64) as u32;
    if x1 <= x0 || y1 <= y0 {
        return 0.0;
    }

    let roi = image::imageops::crop_imm(canonical, x0, y0, x1 - x0, y1 - y0).to_image();
    let gray = image::imageops::grayscale(&roi);

    let mask = mark_mask(&gray, cfg);
    let opened = open(&mask, Norm::LInf, 1);

    let total = (opened.width() * opened.height()) as f32;
    let filled = opened.pixels().filter(|p| p[0] > 0).count() as f32;
    filled / total
}

/// Binary mask of mark-classified pixels: darker than the local mean by
/// `mean_offset`, or absolutely darker than `dark_floor`.
fn mark_mask(gray: &GrayImage, cfg: &SamplerConfig) -> GrayImage {
    let (w, h) = gray.dimensions();
    let r = cfg.block_radius as i64;

    // Summed-area table with one row/column of zero padding.
    let mut integral = vec![0u64; ((w + 1) * (h + 1)) as usize];
    let stride = (w + 1) as usize;
    for y in 0..h as usize {
        let mut row_sum = 0u64;
        for x in 0..w as usize {
            row_sum += gray.get_pixel(x as u32, y as u32)[0] as u64;
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
        }
    }
    let window_sum = |x0: i64, y0: i64, x1: i64, y1: i64| -> u64 {
        let (x0, y0) = (x0 as usize, y0 as usize);
        let (x1, y1) = (x1 as usize, y1 as usize);
        integral[y1 * stride + x1] + integral[y0 * stride + x0]
            - integral[y0 * stride + x1]
            - integral[y1 * stride + x0]
    };

    let mut mask = GrayImage::new(w, h);
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let x0 = (x - r).max(0);
            let y0 = (y - r).max(0);
            let x1 = (x + r + 1).min(w as i64);
            let y1 = (y + r + 1).min(h as i64);
            let count = ((x1 - x0) * (y1 - y0)) as f32;
            let mean = window_sum(x0, y0, x1, y1) as f32 / count;

            let v = gray.get_pixel(x as u32, y as u32)[0];
            let marked = (v as f32) < mean - cfg.mean_offset as f32 || v < cfg.dark_floor;
            mask.put_pixel(x as u32, y as u32, Luma([if marked { 255 } else { 0 }]));
        }
    }
    mask
}
