//! Shared builders for synthetic test images.

use image::{GrayImage, Luma, Rgb, RgbImage};

/// Solid-color RGB image.
pub(crate) fn flat_rgb(w: u32, h: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(w, h, Rgb(color))
}

/// White rectangle on a black background, as the binarizer would see a
/// brightly lit sheet.
pub(crate) fn white_rect_on_black(w: u32, h: u32, x: u32, y: u32, rw: u32, rh: u32) -> GrayImage {
    let mut img = GrayImage::new(w, h);
    for yy in y..(y + rh).min(h) {
        for xx in x..(x + rw).min(w) {
            img.put_pixel(xx, yy, Luma([255]));
        }
    }
    img
}

/// Near-white page with a near-black filled rectangle (a marked bubble).
pub(crate) fn rgb_with_dark_rect(w: u32, h: u32, x: u32, y: u32, rw: u32, rh: u32) -> RgbImage {
    let mut img = flat_rgb(w, h, [245, 245, 245]);
    for yy in y..(y + rh).min(h) {
        for xx in x..(x + rw).min(w) {
            img.put_pixel(xx, yy, Rgb([10, 10, 10]));
        }
    }
    img
}
