//! Geometric rectification: locate the sheet's outer boundary in a raw
//! photograph and warp it onto the canonical canvas.
//!
//! Stages: luminance -> Gaussian blur -> Otsu binarization -> external
//! contours -> largest Douglas-Peucker 4-gon above the area gate ->
//! corner ordering -> homography warp. When no quadrilateral qualifies the
//! sheet is plainly resized instead; a missing boundary is reduced
//! accuracy, not an error.

use image::imageops::FilterType;
use image::{GrayImage, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use nalgebra::Matrix3;

use crate::config::RectifyConfig;
use crate::homography;

/// Warp `raw` to a `canvas`-sized image using the detected sheet boundary,
/// falling back to a plain resize when no boundary is found.
pub fn rectify(raw: &RgbImage, canvas: [u32; 2], cfg: &RectifyConfig) -> RgbImage {
    let gray = image::imageops::grayscale(raw);

    let quad = match find_sheet_quad(&gray, cfg) {
        Some(q) => q,
        None => {
            tracing::warn!("no sheet quadrilateral found, falling back to plain resize");
            return image::imageops::resize(raw, canvas[0], canvas[1], FilterType::Triangle);
        }
    };

    let corners = order_corners(quad);
    let [w, h] = canvas;
    let canonical = [
        [0.0, 0.0],
        [(w - 1) as f64, 0.0],
        [(w - 1) as f64, (h - 1) as f64],
        [0.0, (h - 1) as f64],
    ];

    match homography::estimate_homography(&canonical, &corners) {
        Ok(h_mat) => warp_to_canvas(raw, &h_mat, canvas),
        Err(e) => {
            tracing::warn!("homography estimation failed ({}), falling back to plain resize", e);
            image::imageops::resize(raw, canvas[0], canvas[1], FilterType::Triangle)
        }
    }
}

/// Find the sheet's outer boundary as an unordered quadrilateral.
///
/// Candidates are external contours of the binarized image, largest
/// enclosed area first; the first whose polygonal approximation has
/// exactly four vertices and clears the area gate wins.
pub(crate) fn find_sheet_quad(gray: &GrayImage, cfg: &RectifyConfig) -> Option<[[f64; 2]; 4]> {
    let blurred = imageproc::filter::gaussian_blur_f32(gray, cfg.blur_sigma);
    let level = otsu_level(&blurred);
    let binary = threshold(&blurred, level, ThresholdType::Binary);

    let contours: Vec<Contour<i32>> = find_contours(&binary);
    let mut outer: Vec<&Contour<i32>> = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.points.len() >= 4)
        .collect();
    outer.sort_by(|a, b| shoelace_area(&b.points).total_cmp(&shoelace_area(&a.points)));

    for contour in outer {
        let perimeter = arc_length(&contour.points, true);
        let epsilon = cfg.approx_epsilon_frac * perimeter;
        let approx = approximate_polygon_dp(&contour.points, epsilon, true);
        if approx.len() == 4 && shoelace_area(&approx) > cfg.min_quad_area {
            return Some([
                [approx[0].x as f64, approx[0].y as f64],
                [approx[1].x as f64, approx[1].y as f64],
                [approx[2].x as f64, approx[2].y as f64],
                [approx[3].x as f64, approx[3].y as f64],
            ]);
        }
    }
    None
}

/// Reorder four corner points into top-left, top-right, bottom-right,
/// bottom-left, independent of input ordering.
///
/// Top-left minimizes x+y, bottom-right maximizes it; top-right minimizes
/// y-x, bottom-left maximizes it (image coordinates, y down).
pub fn order_corners(pts: [[f64; 2]; 4]) -> [[f64; 2]; 4] {
    let tl = select_corner(&pts, |p| p[0] + p[1], false);
    let br = select_corner(&pts, |p| p[0] + p[1], true);
    let tr = select_corner(&pts, |p| p[1] - p[0], false);
    let bl = select_corner(&pts, |p| p[1] - p[0], true);
    [tl, tr, br, bl]
}

fn select_corner(pts: &[[f64; 2]; 4], key: impl Fn(&[f64; 2]) -> f64, take_max: bool) -> [f64; 2] {
    let mut best = pts[0];
    let mut best_key = key(&pts[0]);
    for p in &pts[1..] {
        let k = key(p);
        if (take_max && k > best_key) || (!take_max && k < best_key) {
            best = *p;
            best_key = k;
        }
    }
    best
}

/// Enclosed polygon area via the shoelace formula.
fn shoelace_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for i in 0..points.len() {
        let p = points[i];
        let q = points[(i + 1) % points.len()];
        acc += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
    }
    acc.abs() * 0.5
}

/// Backward-map every canvas pixel through `h` and bilinearly sample the
/// raw image. Pixels projecting outside the source stay black.
fn warp_to_canvas(raw: &RgbImage, h: &Matrix3<f64>, canvas: [u32; 2]) -> RgbImage {
    let [w, h_out] = canvas;
    let mut out = RgbImage::new(w, h_out);
    for v in 0..h_out {
        for u in 0..w {
            let p = homography::project(h, u as f64, v as f64);
            if let Some(px) = bilinear_sample_rgb(raw, p[0] as f32, p[1] as f32) {
                out.put_pixel(u, v, Rgb(px));
            }
        }
    }
    out
}

/// Bilinear sample at a sub-pixel position, per channel. Returns `None`
/// outside the image.
fn bilinear_sample_rgb(img: &RgbImage, x: f32, y: f32) -> Option<[u8; 3]> {
    let (w, h) = img.dimensions();
    if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
        return None;
    }
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    if x0 + 1 >= w || y0 + 1 >= h {
        return None;
    }
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let mut out = [0u8; 3];
    for c in 0..3 {
        let p00 = img.get_pixel(x0, y0)[c] as f32;
        let p10 = img.get_pixel(x0 + 1, y0)[c] as f32;
        let p01 = img.get_pixel(x0, y0 + 1)[c] as f32;
        let p11 = img.get_pixel(x0 + 1, y0 + 1)[c] as f32;
        let v = (1.0 - fx) * (1.0 - fy) * p00
            + fx * (1.0 - fy) * p10
            + (1.0 - fx) * fy * p01
            + fx * fy * p11;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    Some(out)
}
