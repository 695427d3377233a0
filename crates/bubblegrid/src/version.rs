//! Form-variant ("Set A/B") detection from the sheet's header band.
//!
//! Detection is advisory: recognition runs behind the `ocr` feature, any
//! engine failure or unparseable text yields `None`, and the pipeline
//! falls back to the configured default version. Token extraction itself
//! is pure and always compiled.

use image::RgbImage;
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use regex::Regex;
use std::sync::OnceLock;

use crate::config::VersionConfig;

/// Recover the version token from the canonical image's header band.
///
/// Returns `None` when nothing trustworthy was recognized; never fails.
pub fn detect_version(canonical: &RgbImage, cfg: &VersionConfig) -> Option<String> {
    let (w, h) = canonical.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    let band_h = ((h as f32 * cfg.header_band_frac).round() as u32).clamp(1, h);
    let band = image::imageops::crop_imm(canonical, 0, 0, w, band_h).to_image();
    let gray = image::imageops::grayscale(&band);
    let blurred = imageproc::filter::gaussian_blur_f32(&gray, cfg.blur_sigma);
    let level = otsu_level(&blurred);
    let binary = threshold(&blurred, level, ThresholdType::Binary);

    let text = recognize_text(&binary)?;
    let token = extract_version_token(&text);
    if token.is_none() {
        tracing::debug!("header text {:?} yielded no version token", text);
    }
    token
}

/// Extract a version token from recognized header text.
///
/// Priority: `SET` + optional separator + one alphanumeric; a lone `A` or
/// `B` word (but not both); the fused substrings `SETA`/`SETB`.
pub fn extract_version_token(text: &str) -> Option<String> {
    static SET_PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = SET_PATTERN
        .get_or_init(|| Regex::new(r"SET\s*[-:]?\s*([A-Z0-9])").expect("static pattern compiles"));

    // Map everything outside the OCR whitelist to spaces so word splits
    // survive recognition noise.
    let cleaned: String = text
        .to_uppercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { ' ' })
        .collect();

    if let Some(caps) = pattern.captures(&cleaned) {
        return Some(caps[1].to_string());
    }

    let has_a = cleaned.split_whitespace().any(|t| t == "A");
    let has_b = cleaned.split_whitespace().any(|t| t == "B");
    match (has_a, has_b) {
        (true, false) => return Some("A".to_string()),
        (false, true) => return Some("B".to_string()),
        _ => {}
    }

    let fused: String = cleaned.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    if fused.contains("SETA") {
        return Some("A".to_string());
    }
    if fused.contains("SETB") {
        return Some("B".to_string());
    }

    None
}

#[cfg(feature = "ocr")]
fn recognize_text(binary: &image::GrayImage) -> Option<String> {
    use leptess::{LepTess, Variable};

    let mut engine = match LepTess::new(None, "eng") {
        Ok(engine) => engine,
        Err(e) => {
            tracing::debug!("tesseract init failed: {}", e);
            return None;
        }
    };
    if let Err(e) = engine.set_variable(
        Variable::TesseditCharWhitelist,
        "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-",
    ) {
        tracing::debug!("tesseract whitelist rejected: {}", e);
        return None;
    }

    let mut png = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut png);
    if binary.write_to(&mut cursor, image::ImageFormat::Png).is_err() {
        return None;
    }
    if let Err(e) = engine.set_image_from_mem(&png) {
        tracing::debug!("tesseract rejected header band: {}", e);
        return None;
    }
    engine.set_source_resolution(300);

    match engine.get_utf8_text() {
        Ok(text) if !text.trim().is_empty() => Some(text),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("tesseract recognition failed: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "ocr"))]
fn recognize_text(_binary: &image::GrayImage) -> Option<String> {
    tracing::debug!("version OCR disabled at build time (enable the `ocr` feature)");
    None
}
