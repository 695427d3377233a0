//! bubblegrid — pure-Rust OMR bubble-sheet reader.
//!
//! Turns a photographed answer sheet into per-question selections and a
//! deterministic score. The pipeline stages are:
//!
//! 1. **Rectify** – sheet boundary detection and perspective warp onto the
//!    canonical canvas.
//! 2. **Sample** – locally thresholded mark density per bubble region.
//! 3. **Decide** – selection per question with no-mark/ambiguous flags.
//! 4. **Version** – optional header-band form-variant recognition.
//! 5. **Score** – answer-key comparison with fixed subject banding.
//! 6. **Overlay** – annotated review image.
//!
//! # Public API
//! - [`SheetProcessor`] as the primary entry point ("create once, process
//!   many sheets")
//! - [`Template`] and [`AnswerKeyBook`] as validated external inputs
//! - [`PipelineConfig`] for threshold tuning
//! - [`render_overlay`] for review images

pub mod config;
mod decide;
mod error;
mod homography;
mod overlay;
mod pipeline;
mod rectify;
mod sample;
mod scoring;
mod template;
#[cfg(test)]
mod test_utils;
mod version;

use std::collections::BTreeMap;

pub use config::{
    DecisionConfig, PipelineConfig, RectifyConfig, SamplerConfig, ScoringConfig, VersionConfig,
};
pub use decide::{decide, Decision};
pub use error::PipelineError;
pub use overlay::render_overlay;
pub use pipeline::{detect_answers, process_sheet, SheetProcessor};
pub use rectify::{order_corners, rectify};
pub use sample::fill_ratio;
pub use scoring::{normalize_version_label, score, AnswerKey, AnswerKeyBook};
pub use template::{OptionBox, Question, Template};
pub use version::{detect_version, extract_version_token};

/// Why a question's detection deserves human review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagReason {
    /// No option reached the minimum fill ratio.
    NoMark,
    /// Best and runner-up fill ratios were too close to call.
    Ambiguous,
}

/// Advisory annotation attached to one question's detection.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Flag {
    /// Question number the flag belongs to.
    pub question: u32,
    /// Review reason.
    pub reason: FlagReason,
    /// Supporting fill ratios: `[best]` for no-mark, `[best, second]` for
    /// ambiguous.
    pub scores: Vec<f32>,
}

/// Detected selections for a single sheet.
///
/// Created fresh per processed sheet and immutable once returned.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DetectionResult {
    /// Question number -> selected option token, `None` when no mark was
    /// detected.
    pub answers: BTreeMap<u32, Option<String>>,
    /// Advisory flags for human review.
    pub flags: Vec<Flag>,
}

impl DetectionResult {
    /// Number of questions with a detected mark.
    pub fn n_answered(&self) -> usize {
        self.answers.values().filter(|a| a.is_some()).count()
    }
}

/// Deterministic score derived from a [`DetectionResult`] and an
/// [`AnswerKey`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScoreReport {
    /// Correct answers per subject band.
    pub per_subject: BTreeMap<String, u32>,
    /// Correct answers across all bands.
    pub total: u32,
    /// `answered/denominator` coverage indicator.
    pub confidence: String,
}

/// Everything one processed sheet hands back to the caller.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SheetReport {
    /// Version label the sheet was scored against (hint, detected, or
    /// default).
    pub version: String,
    /// Answer-key sheet actually used (differs from `version` after a
    /// fallback substitution).
    pub key_sheet: String,
    /// Per-question selections and flags.
    pub detection: DetectionResult,
    /// Score against the resolved key.
    pub score: ScoreReport,
    /// Raw per-option fill ratios, for transparency and review tooling.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub densities: BTreeMap<u32, BTreeMap<String, f32>>,
}
