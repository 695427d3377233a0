//! Stage-boundary glue: rectify -> sample -> decide -> version -> score.
//!
//! Algorithmic primitives live in `crate::rectify`, `crate::sample`,
//! `crate::decide`, `crate::version`, and `crate::scoring`; this layer
//! owns call order and data flow only. All recoverable conditions were
//! absorbed by the stages, so processing a sheet against validated inputs
//! cannot fail.

use std::collections::BTreeMap;

use image::RgbImage;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::scoring::{self, AnswerKeyBook};
use crate::template::Template;
use crate::{decide, rectify, sample, version};
use crate::{DetectionResult, SheetReport};

/// Primary processing interface.
///
/// Wraps a validated [`Template`] and a [`PipelineConfig`]. Create once,
/// process many sheets; the processor holds no mutable state, so sheets
/// may be processed concurrently against a shared instance.
pub struct SheetProcessor {
    template: Template,
    config: PipelineConfig,
}

impl SheetProcessor {
    /// Create a processor with default configuration.
    pub fn new(template: Template) -> Result<Self, PipelineError> {
        Self::with_config(template, PipelineConfig::default())
    }

    /// Create a processor with explicit configuration.
    pub fn with_config(template: Template, config: PipelineConfig) -> Result<Self, PipelineError> {
        template.validate()?;
        Ok(Self { template, config })
    }

    /// Access the template.
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Access the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Warp a raw photograph onto the template's canonical canvas.
    pub fn rectify(&self, raw: &RgbImage) -> RgbImage {
        rectify::rectify(raw, self.template.canvas_size, &self.config.rectify)
    }

    /// Evaluate bubbles on an already-rectified canvas.
    pub fn detect_answers(&self, canonical: &RgbImage) -> DetectionResult {
        detect_answers(canonical, &self.template, &self.config)
    }

    /// Rectify, evaluate, resolve the version, and score in one call.
    pub fn process(
        &self,
        raw: &RgbImage,
        keys: &AnswerKeyBook,
        version_hint: Option<&str>,
    ) -> SheetReport {
        let canonical = self.rectify(raw);
        self.process_canonical(&canonical, keys, version_hint)
    }

    /// Evaluate, resolve the version, and score an already-rectified
    /// canvas. Useful when the caller also wants the canvas for overlay
    /// rendering or archival.
    pub fn process_canonical(
        &self,
        canonical: &RgbImage,
        keys: &AnswerKeyBook,
        version_hint: Option<&str>,
    ) -> SheetReport {
        process_sheet(canonical, &self.template, keys, version_hint, &self.config)
    }
}

/// Evaluate every bubble of the template on a canonical canvas.
pub fn detect_answers(
    canonical: &RgbImage,
    template: &Template,
    cfg: &PipelineConfig,
) -> DetectionResult {
    let (detection, _) = evaluate(canonical, template, cfg);
    detection
}

/// Full single-sheet computation on a canonical canvas: bubble evaluation,
/// version resolution (hint > header detection > configured default), key
/// lookup, and scoring.
pub fn process_sheet(
    canonical: &RgbImage,
    template: &Template,
    keys: &AnswerKeyBook,
    version_hint: Option<&str>,
    cfg: &PipelineConfig,
) -> SheetReport {
    let (detection, densities) = evaluate(canonical, template, cfg);

    let version = version_hint
        .map(str::to_string)
        .or_else(|| version::detect_version(canonical, &cfg.version))
        .unwrap_or_else(|| cfg.version.default_version.clone());

    let (key_sheet, key) = keys.resolve(&version);
    let score = scoring::score(key, &detection, &cfg.scoring);

    tracing::info!(
        "sheet processed: version {}, {}/{} answered, {} flagged, total {}",
        version,
        detection.n_answered(),
        template.n_questions(),
        detection.flags.len(),
        score.total
    );

    SheetReport {
        version,
        key_sheet: key_sheet.to_string(),
        detection,
        score,
        densities,
    }
}

type DensityMap = BTreeMap<u32, BTreeMap<String, f32>>;

fn evaluate(
    canonical: &RgbImage,
    template: &Template,
    cfg: &PipelineConfig,
) -> (DetectionResult, DensityMap) {
    let mut detection = DetectionResult::default();
    let mut densities = DensityMap::new();

    for question in &template.questions {
        let ratios: Vec<(String, f32)> = question
            .options
            .iter()
            .map(|opt| {
                (
                    opt.id.clone(),
                    sample::fill_ratio(canonical, opt.bbox, &cfg.sampler),
                )
            })
            .collect();

        let decision = decide::decide(question.number, &ratios, &cfg.decision);
        detection.answers.insert(question.number, decision.selection);
        if let Some(flag) = decision.flag {
            detection.flags.push(flag);
        }

        densities.insert(question.number, ratios.into_iter().collect());
    }

    (detection, densities)
}
