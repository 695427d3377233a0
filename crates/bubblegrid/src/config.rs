//! Per-stage pipeline configuration.
//!
//! Every tunable lives in an explicit config value passed into the stage
//! that uses it; nothing is read from ambient process state. Defaults are
//! the calibrated constants the decision policy and scoring semantics
//! were tuned with.

/// Canonical canvas size used when a template does not carry one
/// (A4 at 150 dpi, portrait).
pub const DEFAULT_CANVAS_SIZE: [u32; 2] = [1240, 1754];

/// Sheet-boundary detection and perspective warp controls.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RectifyConfig {
    /// Gaussian smoothing sigma applied before binarization.
    pub blur_sigma: f32,
    /// Douglas-Peucker tolerance as a fraction of contour perimeter.
    pub approx_epsilon_frac: f64,
    /// Minimum enclosed area (px^2) for a candidate sheet quadrilateral.
    pub min_quad_area: f64,
}

impl Default for RectifyConfig {
    fn default() -> Self {
        Self {
            // 5x5-kernel equivalent sigma.
            blur_sigma: 1.1,
            approx_epsilon_frac: 0.02,
            min_quad_area: 10_000.0,
        }
    }
}

/// Mark-density measurement controls.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SamplerConfig {
    /// Adaptive-threshold block radius; the window is `2 * r + 1` pixels.
    pub block_radius: u32,
    /// A pixel must sit this far below the local mean to count as marked.
    pub mean_offset: u8,
    /// Pixels darker than this absolute level count as marked regardless of
    /// the local mean; keeps uniformly filled regions from vanishing under
    /// a purely local threshold.
    pub dark_floor: u8,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            // 11-px window.
            block_radius: 5,
            mean_offset: 2,
            dark_floor: 64,
        }
    }
}

/// Bubble decision thresholds.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionConfig {
    /// Minimum fill ratio for the best option to count as a mark at all.
    pub min_fill_ratio: f32,
    /// Minimum separation between best and runner-up fill ratios before
    /// the selection is flagged ambiguous.
    pub ambiguity_margin: f32,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            min_fill_ratio: 0.12,
            ambiguity_margin: 0.10,
        }
    }
}

/// Header-band version detection controls.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VersionConfig {
    /// Fraction of canvas height occupied by the printed header band.
    pub header_band_frac: f32,
    /// Gaussian smoothing sigma applied to the header band before binarization.
    pub blur_sigma: f32,
    /// Version label assumed when detection recovers nothing and the caller
    /// supplied no explicit version.
    pub default_version: String,
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            header_band_frac: 0.18,
            blur_sigma: 1.1,
            default_version: "A".to_string(),
        }
    }
}

/// Scoring semantics controls.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScoringConfig {
    /// Fixed denominator of the `answered/denominator` confidence string.
    ///
    /// Kept at 100 independent of template size for parity with the
    /// historical behavior; callers with differently sized templates can
    /// substitute the template's question count.
    pub confidence_denominator: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            confidence_denominator: 100,
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PipelineConfig {
    /// Sheet rectification controls.
    pub rectify: RectifyConfig,
    /// Region sampling controls.
    pub sampler: SamplerConfig,
    /// Bubble decision thresholds.
    pub decision: DecisionConfig,
    /// Version detection controls.
    pub version: VersionConfig,
    /// Scoring semantics controls.
    pub scoring: ScoringConfig,
}
