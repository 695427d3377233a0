//! Fatal error taxonomy for sheet processing.
//!
//! Only unrecoverable conditions surface here: an unreadable input image,
//! a malformed template, or a missing/empty answer-key workbook.
//! Recoverable conditions (missing sheet quadrilateral, failed version
//! recognition, label-variant mismatch, per-bubble ambiguity) are ordinary
//! return values and never become errors.

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The raw image could not be decoded or read.
    ImageUnreadable(String),
    /// The template failed to parse or validate.
    InvalidTemplate(String),
    /// The answer-key workbook is missing, unreadable, or has no sheets.
    AnswerKeyUnreadable(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ImageUnreadable(msg) => write!(f, "unreadable image: {}", msg),
            Self::InvalidTemplate(msg) => write!(f, "invalid template: {}", msg),
            Self::AnswerKeyUnreadable(msg) => write!(f, "unreadable answer key: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}
