//! Exam-form template: canonical canvas size and per-question bubble layout.
//!
//! Template JSON follows the form schema used by the sheet authoring side:
//! `{"name": ..., "canvas_size": [W, H], "questions": [{"q": 1,
//! "options": [{"id": "A", "bbox": [x, y, w, h]}, ...]}, ...]}`.
//! Validation happens once at load time; the pipeline assumes a valid
//! template afterwards.

use std::collections::HashSet;
use std::path::Path;

use crate::config::DEFAULT_CANVAS_SIZE;
use crate::error::PipelineError;

/// A single selectable bubble: option token plus its bounding box in
/// canonical-canvas pixels (`[x, y, w, h]`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OptionBox {
    pub id: String,
    pub bbox: [i64; 4],
}

/// One question: number plus its options in printed order.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Question {
    #[serde(rename = "q")]
    pub number: u32,
    pub options: Vec<OptionBox>,
}

/// Validated exam-form template.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Template {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_canvas_size")]
    pub canvas_size: [u32; 2],
    pub questions: Vec<Question>,
}

fn default_canvas_size() -> [u32; 2] {
    DEFAULT_CANVAS_SIZE
}

impl Template {
    /// Load and validate a template from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, PipelineError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::InvalidTemplate(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&data)
    }

    /// Parse and validate a template from a JSON string.
    pub fn from_json_str(data: &str) -> Result<Self, PipelineError> {
        let template: Template =
            serde_json::from_str(data).map_err(|e| PipelineError::InvalidTemplate(e.to_string()))?;
        template.validate()?;
        Ok(template)
    }

    /// Validate structural invariants. Called by the loaders; public so
    /// hand-constructed templates can be checked the same way.
    pub fn validate(&self) -> Result<(), PipelineError> {
        validate_template(self).map_err(PipelineError::InvalidTemplate)
    }

    /// Number of questions on the form.
    pub fn n_questions(&self) -> usize {
        self.questions.len()
    }
}

fn validate_template(template: &Template) -> Result<(), String> {
    let [w, h] = template.canvas_size;
    if w == 0 || h == 0 {
        return Err(format!("canvas_size must be positive, got [{}, {}]", w, h));
    }

    if template.questions.is_empty() {
        return Err("template has no questions".to_string());
    }

    let mut seen = HashSet::new();
    for question in &template.questions {
        if question.number == 0 {
            return Err("question numbers must be positive".to_string());
        }
        if !seen.insert(question.number) {
            return Err(format!("duplicate question number {}", question.number));
        }
        if question.options.is_empty() {
            return Err(format!("question {} has no options", question.number));
        }

        let mut option_ids = HashSet::new();
        for option in &question.options {
            if option.id.trim().is_empty() {
                return Err(format!("question {} has an empty option id", question.number));
            }
            if !option_ids.insert(option.id.as_str()) {
                return Err(format!(
                    "question {} has duplicate option id '{}'",
                    question.number, option.id
                ));
            }
            let [_, _, bw, bh] = option.bbox;
            if bw <= 0 || bh <= 0 {
                return Err(format!(
                    "question {} option '{}' has a degenerate bbox",
                    question.number, option.id
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> &'static str {
        r#"{
            "name": "exam1",
            "canvas_size": [1240, 1754],
            "questions": [
                {"q": 1, "options": [
                    {"id": "A", "bbox": [100, 200, 24, 24]},
                    {"id": "B", "bbox": [140, 200, 24, 24]}
                ]}
            ]
        }"#
    }

    #[test]
    fn parses_minimal_template() {
        let t = Template::from_json_str(minimal_json()).expect("valid template");
        assert_eq!(t.name, "exam1");
        assert_eq!(t.canvas_size, [1240, 1754]);
        assert_eq!(t.n_questions(), 1);
        assert_eq!(t.questions[0].options[1].id, "B");
    }

    #[test]
    fn canvas_size_defaults_when_absent() {
        let raw = r#"{"questions": [{"q": 1, "options": [{"id": "A", "bbox": [0, 0, 10, 10]}]}]}"#;
        let t = Template::from_json_str(raw).expect("valid template");
        assert_eq!(t.canvas_size, DEFAULT_CANVAS_SIZE);
    }

    #[test]
    fn rejects_duplicate_question_numbers() {
        let raw = r#"{
            "canvas_size": [100, 100],
            "questions": [
                {"q": 1, "options": [{"id": "A", "bbox": [0, 0, 10, 10]}]},
                {"q": 1, "options": [{"id": "A", "bbox": [0, 20, 10, 10]}]}
            ]
        }"#;
        let err = Template::from_json_str(raw).expect_err("expected error");
        assert!(err.to_string().contains("duplicate question number"));
    }

    #[test]
    fn rejects_question_without_options() {
        let raw = r#"{"canvas_size": [100, 100], "questions": [{"q": 1, "options": []}]}"#;
        let err = Template::from_json_str(raw).expect_err("expected error");
        assert!(err.to_string().contains("no options"));
    }

    #[test]
    fn rejects_duplicate_option_ids() {
        let raw = r#"{
            "canvas_size": [100, 100],
            "questions": [{"q": 1, "options": [
                {"id": "A", "bbox": [0, 0, 10, 10]},
                {"id": "A", "bbox": [20, 0, 10, 10]}
            ]}]
        }"#;
        let err = Template::from_json_str(raw).expect_err("expected error");
        assert!(err.to_string().contains("duplicate option id"));
    }

    #[test]
    fn rejects_zero_canvas() {
        let raw = r#"{"canvas_size": [0, 100], "questions": [{"q": 1, "options": [{"id": "A", "bbox": [0, 0, 10, 10]}]}]}"#;
        assert!(Template::from_json_str(raw).is_err());
    }

    #[test]
    fn rejects_degenerate_bbox() {
        let raw = r#"{"canvas_size": [100, 100], "questions": [{"q": 1, "options": [{"id": "A", "bbox": [0, 0, 0, 10]}]}]}"#;
        let err = Template::from_json_str(raw).expect_err("expected error");
        assert!(err.to_string().contains("degenerate bbox"));
    }
}
