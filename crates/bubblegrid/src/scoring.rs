//! Answer-key model and deterministic scoring.
//!
//! Keys live in an Excel workbook with one sheet per form version; each
//! sheet carries `Question` / `Answer` columns (or the two leading columns
//! when headers differ). Correct answers are bucketed into five fixed
//! subject bands of twenty questions each.

use std::collections::BTreeMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::config::ScoringConfig;
use crate::error::PipelineError;
use crate::{DetectionResult, ScoreReport};

/// Subject bands: label and inclusive question-number range.
const SUBJECT_BANDS: [(&str, u32, u32); 5] = [
    ("subject1", 1, 20),
    ("subject2", 21, 40),
    ("subject3", 41, 60),
    ("subject4", 61, 80),
    ("subject5", 81, 100),
];

/// Correct answers for one form version.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct AnswerKey {
    entries: BTreeMap<u32, String>,
}

impl AnswerKey {
    /// Build a key from `(question, answer)` pairs; answers are
    /// uppercase-normalized.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: AsRef<str>,
    {
        let entries = pairs
            .into_iter()
            .map(|(q, a)| (q, a.as_ref().trim().to_uppercase()))
            .collect();
        Self { entries }
    }

    /// Correct answer token for a question, if the question is keyed.
    pub fn get(&self, question: u32) -> Option<&str> {
        self.entries.get(&question).map(String::as_str)
    }

    /// Number of keyed questions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the key holds no questions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All key sheets of one workbook, in workbook order.
#[derive(Debug, Clone)]
pub struct AnswerKeyBook {
    sheets: Vec<(String, AnswerKey)>,
}

impl AnswerKeyBook {
    /// Load every sheet of an `.xlsx` workbook as a version-labelled key.
    pub fn from_xlsx_file(path: &Path) -> Result<Self, PipelineError> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| PipelineError::AnswerKeyUnreadable(format!("{}: {}", path.display(), e)))?;

        let names: Vec<String> = workbook.sheet_names().to_vec();
        let mut sheets = Vec::with_capacity(names.len());
        for name in names {
            let range = workbook.worksheet_range(&name).map_err(|e| {
                PipelineError::AnswerKeyUnreadable(format!("sheet {:?}: {}", name, e))
            })?;

            let mut entries = BTreeMap::new();
            for row in range.rows() {
                // Header rows and blank lines fail to parse and are skipped.
                let Some(question) = row.first().and_then(cell_as_question) else {
                    continue;
                };
                let Some(answer) = row.get(1).and_then(cell_as_token) else {
                    continue;
                };
                entries.insert(question, answer);
            }
            sheets.push((name, AnswerKey { entries }));
        }

        Self::from_sheets(sheets)
    }

    /// Build a book from in-memory sheets. Fails on an empty workbook:
    /// without any key sheet nothing can be scored.
    pub fn from_sheets(sheets: Vec<(String, AnswerKey)>) -> Result<Self, PipelineError> {
        if sheets.is_empty() {
            return Err(PipelineError::AnswerKeyUnreadable(
                "workbook has no sheets".to_string(),
            ));
        }
        Ok(Self { sheets })
    }

    /// Sheet labels in workbook order.
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|(name, _)| name.as_str())
    }

    /// Resolve a version label to a key sheet.
    ///
    /// Labels are matched after normalization, so `SET-A`, `Set A` and
    /// `seta` all resolve like `A`. An unmatched label substitutes the
    /// first sheet rather than failing; the substitution is logged.
    pub fn resolve(&self, label: &str) -> (&str, &AnswerKey) {
        let want = normalize_version_label(label);
        if let Some((name, key)) = self
            .sheets
            .iter()
            .find(|(name, _)| normalize_version_label(name) == want)
        {
            return (name.as_str(), key);
        }

        let (name, key) = &self.sheets[0];
        tracing::warn!(
            "no answer key sheet matches version {:?}, substituting first sheet {:?}",
            label,
            name
        );
        (name.as_str(), key)
    }
}

/// Normalize a version label for key lookup: uppercase, drop the `SET`
/// marker and separator punctuation.
pub fn normalize_version_label(label: &str) -> String {
    label
        .to_uppercase()
        .replace("SET", "")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn cell_as_question(cell: &Data) -> Option<u32> {
    let value = match cell {
        Data::Int(i) => *i as f64,
        Data::Float(f) => *f,
        Data::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if value.fract() != 0.0 || value < 1.0 || value > u32::MAX as f64 {
        return None;
    }
    Some(value as u32)
}

fn cell_as_token(cell: &Data) -> Option<String> {
    let token = match cell {
        Data::String(s) => s.trim().to_uppercase(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 => (*f as i64).to_string(),
        _ => return None,
    };
    if token.is_empty() {
        return None;
    }
    Some(token)
}

fn subject_for(question: u32) -> Option<&'static str> {
    SUBJECT_BANDS
        .iter()
        .find(|(_, lo, hi)| (*lo..=*hi).contains(&question))
        .map(|(name, _, _)| *name)
}

/// Score detected answers against a key.
///
/// Questions absent from the key are ignored (unscored template extras).
/// Question numbers outside the subject bands are unscored: they count
/// toward neither a bucket nor the total.
pub fn score(key: &AnswerKey, detection: &DetectionResult, cfg: &ScoringConfig) -> ScoreReport {
    let mut per_subject: BTreeMap<String, u32> = SUBJECT_BANDS
        .iter()
        .map(|(name, _, _)| (name.to_string(), 0))
        .collect();
    let mut total = 0;

    for (question, detected) in &detection.answers {
        let Some(detected) = detected else { continue };
        let Some(correct) = key.get(*question) else { continue };
        if detected.trim().to_uppercase() != correct {
            continue;
        }
        match subject_for(*question) {
            Some(subject) => {
                if let Some(count) = per_subject.get_mut(subject) {
                    *count += 1;
                }
                total += 1;
            }
            None => {
                tracing::debug!("question {} lies outside the subject bands, unscored", question);
            }
        }
    }

    let answered = detection.answers.values().filter(|a| a.is_some()).count();
    ScoreReport {
        per_subject,
        total,
        confidence: format!("{}/{}", answered, cfg.confidence_denominator),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection_from(pairs: &[(u32, Option<&str>)]) -> DetectionResult {
        DetectionResult {
            answers: pairs
                .iter()
                .map(|(q, a)| (*q, a.map(str::to_string)))
                .collect(),
            flags: Vec::new(),
        }
    }

    fn cycle_answer(q: u32) -> &'static str {
        ["A", "B", "C", "D"][(q % 4) as usize]
    }

    #[test]
    fn perfect_sheet_scores_full_marks() {
        let key = AnswerKey::from_pairs((1..=100).map(|q| (q, cycle_answer(q))));
        let detection = detection_from(
            &(1..=100).map(|q| (q, Some(cycle_answer(q)))).collect::<Vec<_>>(),
        );
        let report = score(&key, &detection, &ScoringConfig::default());
        assert_eq!(report.total, 100);
        for band in ["subject1", "subject2", "subject3", "subject4", "subject5"] {
            assert_eq!(report.per_subject[band], 20, "band {}", band);
        }
        assert_eq!(report.confidence, "100/100");
    }

    #[test]
    fn comparison_is_case_insensitive() {
        let key = AnswerKey::from_pairs([(1, "a")]);
        let detection = detection_from(&[(1, Some("A"))]);
        let report = score(&key, &detection, &ScoringConfig::default());
        assert_eq!(report.total, 1);
        assert_eq!(report.per_subject["subject1"], 1);
    }

    #[test]
    fn unanswered_and_wrong_answers_do_not_score() {
        let key = AnswerKey::from_pairs([(1, "A"), (2, "B"), (3, "C")]);
        let detection = detection_from(&[(1, None), (2, Some("C")), (3, Some("C"))]);
        let report = score(&key, &detection, &ScoringConfig::default());
        assert_eq!(report.total, 1);
        assert_eq!(report.confidence, "2/100");
    }

    #[test]
    fn questions_missing_from_key_are_ignored() {
        let key = AnswerKey::from_pairs([(1, "A")]);
        let detection = detection_from(&[(1, Some("A")), (2, Some("B"))]);
        let report = score(&key, &detection, &ScoringConfig::default());
        assert_eq!(report.total, 1);
    }

    #[test]
    fn out_of_band_questions_are_unscored() {
        let key = AnswerKey::from_pairs([(101, "A"), (5, "B")]);
        let detection = detection_from(&[(101, Some("A")), (5, Some("B"))]);
        let report = score(&key, &detection, &ScoringConfig::default());
        assert_eq!(report.total, 1);
        assert_eq!(report.per_subject["subject1"], 1);
        assert_eq!(report.per_subject.values().sum::<u32>(), 1);
    }

    #[test]
    fn confidence_denominator_is_configurable() {
        let key = AnswerKey::from_pairs([(1, "A")]);
        let detection = detection_from(&[(1, Some("A"))]);
        let cfg = ScoringConfig {
            confidence_denominator: 40,
        };
        assert_eq!(score(&key, &detection, &cfg).confidence, "1/40");
    }

    #[test]
    fn label_variants_normalize_identically() {
        for label in ["SET-A", "Set A", "seta", "A", " set : a "] {
            assert_eq!(normalize_version_label(label), "A", "label {:?}", label);
        }
        assert_eq!(normalize_version_label("SET-B"), "B");
    }

    #[test]
    fn resolve_matches_normalized_labels() {
        let book = AnswerKeyBook::from_sheets(vec![
            ("A".to_string(), AnswerKey::from_pairs([(1, "A")])),
            ("B".to_string(), AnswerKey::from_pairs([(1, "B")])),
        ])
        .expect("book");
        let (name, key) = book.resolve("Set B");
        assert_eq!(name, "B");
        assert_eq!(key.get(1), Some("B"));
    }

    #[test]
    fn resolve_falls_back_to_first_sheet() {
        let book = AnswerKeyBook::from_sheets(vec![
            ("A".to_string(), AnswerKey::from_pairs([(1, "A")])),
            ("B".to_string(), AnswerKey::from_pairs([(1, "B")])),
        ])
        .expect("book");
        let (name, _) = book.resolve("Z");
        assert_eq!(name, "A");
    }

    #[test]
    fn empty_workbook_is_fatal() {
        let err = AnswerKeyBook::from_sheets(Vec::new()).expect_err("expected error");
        assert!(matches!(err, PipelineError::AnswerKeyUnreadable(_)));
    }

    #[test]
    fn question_cells_parse_from_common_representations() {
        assert_eq!(cell_as_question(&Data::Int(7)), Some(7));
        assert_eq!(cell_as_question(&Data::Float(42.0)), Some(42));
        assert_eq!(cell_as_question(&Data::String(" 13 ".into())), Some(13));
        assert_eq!(cell_as_question(&Data::String("Question".into())), None);
        assert_eq!(cell_as_question(&Data::Float(1.5)), None);
        assert_eq!(cell_as_question(&Data::Int(0)), None);
        assert_eq!(cell_as_question(&Data::Empty), None);
    }

    #[test]
    fn answer_cells_normalize_to_uppercase_tokens() {
        assert_eq!(cell_as_token(&Data::String(" b ".into())).as_deref(), Some("B"));
        assert_eq!(cell_as_token(&Data::Int(3)).as_deref(), Some("3"));
        assert_eq!(cell_as_token(&Data::String("  ".into())), None);
        assert_eq!(cell_as_token(&Data::Empty), None);
    }
}
