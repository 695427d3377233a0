//! Bubble decision policy: fill ratios in, selection plus advisory flag out.
//!
//! A weak best candidate is "no mark"; a best candidate without clear
//! separation from the runner-up is selected anyway but flagged ambiguous.
//! Both outcomes are ordinary values intended for human review, never
//! errors.

use crate::config::DecisionConfig;
use crate::{Flag, FlagReason};

/// Outcome for one question.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Selected option id, or `None` when no mark was detected.
    pub selection: Option<String>,
    /// Advisory flag when the selection is weak or contested.
    pub flag: Option<Flag>,
}

/// Decide a question from its per-option fill ratios, given in template
/// definition order.
///
/// Ties on equal ratios resolve to the earlier option in template order
/// (the sort is stable).
pub fn decide(question: u32, option_ratios: &[(String, f32)], cfg: &DecisionConfig) -> Decision {
    let mut ranked: Vec<&(String, f32)> = option_ratios.iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let Some((best_id, best)) = ranked.first().map(|r| (r.0.clone(), r.1)) else {
        return Decision {
            selection: None,
            flag: Some(Flag {
                question,
                reason: FlagReason::NoMark,
                scores: vec![0.0],
            }),
        };
    };
    let second = ranked.get(1).map(|r| r.1).unwrap_or(0.0);

    if best < cfg.min_fill_ratio {
        return Decision {
            selection: None,
            flag: Some(Flag {
                question,
                reason: FlagReason::NoMark,
                scores: vec![best],
            }),
        };
    }

    if best - second < cfg.ambiguity_margin {
        return Decision {
            selection: Some(best_id),
            flag: Some(Flag {
                question,
                reason: FlagReason::Ambiguous,
                scores: vec![best, second],
            }),
        };
    }

    Decision {
        selection: Some(best_id),
        flag: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratios(pairs: &[(&str, f32)]) -> Vec<(String, f32)> {
        pairs.iter().map(|(id, r)| (id.to_string(), *r)).collect()
    }

    #[test]
    fn clear_mark_selects_without_flag() {
        let d = decide(1, &ratios(&[("A", 0.45), ("B", 0.02)]), &DecisionConfig::default());
        assert_eq!(d.selection.as_deref(), Some("A"));
        assert!(d.flag.is_none());
    }

    #[test]
    fn boundary_best_with_clear_margin_is_unflagged() {
        // 0.12 meets the absolute minimum; margin 0.11 clears 0.10.
        let d = decide(1, &ratios(&[("A", 0.12), ("B", 0.01)]), &DecisionConfig::default());
        assert_eq!(d.selection.as_deref(), Some("A"));
        assert!(d.flag.is_none());
    }

    #[test]
    fn weak_best_is_no_mark() {
        let d = decide(7, &ratios(&[("A", 0.10), ("B", 0.00)]), &DecisionConfig::default());
        assert_eq!(d.selection, None);
        let flag = d.flag.expect("flag");
        assert_eq!(flag.question, 7);
        assert_eq!(flag.reason, FlagReason::NoMark);
        assert_eq!(flag.scores, vec![0.10]);
    }

    #[test]
    fn contested_best_is_selected_but_flagged() {
        let d = decide(3, &ratios(&[("A", 0.50), ("B", 0.45)]), &DecisionConfig::default());
        assert_eq!(d.selection.as_deref(), Some("A"));
        let flag = d.flag.expect("flag");
        assert_eq!(flag.reason, FlagReason::Ambiguous);
        assert_eq!(flag.scores, vec![0.50, 0.45]);
    }

    #[test]
    fn runner_up_can_win_over_earlier_options() {
        let d = decide(1, &ratios(&[("A", 0.05), ("B", 0.60), ("C", 0.08)]), &DecisionConfig::default());
        assert_eq!(d.selection.as_deref(), Some("B"));
        assert!(d.flag.is_none());
    }

    #[test]
    fn exact_tie_prefers_template_order() {
        let d = decide(1, &ratios(&[("C", 0.40), ("A", 0.40)]), &DecisionConfig::default());
        // Stable sort keeps C (listed first) ahead of A; flagged ambiguous.
        assert_eq!(d.selection.as_deref(), Some("C"));
        assert_eq!(d.flag.expect("flag").reason, FlagReason::Ambiguous);
    }

    #[test]
    fn single_option_compares_against_zero_runner_up() {
        let d = decide(1, &ratios(&[("A", 0.30)]), &DecisionConfig::default());
        assert_eq!(d.selection.as_deref(), Some("A"));
        assert!(d.flag.is_none());
    }

    #[test]
    fn decision_is_deterministic() {
        let input = ratios(&[("A", 0.33), ("B", 0.31), ("C", 0.02)]);
        let first = decide(9, &input, &DecisionConfig::default());
        for _ in 0..10 {
            assert_eq!(decide(9, &input, &DecisionConfig::default()), first);
        }
    }
}
