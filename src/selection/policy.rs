//! Turns scored candidates into a selection with pending summary/full pairs.

use std::collections::{HashMap, HashSet};

use super::keywords::ScoringTable;
use super::pairing::detect_pairs;
use super::types::{CandidateDocument, DecisionRole, SelectionOutcome, SelectionResult};

/// Minimum score for a candidate to be selected on its own merit.
pub const SELECTION_THRESHOLD: i32 = 4;
/// Maximum number of score-based picks; paired candidates do not count against it.
pub const SELECTION_CAP: usize = 5;

/// Selection rules: score threshold, cap, and summary/full pair forcing.
#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    threshold: i32,
    cap: usize,
    table: ScoringTable,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::new(ScoringTable::default())
    }
}

impl SelectionPolicy {
    /// Policy using the standard threshold and cap with the given rule table for pairing.
    pub fn new(table: ScoringTable) -> Self {
        Self {
            threshold: SELECTION_THRESHOLD,
            cap: SELECTION_CAP,
            table,
        }
    }

    /// Select candidates.
    ///
    /// Every candidate scoring at or above the threshold qualifies; when more than `cap`
    /// qualify, the highest scores win with ties going to the earlier discovery. Summary/full
    /// pairs are detected first and both members are force-included and marked pending,
    /// even when that pushes the selection above the cap. The outcome lists every candidate in
    /// discovery order.
    pub fn select(&self, candidates: Vec<CandidateDocument>) -> SelectionOutcome {
        let mut ranked: Vec<&CandidateDocument> = candidates.iter().collect();
        // Stable sort keeps discovery order among equal scores.
        ranked.sort_by_key(|candidate| std::cmp::Reverse(candidate.priority_score));

        let deferred_groups = detect_pairs(&self.table, &ranked, self.threshold);
        let roles: HashMap<&str, (&str, DecisionRole)> = deferred_groups
            .iter()
            .flat_map(|group| {
                [
                    (group.summary_id.as_str(), (group.group_id.as_str(), DecisionRole::Summary)),
                    (group.full_id.as_str(), (group.group_id.as_str(), DecisionRole::Full)),
                ]
            })
            .collect();

        let score_picks: HashSet<&str> = ranked
            .iter()
            .filter(|candidate| candidate.priority_score >= self.threshold)
            .filter(|candidate| !roles.contains_key(candidate.id.as_str()))
            .take(self.cap)
            .map(|candidate| candidate.id.as_str())
            .collect();

        let results: Vec<SelectionResult> = candidates
            .iter()
            .map(|candidate| {
                let id = candidate.id.as_str();
                if let Some((group_id, role)) = roles.get(id) {
                    SelectionResult::pending(candidate.clone(), group_id, *role)
                } else if score_picks.contains(id) {
                    SelectionResult::selected(candidate.clone())
                } else {
                    SelectionResult::unselected(candidate.clone())
                }
            })
            .collect();

        let outcome = SelectionOutcome {
            results,
            deferred_groups,
        };
        tracing::info!(
            candidates = outcome.results.len(),
            selected = outcome.selected().count(),
            deferred_groups = outcome.deferred_groups.len(),
            "Selection complete"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::types::{Category, ScoreComponents};

    fn candidate(index: usize, text: &str, category: Category, score: i32) -> CandidateDocument {
        CandidateDocument {
            id: format!("doc{index}"),
            discovery_index: index,
            url: format!("https://e.go.jp/{index}.pdf"),
            display_text: text.into(),
            filename: format!("{index}.pdf"),
            inferred_category: category,
            priority_score: score,
            material_id: None,
            score_components: ScoreComponents::default(),
            adjustments: Vec::new(),
        }
    }

    #[test]
    fn empty_input_yields_empty_selection() {
        let outcome = SelectionPolicy::default().select(Vec::new());
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.selected().count(), 0);
    }

    #[test]
    fn cap_keeps_top_scores_with_discovery_tie_break() {
        let candidates = vec![
            candidate(0, "資料1", Category::Material, 4),
            candidate(1, "資料2", Category::Material, 6),
            candidate(2, "資料3", Category::Material, 4),
            candidate(3, "資料4", Category::Material, 5),
            candidate(4, "資料5", Category::Material, 4),
            candidate(5, "資料6", Category::Material, 7),
            candidate(6, "資料7", Category::Material, 4),
        ];
        let outcome = SelectionPolicy::default().select(candidates);
        assert_eq!(outcome.selected_ids(), vec!["doc0", "doc1", "doc2", "doc3", "doc5"]);
    }

    #[test]
    fn below_threshold_candidates_are_never_selected_alone() {
        let candidates = vec![
            candidate(0, "議事次第", Category::Agenda, 3),
            candidate(1, "委員名簿", Category::Participants, 0),
        ];
        let outcome = SelectionPolicy::default().select(candidates);
        assert_eq!(outcome.selected().count(), 0);
    }

    #[test]
    fn pair_members_bypass_the_cap_and_are_pending() {
        let mut candidates = vec![
            candidate(0, "中間報告書概要", Category::ExecutiveSummary, 5),
            candidate(1, "中間報告書本文", Category::ExecutiveSummary, 5),
        ];
        for index in 2..7 {
            candidates.push(candidate(index, &format!("検討資料{index}"), Category::Material, 6));
        }
        let outcome = SelectionPolicy::default().select(candidates);

        assert_eq!(outcome.selected().count(), 7);
        assert_eq!(outcome.deferred_groups.len(), 1);
        let pending: Vec<_> = outcome
            .results
            .iter()
            .filter(|result| result.decision_pending)
            .collect();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].decision_role, Some(DecisionRole::Summary));
        assert_eq!(pending[1].decision_role, Some(DecisionRole::Full));
        assert_eq!(pending[0].decision_group_id, pending[1].decision_group_id);
    }
}
