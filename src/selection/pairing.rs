//! Detection of summary/full variants of the same material.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use super::keywords::ScoringTable;
use super::types::{CandidateDocument, Category, DeferredGroup};

/// Markers identifying the condensed variant.
pub const SUMMARY_MARKERS: [&str; 5] = [
    "概要",
    "要約",
    "サマリー",
    "エグゼクティブサマリー",
    "executive summary",
];

/// Markers identifying the complete variant.
pub const FULL_MARKERS: [&str; 6] = ["本文", "本編", "報告書", "とりまとめ", "取りまとめ", "詳細"];

static LEADING_MATERIAL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^資料\s*\d+(?:-\d+)?\s*").expect("valid regex"));
static PDF_PAREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[（(][^）)]*pdf[^）)]*[）)]").expect("valid regex"));
static ANY_PAREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[（(][^）)]*[）)]").expect("valid regex"));
static TRAILING_CONNECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:の|について|に関する|に係る)$").expect("valid regex"));
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[・／/,:：\-ー_　\s]+").expect("valid regex"));

/// Whether the display text carries a summary marker.
pub fn is_summary_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    SUMMARY_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Whether the display text carries a full-variant marker.
pub fn is_full_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    FULL_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn strip_markers(text: &str) -> String {
    let mut stripped = text.to_lowercase();
    // Longest first so that エグゼクティブサマリー is removed before サマリー.
    let mut markers: Vec<&str> = SUMMARY_MARKERS.iter().chain(FULL_MARKERS.iter()).copied().collect();
    markers.sort_by_key(|marker| std::cmp::Reverse(marker.chars().count()));
    for marker in markers {
        stripped = stripped.replace(marker, "");
    }
    crate::links::normalize_whitespace(&stripped)
}

/// Base topic of a title with material numbers, file-size notes, and variant markers removed.
pub fn topic_key(text: &str) -> String {
    let normalized = crate::links::normalize_whitespace(text);
    let without_id = LEADING_MATERIAL_ID.replace(&normalized, "");
    let without_pdf = PDF_PAREN.replace_all(&without_id, "");
    let without_paren = ANY_PAREN.replace_all(&without_pdf, "");
    let without_markers = strip_markers(&without_paren);
    let mut key = without_markers;
    // Connectives can stack (`…の概要について`), so strip until stable.
    loop {
        let trimmed = TRAILING_CONNECTIVE.replace(&key, "").into_owned();
        if trimmed == key {
            break;
        }
        key = trimmed;
    }
    SEPARATORS.replace_all(&key, "").into_owned()
}

/// Category of the title once variant markers are removed, so that `報告書概要` and
/// `報告書本文` compare as the same kind of document.
pub fn marker_free_category(table: &ScoringTable, candidate: &CandidateDocument) -> Category {
    table.classify(&strip_markers(&candidate.display_text), &candidate.filename)
}

/// Whether two candidates count as the same kind of document.
///
/// Equal inferred categories always match. When they differ, the marker-free titles are
/// compared instead, but only if neither category was overridden by a page hint.
pub fn same_category(table: &ScoringTable, a: &CandidateDocument, b: &CandidateDocument) -> bool {
    if a.inferred_category == b.inferred_category {
        return true;
    }
    let from_rules =
        |c: &CandidateDocument| table.classify(&c.display_text, &c.filename) == c.inferred_category;
    from_rules(a) && from_rules(b) && marker_free_category(table, a) == marker_free_category(table, b)
}

/// Pair summary candidates with full candidates sharing the same topic and category
/// (see [`same_category`]).
///
/// `ranked` must be ordered by descending score (ties by discovery order); summary candidates
/// are matched in that order, each taking the best unused full candidate. A full candidate
/// carrying an explicit full marker beats a higher-scoring one without it. At least one member
/// of every pair scores `threshold` or more.
pub fn detect_pairs(
    table: &ScoringTable,
    ranked: &[&CandidateDocument],
    threshold: i32,
) -> Vec<DeferredGroup> {
    let (summaries, fulls): (Vec<&CandidateDocument>, Vec<&CandidateDocument>) = ranked
        .iter()
        .copied()
        .partition(|candidate| is_summary_text(&candidate.display_text));

    let mut used_full: HashSet<&str> = HashSet::new();
    let mut groups = Vec::new();

    for summary in summaries {
        let summary_key = topic_key(&summary.display_text);
        if summary_key.is_empty() {
            continue;
        }
        let summary_qualifies = summary.priority_score >= threshold;

        let best_full = fulls
            .iter()
            .copied()
            .filter(|full| summary_qualifies || full.priority_score >= threshold)
            .filter(|full| !used_full.contains(full.id.as_str()))
            .filter(|full| topic_key(&full.display_text) == summary_key)
            .filter(|full| same_category(table, summary, full))
            .max_by_key(|full| {
                let marker_bonus = if is_full_text(&full.display_text) { 100 } else { 0 };
                // Earlier discovery wins ties.
                (marker_bonus + full.priority_score, std::cmp::Reverse(full.discovery_index))
            });

        if let Some(full) = best_full {
            used_full.insert(full.id.as_str());
            let group_id = format!("deferred-{:02}", groups.len() + 1);
            tracing::debug!(
                group_id = %group_id,
                summary = %summary.id,
                full = %full.id,
                topic = %summary_key,
                "Detected summary/full pair"
            );
            groups.push(DeferredGroup {
                group_id,
                summary_id: summary.id.clone(),
                full_id: full.id.clone(),
            });
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::types::ScoreComponents;

    fn candidate(index: usize, text: &str, score: i32) -> CandidateDocument {
        CandidateDocument {
            id: format!("doc{index}"),
            discovery_index: index,
            url: format!("https://e.go.jp/{index}.pdf"),
            display_text: text.into(),
            filename: format!("{index}.pdf"),
            inferred_category: Category::Other,
            priority_score: score,
            material_id: None,
            score_components: ScoreComponents::default(),
            adjustments: Vec::new(),
        }
    }

    #[test]
    fn topic_key_strips_numbers_notes_and_markers() {
        assert_eq!(topic_key("資料1 中間報告書概要（PDF形式：512KB）"), "中間");
        assert_eq!(topic_key("資料2 中間報告書 本文"), "中間");
        assert_eq!(topic_key("デジタル政策の概要について"), "デジタル政策");
    }

    #[test]
    fn pairs_summary_with_matching_full() {
        let table = ScoringTable::default();
        let docs = vec![
            candidate(0, "資料1 中間報告書概要", 5),
            candidate(1, "資料2 中間報告書本文", 5),
            candidate(2, "資料3 別の報告", 5),
        ];
        let ranked: Vec<&CandidateDocument> = docs.iter().collect();
        let groups = detect_pairs(&table, &ranked, 4);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].group_id, "deferred-01");
        assert_eq!(groups[0].summary_id, "doc0");
        assert_eq!(groups[0].full_id, "doc1");
    }

    #[test]
    fn explicit_full_marker_beats_higher_score() {
        let table = ScoringTable::default();
        let docs = vec![
            candidate(0, "政策パッケージ概要", 5),
            candidate(1, "政策パッケージ", 9),
            candidate(2, "政策パッケージ詳細", 4),
        ];
        let ranked: Vec<&CandidateDocument> = docs.iter().collect();
        let groups = detect_pairs(&table, &ranked, 4);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].full_id, "doc2");
    }

    #[test]
    fn pairs_need_one_qualifying_member() {
        let table = ScoringTable::default();
        let docs = vec![candidate(0, "白書概要", 3), candidate(1, "白書本文", 2)];
        let ranked: Vec<&CandidateDocument> = docs.iter().collect();
        assert!(detect_pairs(&table, &ranked, 4).is_empty());

        let docs = vec![candidate(0, "白書概要", 5), candidate(1, "白書本文", 2)];
        let ranked: Vec<&CandidateDocument> = docs.iter().collect();
        assert_eq!(detect_pairs(&table, &ranked, 4).len(), 1);
    }

    #[test]
    fn hinted_categories_must_agree() {
        let table = ScoringTable::default();
        let mut summary = candidate(0, "中間報告書概要", 5);
        summary.inferred_category = Category::ExecutiveSummary;
        let mut full = candidate(1, "中間報告書本文", 1);
        full.inferred_category = Category::Reference;
        let docs = vec![summary, full];
        let ranked: Vec<&CandidateDocument> = docs.iter().collect();
        assert!(detect_pairs(&table, &ranked, 4).is_empty());

        // Without a hint the full variant keeps its rule-table category and still pairs.
        let mut docs = docs;
        docs[1].inferred_category = table.classify("中間報告書本文", "1.pdf");
        let ranked: Vec<&CandidateDocument> = docs.iter().collect();
        assert_eq!(detect_pairs(&table, &ranked, 4).len(), 1);
    }

    #[test]
    fn unrelated_titles_do_not_pair() {
        let table = ScoringTable::default();
        let docs = vec![candidate(0, "予算の概要", 5), candidate(1, "税制改正本文", 5)];
        let ranked: Vec<&CandidateDocument> = docs.iter().collect();
        assert!(detect_pairs(&table, &ranked, 4).is_empty());
    }
}
