use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use pagereport::extract::ExtractError;
use pagereport::links::LinkDescriptor;
use pagereport::metrics::RunMetrics;
use pagereport::selection::{
    CandidateDocument, Category, DecisionRole, DeferredResolver, ScoringEngine, SelectionPolicy,
    StructuralProbe,
};
use pagereport::selection::types::ScoreComponents;

fn candidate(index: usize, text: &str, category: Category, score: i32) -> CandidateDocument {
    CandidateDocument {
        id: format!("doc{index}"),
        discovery_index: index,
        url: format!("https://www.example.go.jp/council/{index}.pdf"),
        display_text: text.into(),
        filename: format!("{index}.pdf"),
        inferred_category: category,
        priority_score: score,
        material_id: None,
        score_components: ScoreComponents::default(),
        adjustments: Vec::new(),
    }
}

/// Candidate list with one summary/full pair followed by five ordinary materials.
fn paired_candidates() -> Vec<CandidateDocument> {
    let mut candidates = vec![
        candidate(0, "中間報告書概要", Category::ExecutiveSummary, 5),
        candidate(1, "中間報告書本文", Category::ExecutiveSummary, 5),
    ];
    for index in 2..7 {
        candidates.push(candidate(
            index,
            &format!("検討資料{index}"),
            Category::Material,
            6,
        ));
    }
    candidates
}

struct PageProbe {
    pages: HashMap<String, u32>,
}

#[async_trait]
impl StructuralProbe for PageProbe {
    async fn measure(&self, candidate: &CandidateDocument) -> Result<u32, ExtractError> {
        self.pages
            .get(&candidate.id)
            .copied()
            .ok_or_else(|| ExtractError::PageCountMissing(candidate.id.clone()))
    }
}

fn resolver(full_pages: Option<u32>) -> DeferredResolver {
    let pages = full_pages
        .map(|pages| HashMap::from([("doc1".to_string(), pages)]))
        .unwrap_or_default();
    DeferredResolver::new(Arc::new(PageProbe { pages }))
}

#[test]
fn threshold_selection_keeps_discovery_order() {
    let candidates = vec![
        candidate(0, "資料1", Category::Material, 6),
        candidate(1, "議事次第", Category::Agenda, 3),
        candidate(2, "資料2", Category::Material, 5),
    ];
    let outcome = SelectionPolicy::default().select(candidates);

    assert_eq!(outcome.selected_ids(), vec!["doc0", "doc2"]);
    assert_eq!(outcome.results.len(), 3);
    assert!(outcome.deferred_groups.is_empty());
    assert!(outcome.results.iter().all(|result| !result.decision_pending));
}

#[test]
fn cap_never_exceeded_without_pairs() {
    let candidates: Vec<_> = (0..12)
        .map(|index| {
            candidate(
                index,
                &format!("資料{index}"),
                Category::Material,
                4 + (index as i32 % 3),
            )
        })
        .collect();
    let outcome = SelectionPolicy::default().select(candidates);
    let selected: Vec<_> = outcome.selected().collect();

    assert_eq!(selected.len(), 5);
    assert!(selected.iter().all(|result| result.candidate.priority_score >= 4));
    let indexes: Vec<usize> = selected
        .iter()
        .map(|result| result.candidate.discovery_index)
        .collect();
    let mut sorted = indexes.clone();
    sorted.sort_unstable();
    assert_eq!(indexes, sorted);
}

#[test]
fn scored_links_flow_into_selection() {
    let base = "https://www.example.go.jp/council";
    let links = vec![
        LinkDescriptor::new("資料1 事務局説明資料", format!("{base}/shiryou1.pdf")),
        LinkDescriptor::new("議事次第", format!("{base}/agenda.pdf")),
        LinkDescriptor::new("資料2 論点整理", format!("{base}/s2.pdf")),
        LinkDescriptor::new("委員名簿", format!("{base}/meibo.pdf")),
    ];
    let engine = ScoringEngine::default();
    let scored = engine.score(&links, "");
    let outcome = SelectionPolicy::new(engine.table().clone()).select(scored);

    let selected: Vec<&str> = outcome
        .selected()
        .map(|result| result.candidate.display_text.as_str())
        .collect();
    assert_eq!(selected, vec!["資料1 事務局説明資料", "資料2 論点整理"]);
}

#[test]
fn hinted_categories_that_differ_are_not_paired() {
    let base = "https://www.example.go.jp/council";
    let links = vec![
        LinkDescriptor::new("中間報告書概要", format!("{base}/a.pdf")).with_hint("executive_summary"),
        LinkDescriptor::new("中間報告書本文", format!("{base}/b.pdf")).with_hint("reference"),
    ];
    let engine = ScoringEngine::default();
    let scored = engine.score(&links, "");
    assert_eq!(scored[0].inferred_category, Category::ExecutiveSummary);
    assert_eq!(scored[1].inferred_category, Category::Reference);

    let outcome = SelectionPolicy::new(engine.table().clone()).select(scored);
    assert!(outcome.deferred_groups.is_empty());
    let selected: Vec<&str> = outcome
        .selected()
        .map(|result| result.candidate.display_text.as_str())
        .collect();
    assert_eq!(selected, vec!["中間報告書概要"]);
}

#[tokio::test]
async fn short_full_variant_replaces_summary() {
    let outcome = SelectionPolicy::default().select(paired_candidates());
    assert_eq!(outcome.selected().count(), 7);

    let metrics = RunMetrics::new();
    let selection = resolver(Some(15)).resolve(&outcome, &metrics).await;

    assert_eq!(selection.documents().len(), 6);
    assert_eq!(
        selection.document_ids(),
        vec!["doc1", "doc2", "doc3", "doc4", "doc5", "doc6"]
    );
    let decision = &selection.decisions()[0];
    assert_eq!(decision.chosen_role, DecisionRole::Full);
    assert_eq!(decision.rejected_document_id, "doc0");
    assert_eq!(decision.measured_length, Some(15));
    assert_eq!(decision.reason, "full_page_count=15 <= 20");
    assert_eq!(metrics.snapshot().probes_attempted, 1);
}

#[tokio::test]
async fn long_full_variant_keeps_summary() {
    let outcome = SelectionPolicy::default().select(paired_candidates());
    let selection = resolver(Some(45))
        .resolve(&outcome, &RunMetrics::new())
        .await;

    assert_eq!(selection.documents().len(), 6);
    assert_eq!(selection.documents()[0].id, "doc0");
    assert!(!selection.document_ids().contains(&"doc1".to_string()));
    assert_eq!(selection.decisions()[0].chosen_role, DecisionRole::Summary);
    assert_eq!(selection.decisions()[0].reason, "full_page_count=45 > 20");
}

#[tokio::test]
async fn probe_failure_defaults_to_summary() {
    let outcome = SelectionPolicy::default().select(paired_candidates());
    let metrics = RunMetrics::new();
    let selection = resolver(None).resolve(&outcome, &metrics).await;

    let decision = &selection.decisions()[0];
    assert_eq!(decision.chosen_document_id, "doc0");
    assert_eq!(decision.measured_length, None);
    assert_eq!(decision.reason, "default_to_summary");
    assert_eq!(metrics.snapshot().probes_failed, 1);
}

#[tokio::test]
async fn resolution_is_repeatable() {
    let outcome = SelectionPolicy::default().select(paired_candidates());
    let resolver = resolver(Some(20));
    let first = resolver.resolve(&outcome, &RunMetrics::new()).await;
    let second = resolver.resolve(&outcome, &RunMetrics::new()).await;
    assert_eq!(first, second);
    assert_eq!(first.decisions()[0].chosen_role, DecisionRole::Full);
}
