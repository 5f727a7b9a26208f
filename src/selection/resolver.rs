//! Resolution of pending summary/full pairs with a cheap structural probe.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use super::types::{
    CandidateDocument, DecisionRole, DeferredDecision, DeferredGroup, FinalSelection,
    SelectionOutcome,
};
use crate::extract::ExtractError;
use crate::metrics::RunMetrics;

/// Rule recorded on every deferred decision.
pub const RESOLUTION_RULE: &str = "prefer full when short, else summary";
/// Full variants at or below this many pages win their pair.
pub const FULL_LENGTH_THRESHOLD: u32 = 20;
/// Budget for measuring one full variant.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(120);

/// Cheap structural measurement of a document, such as its page count.
#[async_trait]
pub trait StructuralProbe: Send + Sync {
    /// Measure the candidate without processing its content.
    async fn measure(&self, candidate: &CandidateDocument) -> Result<u32, ExtractError>;
}

/// Picks exactly one member of every deferred pair.
#[derive(Clone)]
pub struct DeferredResolver {
    probe: Arc<dyn StructuralProbe>,
    threshold: u32,
    probe_timeout: Duration,
}

impl DeferredResolver {
    /// Resolver measuring full variants with `probe`.
    pub fn new(probe: Arc<dyn StructuralProbe>) -> Self {
        Self {
            probe,
            threshold: FULL_LENGTH_THRESHOLD,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Override the per-probe time budget. A probe that overruns counts as failed.
    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    /// Resolve every pending pair and return only the winners.
    ///
    /// Only the `full` member of each group is probed; everything else selected passes through
    /// untouched. Probe failures fall back to the summary and never fail the run.
    pub async fn resolve(&self, outcome: &SelectionOutcome, metrics: &RunMetrics) -> FinalSelection {
        let mut decisions = Vec::with_capacity(outcome.deferred_groups.len());
        for group in &outcome.deferred_groups {
            let measured = self.measure_full(outcome, group, metrics).await;
            decisions.push(decide_group(group, measured, self.threshold));
        }

        let rejected: HashSet<&str> = decisions
            .iter()
            .map(|decision| decision.rejected_document_id.as_str())
            .collect();
        let documents: Vec<CandidateDocument> = outcome
            .selected()
            .filter(|result| !rejected.contains(result.candidate.id.as_str()))
            .map(|result| result.candidate.clone())
            .collect();

        tracing::info!(
            groups = decisions.len(),
            final_documents = documents.len(),
            "Deferred pairs resolved"
        );
        FinalSelection::new(documents, decisions)
    }

    async fn measure_full(
        &self,
        outcome: &SelectionOutcome,
        group: &DeferredGroup,
        metrics: &RunMetrics,
    ) -> Option<u32> {
        let Some(full) = outcome.candidate(&group.full_id) else {
            tracing::warn!(group_id = %group.group_id, full = %group.full_id, "Full member missing from selection");
            return None;
        };
        match tokio::time::timeout(self.probe_timeout, self.probe.measure(full)).await {
            Ok(Ok(length)) => {
                metrics.record_probe(true);
                tracing::debug!(group_id = %group.group_id, full = %full.id, length, "Probed full variant");
                Some(length)
            }
            Ok(Err(error)) => {
                metrics.record_probe(false);
                tracing::warn!(group_id = %group.group_id, full = %full.id, error = %error, "Probe failed; defaulting to summary");
                None
            }
            Err(_) => {
                metrics.record_probe(false);
                tracing::warn!(
                    group_id = %group.group_id,
                    full = %full.id,
                    timeout_ms = self.probe_timeout.as_millis() as u64,
                    "Probe timed out; defaulting to summary"
                );
                None
            }
        }
    }
}

/// Choose a role from the full variant's measured length.
///
/// Deterministic: identical inputs always yield the same role and reason.
pub fn decide(measured: Option<u32>, threshold: u32) -> (DecisionRole, String) {
    match measured {
        Some(length) if length <= threshold => (
            DecisionRole::Full,
            format!("full_page_count={length} <= {threshold}"),
        ),
        Some(length) => (
            DecisionRole::Summary,
            format!("full_page_count={length} > {threshold}"),
        ),
        None => (DecisionRole::Summary, "default_to_summary".to_string()),
    }
}

fn decide_group(group: &DeferredGroup, measured: Option<u32>, threshold: u32) -> DeferredDecision {
    let (chosen_role, reason) = decide(measured, threshold);
    DeferredDecision {
        group_id: group.group_id.clone(),
        rule_applied: RESOLUTION_RULE.to_string(),
        chosen_role,
        chosen_document_id: group.member(chosen_role).to_string(),
        rejected_document_id: group.member(chosen_role.complement()).to_string(),
        measured_length: measured,
        threshold,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::types::{Category, ScoreComponents, SelectionResult};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeProbe {
        pages: HashMap<String, u32>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StructuralProbe for FakeProbe {
        async fn measure(&self, candidate: &CandidateDocument) -> Result<u32, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pages
                .get(&candidate.id)
                .copied()
                .ok_or_else(|| ExtractError::PageCountMissing(candidate.id.clone()))
        }
    }

    fn candidate(id: &str, index: usize) -> CandidateDocument {
        CandidateDocument {
            id: id.into(),
            discovery_index: index,
            url: format!("https://e.go.jp/{id}.pdf"),
            display_text: id.into(),
            filename: format!("{id}.pdf"),
            inferred_category: Category::Material,
            priority_score: 5,
            material_id: None,
            score_components: ScoreComponents::default(),
            adjustments: Vec::new(),
        }
    }

    fn outcome() -> SelectionOutcome {
        SelectionOutcome {
            results: vec![
                SelectionResult::selected(candidate("a", 0)),
                SelectionResult::pending(candidate("sum", 1), "deferred-01", DecisionRole::Summary),
                SelectionResult::pending(candidate("full", 2), "deferred-01", DecisionRole::Full),
                SelectionResult::unselected(candidate("z", 3)),
            ],
            deferred_groups: vec![DeferredGroup {
                group_id: "deferred-01".into(),
                summary_id: "sum".into(),
                full_id: "full".into(),
            }],
        }
    }

    fn resolver(pages: &[(&str, u32)]) -> (DeferredResolver, Arc<FakeProbe>) {
        let probe = Arc::new(FakeProbe {
            pages: pages.iter().map(|(id, n)| (id.to_string(), *n)).collect(),
            calls: AtomicUsize::new(0),
        });
        (DeferredResolver::new(probe.clone()), probe)
    }

    #[tokio::test]
    async fn short_full_variant_wins() {
        let (resolver, probe) = resolver(&[("full", 15)]);
        let selection = resolver.resolve(&outcome(), &RunMetrics::new()).await;
        assert_eq!(selection.document_ids(), vec!["a", "full"]);
        let decision = &selection.decisions()[0];
        assert_eq!(decision.chosen_role, DecisionRole::Full);
        assert_eq!(decision.rejected_document_id, "sum");
        assert_eq!(decision.measured_length, Some(15));
        assert_eq!(decision.rule_applied, RESOLUTION_RULE);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn long_full_variant_loses() {
        let (resolver, _) = resolver(&[("full", 45)]);
        let selection = resolver.resolve(&outcome(), &RunMetrics::new()).await;
        assert_eq!(selection.document_ids(), vec!["a", "sum"]);
        assert_eq!(selection.decisions()[0].reason, "full_page_count=45 > 20");
    }

    #[tokio::test]
    async fn probe_failure_defaults_to_summary() {
        let (resolver, _) = resolver(&[]);
        let metrics = RunMetrics::new();
        let selection = resolver.resolve(&outcome(), &metrics).await;
        assert_eq!(selection.decisions()[0].chosen_role, DecisionRole::Summary);
        assert_eq!(selection.decisions()[0].measured_length, None);
        assert_eq!(metrics.snapshot().probes_failed, 1);
    }

    struct StalledMeasure;

    #[async_trait]
    impl StructuralProbe for StalledMeasure {
        async fn measure(&self, _candidate: &CandidateDocument) -> Result<u32, ExtractError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(1)
        }
    }

    #[tokio::test]
    async fn stalled_measurement_times_out_to_summary() {
        let resolver =
            DeferredResolver::new(Arc::new(StalledMeasure)).with_probe_timeout(Duration::from_millis(50));
        let metrics = RunMetrics::new();
        let selection = resolver.resolve(&outcome(), &metrics).await;
        let decision = &selection.decisions()[0];
        assert_eq!(decision.chosen_document_id, "sum");
        assert_eq!(decision.reason, "default_to_summary");
        assert_eq!(selection.document_ids(), vec!["a", "sum"]);
        assert_eq!(metrics.snapshot().probes_failed, 1);
    }

    #[test]
    fn boundary_and_idempotence() {
        assert_eq!(decide(Some(20), 20).0, DecisionRole::Full);
        assert_eq!(decide(Some(21), 20).0, DecisionRole::Summary);
        assert_eq!(decide(Some(7), 20), decide(Some(7), 20));
        assert_eq!(decide(None, 20).1, "default_to_summary");
    }
}
