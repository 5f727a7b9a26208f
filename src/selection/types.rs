//! Data types shared by scoring, selection, and deferred resolution.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of document categories recognised on a meeting page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Meeting agenda (議事次第).
    Agenda,
    /// Minutes or summary of proceedings.
    Minutes,
    /// Executive summary or consolidated outline.
    ExecutiveSummary,
    /// Substantive numbered or explanatory material.
    Material,
    /// Reference material.
    Reference,
    /// Member or attendee list.
    Participants,
    /// Seating chart.
    Seating,
    /// Notice about how the meeting is disclosed or observed.
    DisclosureMethod,
    /// Material submitted by an individual member.
    PersonalMaterial,
    /// Anything that matched no rule.
    Other,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 10] = [
        Category::Agenda,
        Category::Minutes,
        Category::ExecutiveSummary,
        Category::Material,
        Category::Reference,
        Category::Participants,
        Category::Seating,
        Category::DisclosureMethod,
        Category::PersonalMaterial,
        Category::Other,
    ];

    /// Stable snake_case name used in artifacts and hints.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Agenda => "agenda",
            Category::Minutes => "minutes",
            Category::ExecutiveSummary => "executive_summary",
            Category::Material => "material",
            Category::Reference => "reference",
            Category::Participants => "participants",
            Category::Seating => "seating",
            Category::DisclosureMethod => "disclosure_method",
            Category::PersonalMaterial => "personal_material",
            Category::Other => "other",
        }
    }

    /// Administrative categories that are never worth summarizing.
    pub fn is_administrative(self) -> bool {
        matches!(
            self,
            Category::Participants | Category::Seating | Category::DisclosureMethod
        )
    }

    /// Categories that carry the meeting's official substance.
    pub fn is_substantive(self) -> bool {
        matches!(self, Category::ExecutiveSummary | Category::Material)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or(())
    }
}

/// Points contributed by each scoring signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponents {
    /// Weight of the inferred category.
    pub base: i32,
    /// Bonus for a well-known primary-material file name.
    pub filename_bonus: i32,
    /// Bonus for being referenced repeatedly in the minutes.
    pub minutes_mention_bonus: i32,
    /// Penalty for administrative or secondary categories.
    pub category_penalty: i32,
}

impl ScoreComponents {
    /// Sum of all components before adjustment rules.
    pub fn total(&self) -> i32 {
        self.base + self.filename_bonus + self.minutes_mention_bonus + self.category_penalty
    }
}

/// One discovered file reference after scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDocument {
    /// Identifier derived from the URL; stable within a run.
    pub id: String,
    /// Zero-based position in the discovered link list.
    pub discovery_index: usize,
    /// Absolute URL of the file.
    pub url: String,
    /// Anchor text shown on the source page.
    pub display_text: String,
    /// File name taken from the link or URL.
    pub filename: String,
    /// Category assigned by the keyword rule table.
    pub inferred_category: Category,
    /// Relevance score; higher is more relevant.
    pub priority_score: i32,
    /// Material identifier such as `資料3-1`, when one could be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_id: Option<String>,
    /// Breakdown of the score before adjustments.
    pub score_components: ScoreComponents,
    /// Names of corpus-level adjustment rules that changed the score.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adjustments: Vec<String>,
}

/// Which half of a summary/full pair a candidate represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRole {
    /// The condensed variant (概要, summary).
    Summary,
    /// The complete variant (本文, report).
    Full,
}

impl DecisionRole {
    /// The other member's role.
    pub fn complement(self) -> Self {
        match self {
            DecisionRole::Summary => DecisionRole::Full,
            DecisionRole::Full => DecisionRole::Summary,
        }
    }
}

impl fmt::Display for DecisionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionRole::Summary => f.write_str("summary"),
            DecisionRole::Full => f.write_str("full"),
        }
    }
}

/// A detected summary/full pair whose final member is decided after probing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredGroup {
    /// Group identifier, e.g. `deferred-01`.
    pub group_id: String,
    /// Candidate id of the summary variant.
    pub summary_id: String,
    /// Candidate id of the full variant.
    pub full_id: String,
}

impl DeferredGroup {
    /// Candidate id holding the given role.
    pub fn member(&self, role: DecisionRole) -> &str {
        match role {
            DecisionRole::Summary => &self.summary_id,
            DecisionRole::Full => &self.full_id,
        }
    }
}

/// A candidate together with its selection state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionResult {
    /// The scored candidate.
    #[serde(flatten)]
    pub candidate: CandidateDocument,
    /// Whether the candidate survived selection.
    pub selected: bool,
    /// Whether the candidate awaits deferred resolution.
    pub decision_pending: bool,
    /// Pair identifier; present only for paired candidates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_group_id: Option<String>,
    /// Role within the pair; present only for paired candidates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_role: Option<DecisionRole>,
}

impl SelectionResult {
    pub(crate) fn unselected(candidate: CandidateDocument) -> Self {
        Self {
            candidate,
            selected: false,
            decision_pending: false,
            decision_group_id: None,
            decision_role: None,
        }
    }

    pub(crate) fn selected(candidate: CandidateDocument) -> Self {
        Self {
            selected: true,
            ..Self::unselected(candidate)
        }
    }

    pub(crate) fn pending(candidate: CandidateDocument, group_id: &str, role: DecisionRole) -> Self {
        Self {
            candidate,
            selected: true,
            decision_pending: true,
            decision_group_id: Some(group_id.to_string()),
            decision_role: Some(role),
        }
    }
}

/// Output of the selection policy: every candidate in discovery order plus detected pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionOutcome {
    /// One entry per scored candidate, in discovery order.
    pub results: Vec<SelectionResult>,
    /// Pending summary/full pairs, in detection order.
    pub deferred_groups: Vec<DeferredGroup>,
}

impl SelectionOutcome {
    /// Selected entries in discovery order.
    pub fn selected(&self) -> impl Iterator<Item = &SelectionResult> {
        self.results.iter().filter(|result| result.selected)
    }

    /// Ids of selected entries in discovery order.
    pub fn selected_ids(&self) -> Vec<String> {
        self.selected()
            .map(|result| result.candidate.id.clone())
            .collect()
    }

    /// Look up a candidate by id.
    pub fn candidate(&self, id: &str) -> Option<&CandidateDocument> {
        self.results
            .iter()
            .map(|result| &result.candidate)
            .find(|candidate| candidate.id == id)
    }
}

/// Record of how one deferred pair was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredDecision {
    /// Pair identifier.
    pub group_id: String,
    /// Human-readable rule name; fixed for every decision.
    pub rule_applied: String,
    /// Role of the surviving member.
    pub chosen_role: DecisionRole,
    /// Candidate id of the surviving member.
    pub chosen_document_id: String,
    /// Candidate id of the dropped member.
    pub rejected_document_id: String,
    /// Measured length of the full variant; `None` when the probe failed.
    pub measured_length: Option<u32>,
    /// Length at or below which the full variant wins.
    pub threshold: u32,
    /// Short explanation, e.g. `full_page_count=15 <= 20`.
    pub reason: String,
}

/// Documents that survived selection and deferred resolution, in selection order.
///
/// Only [`crate::selection::DeferredResolver`] constructs this type, so holding one proves that
/// every pending pair has been resolved and losers removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalSelection {
    documents: Vec<CandidateDocument>,
    decisions: Vec<DeferredDecision>,
}

impl FinalSelection {
    pub(crate) fn new(documents: Vec<CandidateDocument>, decisions: Vec<DeferredDecision>) -> Self {
        Self {
            documents,
            decisions,
        }
    }

    /// Surviving documents in deterministic selection order.
    pub fn documents(&self) -> &[CandidateDocument] {
        &self.documents
    }

    /// One decision per resolved pair.
    pub fn decisions(&self) -> &[DeferredDecision] {
        &self.decisions
    }

    /// Ids of the surviving documents in selection order.
    pub fn document_ids(&self) -> Vec<String> {
        self.documents.iter().map(|doc| doc.id.clone()).collect()
    }

    /// Whether nothing survived selection.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Split into owned parts.
    pub fn into_parts(self) -> (Vec<CandidateDocument>, Vec<DeferredDecision>) {
        (self.documents, self.decisions)
    }
}
