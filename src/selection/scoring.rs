//! Category inference and priority scoring for discovered links.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};

use super::keywords::{ScoringTable, material_id, minutes_mentions};
use super::types::{CandidateDocument, Category, ScoreComponents};
use crate::links::LinkDescriptor;

/// Assigns a category and a priority score to every discovered link.
///
/// Scoring is a pure function of the link list, the minutes text, and the rule table.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    table: ScoringTable,
}

impl ScoringEngine {
    /// Build an engine around a custom rule table.
    pub fn new(table: ScoringTable) -> Self {
        Self { table }
    }

    /// Rule table in use.
    pub fn table(&self) -> &ScoringTable {
        &self.table
    }

    /// Score every link, returning candidates in discovery order.
    ///
    /// Within a fixed category, an extra matching keyword, file-name pattern, or minutes mention
    /// never lowers a score. A title keyword that changes the first matching category rule can.
    pub fn score(&self, links: &[LinkDescriptor], minutes_text: &str) -> Vec<CandidateDocument> {
        let mentions = minutes_mentions(minutes_text);
        let categories: Vec<Category> = links.iter().map(|link| self.categorize(link)).collect();
        let has_executive_summary = categories.contains(&Category::ExecutiveSummary);

        let mut seen_ids = HashSet::new();
        let mut candidates: Vec<CandidateDocument> = links
            .iter()
            .zip(categories)
            .enumerate()
            .map(|(index, (link, category))| {
                let mut id = document_id(&link.url);
                if !seen_ids.insert(id.clone()) {
                    id = format!("{id}-{index}");
                    seen_ids.insert(id.clone());
                }
                self.score_one(
                    index,
                    id,
                    link,
                    category,
                    &mentions,
                    has_executive_summary,
                )
            })
            .collect();

        apply_adjustment_rules(&mut candidates);
        for candidate in &candidates {
            tracing::debug!(
                id = %candidate.id,
                category = %candidate.inferred_category,
                score = candidate.priority_score,
                adjustments = ?candidate.adjustments,
                "Scored candidate"
            );
        }
        candidates
    }

    fn categorize(&self, link: &LinkDescriptor) -> Category {
        let hinted = link
            .category_hint
            .as_deref()
            .and_then(|hint| hint.parse::<Category>().ok())
            .filter(|category| *category != Category::Other);
        hinted.unwrap_or_else(|| self.table.classify(&link.text, &link.filename))
    }

    fn score_one(
        &self,
        index: usize,
        id: String,
        link: &LinkDescriptor,
        category: Category,
        mentions: &BTreeMap<String, usize>,
        has_executive_summary: bool,
    ) -> CandidateDocument {
        let material_id = material_id(&link.text, &link.filename);
        let mention_count = material_id
            .as_ref()
            .and_then(|id| mentions.get(id))
            .copied()
            .unwrap_or(0);
        let components = ScoreComponents {
            base: self.table.base_weight(category),
            filename_bonus: self.table.filename_bonus_for(&link.filename),
            minutes_mention_bonus: self.table.mention_bonus_for(mention_count),
            category_penalty: self.category_penalty(category, has_executive_summary),
        };

        CandidateDocument {
            id,
            discovery_index: index,
            url: link.url.clone(),
            display_text: link.text.clone(),
            filename: link.filename.clone(),
            inferred_category: category,
            priority_score: components.total().max(0),
            material_id,
            score_components: components,
            adjustments: Vec::new(),
        }
    }

    fn category_penalty(&self, category: Category, has_executive_summary: bool) -> i32 {
        if category.is_administrative() {
            return self.table.administrative_penalty;
        }
        match category {
            Category::Reference if has_executive_summary => {
                self.table.reference_penalty_with_summary
            }
            Category::PersonalMaterial if has_executive_summary => {
                self.table.personal_penalty_with_summary
            }
            _ => 0,
        }
    }
}

/// Corpus-level caps that depend on which other documents exist in the run.
fn apply_adjustment_rules(candidates: &mut [CandidateDocument]) {
    let has_substantial = candidates
        .iter()
        .any(|c| c.inferred_category.is_substantive() && c.priority_score >= 4);
    let has_official = candidates
        .iter()
        .any(|c| c.inferred_category.is_substantive());

    for candidate in candidates.iter_mut() {
        let before = candidate.priority_score;
        match candidate.inferred_category {
            Category::Agenda if has_substantial && before >= 5 => {
                candidate.priority_score = 4;
                candidate.adjustments.push("agenda_cap_to_4".into());
            }
            Category::Reference if has_official && before > 4 => {
                candidate.priority_score = 4;
                candidate.adjustments.push("reference_cap_to_4".into());
            }
            Category::PersonalMaterial if has_official => {
                candidate.priority_score = before.min(2);
                if candidate.priority_score != before {
                    candidate.adjustments.push("personal_cap_with_official".into());
                }
            }
            Category::PersonalMaterial => {
                candidate.priority_score = before.max(3);
                if candidate.priority_score != before {
                    candidate
                        .adjustments
                        .push("personal_raise_without_official".into());
                }
            }
            _ => {}
        }
        candidate.priority_score = candidate.priority_score.max(0);
    }
}

/// Stable identifier for a document URL: the first 12 hex digits of its SHA-256.
pub fn document_id(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..12].to_string()
}
