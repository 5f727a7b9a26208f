//! Candidate scoring, selection, and deferred pair resolution.

pub mod keywords;
pub mod pairing;
pub mod policy;
pub mod resolver;
pub mod scoring;
pub mod types;

pub use keywords::ScoringTable;
pub use policy::SelectionPolicy;
pub use resolver::{DeferredResolver, StructuralProbe};
pub use scoring::ScoringEngine;
pub use types::{
    CandidateDocument, Category, DecisionRole, DeferredDecision, DeferredGroup, FinalSelection,
    SelectionOutcome, SelectionResult,
};
