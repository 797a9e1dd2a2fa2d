//! Heuristic threat/privacy classification: file records, ordered rule
//! tables, first-match-wins cascades, and working-set summaries.

pub mod classifier;
pub mod record;
pub mod rules;
pub mod summary;
