use serde::Serialize;

use concord_core::{MatchType, TransactionId, TransactionSource};

use crate::evaluate::{MatchEvaluator, MatchableTransaction};

/// Candidates scoring below this floor are not worth showing.
pub const MIN_SUGGESTION_CONFIDENCE: f32 = 0.5;

#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub candidate_id: TransactionId,
    pub confidence: f32,
    pub match_type: MatchType,
    pub reasoning: String,
}

/// Ranks every unmatched candidate against one selected transaction,
/// highest confidence first. Ties keep pool order (stable sort). Returns
/// an empty list, never an error, when nothing clears the floor.
pub fn rank_suggestions(
    evaluator: &MatchEvaluator,
    selected: &MatchableTransaction,
    candidates: &[MatchableTransaction],
) -> Vec<Suggestion> {
    let mut suggestions: Vec<Suggestion> = candidates
        .iter()
        .filter(|candidate| !candidate.matched)
        .map(|candidate| {
            // The evaluator is oriented bank-vs-ledger; flip when the
            // selected transaction sits on the ledger side.
            let evaluation = match selected.source {
                TransactionSource::Bank => evaluator.evaluate(selected, candidate),
                TransactionSource::Ledger => evaluator.evaluate(candidate, selected),
            };
            Suggestion {
                candidate_id: candidate.id,
                confidence: evaluation.confidence,
                match_type: evaluation.match_type,
                reasoning: evaluation.reasoning,
            }
        })
        .filter(|s| s.confidence >= MIN_SUGGESTION_CONFIDENCE)
        .collect();

    suggestions.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    suggestions
}
