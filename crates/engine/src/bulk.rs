use std::collections::HashSet;

use serde::Serialize;

use concord_core::{MatchType, TransactionId};

use crate::evaluate::{MatchEvaluator, MatchableTransaction};

/// Bulk assignment only proposes pairs strictly above this confidence.
pub const BULK_CONFIDENCE_FLOOR: f32 = 0.90;

#[derive(Debug, Clone, Serialize)]
pub struct BulkMatch {
    pub bank_id: TransactionId,
    pub candidate_id: TransactionId,
    pub confidence: f32,
    pub match_type: MatchType,
    pub reasoning: String,
}

/// Greedy one-to-one assignment over the full unmatched pools. Bank
/// transactions are visited newest-first (stable order for equal dates);
/// each candidate is consumed at most once per invocation. Scoring uses
/// the conservative evaluator, so only exact/timing pairs ever surface.
///
/// This is not a maximum-weight matching; the strict floor keeps the
/// proposals near-certain, where assignment conflicts are rare anyway.
pub fn bulk_suggest(
    evaluator: &MatchEvaluator,
    bank_pool: &[MatchableTransaction],
    candidates: &[MatchableTransaction],
) -> Vec<BulkMatch> {
    let mut ordered: Vec<&MatchableTransaction> = bank_pool.iter().collect();
    ordered.sort_by(|a, b| b.date.cmp(&a.date));

    let mut used: HashSet<TransactionId> = HashSet::new();
    let mut assignments = Vec::new();

    for bank in ordered {
        if bank.matched {
            continue;
        }

        let mut best: Option<BulkMatch> = None;
        for candidate in candidates {
            if candidate.matched || used.contains(&candidate.id) {
                continue;
            }
            let evaluation = evaluator.evaluate_conservative(bank, candidate);
            if evaluation.confidence <= BULK_CONFIDENCE_FLOOR {
                continue;
            }
            // Strictly-greater keeps the earliest candidate on ties.
            if best
                .as_ref()
                .map_or(true, |b| evaluation.confidence > b.confidence)
            {
                best = Some(BulkMatch {
                    bank_id: bank.id,
                    candidate_id: candidate.id,
                    confidence: evaluation.confidence,
                    match_type: evaluation.match_type,
                    reasoning: evaluation.reasoning,
                });
            }
        }

        if let Some(found) = best {
            used.insert(found.candidate_id);
            assignments.push(found);
        }
    }

    assignments
}
