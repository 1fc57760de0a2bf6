use serde::{Deserialize, Serialize};
use std::fmt;

use super::transaction::{TransactionId, WorkspaceId};

/// Reasoning text recorded on every manual match.
pub const MANUAL_MATCH_REASONING: &str = "Manually matched by user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchId(pub i64);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classification produced by the pairwise evaluator, plus `Manual` for
/// user-asserted matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Timing,
    FeeAdjusted,
    Partial,
    Manual,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Timing => "timing",
            MatchType::FeeAdjusted => "fee_adjusted",
            MatchType::Partial => "partial",
            MatchType::Manual => "manual",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A confirmed linkage between one bank and one ledger transaction.
/// Created once, never updated, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub workspace_id: WorkspaceId,
    pub bank_transaction_id: TransactionId,
    pub ledger_transaction_id: TransactionId,
    pub match_type: MatchType,
    pub confidence: f32,
    pub reasoning: String,
}
