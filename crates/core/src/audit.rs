use serde::{Deserialize, Serialize};

use super::match_record::MatchType;
use super::money::Money;
use super::transaction::{TransactionId, UserId, WorkspaceId};

pub const ACTION_SUGGESTION_REJECTED: &str = "match_suggestion_rejected";
pub const ENTITY_MATCH_SUGGESTION: &str = "MatchSuggestion";

/// Append-only trace of a decision that produced no match record.
/// `old_value` holds the JSON snapshot of what was rejected; `new_value`
/// stays empty for rejections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub workspace_id: WorkspaceId,
    pub user_id: UserId,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl AuditLogEntry {
    /// Entry for a rejected match suggestion, keyed by the composite
    /// `<bankId>:<ledgerId>` pair.
    pub fn suggestion_rejected(
        workspace_id: WorkspaceId,
        user_id: UserId,
        snapshot: &RejectedSuggestion,
    ) -> Result<Self, serde_json::Error> {
        Ok(AuditLogEntry {
            workspace_id,
            user_id,
            action: ACTION_SUGGESTION_REJECTED.to_string(),
            entity_type: ENTITY_MATCH_SUGGESTION.to_string(),
            entity_id: format!(
                "{}:{}",
                snapshot.bank_transaction_id, snapshot.ledger_transaction_id
            ),
            old_value: Some(serde_json::to_string(snapshot)?),
            new_value: None,
        })
    }
}

/// Full snapshot of a suggestion at the moment it was rejected, so the
/// decision stays reconstructable after the underlying pool changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedSuggestion {
    pub bank_transaction_id: TransactionId,
    pub ledger_transaction_id: TransactionId,
    pub match_type: MatchType,
    pub confidence: f32,
    pub reasoning: String,
    pub bank_description: String,
    pub ledger_description: String,
    pub bank_amount: Money,
    pub ledger_amount: Money,
}
