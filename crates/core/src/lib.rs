pub mod audit;
pub mod error;
pub mod match_record;
pub mod money;
pub mod transaction;

pub use audit::{
    AuditLogEntry, RejectedSuggestion, ACTION_SUGGESTION_REJECTED, ENTITY_MATCH_SUGGESTION,
};
pub use error::ReconcileError;
pub use match_record::{MatchId, MatchRecord, MatchType, MANUAL_MATCH_REASONING};
pub use money::Money;
pub use transaction::{
    CategoryId, Transaction, TransactionId, TransactionSource, TransactionStatus, UserId,
    WorkspaceId,
};
