use thiserror::Error;

use super::transaction::{TransactionId, WorkspaceId};

/// Failures surfaced by the match lifecycle operations. The scoring
/// components never error; a non-match is a below-floor confidence.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReconcileError {
    #[error("Transaction {0} not found in workspace {1}")]
    NotFound(TransactionId, WorkspaceId),
    #[error("Transaction {0} is already matched")]
    AlreadyMatched(TransactionId),
    #[error("Manual match requires one bank and one ledger transaction")]
    InvalidSource,
    #[error("No authenticated user for this action")]
    Unauthenticated,
    /// Underlying write failed. The message stays generic; the cause is
    /// logged where the failure happened.
    #[error("Failed to save match changes, please try again")]
    Persistence,
}
