use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub i64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceId(pub i64);

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryId(pub i64);

/// Which feed a transaction arrived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSource {
    Bank,
    Ledger,
}

impl TransactionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionSource::Bank => "bank",
            TransactionSource::Ledger => "ledger",
        }
    }

    /// The side this source is reconciled against.
    pub fn opposite(self) -> Self {
        match self {
            TransactionSource::Bank => TransactionSource::Ledger,
            TransactionSource::Ledger => TransactionSource::Bank,
        }
    }
}

impl fmt::Display for TransactionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Unmatched,
    Matched,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Unmatched => "unmatched",
            TransactionStatus::Matched => "matched",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A financial record from one of the two feeds. Immutable apart from
/// `status`, which flips to `Matched` exactly when a match references it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub workspace_id: WorkspaceId,
    pub source: TransactionSource,
    pub amount: Money,
    pub date: NaiveDate,
    pub description: String,
    pub status: TransactionStatus,
    pub category_id: Option<CategoryId>,
    pub external_id: Option<String>,
}

impl Transaction {
    pub fn is_matched(&self) -> bool {
        self.status == TransactionStatus::Matched
    }
}
