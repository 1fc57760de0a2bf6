use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqliteConnection};
use std::path::Path;

use concord_core::{
    AuditLogEntry, CategoryId, MatchId, MatchRecord, MatchType, Money, Transaction, TransactionId,
    TransactionSource, TransactionStatus, UserId, WorkspaceId,
};

pub type DbPool = Pool<Sqlite>;

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    // A single connection: SQLite is single-writer anyway, and it keeps
    // conflicting same-pair operations serialized at the pool.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workspace_id INTEGER NOT NULL,
            source TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'unmatched',
            category_id INTEGER,
            external_id TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    // The UNIQUE columns back the one-match-per-transaction invariant at
    // the schema level; the lifecycle layer checks status first.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workspace_id INTEGER NOT NULL,
            bank_transaction_id INTEGER NOT NULL UNIQUE,
            ledger_transaction_id INTEGER NOT NULL UNIQUE,
            match_type TEXT NOT NULL,
            confidence REAL NOT NULL,
            reasoning TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (bank_transaction_id) REFERENCES transactions(id),
            FOREIGN KEY (ledger_transaction_id) REFERENCES transactions(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workspace_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            action TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            old_value TEXT,
            new_value TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Ingestion-side insert. Feed ingestion itself lives outside this
/// subsystem; embedding apps and tests use this to seed the pools.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub workspace_id: WorkspaceId,
    pub source: TransactionSource,
    pub amount: Money,
    pub date: NaiveDate,
    pub description: String,
    pub category_id: Option<CategoryId>,
    pub external_id: Option<String>,
}

pub async fn insert_transaction(
    pool: &DbPool,
    tx: &NewTransaction,
) -> Result<TransactionId, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO transactions (workspace_id, source, amount_cents, date, description, category_id, external_id) VALUES (?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(tx.workspace_id.0)
    .bind(tx.source.as_str())
    .bind(tx.amount.to_cents())
    .bind(tx.date)
    .bind(&tx.description)
    .bind(tx.category_id.map(|c| c.0))
    .bind(tx.external_id.as_deref())
    .execute(pool)
    .await?;

    Ok(TransactionId(result.last_insert_rowid()))
}

type TransactionRow = (
    i64,
    i64,
    String,
    i64,
    NaiveDate,
    String,
    String,
    Option<i64>,
    Option<String>,
);

const TRANSACTION_COLUMNS: &str =
    "id, workspace_id, source, amount_cents, date, description, status, category_id, external_id";

fn transaction_from_row(r: TransactionRow) -> Transaction {
    Transaction {
        id: TransactionId(r.0),
        workspace_id: WorkspaceId(r.1),
        source: parse_source(&r.2),
        amount: Money::from_cents(r.3),
        date: r.4,
        description: r.5,
        status: parse_status(&r.6),
        category_id: r.7.map(CategoryId),
        external_id: r.8,
    }
}

fn parse_source(s: &str) -> TransactionSource {
    match s {
        "ledger" => TransactionSource::Ledger,
        _ => TransactionSource::Bank,
    }
}

fn parse_status(s: &str) -> TransactionStatus {
    match s {
        "matched" => TransactionStatus::Matched,
        _ => TransactionStatus::Unmatched,
    }
}

fn parse_match_type(s: &str) -> MatchType {
    match s {
        "exact" => MatchType::Exact,
        "timing" => MatchType::Timing,
        "fee_adjusted" => MatchType::FeeAdjusted,
        "manual" => MatchType::Manual,
        _ => MatchType::Partial,
    }
}

pub async fn get_transaction(
    pool: &DbPool,
    workspace: WorkspaceId,
    id: TransactionId,
) -> Result<Option<Transaction>, sqlx::Error> {
    let row = sqlx::query_as::<_, TransactionRow>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ? AND workspace_id = ?"
    ))
    .bind(id.0)
    .bind(workspace.0)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(transaction_from_row))
}

/// Same lookup against an open transaction, for re-validation right
/// before a write.
pub async fn get_transaction_for_update(
    conn: &mut SqliteConnection,
    workspace: WorkspaceId,
    id: TransactionId,
) -> Result<Option<Transaction>, sqlx::Error> {
    let row = sqlx::query_as::<_, TransactionRow>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ? AND workspace_id = ?"
    ))
    .bind(id.0)
    .bind(workspace.0)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(transaction_from_row))
}

pub async fn get_transactions_by_source(
    pool: &DbPool,
    workspace: WorkspaceId,
    source: TransactionSource,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TransactionRow>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE workspace_id = ? AND source = ? ORDER BY id"
    ))
    .bind(workspace.0)
    .bind(source.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(transaction_from_row).collect())
}

pub async fn get_unmatched_by_source(
    pool: &DbPool,
    workspace: WorkspaceId,
    source: TransactionSource,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TransactionRow>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE workspace_id = ? AND source = ? AND status = 'unmatched' ORDER BY id"
    ))
    .bind(workspace.0)
    .bind(source.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(transaction_from_row).collect())
}

pub async fn set_transaction_status(
    conn: &mut SqliteConnection,
    workspace: WorkspaceId,
    id: TransactionId,
    status: TransactionStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE transactions SET status = ? WHERE id = ? AND workspace_id = ?")
        .bind(status.as_str())
        .bind(id.0)
        .bind(workspace.0)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_match(
    conn: &mut SqliteConnection,
    workspace: WorkspaceId,
    bank_id: TransactionId,
    ledger_id: TransactionId,
    match_type: MatchType,
    confidence: f32,
    reasoning: &str,
) -> Result<MatchId, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO matches (workspace_id, bank_transaction_id, ledger_transaction_id, match_type, confidence, reasoning) VALUES (?, ?, ?, ?, ?, ?)"
    )
    .bind(workspace.0)
    .bind(bank_id.0)
    .bind(ledger_id.0)
    .bind(match_type.as_str())
    .bind(confidence as f64)
    .bind(reasoning)
    .execute(&mut *conn)
    .await?;

    Ok(MatchId(result.last_insert_rowid()))
}

type MatchRow = (i64, i64, i64, i64, String, f64, String);

const MATCH_COLUMNS: &str =
    "id, workspace_id, bank_transaction_id, ledger_transaction_id, match_type, confidence, reasoning";

fn match_from_row(r: MatchRow) -> MatchRecord {
    MatchRecord {
        id: MatchId(r.0),
        workspace_id: WorkspaceId(r.1),
        bank_transaction_id: TransactionId(r.2),
        ledger_transaction_id: TransactionId(r.3),
        match_type: parse_match_type(&r.4),
        confidence: r.5 as f32,
        reasoning: r.6,
    }
}

pub async fn get_match_for_pair(
    pool: &DbPool,
    workspace: WorkspaceId,
    bank_id: TransactionId,
    ledger_id: TransactionId,
) -> Result<Option<MatchRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, MatchRow>(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE workspace_id = ? AND bank_transaction_id = ? AND ledger_transaction_id = ?"
    ))
    .bind(workspace.0)
    .bind(bank_id.0)
    .bind(ledger_id.0)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(match_from_row))
}

pub async fn get_matches(
    pool: &DbPool,
    workspace: WorkspaceId,
) -> Result<Vec<MatchRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, MatchRow>(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE workspace_id = ? ORDER BY id"
    ))
    .bind(workspace.0)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(match_from_row).collect())
}

pub async fn insert_audit_entry(
    conn: &mut SqliteConnection,
    entry: &AuditLogEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_log (workspace_id, user_id, action, entity_type, entity_id, old_value, new_value) VALUES (?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(entry.workspace_id.0)
    .bind(entry.user_id.0)
    .bind(&entry.action)
    .bind(&entry.entity_type)
    .bind(&entry.entity_id)
    .bind(entry.old_value.as_deref())
    .bind(entry.new_value.as_deref())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn get_audit_entries(
    pool: &DbPool,
    workspace: WorkspaceId,
) -> Result<Vec<AuditLogEntry>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, i64, String, String, String, Option<String>, Option<String>)>(
        "SELECT workspace_id, user_id, action, entity_type, entity_id, old_value, new_value FROM audit_log WHERE workspace_id = ? ORDER BY id"
    )
    .bind(workspace.0)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| AuditLogEntry {
            workspace_id: WorkspaceId(r.0),
            user_id: UserId(r.1),
            action: r.2,
            entity_type: r.3,
            entity_id: r.4,
            old_value: r.5,
            new_value: r.6,
        })
        .collect())
}
