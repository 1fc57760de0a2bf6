use sqlx::SqliteConnection;
use tokio::sync::mpsc;

use concord_core::{
    AuditLogEntry, MatchId, MatchType, ReconcileError, RejectedSuggestion, TransactionId,
    TransactionSource, TransactionStatus, UserId, WorkspaceId, MANUAL_MATCH_REASONING,
};
use concord_engine::{
    bulk_suggest, rank_suggestions, BulkMatch, MatchEvaluator, MatchableTransaction, Suggestion,
};
use concord_storage as storage;
use concord_storage::DbPool;

/// Signal that reconciliation state changed in a workspace, so dependent
/// views can refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconEvent {
    MatchesChanged(WorkspaceId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BulkApproveOutcome {
    pub approved: u32,
    pub failed: u32,
}

/// The only side-effecting layer of the reconciliation subsystem. Every
/// single-pair operation is one database transaction: either the match
/// row and both status flips land, or none do. Bulk approval relaxes this
/// to per-item transactions with a best-effort outer loop.
pub struct Reconciler {
    db: DbPool,
    evaluator: MatchEvaluator,
    events: Option<mpsc::Sender<ReconEvent>>,
}

impl Reconciler {
    pub fn new(db: DbPool) -> Self {
        Reconciler {
            db,
            evaluator: MatchEvaluator::default(),
            events: None,
        }
    }

    /// Swap in an evaluator with a customized vendor-alias table.
    pub fn with_evaluator(mut self, evaluator: MatchEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Register a change-notification channel. Sends are best-effort and
    /// never block a lifecycle operation.
    pub fn with_events(mut self, events: mpsc::Sender<ReconEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Ranked match suggestions for one selected transaction against the
    /// full pool on the opposite side.
    pub async fn suggestions_for(
        &self,
        workspace: WorkspaceId,
        transaction_id: TransactionId,
    ) -> Result<Vec<Suggestion>, ReconcileError> {
        let selected = storage::get_transaction(&self.db, workspace, transaction_id)
            .await
            .map_err(persistence)?
            .ok_or(ReconcileError::NotFound(transaction_id, workspace))?;

        let pool =
            storage::get_transactions_by_source(&self.db, workspace, selected.source.opposite())
                .await
                .map_err(persistence)?;

        let selected = MatchableTransaction::from(&selected);
        let candidates: Vec<MatchableTransaction> =
            pool.iter().map(MatchableTransaction::from).collect();
        Ok(rank_suggestions(&self.evaluator, &selected, &candidates))
    }

    /// Greedy high-confidence assignment across the whole unmatched set.
    pub async fn bulk_suggestions(
        &self,
        workspace: WorkspaceId,
    ) -> Result<Vec<BulkMatch>, ReconcileError> {
        let banks =
            storage::get_unmatched_by_source(&self.db, workspace, TransactionSource::Bank)
                .await
                .map_err(persistence)?;
        let ledgers =
            storage::get_unmatched_by_source(&self.db, workspace, TransactionSource::Ledger)
                .await
                .map_err(persistence)?;

        let banks: Vec<MatchableTransaction> =
            banks.iter().map(MatchableTransaction::from).collect();
        let ledgers: Vec<MatchableTransaction> =
            ledgers.iter().map(MatchableTransaction::from).collect();
        Ok(bulk_suggest(&self.evaluator, &banks, &ledgers))
    }

    /// Confirms a suggested match. Atomic: the match row and both status
    /// flips commit together or not at all.
    pub async fn approve_match(
        &self,
        workspace: WorkspaceId,
        bank_id: TransactionId,
        ledger_id: TransactionId,
        match_type: MatchType,
        confidence: f32,
        reasoning: &str,
    ) -> Result<MatchId, ReconcileError> {
        let mut tx = self.db.begin().await.map_err(persistence)?;
        let match_id = apply_match(
            &mut tx, workspace, bank_id, ledger_id, match_type, confidence, reasoning, false,
        )
        .await?;
        tx.commit().await.map_err(persistence)?;

        tracing::info!(%workspace, %bank_id, %ledger_id, %match_type, "match approved");
        self.notify(workspace);
        Ok(match_id)
    }

    /// User-asserted match outside the heuristics. Validates that the ids
    /// sit on the right sides before writing.
    pub async fn create_manual_match(
        &self,
        workspace: WorkspaceId,
        bank_id: TransactionId,
        ledger_id: TransactionId,
    ) -> Result<MatchId, ReconcileError> {
        let mut tx = self.db.begin().await.map_err(persistence)?;
        let match_id = apply_match(
            &mut tx,
            workspace,
            bank_id,
            ledger_id,
            MatchType::Manual,
            1.0,
            MANUAL_MATCH_REASONING,
            true,
        )
        .await?;
        tx.commit().await.map_err(persistence)?;

        tracing::info!(%workspace, %bank_id, %ledger_id, "manual match created");
        self.notify(workspace);
        Ok(match_id)
    }

    /// Records that a user turned a suggestion down. Writes one audit
    /// entry with a full snapshot; transaction statuses are never touched,
    /// so rejecting an already-matched pair is harmless.
    #[allow(clippy::too_many_arguments)]
    pub async fn reject_suggestion(
        &self,
        actor: Option<UserId>,
        workspace: WorkspaceId,
        bank_id: TransactionId,
        ledger_id: TransactionId,
        match_type: MatchType,
        confidence: f32,
        reasoning: &str,
    ) -> Result<(), ReconcileError> {
        let user = actor.ok_or(ReconcileError::Unauthenticated)?;

        let bank = storage::get_transaction(&self.db, workspace, bank_id)
            .await
            .map_err(persistence)?
            .ok_or(ReconcileError::NotFound(bank_id, workspace))?;
        let ledger = storage::get_transaction(&self.db, workspace, ledger_id)
            .await
            .map_err(persistence)?
            .ok_or(ReconcileError::NotFound(ledger_id, workspace))?;

        let snapshot = RejectedSuggestion {
            bank_transaction_id: bank_id,
            ledger_transaction_id: ledger_id,
            match_type,
            confidence,
            reasoning: reasoning.to_string(),
            bank_description: bank.description,
            ledger_description: ledger.description,
            bank_amount: bank.amount,
            ledger_amount: ledger.amount,
        };
        let entry =
            AuditLogEntry::suggestion_rejected(workspace, user, &snapshot).map_err(|error| {
                tracing::error!(%error, "failed to serialize rejection snapshot");
                ReconcileError::Persistence
            })?;

        let mut conn = self.db.acquire().await.map_err(persistence)?;
        storage::insert_audit_entry(&mut conn, &entry)
            .await
            .map_err(persistence)?;

        tracing::info!(%workspace, %bank_id, %ledger_id, "match suggestion rejected");
        Ok(())
    }

    /// Applies a batch of bulk-suggested matches. Each item re-validates
    /// and commits on its own; a stale or conflicting item is counted and
    /// skipped, never aborting the rest of the batch.
    pub async fn bulk_approve(
        &self,
        workspace: WorkspaceId,
        candidates: &[BulkMatch],
    ) -> Result<BulkApproveOutcome, ReconcileError> {
        let mut outcome = BulkApproveOutcome::default();

        for candidate in candidates {
            match self.approve_one(workspace, candidate).await {
                Ok(_) => outcome.approved += 1,
                Err(error) => {
                    tracing::warn!(
                        %workspace,
                        bank_id = %candidate.bank_id,
                        candidate_id = %candidate.candidate_id,
                        %error,
                        "bulk approval item skipped"
                    );
                    outcome.failed += 1;
                }
            }
        }

        if outcome.approved > 0 {
            self.notify(workspace);
        }
        tracing::info!(
            %workspace,
            approved = outcome.approved,
            failed = outcome.failed,
            "bulk approval finished"
        );
        Ok(outcome)
    }

    async fn approve_one(
        &self,
        workspace: WorkspaceId,
        candidate: &BulkMatch,
    ) -> Result<MatchId, ReconcileError> {
        let mut tx = self.db.begin().await.map_err(persistence)?;
        let match_id = apply_match(
            &mut tx,
            workspace,
            candidate.bank_id,
            candidate.candidate_id,
            candidate.match_type,
            candidate.confidence,
            &candidate.reasoning,
            false,
        )
        .await?;
        tx.commit().await.map_err(persistence)?;
        Ok(match_id)
    }

    fn notify(&self, workspace: WorkspaceId) {
        if let Some(events) = &self.events {
            // Best effort; a saturated channel drops the signal rather
            // than block a write path.
            let _ = events.try_send(ReconEvent::MatchesChanged(workspace));
        }
    }
}

/// Existence and status checks plus all three writes, against one open
/// database transaction. `require_sources` is set for manual matches.
#[allow(clippy::too_many_arguments)]
async fn apply_match(
    conn: &mut SqliteConnection,
    workspace: WorkspaceId,
    bank_id: TransactionId,
    ledger_id: TransactionId,
    match_type: MatchType,
    confidence: f32,
    reasoning: &str,
    require_sources: bool,
) -> Result<MatchId, ReconcileError> {
    let bank = storage::get_transaction_for_update(conn, workspace, bank_id)
        .await
        .map_err(persistence)?
        .ok_or(ReconcileError::NotFound(bank_id, workspace))?;
    let ledger = storage::get_transaction_for_update(conn, workspace, ledger_id)
        .await
        .map_err(persistence)?
        .ok_or(ReconcileError::NotFound(ledger_id, workspace))?;

    if require_sources
        && (bank.source != TransactionSource::Bank || ledger.source != TransactionSource::Ledger)
    {
        return Err(ReconcileError::InvalidSource);
    }
    if bank.is_matched() {
        return Err(ReconcileError::AlreadyMatched(bank_id));
    }
    if ledger.is_matched() {
        return Err(ReconcileError::AlreadyMatched(ledger_id));
    }

    let match_id = storage::insert_match(
        conn, workspace, bank_id, ledger_id, match_type, confidence, reasoning,
    )
    .await
    .map_err(persistence)?;
    storage::set_transaction_status(conn, workspace, bank_id, TransactionStatus::Matched)
        .await
        .map_err(persistence)?;
    storage::set_transaction_status(conn, workspace, ledger_id, TransactionStatus::Matched)
        .await
        .map_err(persistence)?;

    Ok(match_id)
}

fn persistence(error: sqlx::Error) -> ReconcileError {
    tracing::error!(%error, "reconciliation persistence failure");
    ReconcileError::Persistence
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use concord_core::Money;
    use concord_storage::NewTransaction;

    const WS: WorkspaceId = WorkspaceId(1);

    async fn test_db() -> (tempfile::TempDir, DbPool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = storage::create_db(&dir.path().join("recon.db"))
            .await
            .unwrap();
        (dir, pool)
    }

    async fn seed(
        pool: &DbPool,
        source: TransactionSource,
        date: (i32, u32, u32),
        desc: &str,
        cents: i64,
    ) -> TransactionId {
        storage::insert_transaction(
            pool,
            &NewTransaction {
                workspace_id: WS,
                source,
                amount: Money::from_cents(cents),
                date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
                description: desc.to_string(),
                category_id: None,
                external_id: None,
            },
        )
        .await
        .unwrap()
    }

    async fn status_of(pool: &DbPool, id: TransactionId) -> TransactionStatus {
        storage::get_transaction(pool, WS, id)
            .await
            .unwrap()
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn approve_creates_match_and_flips_both_statuses() {
        let (_dir, pool) = test_db().await;
        let bank = seed(&pool, TransactionSource::Bank, (2024, 1, 10), "AWS INVOICE", -10_000).await;
        let ledger = seed(
            &pool,
            TransactionSource::Ledger,
            (2024, 1, 10),
            "Amazon Web Services - Jan invoice",
            -10_000,
        )
        .await;

        let reconciler = Reconciler::new(pool.clone());
        reconciler
            .approve_match(WS, bank, ledger, MatchType::Exact, 0.99, "Exact match")
            .await
            .unwrap();

        assert_eq!(status_of(&pool, bank).await, TransactionStatus::Matched);
        assert_eq!(status_of(&pool, ledger).await, TransactionStatus::Matched);

        let matches = storage::get_matches(&pool, WS).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].bank_transaction_id, bank);
        assert_eq!(matches[0].ledger_transaction_id, ledger);
        assert_eq!(matches[0].match_type, MatchType::Exact);
    }

    #[tokio::test]
    async fn approve_unknown_transaction_is_not_found() {
        let (_dir, pool) = test_db().await;
        let bank = seed(&pool, TransactionSource::Bank, (2024, 1, 10), "AWS", -10_000).await;

        let reconciler = Reconciler::new(pool.clone());
        let err = reconciler
            .approve_match(WS, bank, TransactionId(999), MatchType::Exact, 0.99, "r")
            .await
            .unwrap_err();
        assert_eq!(err, ReconcileError::NotFound(TransactionId(999), WS));
        // The atomic unit rolled back: nothing flipped, nothing written.
        assert_eq!(status_of(&pool, bank).await, TransactionStatus::Unmatched);
        assert!(storage::get_matches(&pool, WS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn approve_matched_side_fails_and_writes_nothing() {
        let (_dir, pool) = test_db().await;
        let bank1 = seed(&pool, TransactionSource::Bank, (2024, 1, 10), "AWS", -10_000).await;
        let bank2 = seed(&pool, TransactionSource::Bank, (2024, 1, 11), "AWS RETRY", -10_000).await;
        let ledger = seed(
            &pool,
            TransactionSource::Ledger,
            (2024, 1, 10),
            "Amazon Web Services - Jan",
            -10_000,
        )
        .await;

        let reconciler = Reconciler::new(pool.clone());
        reconciler
            .approve_match(WS, bank1, ledger, MatchType::Exact, 0.99, "r")
            .await
            .unwrap();

        let err = reconciler
            .approve_match(WS, bank2, ledger, MatchType::Timing, 0.95, "r")
            .await
            .unwrap_err();
        assert_eq!(err, ReconcileError::AlreadyMatched(ledger));
        assert_eq!(status_of(&pool, bank2).await, TransactionStatus::Unmatched);
        assert_eq!(storage::get_matches(&pool, WS).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_approvals_of_one_pair_yield_one_match() {
        let (_dir, pool) = test_db().await;
        let bank = seed(&pool, TransactionSource::Bank, (2024, 1, 10), "AWS", -10_000).await;
        let ledger = seed(
            &pool,
            TransactionSource::Ledger,
            (2024, 1, 10),
            "Amazon Web Services - Jan",
            -10_000,
        )
        .await;

        let reconciler = Reconciler::new(pool.clone());
        let (a, b) = tokio::join!(
            reconciler.approve_match(WS, bank, ledger, MatchType::Exact, 0.99, "r"),
            reconciler.approve_match(WS, bank, ledger, MatchType::Exact, 0.99, "r"),
        );

        assert!(a.is_ok() != b.is_ok(), "exactly one approval must win");
        let loser = if a.is_err() { a } else { b };
        assert!(matches!(
            loser.unwrap_err(),
            ReconcileError::AlreadyMatched(_)
        ));
        assert_eq!(storage::get_matches(&pool, WS).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn manual_match_uses_fixed_type_confidence_and_reasoning() {
        let (_dir, pool) = test_db().await;
        let bank = seed(&pool, TransactionSource::Bank, (2024, 1, 10), "CHECK 42", -20_000).await;
        let ledger = seed(
            &pool,
            TransactionSource::Ledger,
            (2024, 2, 20),
            "Office rent - January",
            -19_000,
        )
        .await;

        let reconciler = Reconciler::new(pool.clone());
        reconciler.create_manual_match(WS, bank, ledger).await.unwrap();

        let matches = storage::get_matches(&pool, WS).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].match_type, MatchType::Manual);
        assert_eq!(matches[0].confidence, 1.0);
        assert_eq!(matches[0].reasoning, MANUAL_MATCH_REASONING);
        assert_eq!(status_of(&pool, bank).await, TransactionStatus::Matched);
        assert_eq!(status_of(&pool, ledger).await, TransactionStatus::Matched);
    }

    #[tokio::test]
    async fn manual_match_rejects_wrong_sources() {
        let (_dir, pool) = test_db().await;
        let bank1 = seed(&pool, TransactionSource::Bank, (2024, 1, 10), "A", -100).await;
        let bank2 = seed(&pool, TransactionSource::Bank, (2024, 1, 10), "B", -100).await;
        let ledger = seed(&pool, TransactionSource::Ledger, (2024, 1, 10), "C - memo", -100).await;

        let reconciler = Reconciler::new(pool.clone());

        let same_source = reconciler.create_manual_match(WS, bank1, bank2).await;
        assert_eq!(same_source.unwrap_err(), ReconcileError::InvalidSource);

        // Sides swapped: ledger id in the bank position.
        let swapped = reconciler.create_manual_match(WS, ledger, bank1).await;
        assert_eq!(swapped.unwrap_err(), ReconcileError::InvalidSource);

        assert!(storage::get_matches(&pool, WS).await.unwrap().is_empty());
        assert_eq!(status_of(&pool, bank1).await, TransactionStatus::Unmatched);
    }

    #[tokio::test]
    async fn reject_requires_an_actor() {
        let (_dir, pool) = test_db().await;
        let bank = seed(&pool, TransactionSource::Bank, (2024, 1, 10), "AWS", -10_000).await;
        let ledger =
            seed(&pool, TransactionSource::Ledger, (2024, 1, 10), "AWS - Jan", -10_000).await;

        let reconciler = Reconciler::new(pool.clone());
        let err = reconciler
            .reject_suggestion(None, WS, bank, ledger, MatchType::Exact, 0.99, "r")
            .await
            .unwrap_err();
        assert_eq!(err, ReconcileError::Unauthenticated);
        assert!(storage::get_audit_entries(&pool, WS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reject_writes_audit_snapshot_and_never_touches_status() {
        let (_dir, pool) = test_db().await;
        let bank = seed(&pool, TransactionSource::Bank, (2024, 1, 10), "AWS INVOICE", -10_000).await;
        let ledger = seed(
            &pool,
            TransactionSource::Ledger,
            (2024, 1, 10),
            "Amazon Web Services - Jan invoice",
            -10_000,
        )
        .await;

        let reconciler = Reconciler::new(pool.clone());
        reconciler
            .reject_suggestion(
                Some(UserId(7)),
                WS,
                bank,
                ledger,
                MatchType::Exact,
                0.99,
                "Exact match on amount and date",
            )
            .await
            .unwrap();

        assert_eq!(status_of(&pool, bank).await, TransactionStatus::Unmatched);
        assert_eq!(status_of(&pool, ledger).await, TransactionStatus::Unmatched);

        let entries = storage::get_audit_entries(&pool, WS).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "match_suggestion_rejected");
        assert_eq!(entries[0].entity_type, "MatchSuggestion");
        assert_eq!(entries[0].entity_id, format!("{bank}:{ledger}"));
        assert!(entries[0].new_value.is_none());

        let snapshot: serde_json::Value =
            serde_json::from_str(entries[0].old_value.as_deref().unwrap()).unwrap();
        assert_eq!(snapshot["matchType"], "exact");
        assert_eq!(snapshot["bankDescription"], "AWS INVOICE");
        assert_eq!(
            snapshot["ledgerDescription"],
            "Amazon Web Services - Jan invoice"
        );

        // Rejecting an already-matched pair is allowed and still only
        // writes an audit entry.
        reconciler
            .approve_match(WS, bank, ledger, MatchType::Exact, 0.99, "r")
            .await
            .unwrap();
        reconciler
            .reject_suggestion(Some(UserId(7)), WS, bank, ledger, MatchType::Exact, 0.99, "r")
            .await
            .unwrap();
        assert_eq!(storage::get_audit_entries(&pool, WS).await.unwrap().len(), 2);
        assert_eq!(status_of(&pool, bank).await, TransactionStatus::Matched);
    }

    #[tokio::test]
    async fn suggestions_for_ranks_candidates() {
        let (_dir, pool) = test_db().await;
        let bank = seed(&pool, TransactionSource::Bank, (2024, 1, 10), "AWS INVOICE", -10_000).await;
        let exact = seed(
            &pool,
            TransactionSource::Ledger,
            (2024, 1, 10),
            "Amazon Web Services - Jan invoice",
            -10_000,
        )
        .await;
        let timing = seed(
            &pool,
            TransactionSource::Ledger,
            (2024, 1, 12),
            "Amazon Web Services - Jan invoice",
            -10_000,
        )
        .await;
        seed(
            &pool,
            TransactionSource::Ledger,
            (2024, 3, 1),
            "Office rent - March",
            -250_000,
        )
        .await;

        let reconciler = Reconciler::new(pool.clone());
        let suggestions = reconciler.suggestions_for(WS, bank).await.unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].candidate_id, exact);
        assert_eq!(suggestions[0].confidence, 0.99);
        assert_eq!(suggestions[1].candidate_id, timing);
    }

    #[tokio::test]
    async fn suggestions_for_unknown_transaction_is_not_found() {
        let (_dir, pool) = test_db().await;
        let reconciler = Reconciler::new(pool.clone());
        let err = reconciler
            .suggestions_for(WS, TransactionId(404))
            .await
            .unwrap_err();
        assert_eq!(err, ReconcileError::NotFound(TransactionId(404), WS));
    }

    #[tokio::test]
    async fn bulk_cycle_assigns_and_approves() {
        let (_dir, pool) = test_db().await;
        let bank1 = seed(&pool, TransactionSource::Bank, (2024, 1, 10), "AWS INVOICE", -10_000).await;
        let bank2 = seed(&pool, TransactionSource::Bank, (2024, 1, 15), "STARBUCKS #42", -550).await;
        let ledger1 = seed(
            &pool,
            TransactionSource::Ledger,
            (2024, 1, 10),
            "Amazon Web Services - Jan invoice",
            -10_000,
        )
        .await;
        let ledger2 = seed(
            &pool,
            TransactionSource::Ledger,
            (2024, 1, 15),
            "Starbucks - team coffee",
            -550,
        )
        .await;

        let reconciler = Reconciler::new(pool.clone());
        let proposals = reconciler.bulk_suggestions(WS).await.unwrap();
        assert_eq!(proposals.len(), 2);

        let outcome = reconciler.bulk_approve(WS, &proposals).await.unwrap();
        assert_eq!(outcome, BulkApproveOutcome { approved: 2, failed: 0 });

        for id in [bank1, bank2, ledger1, ledger2] {
            assert_eq!(status_of(&pool, id).await, TransactionStatus::Matched);
        }
        assert_eq!(storage::get_matches(&pool, WS).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn bulk_approve_skips_stale_items_and_counts_them() {
        let (_dir, pool) = test_db().await;
        let bank1 = seed(&pool, TransactionSource::Bank, (2024, 1, 10), "AWS INVOICE", -10_000).await;
        let bank2 = seed(&pool, TransactionSource::Bank, (2024, 1, 15), "STARBUCKS #42", -550).await;
        let ledger1 = seed(
            &pool,
            TransactionSource::Ledger,
            (2024, 1, 10),
            "Amazon Web Services - Jan invoice",
            -10_000,
        )
        .await;
        let ledger2 = seed(
            &pool,
            TransactionSource::Ledger,
            (2024, 1, 15),
            "Starbucks - team coffee",
            -550,
        )
        .await;

        let reconciler = Reconciler::new(pool.clone());
        let proposals = reconciler.bulk_suggestions(WS).await.unwrap();
        assert_eq!(proposals.len(), 2);

        // The pool goes stale: one pair gets matched between ranking and
        // approval.
        reconciler
            .approve_match(WS, bank1, ledger1, MatchType::Exact, 0.99, "r")
            .await
            .unwrap();

        let outcome = reconciler.bulk_approve(WS, &proposals).await.unwrap();
        assert_eq!(outcome, BulkApproveOutcome { approved: 1, failed: 1 });
        assert_eq!(status_of(&pool, bank2).await, TransactionStatus::Matched);
        assert_eq!(status_of(&pool, ledger2).await, TransactionStatus::Matched);

        // Re-running the same list is safe: everything is stale now.
        let rerun = reconciler.bulk_approve(WS, &proposals).await.unwrap();
        assert_eq!(rerun, BulkApproveOutcome { approved: 0, failed: 2 });
        assert_eq!(storage::get_matches(&pool, WS).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn events_fire_after_successful_mutations() {
        let (_dir, pool) = test_db().await;
        let bank = seed(&pool, TransactionSource::Bank, (2024, 1, 10), "AWS", -10_000).await;
        let ledger =
            seed(&pool, TransactionSource::Ledger, (2024, 1, 10), "AWS - Jan", -10_000).await;

        let (tx, mut rx) = mpsc::channel(4);
        let reconciler = Reconciler::new(pool.clone()).with_events(tx);
        reconciler
            .approve_match(WS, bank, ledger, MatchType::Exact, 0.99, "r")
            .await
            .unwrap();

        assert_eq!(rx.try_recv().unwrap(), ReconEvent::MatchesChanged(WS));
    }
}
