use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use concord_core::{MatchType, Money, Transaction, TransactionId, TransactionSource};

use crate::vendor::VendorAliasTable;

/// Flat scoring view of a transaction. Carries just enough for the
/// evaluator plus the matched flag the ranking passes filter on.
#[derive(Debug, Clone)]
pub struct MatchableTransaction {
    pub id: TransactionId,
    pub source: TransactionSource,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Money,
    pub matched: bool,
}

impl From<&Transaction> for MatchableTransaction {
    fn from(tx: &Transaction) -> Self {
        MatchableTransaction {
            id: tx.id,
            source: tx.source,
            date: tx.date,
            description: tx.description.clone(),
            amount: tx.amount,
            matched: tx.is_matched(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchEvaluation {
    pub confidence: f32,
    pub match_type: MatchType,
    pub reasoning: String,
}

/// Derived quantities shared by every rule of the decision table.
struct PairFacts {
    amount_diff: Money,
    percent_diff: Decimal,
    days_diff: i64,
    descriptions_match: bool,
}

/// Scores one bank-side transaction against one ledger-side transaction
/// with a fixed, ordered rule table. Pure and deterministic; absence of a
/// match is a zero-confidence result, never an error.
pub struct MatchEvaluator {
    aliases: VendorAliasTable,
}

impl Default for MatchEvaluator {
    fn default() -> Self {
        Self::new(VendorAliasTable::default())
    }
}

impl MatchEvaluator {
    pub fn new(aliases: VendorAliasTable) -> Self {
        Self { aliases }
    }

    /// Full decision table. Rules run in order and the first hit wins;
    /// exact-amount rules outrank fee and partial heuristics.
    pub fn evaluate(
        &self,
        bank: &MatchableTransaction,
        ledger: &MatchableTransaction,
    ) -> MatchEvaluation {
        let facts = self.pair_facts(bank, ledger);

        if let Some(evaluation) = exact_or_timing(&facts) {
            return evaluation;
        }

        let PairFacts {
            amount_diff,
            percent_diff,
            days_diff,
            descriptions_match,
        } = facts;

        // Same amount, nearby date, but the descriptions disagree.
        if amount_diff <= Money::from_cents(1) && days_diff <= 3 {
            return MatchEvaluation {
                confidence: 0.75,
                match_type: MatchType::Timing,
                reasoning: format!(
                    "Amounts match exactly {days_diff} day(s) apart but descriptions differ"
                ),
            };
        }

        // Small percentage delta reads as a processing fee.
        if percent_diff > Decimal::ZERO
            && percent_diff <= Decimal::from(5)
            && days_diff <= 5
            && descriptions_match
        {
            let confidence = if percent_diff <= Decimal::from(3) {
                0.88
            } else {
                0.78
            };
            return MatchEvaluation {
                confidence,
                match_type: MatchType::FeeAdjusted,
                reasoning: format!(
                    "Amount differs by {amount_diff} ({}%) - likely payment processing fee",
                    percent_diff.round_dp(1)
                ),
            };
        }

        // Flat $10-$50 delta with a matching counterparty.
        if amount_diff >= Money::from_cents(1_000)
            && amount_diff <= Money::from_cents(5_000)
            && days_diff <= 5
            && descriptions_match
        {
            return MatchEvaluation {
                confidence: 0.82,
                match_type: MatchType::FeeAdjusted,
                reasoning: format!(
                    "Amount differs by {amount_diff} - possible flat fee or adjustment"
                ),
            };
        }

        if descriptions_match && days_diff <= 7 && percent_diff <= Decimal::from(20) {
            return MatchEvaluation {
                confidence: 0.60,
                match_type: MatchType::Partial,
                reasoning: format!(
                    "Same counterparty, {days_diff} day(s) and {}% apart - possible partial payment",
                    percent_diff.round_dp(1)
                ),
            };
        }

        if days_diff <= 3 && percent_diff <= Decimal::from(10) {
            return MatchEvaluation {
                confidence: 0.55,
                match_type: MatchType::Partial,
                reasoning: format!(
                    "Amounts within {}% and {days_diff} day(s) apart without description overlap",
                    percent_diff.round_dp(1)
                ),
            };
        }

        no_match()
    }

    /// Restricted table used by bulk assignment: only the exact and
    /// timing rules, so a bulk pass never proposes fee-adjusted or partial
    /// pairings.
    pub fn evaluate_conservative(
        &self,
        bank: &MatchableTransaction,
        ledger: &MatchableTransaction,
    ) -> MatchEvaluation {
        let facts = self.pair_facts(bank, ledger);
        exact_or_timing(&facts).unwrap_or_else(no_match)
    }

    fn pair_facts(&self, bank: &MatchableTransaction, ledger: &MatchableTransaction) -> PairFacts {
        let amount_diff = (bank.amount - ledger.amount).abs();
        let days_diff = (bank.date - ledger.date).num_days().abs();
        let descriptions_match = self
            .aliases
            .descriptions_likely_match(&bank.description, &ledger.description);
        PairFacts {
            amount_diff,
            percent_diff: percent_difference(amount_diff, ledger.amount),
            days_diff,
            descriptions_match,
        }
    }
}

/// Rules 1-2: identical amount with matching descriptions, same day or up
/// to five days apart.
fn exact_or_timing(facts: &PairFacts) -> Option<MatchEvaluation> {
    if facts.amount_diff > Money::from_cents(1) || !facts.descriptions_match {
        return None;
    }

    if facts.days_diff == 0 {
        return Some(MatchEvaluation {
            confidence: 0.99,
            match_type: MatchType::Exact,
            reasoning: "Exact match on amount and date".to_string(),
        });
    }

    if facts.days_diff <= 5 {
        let confidence = if facts.days_diff <= 2 {
            0.95
        } else if facts.days_diff <= 3 {
            0.90
        } else {
            0.85
        };
        return Some(MatchEvaluation {
            confidence,
            match_type: MatchType::Timing,
            reasoning: format!(
                "Amounts match exactly, {} day(s) apart - likely settlement timing",
                facts.days_diff
            ),
        });
    }

    None
}

fn no_match() -> MatchEvaluation {
    MatchEvaluation {
        confidence: 0.0,
        match_type: MatchType::Partial,
        reasoning: "No match found".to_string(),
    }
}

/// Amount delta as a percentage of the ledger amount; 100 when the ledger
/// amount is zero.
fn percent_difference(amount_diff: Money, ledger_amount: Money) -> Decimal {
    let base = ledger_amount.abs();
    if base.is_zero() {
        return Decimal::from(100);
    }
    amount_diff.to_decimal() / base.to_decimal() * Decimal::from(100)
}
