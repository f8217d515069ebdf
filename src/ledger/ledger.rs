use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{OwnerId, Transaction, TransactionDraft, TransactionKind};
use crate::errors::{FinanceError, Result};
use crate::storage::{Collection, Document, DocumentStore};

use super::book::BalanceBook;
use super::participant::ParticipantIndex;
use super::reconcile::{self, ReconcileMode};

/// Aggregates for one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySummary {
    pub month: String,
    pub year: String,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net_savings: Decimal,
    pub by_category: BTreeMap<String, Decimal>,
    pub transaction_count: usize,
}

/// The transaction ledger: source of truth for what has occurred, and the
/// only entry point through which balances change.
///
/// Every mutating operation computes its full reconciliation plan before the
/// first write and rolls back on a mid-flight failure, so a transaction is
/// either fully committed (record + balances) or absent.
pub struct TransactionLedger {
    store: Arc<dyn DocumentStore>,
    owner: OwnerId,
}

impl TransactionLedger {
    pub fn new(store: Arc<dyn DocumentStore>, owner: OwnerId) -> Self {
        Self { store, owner }
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    fn book(&self) -> BalanceBook<'_> {
        BalanceBook::new(self.store.as_ref(), &self.owner)
    }

    /// Validates the draft, assigns an id, persists the record, then applies
    /// the reconciliation plan. A reconciliation failure deletes the
    /// just-persisted record.
    pub fn record(&self, draft: TransactionDraft) -> Result<Transaction> {
        let txn = draft.into_transaction()?;
        let participants = ParticipantIndex::load(self.store.as_ref(), &self.owner)?;
        let plan = reconcile::plan(&txn, ReconcileMode::Apply, &participants)?;

        let key = txn.id.to_string();
        let body = serde_json::to_value(&txn)?;
        self.store
            .insert(Collection::Transactions, &self.owner, &key, body)?;

        if let Err(err) = self.book().apply_plan(&plan) {
            if let Err(cleanup) = self.store.delete(Collection::Transactions, &self.owner, &key) {
                warn!(
                    transaction = %key,
                    %cleanup,
                    "could not roll back transaction record after reconciliation failure"
                );
            }
            return Err(err);
        }
        info!(transaction = %key, kind = ?txn.kind, amount = %txn.amount, "recorded transaction");
        Ok(txn)
    }

    /// Edits a transaction: reverts the pre-edit values, applies the merged
    /// values, then persists the merged record. The mutator may change any
    /// field except the id; calendar fields are re-derived from the date.
    pub fn amend<F>(&self, id: Uuid, mutate: F) -> Result<Transaction>
    where
        F: FnOnce(&mut Transaction),
    {
        let key = id.to_string();
        let doc = self
            .store
            .get(Collection::Transactions, &self.owner, &key)?
            .ok_or_else(|| FinanceError::not_found("transaction", &key))?;
        let old: Transaction = doc.decode()?;

        let mut updated = old.clone();
        mutate(&mut updated);
        updated.id = old.id;
        updated.refresh_calendar_fields();
        updated.validate()?;

        let participants = ParticipantIndex::load(self.store.as_ref(), &self.owner)?;
        let revert_plan = reconcile::plan(&old, ReconcileMode::Revert, &participants)?;
        let apply_plan = reconcile::plan(&updated, ReconcileMode::Apply, &participants)?;

        let book = self.book();
        book.apply_plan(&revert_plan)?;
        if let Err(err) = book.apply_plan(&apply_plan) {
            if let Err(undo) = book.apply_plan(&revert_plan.inverse()) {
                warn!(transaction = %key, %undo, "could not restore balances after failed amend");
            }
            return Err(err);
        }

        let body = serde_json::to_value(&updated)?;
        if let Err(err) =
            self.store
                .update(Collection::Transactions, &self.owner, &key, doc.version, body)
        {
            if let Err(undo) = book.apply_plan(&apply_plan.inverse()) {
                warn!(transaction = %key, %undo, "could not revert amended balances");
            }
            if let Err(undo) = book.apply_plan(&revert_plan.inverse()) {
                warn!(transaction = %key, %undo, "could not restore original balances");
            }
            return Err(err);
        }
        info!(transaction = %key, "amended transaction");
        Ok(updated)
    }

    /// Reverts the stored values, then removes the record. Returns the
    /// removed transaction.
    pub fn remove(&self, id: Uuid) -> Result<Transaction> {
        let key = id.to_string();
        let doc = self
            .store
            .get(Collection::Transactions, &self.owner, &key)?
            .ok_or_else(|| FinanceError::not_found("transaction", &key))?;
        let stored: Transaction = doc.decode()?;

        let participants = ParticipantIndex::load(self.store.as_ref(), &self.owner)?;
        let revert_plan = reconcile::plan(&stored, ReconcileMode::Revert, &participants)?;

        let book = self.book();
        book.apply_plan(&revert_plan)?;
        if let Err(err) = self.store.delete(Collection::Transactions, &self.owner, &key) {
            if let Err(undo) = book.apply_plan(&revert_plan.inverse()) {
                warn!(transaction = %key, %undo, "could not restore balances after failed delete");
            }
            return Err(err);
        }
        info!(transaction = %key, "removed transaction");
        Ok(stored)
    }

    pub fn get(&self, id: Uuid) -> Result<Transaction> {
        let key = id.to_string();
        self.store
            .get(Collection::Transactions, &self.owner, &key)?
            .ok_or_else(|| FinanceError::not_found("transaction", &key))?
            .decode()
    }

    /// All transactions, newest first (date, then insertion order).
    pub fn list(&self) -> Result<Vec<Transaction>> {
        let mut entries = self.decoded()?;
        sort_newest_first(&mut entries);
        Ok(entries.into_iter().map(|(txn, _)| txn).collect())
    }

    /// Transactions for one calendar month, by derived month name and year.
    pub fn transactions_for_month(&self, month: &str, year: &str) -> Result<Vec<Transaction>> {
        let mut entries = self.decoded()?;
        entries.retain(|(txn, _)| txn.month == month && txn.year == year);
        sort_newest_first(&mut entries);
        Ok(entries.into_iter().map(|(txn, _)| txn).collect())
    }

    /// Income/expense totals, net savings, and the expense-only category
    /// breakdown for one month. Income and transfers never contribute to
    /// `by_category`.
    pub fn monthly_summary(&self, month: &str, year: &str) -> Result<MonthlySummary> {
        let transactions = self.transactions_for_month(month, year)?;
        let mut total_income = Decimal::ZERO;
        let mut total_expenses = Decimal::ZERO;
        let mut by_category: BTreeMap<String, Decimal> = BTreeMap::new();
        for txn in &transactions {
            match txn.kind {
                TransactionKind::Income => total_income += txn.amount,
                TransactionKind::Expense => {
                    total_expenses += txn.amount;
                    *by_category.entry(txn.category.clone()).or_default() += txn.amount;
                }
                TransactionKind::Transfer => {}
            }
        }
        Ok(MonthlySummary {
            month: month.to_string(),
            year: year.to_string(),
            total_income,
            total_expenses,
            net_savings: total_income - total_expenses,
            by_category,
            transaction_count: transactions.len(),
        })
    }

    /// All transactions in which the given account or card participates on
    /// either side, newest first; equal dates resolve to the most recently
    /// inserted record.
    pub fn list_for_participant(&self, id: Uuid) -> Result<Vec<Transaction>> {
        let mut entries = self.decoded()?;
        entries.retain(|(txn, _)| txn.involves(id));
        sort_newest_first(&mut entries);
        Ok(entries.into_iter().map(|(txn, _)| txn).collect())
    }

    fn decoded(&self) -> Result<Vec<(Transaction, u64)>> {
        self.store
            .list(Collection::Transactions, &self.owner)?
            .iter()
            .map(|doc: &Document| Ok((doc.decode::<Transaction>()?, doc.sequence)))
            .collect()
    }
}

fn sort_newest_first(entries: &mut [(Transaction, u64)]) {
    entries.sort_by(|a, b| (b.0.date, b.1).cmp(&(a.0.date, a.1)));
}
