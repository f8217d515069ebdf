use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, error};
use uuid::Uuid;

use crate::domain::{Balance, CreditCard, OwnerId};
use crate::errors::{FinanceError, Result};
use crate::storage::{Collection, DocumentStore};

use super::reconcile::{Adjustment, AdjustmentPlan};
use super::participant::ParticipantKind;

/// Attempts per balance mutation before a conflict is surfaced to the caller.
const MAX_RECONCILE_RETRIES: u32 = 5;

/// Writer for account balances and card utilization. Every balance mutation
/// in the crate goes through here; each one is an optimistic read-compute-
/// write cycle with bounded retries, never a blind increment.
pub struct BalanceBook<'a> {
    store: &'a dyn DocumentStore,
    owner: &'a OwnerId,
}

impl<'a> BalanceBook<'a> {
    pub fn new(store: &'a dyn DocumentStore, owner: &'a OwnerId) -> Self {
        Self { store, owner }
    }

    /// Current balance of an account: the snapshot with the latest date,
    /// equal dates resolved by insertion sequence. Zero when no snapshot
    /// exists yet.
    pub fn current_account_balance(&self, account_id: Uuid) -> Result<Decimal> {
        Ok(self
            .latest_snapshot(account_id)?
            .map(|(balance, _)| balance.amount)
            .unwrap_or(Decimal::ZERO))
    }

    /// Most recent snapshot for an account with its insertion sequence:
    /// latest date wins, equal dates resolved by insertion sequence. `None`
    /// when no snapshot references the account.
    fn latest_snapshot(&self, account_id: Uuid) -> Result<Option<(Balance, u64)>> {
        let mut snapshots: Vec<(Balance, u64)> = Vec::new();
        for doc in self.store.list(Collection::Balances, self.owner)? {
            let balance: Balance = doc.decode()?;
            if balance.account_id == account_id {
                snapshots.push((balance, doc.sequence));
            }
        }
        snapshots.sort_by(|a, b| (b.0.date, b.1).cmp(&(a.0.date, a.1)));
        Ok(snapshots.into_iter().next())
    }

    /// Full snapshot history for an account, newest first.
    pub fn history(&self, account_id: Uuid) -> Result<Vec<Balance>> {
        let mut snapshots: Vec<(Balance, u64)> = Vec::new();
        for doc in self.store.list(Collection::Balances, self.owner)? {
            let balance: Balance = doc.decode()?;
            if balance.account_id == account_id {
                snapshots.push((balance, doc.sequence));
            }
        }
        snapshots.sort_by(|a, b| (b.0.date, b.1).cmp(&(a.0.date, a.1)));
        Ok(snapshots.into_iter().map(|(balance, _)| balance).collect())
    }

    /// Whether any snapshot references the account.
    pub fn has_snapshots(&self, account_id: Uuid) -> Result<bool> {
        for doc in self.store.list(Collection::Balances, self.owner)? {
            let balance: Balance = doc.decode()?;
            if balance.account_id == account_id {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Records a manual snapshot at an explicit date, bypassing delta math.
    pub fn record_snapshot(
        &self,
        account_id: Uuid,
        amount: Decimal,
        date: DateTime<Utc>,
    ) -> Result<Balance> {
        let balance = Balance::new(account_id, amount, date);
        let body = serde_json::to_value(&balance)?;
        self.store.insert(
            Collection::Balances,
            self.owner,
            &balance.id.to_string(),
            body,
        )?;
        Ok(balance)
    }

    /// Applies every adjustment of a plan. If one fails, the already-applied
    /// prefix is unwound before the error is returned so the plan commits
    /// all-or-nothing.
    pub fn apply_plan(&self, plan: &AdjustmentPlan) -> Result<()> {
        for (index, adjustment) in plan.adjustments.iter().enumerate() {
            if let Err(err) = self.apply_adjustment(adjustment) {
                self.unwind(&plan.adjustments[..index]);
                return Err(err);
            }
        }
        Ok(())
    }

    fn unwind(&self, applied: &[Adjustment]) {
        for adjustment in applied.iter().rev() {
            if let Err(err) = self.apply_adjustment(&adjustment.inverse()) {
                error!(
                    participant = %adjustment.target,
                    %err,
                    "failed to unwind balance adjustment; store needs repair"
                );
            }
        }
    }

    fn apply_adjustment(&self, adjustment: &Adjustment) -> Result<()> {
        debug!(
            participant = %adjustment.target,
            delta = %adjustment.delta,
            "applying balance adjustment"
        );
        match adjustment.kind {
            ParticipantKind::Account => self.adjust_account(adjustment.target, adjustment.delta),
            ParticipantKind::Card => self.adjust_card(adjustment.target, adjustment.delta),
        }
    }

    /// Appends `current + delta` as a fresh snapshot, guarded by the balance
    /// collection version so concurrent reconciliations cannot drop updates.
    fn adjust_account(&self, account_id: Uuid, delta: Decimal) -> Result<()> {
        let mut last_err = None;
        for _ in 0..MAX_RECONCILE_RETRIES {
            let version = self
                .store
                .collection_version(Collection::Balances, self.owner)?;
            let current = self.current_account_balance(account_id)?;
            let snapshot = Balance::new(account_id, current + delta, Utc::now());
            let body = serde_json::to_value(&snapshot)?;
            match self.store.insert_cas(
                Collection::Balances,
                self.owner,
                version,
                &snapshot.id.to_string(),
                body,
            ) {
                Ok(_) => return Ok(()),
                Err(err) if err.is_retryable() => last_err = Some(err),
                Err(err) => return Err(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            FinanceError::conflict(Collection::Balances.name(), account_id.to_string())
        }))
    }

    /// Read-modify-write on the card document with per-document CAS.
    fn adjust_card(&self, card_id: Uuid, delta: Decimal) -> Result<()> {
        let key = card_id.to_string();
        let mut last_err = None;
        for _ in 0..MAX_RECONCILE_RETRIES {
            let doc = self
                .store
                .get(Collection::Cards, self.owner, &key)?
                .ok_or_else(|| FinanceError::not_found("card", &key))?;
            let mut card: CreditCard = doc.decode()?;
            card.current_balance += delta;
            card.recompute_available();
            let body = serde_json::to_value(&card)?;
            match self
                .store
                .update(Collection::Cards, self.owner, &key, doc.version, body)
            {
                Ok(_) => return Ok(()),
                Err(err) if err.is_retryable() => last_err = Some(err),
                Err(err) => return Err(err),
            }
        }
        Err(last_err
            .unwrap_or_else(|| FinanceError::conflict(Collection::Cards.name(), key.clone())))
    }

    pub fn card(&self, card_id: Uuid) -> Result<CreditCard> {
        let key = card_id.to_string();
        self.store
            .get(Collection::Cards, self.owner, &key)?
            .ok_or_else(|| FinanceError::not_found("card", &key))?
            .decode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CardType, TransactionKind};
    use crate::ledger::participant::ParticipantIndex;
    use crate::ledger::reconcile::{plan, ReconcileMode};
    use crate::storage::MemoryStore;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn owner() -> OwnerId {
        OwnerId::new("book-tests").unwrap()
    }

    fn seed_card(store: &MemoryStore, owner: &OwnerId, limit: Decimal) -> CreditCard {
        let card = CreditCard::new("Card", "Bank", CardType::Credit, limit, "0000", "01/30");
        store
            .insert(
                Collection::Cards,
                owner,
                &card.id.to_string(),
                serde_json::to_value(&card).unwrap(),
            )
            .unwrap();
        card
    }

    #[test]
    fn missing_account_balance_is_zero() {
        let store = MemoryStore::new();
        let owner = owner();
        let book = BalanceBook::new(&store, &owner);
        assert_eq!(book.current_account_balance(Uuid::new_v4()).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn equal_dates_resolve_by_insertion_order() {
        let store = MemoryStore::new();
        let owner = owner();
        let book = BalanceBook::new(&store, &owner);
        let account = Uuid::new_v4();
        let date = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        book.record_snapshot(account, dec!(100), date).unwrap();
        book.record_snapshot(account, dec!(250), date).unwrap();
        assert_eq!(book.current_account_balance(account).unwrap(), dec!(250));
    }

    #[test]
    fn card_adjustment_keeps_utilization_invariant() {
        let store = MemoryStore::new();
        let owner = owner();
        let card = seed_card(&store, &owner, dec!(1000));
        let book = BalanceBook::new(&store, &owner);
        book.adjust_card(card.id, dec!(125.50)).unwrap();
        let stored = book.card(card.id).unwrap();
        assert_eq!(stored.current_balance, dec!(125.50));
        assert_eq!(stored.available_credit, dec!(874.50));
        assert!(stored.utilization_consistent());
    }

    #[test]
    fn failed_plan_unwinds_applied_prefix() {
        let store = MemoryStore::new();
        let owner = owner();
        let book = BalanceBook::new(&store, &owner);
        let account = Uuid::new_v4();
        let missing_card = Uuid::new_v4();
        let date = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        book.record_snapshot(account, dec!(500), date).unwrap();

        let index = ParticipantIndex::with_entries(&[missing_card], &[account]);
        let txn = crate::domain::TransactionDraft {
            account_id: Some(account),
            to_account_id: Some(missing_card),
            kind: TransactionKind::Transfer,
            amount: dec!(200),
            category: "Bill payment".into(),
            reason: String::new(),
            source: None,
            payment_method: "Bank".into(),
            date: chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            time: None,
        }
        .into_transaction()
        .unwrap();
        let plan = plan(&txn, ReconcileMode::Apply, &index).unwrap();

        // The card document does not exist in the store, so the second
        // adjustment fails and the first must be unwound.
        assert!(book.apply_plan(&plan).is_err());
        assert_eq!(book.current_account_balance(account).unwrap(), dec!(500));
    }
}
