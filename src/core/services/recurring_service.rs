use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::domain::transaction::{is_expense_category, is_income_category};
use crate::domain::{Frequency, OwnerId, RecurringTransaction, TransactionKind};
use crate::errors::{FinanceError, Result};
use crate::storage::{Collection, DocumentStore};

/// Validated CRUD for recurring items. Due-date advancement is the
/// scheduler's job; edits here never touch `next_due_date` of an item being
/// processed.
pub struct RecurringService {
    store: Arc<dyn DocumentStore>,
    owner: OwnerId,
}

impl RecurringService {
    pub fn new(store: Arc<dyn DocumentStore>, owner: OwnerId) -> Self {
        Self { store, owner }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &self,
        name: impl Into<String>,
        amount: Decimal,
        kind: TransactionKind,
        frequency: Frequency,
        first_due: NaiveDate,
        category: impl Into<String>,
        account_id: Option<Uuid>,
        auto_pay: bool,
    ) -> Result<RecurringTransaction> {
        let name = name.into();
        let category = category.into();
        validate_item(&name, amount, kind, &category)?;
        let mut item =
            RecurringTransaction::new(name, amount, kind, frequency, first_due, category);
        item.account_id = account_id;
        item.auto_pay = auto_pay;
        let body = serde_json::to_value(&item)?;
        self.store.insert(
            Collection::RecurringItems,
            &self.owner,
            &item.id.to_string(),
            body,
        )?;
        info!(item = %item.id, "created recurring item");
        Ok(item)
    }

    pub fn get(&self, id: Uuid) -> Result<RecurringTransaction> {
        let key = id.to_string();
        self.store
            .get(Collection::RecurringItems, &self.owner, &key)?
            .ok_or_else(|| FinanceError::not_found("recurring item", &key))?
            .decode()
    }

    pub fn list(&self) -> Result<Vec<RecurringTransaction>> {
        let mut items: Vec<RecurringTransaction> = self
            .store
            .list(Collection::RecurringItems, &self.owner)?
            .iter()
            .map(|doc| doc.decode())
            .collect::<Result<_>>()?;
        items.sort_by(|a, b| a.next_due_date.cmp(&b.next_due_date));
        Ok(items)
    }

    /// Edits an item. The id and `last_processed` are preserved; the mutated
    /// copy is re-validated before it is persisted.
    pub fn update<F>(&self, id: Uuid, mutate: F) -> Result<RecurringTransaction>
    where
        F: FnOnce(&mut RecurringTransaction),
    {
        let key = id.to_string();
        let doc = self
            .store
            .get(Collection::RecurringItems, &self.owner, &key)?
            .ok_or_else(|| FinanceError::not_found("recurring item", &key))?;
        let old: RecurringTransaction = doc.decode()?;
        let mut updated = old.clone();
        mutate(&mut updated);
        updated.id = old.id;
        updated.last_processed = old.last_processed;
        validate_item(&updated.name, updated.amount, updated.kind, &updated.category)?;
        let body = serde_json::to_value(&updated)?;
        self.store
            .update(Collection::RecurringItems, &self.owner, &key, doc.version, body)?;
        Ok(updated)
    }

    pub fn delete(&self, id: Uuid) -> Result<()> {
        let key = id.to_string();
        self.store
            .delete(Collection::RecurringItems, &self.owner, &key)?;
        info!(item = %key, "deleted recurring item");
        Ok(())
    }
}

fn validate_item(
    name: &str,
    amount: Decimal,
    kind: TransactionKind,
    category: &str,
) -> Result<()> {
    if name.trim().is_empty() {
        return Err(FinanceError::validation("name", "must not be empty"));
    }
    if amount <= Decimal::ZERO {
        return Err(FinanceError::validation(
            "amount",
            format!("must be positive, got {amount}"),
        ));
    }
    match kind {
        TransactionKind::Expense => {
            if !is_expense_category(category) {
                return Err(FinanceError::validation(
                    "category",
                    format!("unknown expense category `{category}`"),
                ));
            }
        }
        TransactionKind::Income => {
            if !is_income_category(category) {
                return Err(FinanceError::validation(
                    "category",
                    format!("unknown income category `{category}`"),
                ));
            }
        }
        // A scheduled transfer has no destination field to post with; record
        // those by hand through the ledger.
        TransactionKind::Transfer => {
            return Err(FinanceError::validation(
                "kind",
                "recurring items must be income or expense",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use rust_decimal_macros::dec;

    fn service() -> RecurringService {
        RecurringService::new(Arc::new(MemoryStore::new()), OwnerId::new("rec").unwrap())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn create_rejects_transfer_kind() {
        let service = service();
        let err = service
            .create(
                "Vault sweep",
                dec!(100),
                TransactionKind::Transfer,
                Frequency::Monthly,
                date(2024, 1, 1),
                "Savings",
                None,
                true,
            )
            .unwrap_err();
        assert!(matches!(err, FinanceError::Validation { field: "kind", .. }));
    }

    #[test]
    fn update_preserves_id_and_processing_marker() {
        let service = service();
        let item = service
            .create(
                "Netflix",
                dec!(15.99),
                TransactionKind::Expense,
                Frequency::Monthly,
                date(2024, 1, 1),
                "Subscriptions",
                None,
                true,
            )
            .unwrap();
        let updated = service
            .update(item.id, |it| {
                it.amount = dec!(17.99);
                it.id = Uuid::new_v4();
            })
            .unwrap();
        assert_eq!(updated.id, item.id);
        assert_eq!(updated.amount, dec!(17.99));
    }

    #[test]
    fn list_orders_by_due_date() {
        let service = service();
        service
            .create(
                "Later",
                dec!(1),
                TransactionKind::Expense,
                Frequency::Monthly,
                date(2024, 6, 1),
                "Bills",
                None,
                true,
            )
            .unwrap();
        service
            .create(
                "Sooner",
                dec!(1),
                TransactionKind::Expense,
                Frequency::Monthly,
                date(2024, 2, 1),
                "Bills",
                None,
                true,
            )
            .unwrap();
        let names: Vec<String> = service.list().unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["Sooner", "Later"]);
    }
}
