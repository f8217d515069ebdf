use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    Alert, AlertKind, OwnerId, RecurringTransaction, TransactionDraft, TransactionKind,
};
use crate::errors::{FinanceError, Result};
use crate::storage::{Collection, DocumentStore};

use super::ledger::TransactionLedger;

/// Result of one scheduler pass.
#[derive(Debug, Default)]
pub struct PassOutcome {
    pub examined: usize,
    /// Items whose transaction posted and whose due date advanced.
    pub posted: Vec<Uuid>,
    /// Items that were due but failed to post; their due dates are untouched.
    pub failed: Vec<(Uuid, FinanceError)>,
    /// Due-bill alerts raised for items without auto-pay.
    pub alerts_raised: usize,
}

/// Turns due recurring items into concrete transactions.
///
/// A pass is an explicit, externally-triggered invocation (cron style);
/// nothing re-enters it reactively. Each item advances at most one period per
/// pass, so an item overdue by several periods catches up across repeated
/// passes. Re-running a pass on the same day is idempotent: advanced items
/// are no longer due.
pub struct RecurringScheduler {
    store: Arc<dyn DocumentStore>,
    owner: OwnerId,
    ledger: TransactionLedger,
}

impl RecurringScheduler {
    pub fn new(store: Arc<dyn DocumentStore>, owner: OwnerId) -> Self {
        let ledger = TransactionLedger::new(Arc::clone(&store), owner.clone());
        Self { store, owner, ledger }
    }

    /// Processes every due item once. A failed post is logged and skipped so
    /// one broken item cannot stall the rest of the pass.
    pub fn run_pass(&self, today: NaiveDate) -> Result<PassOutcome> {
        let mut outcome = PassOutcome::default();
        for doc in self.store.list(Collection::RecurringItems, &self.owner)? {
            let item: RecurringTransaction = doc.decode()?;
            outcome.examined += 1;
            if !item.is_due(today) {
                continue;
            }
            if !item.auto_pay {
                if self.raise_due_alert(&item)? {
                    outcome.alerts_raised += 1;
                }
                continue;
            }

            // The posted transaction is dated at the original due date, not
            // today.
            match self.ledger.record(draft_for(&item)) {
                Ok(txn) => {
                    let mut advanced = item.clone();
                    advanced.next_due_date = item.frequency.advance(item.next_due_date);
                    advanced.last_processed = Some(Utc::now());
                    let body = serde_json::to_value(&advanced)?;
                    match self.store.update(
                        Collection::RecurringItems,
                        &self.owner,
                        &doc.key,
                        doc.version,
                        body,
                    ) {
                        Ok(_) => {
                            info!(
                                item = %item.id,
                                transaction = %txn.id,
                                next_due = %advanced.next_due_date,
                                "posted recurring item"
                            );
                            outcome.posted.push(item.id);
                        }
                        Err(err) if err.is_retryable() => {
                            // Another session advanced the item concurrently;
                            // undo our post so the bill is not charged twice.
                            warn!(item = %item.id, "recurring item advanced concurrently, undoing post");
                            if let Err(undo) = self.ledger.remove(txn.id) {
                                warn!(item = %item.id, %undo, "could not undo duplicate post");
                            }
                            outcome.failed.push((item.id, err));
                        }
                        Err(err) => {
                            outcome.failed.push((item.id, err));
                        }
                    }
                }
                Err(err) => {
                    warn!(item = %item.id, %err, "failed to post recurring item");
                    outcome.failed.push((item.id, err));
                }
            }
        }
        Ok(outcome)
    }

    /// At most one alert per (item, due date); a duplicate insert means the
    /// alert already exists, possibly raised by another session.
    fn raise_due_alert(&self, item: &RecurringTransaction) -> Result<bool> {
        let key = format!("recurring-due-{}-{}", item.id, item.next_due_date);
        let now = Utc::now();
        let alert = Alert {
            id: key.clone(),
            kind: AlertKind::RecurringDue,
            title: format!("Bill due: {}", item.name),
            message: format!(
                "{} for {} was due on {}.",
                item.name, item.amount, item.next_due_date
            ),
            date: now,
            is_read: false,
            cleared: false,
            level: None,
            month: crate::domain::transaction::month_name(item.next_due_date),
            year: item.next_due_date.format("%Y").to_string(),
        };
        let body = serde_json::to_value(&alert)?;
        match self.store.insert(Collection::Alerts, &self.owner, &key, body) {
            Ok(_) => Ok(true),
            Err(err) if err.is_retryable() => Ok(false),
            Err(err) => Err(err),
        }
    }
}

fn draft_for(item: &RecurringTransaction) -> TransactionDraft {
    TransactionDraft {
        account_id: item.account_id,
        to_account_id: None,
        kind: item.kind,
        amount: item.amount,
        category: item.category.clone(),
        reason: format!("Auto-Pay: {}", item.name),
        source: match item.kind {
            TransactionKind::Income => Some(item.name.clone()),
            _ => None,
        },
        payment_method: "Other".into(),
        date: item.next_due_date,
        time: None,
    }
}
