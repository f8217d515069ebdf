use std::sync::Arc;

use crate::domain::OwnerId;
use crate::ledger::{RecurringScheduler, TransactionLedger};
use crate::storage::DocumentStore;

use super::services::{AccountService, BudgetService, CardService, RecurringService};

/// Composition root for one authenticated owner: every service wired to the
/// same store, injected explicitly instead of read from ambient globals.
pub struct UserSession {
    pub accounts: AccountService,
    pub cards: CardService,
    pub ledger: TransactionLedger,
    pub recurring: RecurringService,
    pub scheduler: RecurringScheduler,
    pub budgets: BudgetService,
}

impl UserSession {
    pub fn new(store: Arc<dyn DocumentStore>, owner: OwnerId) -> Self {
        Self {
            accounts: AccountService::new(Arc::clone(&store), owner.clone()),
            cards: CardService::new(Arc::clone(&store), owner.clone()),
            ledger: TransactionLedger::new(Arc::clone(&store), owner.clone()),
            recurring: RecurringService::new(Arc::clone(&store), owner.clone()),
            scheduler: RecurringScheduler::new(Arc::clone(&store), owner.clone()),
            budgets: BudgetService::new(store, owner),
        }
    }
}
