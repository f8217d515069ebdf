use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::domain::{
    Account, AccountKind, Balance, CreditCard, OwnerId, RecurringTransaction, Transaction,
};
use crate::errors::{FinanceError, Result};
use crate::ledger::BalanceBook;
use crate::storage::{Collection, DocumentStore};

/// An account with its resolved current balance.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountOverview {
    pub account: Account,
    pub current_balance: Decimal,
}

/// An account with its full snapshot history, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountHistory {
    pub account: Account,
    pub history: Vec<Balance>,
}

/// Validated CRUD for accounts plus manual balance recording and the
/// balance-sheet overviews.
pub struct AccountService {
    store: Arc<dyn DocumentStore>,
    owner: OwnerId,
}

impl AccountService {
    pub fn new(store: Arc<dyn DocumentStore>, owner: OwnerId) -> Self {
        Self { store, owner }
    }

    fn book(&self) -> BalanceBook<'_> {
        BalanceBook::new(self.store.as_ref(), &self.owner)
    }

    pub fn create(
        &self,
        name: impl Into<String>,
        kind: AccountKind,
        category: impl Into<String>,
    ) -> Result<Account> {
        let name = name.into();
        let category = category.into();
        if name.trim().is_empty() {
            return Err(FinanceError::validation("name", "must not be empty"));
        }
        if category.trim().is_empty() {
            return Err(FinanceError::validation("category", "must not be empty"));
        }
        let account = Account::new(name, kind, category);
        let body = serde_json::to_value(&account)?;
        self.store
            .insert(Collection::Accounts, &self.owner, &account.id.to_string(), body)?;
        info!(account = %account.id, "created account");
        Ok(account)
    }

    pub fn get(&self, id: Uuid) -> Result<Account> {
        let key = id.to_string();
        self.store
            .get(Collection::Accounts, &self.owner, &key)?
            .ok_or_else(|| FinanceError::not_found("account", &key))?
            .decode()
    }

    /// All accounts, oldest first.
    pub fn list(&self) -> Result<Vec<Account>> {
        let mut accounts: Vec<Account> = self
            .store
            .list(Collection::Accounts, &self.owner)?
            .iter()
            .map(|doc| doc.decode())
            .collect::<Result<_>>()?;
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(accounts)
    }

    /// Renames or recategorizes an account. Kind changes go through
    /// `change_kind`.
    pub fn update_details(
        &self,
        id: Uuid,
        name: impl Into<String>,
        category: impl Into<String>,
    ) -> Result<Account> {
        let name = name.into();
        let category = category.into();
        if name.trim().is_empty() {
            return Err(FinanceError::validation("name", "must not be empty"));
        }
        let key = id.to_string();
        let doc = self
            .store
            .get(Collection::Accounts, &self.owner, &key)?
            .ok_or_else(|| FinanceError::not_found("account", &key))?;
        let mut account: Account = doc.decode()?;
        account.name = name;
        account.category = category;
        let body = serde_json::to_value(&account)?;
        self.store
            .update(Collection::Accounts, &self.owner, &key, doc.version, body)?;
        Ok(account)
    }

    /// Changes the balance-sheet kind. Rejected once any balance snapshot
    /// references the account: reclassifying an account with history would
    /// silently flip the sign conventions of past reports.
    pub fn change_kind(&self, id: Uuid, kind: AccountKind) -> Result<Account> {
        let key = id.to_string();
        let doc = self
            .store
            .get(Collection::Accounts, &self.owner, &key)?
            .ok_or_else(|| FinanceError::not_found("account", &key))?;
        let mut account: Account = doc.decode()?;
        if account.kind != kind && self.book().has_snapshots(id)? {
            return Err(FinanceError::validation(
                "kind",
                "cannot change the kind of an account with recorded balances",
            ));
        }
        account.kind = kind;
        let body = serde_json::to_value(&account)?;
        self.store
            .update(Collection::Accounts, &self.owner, &key, doc.version, body)?;
        Ok(account)
    }

    /// Deletes an account. Blocked while balances, transactions, or
    /// recurring items still reference it; nothing cascades.
    pub fn delete(&self, id: Uuid) -> Result<()> {
        let key = id.to_string();
        if self
            .store
            .get(Collection::Accounts, &self.owner, &key)?
            .is_none()
        {
            return Err(FinanceError::not_found("account", &key));
        }
        if self.book().has_snapshots(id)? {
            return Err(referenced_by(id, "balances"));
        }
        for doc in self.store.list(Collection::Transactions, &self.owner)? {
            let txn: Transaction = doc.decode()?;
            if txn.involves(id) {
                return Err(referenced_by(id, "transactions"));
            }
        }
        for doc in self.store.list(Collection::RecurringItems, &self.owner)? {
            let item: RecurringTransaction = doc.decode()?;
            if item.account_id == Some(id) {
                return Err(referenced_by(id, "recurring items"));
            }
        }
        self.store.delete(Collection::Accounts, &self.owner, &key)?;
        info!(account = %key, "deleted account");
        Ok(())
    }

    /// Records a manual balance snapshot for an account.
    pub fn record_balance(
        &self,
        account_id: Uuid,
        amount: Decimal,
        date: Option<DateTime<Utc>>,
    ) -> Result<Balance> {
        self.get(account_id)?;
        self.book()
            .record_snapshot(account_id, amount, date.unwrap_or_else(Utc::now))
    }

    /// Records snapshots for several accounts at one shared date (the
    /// month-end "record balances" flow).
    pub fn record_balances(
        &self,
        entries: &[(Uuid, Decimal)],
        date: Option<DateTime<Utc>>,
    ) -> Result<Vec<Balance>> {
        let date = date.unwrap_or_else(Utc::now);
        for (account_id, _) in entries {
            self.get(*account_id)?;
        }
        entries
            .iter()
            .map(|(account_id, amount)| self.book().record_snapshot(*account_id, *amount, date))
            .collect()
    }

    pub fn current_balance(&self, account_id: Uuid) -> Result<Decimal> {
        self.get(account_id)?;
        self.book().current_account_balance(account_id)
    }

    pub fn overviews(&self) -> Result<Vec<AccountOverview>> {
        let book = self.book();
        self.list()?
            .into_iter()
            .map(|account| {
                let current_balance = book.current_account_balance(account.id)?;
                Ok(AccountOverview {
                    account,
                    current_balance,
                })
            })
            .collect()
    }

    pub fn history(&self, account_id: Uuid) -> Result<AccountHistory> {
        let account = self.get(account_id)?;
        let history = self.book().history(account_id)?;
        Ok(AccountHistory { account, history })
    }

    /// Net worth: asset balances minus liability balances minus active card
    /// debt. Equity accounts are outputs of this figure, not inputs.
    pub fn net_worth(&self) -> Result<Decimal> {
        let mut total = Decimal::ZERO;
        for overview in self.overviews()? {
            match overview.account.kind {
                AccountKind::Asset => total += overview.current_balance,
                AccountKind::Liability => total -= overview.current_balance,
                AccountKind::Equity => {}
            }
        }
        for doc in self.store.list(Collection::Cards, &self.owner)? {
            let card: CreditCard = doc.decode()?;
            if card.is_active {
                total -= card.current_balance;
            }
        }
        Ok(total)
    }
}

fn referenced_by(id: Uuid, collection: &str) -> FinanceError {
    FinanceError::validation(
        "account_id",
        format!("account {id} is still referenced by {collection}"),
    )
}
