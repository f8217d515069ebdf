#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use finance_core::core::services::{AccountService, CardService, NewCard};
use finance_core::domain::{
    Account, AccountKind, CardType, CreditCard, OwnerId, TransactionDraft, TransactionKind,
};
use finance_core::ledger::TransactionLedger;
use finance_core::storage::{DocumentStore, MemoryStore};

pub struct Fixture {
    pub store: Arc<dyn DocumentStore>,
    pub owner: OwnerId,
    pub accounts: AccountService,
    pub cards: CardService,
    pub ledger: TransactionLedger,
}

pub fn fixture() -> Fixture {
    fixture_on(Arc::new(MemoryStore::new()))
}

pub fn fixture_on(store: Arc<dyn DocumentStore>) -> Fixture {
    let owner = OwnerId::new("test-user").unwrap();
    Fixture {
        accounts: AccountService::new(Arc::clone(&store), owner.clone()),
        cards: CardService::new(Arc::clone(&store), owner.clone()),
        ledger: TransactionLedger::new(Arc::clone(&store), owner.clone()),
        store,
        owner,
    }
}

impl Fixture {
    /// A bank account seeded with an opening balance snapshot.
    pub fn bank_account(&self, name: &str, opening: Decimal) -> Account {
        let account = self
            .accounts
            .create(name, AccountKind::Asset, "Cash and Cash Equivalents")
            .unwrap();
        self.accounts
            .record_balance(account.id, opening, None)
            .unwrap();
        account
    }

    pub fn credit_card(&self, name: &str, limit: Decimal) -> CreditCard {
        self.cards
            .create(NewCard {
                name: name.into(),
                bank: "Test Bank".into(),
                card_type: CardType::Credit,
                credit_limit: limit,
                last_four: "4242".into(),
                expiry_date: "12/28".into(),
                closing_date: None,
            })
            .unwrap()
    }

    pub fn balance_of(&self, account_id: Uuid) -> Decimal {
        self.accounts.current_balance(account_id).unwrap()
    }

    pub fn card_state(&self, card_id: Uuid) -> CreditCard {
        self.cards.get(card_id).unwrap()
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn expense(amount: Decimal, account_id: Option<Uuid>, on: NaiveDate) -> TransactionDraft {
    TransactionDraft {
        account_id,
        to_account_id: None,
        kind: TransactionKind::Expense,
        amount,
        category: "Groceries".into(),
        reason: "test expense".into(),
        source: None,
        payment_method: "Bank".into(),
        date: on,
        time: None,
    }
}

pub fn income(amount: Decimal, account_id: Option<Uuid>, on: NaiveDate) -> TransactionDraft {
    TransactionDraft {
        account_id,
        to_account_id: None,
        kind: TransactionKind::Income,
        amount,
        category: "Salary".into(),
        reason: "test income".into(),
        source: Some("Employer".into()),
        payment_method: "Bank".into(),
        date: on,
        time: None,
    }
}

pub fn transfer(
    amount: Decimal,
    from: Option<Uuid>,
    to: Uuid,
    on: NaiveDate,
) -> TransactionDraft {
    TransactionDraft {
        account_id: from,
        to_account_id: Some(to),
        kind: TransactionKind::Transfer,
        amount,
        category: "Bill payment".into(),
        reason: "test transfer".into(),
        source: None,
        payment_method: "Bank".into(),
        date: on,
        time: None,
    }
}
