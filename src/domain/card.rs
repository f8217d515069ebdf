use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{Identifiable, NamedEntity};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Credit,
    Debit,
}

/// A payment card, playable as a pseudo-liability account in balance-sheet
/// views. `current_balance` is the amount owed and is authoritative (a stored
/// field, not derived from snapshot history); `available_credit` must equal
/// `credit_limit - current_balance` after every mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreditCard {
    pub id: Uuid,
    pub name: String,
    pub bank: String,
    #[serde(rename = "type")]
    pub card_type: CardType,
    pub credit_limit: Decimal,
    pub current_balance: Decimal,
    pub available_credit: Decimal,
    pub last_four: String,
    pub expiry_date: String,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_date: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl CreditCard {
    pub fn new(
        name: impl Into<String>,
        bank: impl Into<String>,
        card_type: CardType,
        credit_limit: Decimal,
        last_four: impl Into<String>,
        expiry_date: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            bank: bank.into(),
            card_type,
            credit_limit,
            current_balance: Decimal::ZERO,
            available_credit: credit_limit,
            last_four: last_four.into(),
            expiry_date: expiry_date.into(),
            is_active: true,
            closing_date: None,
            created_at: Utc::now(),
        }
    }

    /// Re-establishes `available_credit = credit_limit - current_balance`.
    pub fn recompute_available(&mut self) {
        self.available_credit = self.credit_limit - self.current_balance;
    }

    pub fn utilization_consistent(&self) -> bool {
        self.available_credit == self.credit_limit - self.current_balance
    }
}

impl Identifiable for CreditCard {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for CreditCard {
    fn name(&self) -> &str {
        &self.name
    }
}
