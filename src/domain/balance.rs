use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::Identifiable;

/// A point-in-time balance snapshot for an account.
///
/// Snapshots are append-only; the current balance of an account is the
/// snapshot with the latest date, equal dates resolved by store insertion
/// order. Adjustments write a fresh snapshot rather than mutating one in
/// place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Balance {
    pub id: Uuid,
    pub account_id: Uuid,
    pub amount: Decimal,
    pub date: DateTime<Utc>,
}

impl Balance {
    pub fn new(account_id: Uuid, amount: Decimal, date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            amount,
            date,
        }
    }
}

impl Identifiable for Balance {
    fn id(&self) -> Uuid {
        self.id
    }
}
