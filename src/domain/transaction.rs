use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::Identifiable;
use crate::errors::{FinanceError, Result};

pub const PAYMENT_METHODS: &[&str] =
    &["Credit Card", "Debit Card", "Bank", "Zelle", "Cash", "Other"];

pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Food",
    "Groceries",
    "Transport",
    "Shopping",
    "Entertainment",
    "Bills",
    "Rent",
    "Healthcare",
    "Education",
    "Personal Care",
    "Utilities",
    "Travel",
    "Gifts & Donations",
    "Home & Garden",
    "Insurance",
    "Subscriptions",
    "Dining Out",
    "Fitness & Sports",
    "Pet Care",
    "Clothing",
    "Electronics",
    "Lending / Reimbursable",
    "Others",
];

pub const INCOME_CATEGORIES: &[&str] = &[
    "Salary",
    "Freelance",
    "Pocket Money",
    "Gift",
    "Investment Returns",
    "Reimbursement",
    "Other Income",
];

static EXPENSE_CATEGORY_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| EXPENSE_CATEGORIES.iter().copied().collect());
static INCOME_CATEGORY_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| INCOME_CATEGORIES.iter().copied().collect());
static PAYMENT_METHOD_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| PAYMENT_METHODS.iter().copied().collect());

pub fn is_expense_category(name: &str) -> bool {
    EXPENSE_CATEGORY_SET.contains(name)
}

pub fn is_income_category(name: &str) -> bool {
    INCOME_CATEGORY_SET.contains(name)
}

pub fn is_payment_method(name: &str) -> bool {
    PAYMENT_METHOD_SET.contains(name)
}

/// Calendar month name used for the derived `month` field ("January").
pub fn month_name(date: NaiveDate) -> String {
    date.format("%B").to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

/// A ledger entry. Amounts are always positive; the sign of the balance
/// effect is implied by `kind` and the side an id appears on.
///
/// `account_id` is the source side (debited for expense/transfer, credited
/// for income); `None` means an external/cash source with no tracked balance.
/// `to_account_id` is present exactly when `kind` is `Transfer`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_account_id: Option<Uuid>,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub category: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub payment_method: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub month: String,
    pub year: String,
}

impl Transaction {
    /// Rewrites the derived `month`/`year` fields from `date`.
    pub fn refresh_calendar_fields(&mut self) {
        self.month = month_name(self.date);
        self.year = self.date.year().to_string();
    }

    pub fn involves(&self, id: Uuid) -> bool {
        self.account_id == Some(id) || self.to_account_id == Some(id)
    }

    pub fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(FinanceError::validation(
                "amount",
                format!("must be positive, got {}", self.amount),
            ));
        }
        match self.kind {
            TransactionKind::Transfer => {
                let destination = self.to_account_id.ok_or_else(|| {
                    FinanceError::validation("to_account_id", "transfer requires a destination")
                })?;
                if self.account_id == Some(destination) {
                    return Err(FinanceError::validation(
                        "to_account_id",
                        "transfer source and destination must differ",
                    ));
                }
                if self.category.trim().is_empty() {
                    return Err(FinanceError::validation("category", "must not be empty"));
                }
            }
            TransactionKind::Expense => {
                if self.to_account_id.is_some() {
                    return Err(FinanceError::validation(
                        "to_account_id",
                        "only transfers carry a destination",
                    ));
                }
                if !is_expense_category(&self.category) {
                    return Err(FinanceError::validation(
                        "category",
                        format!("unknown expense category `{}`", self.category),
                    ));
                }
            }
            TransactionKind::Income => {
                if self.to_account_id.is_some() {
                    return Err(FinanceError::validation(
                        "to_account_id",
                        "only transfers carry a destination",
                    ));
                }
                if !is_income_category(&self.category) {
                    return Err(FinanceError::validation(
                        "category",
                        format!("unknown income category `{}`", self.category),
                    ));
                }
            }
        }
        if !is_payment_method(&self.payment_method) {
            return Err(FinanceError::validation(
                "payment_method",
                format!("unknown payment method `{}`", self.payment_method),
            ));
        }
        Ok(())
    }
}

impl Identifiable for Transaction {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Input for `TransactionLedger::record`: a transaction before the ledger
/// assigned its id and derived calendar fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_account_id: Option<Uuid>,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub category: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub payment_method: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl TransactionDraft {
    pub fn into_transaction(self) -> Result<Transaction> {
        let mut txn = Transaction {
            id: Uuid::new_v4(),
            account_id: self.account_id,
            to_account_id: self.to_account_id,
            kind: self.kind,
            amount: self.amount,
            category: self.category,
            reason: self.reason,
            source: self.source,
            payment_method: self.payment_method,
            date: self.date,
            time: self.time,
            month: String::new(),
            year: String::new(),
        };
        txn.refresh_calendar_fields();
        txn.validate()?;
        Ok(txn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn expense_draft() -> TransactionDraft {
        TransactionDraft {
            account_id: Some(Uuid::new_v4()),
            to_account_id: None,
            kind: TransactionKind::Expense,
            amount: dec!(12.50),
            category: "Groceries".into(),
            reason: "weekly shop".into(),
            source: None,
            payment_method: "Bank".into(),
            date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            time: None,
        }
    }

    #[test]
    fn derives_month_name_and_year() {
        let txn = expense_draft().into_transaction().unwrap();
        assert_eq!(txn.month, "January");
        assert_eq!(txn.year, "2026");
    }

    #[test]
    fn rejects_non_positive_amount() {
        let mut draft = expense_draft();
        draft.amount = Decimal::ZERO;
        let err = draft.into_transaction().unwrap_err();
        assert!(matches!(err, FinanceError::Validation { field: "amount", .. }));
    }

    #[test]
    fn transfer_requires_destination() {
        let mut draft = expense_draft();
        draft.kind = TransactionKind::Transfer;
        let err = draft.into_transaction().unwrap_err();
        assert!(matches!(
            err,
            FinanceError::Validation { field: "to_account_id", .. }
        ));
    }

    #[test]
    fn destination_is_transfer_only() {
        let mut draft = expense_draft();
        draft.to_account_id = Some(Uuid::new_v4());
        assert!(draft.into_transaction().is_err());
    }

    #[test]
    fn rejects_unknown_category() {
        let mut draft = expense_draft();
        draft.category = "Yachts".into();
        let err = draft.into_transaction().unwrap_err();
        assert!(matches!(err, FinanceError::Validation { field: "category", .. }));
    }

    #[test]
    fn income_uses_income_categories() {
        let mut draft = expense_draft();
        draft.kind = TransactionKind::Income;
        draft.category = "Salary".into();
        assert!(draft.clone().into_transaction().is_ok());
        draft.category = "Groceries".into();
        assert!(draft.into_transaction().is_err());
    }

    #[test]
    fn transfer_to_itself_is_rejected() {
        let id = Uuid::new_v4();
        let mut draft = expense_draft();
        draft.kind = TransactionKind::Transfer;
        draft.account_id = Some(id);
        draft.to_account_id = Some(id);
        draft.category = "Bill payment".into();
        assert!(draft.into_transaction().is_err());
    }
}
