use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{Identifiable, NamedEntity};
use crate::domain::transaction::TransactionKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// The due date one period after `from`. Month and year steps keep the
    /// day-of-month, clamped to the last day of the target month (Jan 31 ->
    /// Feb 28/29, Feb 29 -> Feb 28 in non-leap years).
    pub fn advance(self, from: NaiveDate) -> NaiveDate {
        match self {
            Frequency::Weekly => from + Duration::days(7),
            Frequency::Monthly => shift_months(from, 1),
            Frequency::Yearly => shift_years(from, 1),
        }
    }
}

fn shift_months(date: NaiveDate, months: i32) -> NaiveDate {
    let mut year = date.year();
    let mut month = date.month() as i32 + months;
    while month > 12 {
        month -= 12;
        year += 1;
    }
    while month < 1 {
        month += 12;
        year -= 1;
    }
    let day = date.day().min(days_in_month(year, month as u32));
    NaiveDate::from_ymd_opt(year, month as u32, day).expect("clamped day is valid")
}

fn shift_years(date: NaiveDate, years: i32) -> NaiveDate {
    let year = date.year() + years;
    let day = date.day().min(days_in_month(year, date.month()));
    NaiveDate::from_ymd_opt(year, date.month(), day).expect("clamped day is valid")
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let first_next = NaiveDate::from_ymd_opt(next_year, next_month, 1).expect("first of month");
    (first_next - Duration::days(1)).day()
}

/// A scheduled bill or deposit. `next_due_date` is advanced only by the
/// scheduler when it processes the item, never during user edits of other
/// fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecurringTransaction {
    pub id: Uuid,
    pub name: String,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub frequency: Frequency,
    pub next_due_date: NaiveDate,
    pub auto_pay: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_processed: Option<DateTime<Utc>>,
}

impl RecurringTransaction {
    pub fn new(
        name: impl Into<String>,
        amount: Decimal,
        kind: TransactionKind,
        frequency: Frequency,
        next_due_date: NaiveDate,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            amount,
            kind,
            frequency,
            next_due_date,
            auto_pay: true,
            account_id: None,
            category: category.into(),
            description: None,
            last_processed: None,
        }
    }

    /// Due test at calendar-day granularity; time of day is ignored.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.next_due_date <= today
    }
}

impl Identifiable for RecurringTransaction {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for RecurringTransaction {
    fn name(&self) -> &str {
        &self.name
    }
}
