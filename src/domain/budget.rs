use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::Identifiable;
use crate::errors::{FinanceError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    #[default]
    Monthly,
}

/// Caps spend for one category per period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Budget {
    pub id: Uuid,
    pub category: String,
    pub limit: Decimal,
    #[serde(default)]
    pub period: BudgetPeriod,
}

impl Budget {
    pub fn new(category: impl Into<String>, limit: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            category: category.into(),
            limit,
            period: BudgetPeriod::Monthly,
        }
    }
}

impl Identifiable for Budget {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Owner-wide spend-level thresholds. Up to five levels; a zero disables its
/// slot, and the non-zero levels must be strictly ascending.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetConfig {
    pub levels: Vec<Decimal>,
    pub last_updated: DateTime<Utc>,
}

impl BudgetConfig {
    pub const MAX_LEVELS: usize = 5;

    pub fn new(levels: Vec<Decimal>) -> Result<Self> {
        let config = Self {
            levels,
            last_updated: Utc::now(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.levels.len() > Self::MAX_LEVELS {
            return Err(FinanceError::validation(
                "levels",
                format!("at most {} spend levels are supported", Self::MAX_LEVELS),
            ));
        }
        let mut previous: Option<Decimal> = None;
        for level in self.levels.iter().filter(|l| !l.is_zero()) {
            if *level < Decimal::ZERO {
                return Err(FinanceError::validation("levels", "levels must not be negative"));
            }
            if let Some(prev) = previous {
                if *level <= prev {
                    return Err(FinanceError::validation(
                        "levels",
                        "non-zero levels must be strictly ascending",
                    ));
                }
            }
            previous = Some(*level);
        }
        Ok(())
    }

    /// Enabled levels crossed by `spent`, as (1-based level, limit) pairs.
    pub fn crossed_levels(&self, spent: Decimal) -> Vec<(u8, Decimal)> {
        self.levels
            .iter()
            .enumerate()
            .filter(|(_, limit)| !limit.is_zero() && spent >= **limit)
            .map(|(index, limit)| (index as u8 + 1, *limit))
            .collect()
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            levels: vec![Decimal::ZERO; Self::MAX_LEVELS],
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    BudgetLevel,
    RecurringDue,
}

/// A generated notification. Keys are deterministic per trigger so that
/// concurrent clients cannot duplicate an alert; `cleared` hides one without
/// deleting it, which would let the next sweep regenerate it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: String,
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub cleared: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    pub month: String,
    pub year: String,
}

/// Spend position of one category against its budget for a month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetStatus {
    pub category: String,
    pub limit: Decimal,
    pub spent: Decimal,
    pub remaining: Decimal,
    pub percentage: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn levels_must_ascend() {
        assert!(BudgetConfig::new(vec![dec!(100), dec!(200), dec!(300)]).is_ok());
        assert!(BudgetConfig::new(vec![dec!(100), dec!(100)]).is_err());
        assert!(BudgetConfig::new(vec![dec!(200), dec!(100)]).is_err());
    }

    #[test]
    fn zero_levels_are_disabled_slots() {
        let config = BudgetConfig::new(vec![dec!(0), dec!(150), dec!(0), dec!(400)]).unwrap();
        assert_eq!(config.crossed_levels(dec!(150)), vec![(2, dec!(150))]);
        assert_eq!(
            config.crossed_levels(dec!(500)),
            vec![(2, dec!(150)), (4, dec!(400))]
        );
        assert!(config.crossed_levels(dec!(149.99)).is_empty());
    }

    #[test]
    fn more_than_five_levels_rejected() {
        let levels = vec![dec!(1), dec!(2), dec!(3), dec!(4), dec!(5), dec!(6)];
        assert!(BudgetConfig::new(levels).is_err());
    }
}
