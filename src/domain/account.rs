use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{Identifiable, NamedEntity};

/// Represents a tracked financial account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub kind: AccountKind,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(name: impl Into<String>, kind: AccountKind, category: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            category: category.into(),
            created_at: Utc::now(),
        }
    }
}

impl Identifiable for Account {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for Account {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Balance-sheet classification of an account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Asset,
    Liability,
    Equity,
}

impl AccountKind {
    /// Conventional categories for this kind. The `category` field stays
    /// free-form; these are the suggestions presentation layers offer.
    pub fn categories(self) -> &'static [&'static str] {
        match self {
            AccountKind::Asset => &[
                "Cash and Cash Equivalents",
                "Investments",
                "Real Estate",
                "Personal Property",
                "Money Owed (Friends)",
                "Other Assets",
            ],
            AccountKind::Liability => &["Credit Cards", "Loans", "Mortgages", "Other Liabilities"],
            AccountKind::Equity => &["Net Worth"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_cover_every_kind() {
        for kind in [AccountKind::Asset, AccountKind::Liability, AccountKind::Equity] {
            assert!(!kind.categories().is_empty());
        }
    }

    #[test]
    fn kind_serializes_lowercase() {
        let json = serde_json::to_string(&AccountKind::Liability).unwrap();
        assert_eq!(json, "\"liability\"");
    }
}
