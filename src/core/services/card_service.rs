use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::domain::{CardType, CreditCard, OwnerId, Transaction};
use crate::errors::{FinanceError, Result};
use crate::storage::{Collection, DocumentStore};

/// Input for creating a card.
#[derive(Debug, Clone)]
pub struct NewCard {
    pub name: String,
    pub bank: String,
    pub card_type: CardType,
    pub credit_limit: Decimal,
    pub last_four: String,
    pub expiry_date: String,
    pub closing_date: Option<u32>,
}

/// Editable card attributes. `current_balance` is deliberately absent:
/// card debt only moves through ledger reconciliation.
#[derive(Debug, Clone)]
pub struct CardDetails {
    pub name: String,
    pub bank: String,
    pub credit_limit: Decimal,
    pub expiry_date: String,
    pub closing_date: Option<u32>,
}

/// Validated CRUD for cards. Every write re-establishes
/// `available_credit == credit_limit - current_balance`.
pub struct CardService {
    store: Arc<dyn DocumentStore>,
    owner: OwnerId,
}

impl CardService {
    pub fn new(store: Arc<dyn DocumentStore>, owner: OwnerId) -> Self {
        Self { store, owner }
    }

    pub fn create(&self, new: NewCard) -> Result<CreditCard> {
        validate_name(&new.name)?;
        validate_limit(new.credit_limit)?;
        validate_last_four(&new.last_four)?;
        validate_closing_date(new.closing_date)?;
        let mut card = CreditCard::new(
            new.name,
            new.bank,
            new.card_type,
            new.credit_limit,
            new.last_four,
            new.expiry_date,
        );
        card.closing_date = new.closing_date;
        let body = serde_json::to_value(&card)?;
        self.store
            .insert(Collection::Cards, &self.owner, &card.id.to_string(), body)?;
        info!(card = %card.id, "created card");
        Ok(card)
    }

    pub fn get(&self, id: Uuid) -> Result<CreditCard> {
        let key = id.to_string();
        self.store
            .get(Collection::Cards, &self.owner, &key)?
            .ok_or_else(|| FinanceError::not_found("card", &key))?
            .decode()
    }

    /// All cards, oldest first.
    pub fn list(&self) -> Result<Vec<CreditCard>> {
        let mut cards: Vec<CreditCard> = self
            .store
            .list(Collection::Cards, &self.owner)?
            .iter()
            .map(|doc| doc.decode())
            .collect::<Result<_>>()?;
        cards.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(cards)
    }

    /// Updates the editable attributes. A limit change recomputes available
    /// credit against the unchanged debt.
    pub fn update_details(&self, id: Uuid, details: CardDetails) -> Result<CreditCard> {
        validate_name(&details.name)?;
        validate_limit(details.credit_limit)?;
        validate_closing_date(details.closing_date)?;
        let key = id.to_string();
        let doc = self
            .store
            .get(Collection::Cards, &self.owner, &key)?
            .ok_or_else(|| FinanceError::not_found("card", &key))?;
        let mut card: CreditCard = doc.decode()?;
        card.name = details.name;
        card.bank = details.bank;
        card.credit_limit = details.credit_limit;
        card.expiry_date = details.expiry_date;
        card.closing_date = details.closing_date;
        card.recompute_available();
        let body = serde_json::to_value(&card)?;
        self.store
            .update(Collection::Cards, &self.owner, &key, doc.version, body)?;
        Ok(card)
    }

    pub fn set_active(&self, id: Uuid, active: bool) -> Result<CreditCard> {
        let key = id.to_string();
        let doc = self
            .store
            .get(Collection::Cards, &self.owner, &key)?
            .ok_or_else(|| FinanceError::not_found("card", &key))?;
        let mut card: CreditCard = doc.decode()?;
        card.is_active = active;
        let body = serde_json::to_value(&card)?;
        self.store
            .update(Collection::Cards, &self.owner, &key, doc.version, body)?;
        Ok(card)
    }

    /// Deletes a card. Blocked while transactions reference it, mirroring
    /// the account-deletion policy.
    pub fn delete(&self, id: Uuid) -> Result<()> {
        let key = id.to_string();
        if self.store.get(Collection::Cards, &self.owner, &key)?.is_none() {
            return Err(FinanceError::not_found("card", &key));
        }
        for doc in self.store.list(Collection::Transactions, &self.owner)? {
            let txn: Transaction = doc.decode()?;
            if txn.involves(id) {
                return Err(FinanceError::validation(
                    "card_id",
                    format!("card {id} is still referenced by transactions"),
                ));
            }
        }
        self.store.delete(Collection::Cards, &self.owner, &key)?;
        info!(card = %key, "deleted card");
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(FinanceError::validation("name", "must not be empty"));
    }
    Ok(())
}

fn validate_limit(credit_limit: Decimal) -> Result<()> {
    if credit_limit < Decimal::ZERO {
        return Err(FinanceError::validation("credit_limit", "must not be negative"));
    }
    Ok(())
}

fn validate_last_four(last_four: &str) -> Result<()> {
    if last_four.len() != 4 || !last_four.chars().all(|c| c.is_ascii_digit()) {
        return Err(FinanceError::validation(
            "last_four",
            "must be exactly four digits",
        ));
    }
    Ok(())
}

fn validate_closing_date(closing_date: Option<u32>) -> Result<()> {
    if let Some(day) = closing_date {
        if !(1..=31).contains(&day) {
            return Err(FinanceError::validation(
                "closing_date",
                "must be a day of month between 1 and 31",
            ));
        }
    }
    Ok(())
}
