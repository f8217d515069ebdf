use std::collections::HashSet;

use uuid::Uuid;

use crate::domain::{Account, CreditCard, OwnerId};
use crate::errors::{FinanceError, Result};
use crate::storage::{Collection, DocumentStore};

/// How an id taking part in a transaction resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantKind {
    Account,
    Card,
}

/// Lookup of every id that can take part in a transaction, built once per
/// ledger operation instead of scanning the card and account lists at each
/// membership test. Cards shadow accounts: an id is checked against cards
/// first.
#[derive(Debug, Default)]
pub struct ParticipantIndex {
    cards: HashSet<Uuid>,
    accounts: HashSet<Uuid>,
}

impl ParticipantIndex {
    pub fn load(store: &dyn DocumentStore, owner: &OwnerId) -> Result<Self> {
        let mut index = ParticipantIndex::default();
        for doc in store.list(Collection::Cards, owner)? {
            let card: CreditCard = doc.decode()?;
            index.cards.insert(card.id);
        }
        for doc in store.list(Collection::Accounts, owner)? {
            let account: Account = doc.decode()?;
            index.accounts.insert(account.id);
        }
        Ok(index)
    }

    pub fn resolve(&self, id: Uuid) -> Option<ParticipantKind> {
        if self.cards.contains(&id) {
            Some(ParticipantKind::Card)
        } else if self.accounts.contains(&id) {
            Some(ParticipantKind::Account)
        } else {
            None
        }
    }

    /// Resolution that fails with `NotFound` for ids known to neither side.
    pub fn require(&self, id: Uuid) -> Result<ParticipantKind> {
        self.resolve(id)
            .ok_or_else(|| FinanceError::not_found("participant", id.to_string()))
    }

    #[cfg(test)]
    pub(crate) fn with_entries(cards: &[Uuid], accounts: &[Uuid]) -> Self {
        Self {
            cards: cards.iter().copied().collect(),
            accounts: accounts.iter().copied().collect(),
        }
    }
}
