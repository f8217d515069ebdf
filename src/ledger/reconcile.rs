use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{Transaction, TransactionKind};
use crate::errors::Result;

use super::participant::{ParticipantIndex, ParticipantKind};

/// Direction of a reconciliation run. `Revert` is the exact algebraic
/// inverse of `Apply` for the same transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    Apply,
    Revert,
}

impl ReconcileMode {
    fn multiplier(self) -> Decimal {
        match self {
            ReconcileMode::Apply => Decimal::ONE,
            ReconcileMode::Revert => -Decimal::ONE,
        }
    }
}

/// One signed balance change for one participant.
///
/// For accounts the delta is added to the current balance; for cards it is
/// added to `current_balance` (the amount owed), with `available_credit`
/// recomputed by the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjustment {
    pub target: Uuid,
    pub kind: ParticipantKind,
    pub delta: Decimal,
}

impl Adjustment {
    pub fn inverse(&self) -> Adjustment {
        Adjustment {
            target: self.target,
            kind: self.kind,
            delta: -self.delta,
        }
    }
}

/// The full set of balance changes one transaction implies, computed before
/// anything is written so a failure cannot leave a partial mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjustmentPlan {
    pub adjustments: Vec<Adjustment>,
}

impl AdjustmentPlan {
    pub fn inverse(&self) -> AdjustmentPlan {
        AdjustmentPlan {
            adjustments: self.adjustments.iter().map(Adjustment::inverse).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.adjustments.is_empty()
    }
}

/// Maps a transaction to the signed deltas of every participant.
///
/// Rule table (amount A, m = +1 apply / -1 revert):
///
/// | kind     | side        | card           | account |
/// |----------|-------------|----------------|---------|
/// | expense  | source      | +mA (debt up)  | -mA     |
/// | income   | source      | -mA (refund)   | +mA     |
/// | transfer | source      | +mA (debt up)  | -mA     |
/// | transfer | destination | -mA (payment)  | +mA     |
///
/// A missing source means an external/cash payment: no source-side change.
pub fn plan(
    txn: &Transaction,
    mode: ReconcileMode,
    participants: &ParticipantIndex,
) -> Result<AdjustmentPlan> {
    txn.validate()?;
    let amount = txn.amount * mode.multiplier();
    let mut adjustments = Vec::with_capacity(2);

    if let Some(source) = txn.account_id {
        let kind = participants.require(source)?;
        let delta = match (txn.kind, kind) {
            (TransactionKind::Expense, ParticipantKind::Card) => amount,
            (TransactionKind::Expense, ParticipantKind::Account) => -amount,
            (TransactionKind::Income, ParticipantKind::Card) => -amount,
            (TransactionKind::Income, ParticipantKind::Account) => amount,
            (TransactionKind::Transfer, ParticipantKind::Card) => amount,
            (TransactionKind::Transfer, ParticipantKind::Account) => -amount,
        };
        adjustments.push(Adjustment {
            target: source,
            kind,
            delta,
        });
    }

    if txn.kind == TransactionKind::Transfer {
        // validate() guarantees the destination is present.
        let destination = txn.to_account_id.expect("validated transfer destination");
        let kind = participants.require(destination)?;
        let delta = match kind {
            ParticipantKind::Card => -amount,
            ParticipantKind::Account => amount,
        };
        adjustments.push(Adjustment {
            target: destination,
            kind,
            delta,
        });
    }

    Ok(AdjustmentPlan { adjustments })
}
