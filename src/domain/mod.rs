pub mod account;
pub mod balance;
pub mod budget;
pub mod card;
pub mod common;
pub mod recurring;
pub mod transaction;

pub use account::{Account, AccountKind};
pub use balance::Balance;
pub use budget::{Alert, AlertKind, Budget, BudgetConfig, BudgetPeriod, BudgetStatus};
pub use card::{CardType, CreditCard};
pub use common::{Identifiable, NamedEntity, OwnerId};
pub use recurring::{Frequency, RecurringTransaction};
pub use transaction::{Transaction, TransactionDraft, TransactionKind};
