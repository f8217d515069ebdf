mod common;

use std::sync::Arc;

use common::{date, expense, fixture, income, transfer};
use finance_core::core::services::{BudgetService, CardDetails};
use finance_core::domain::AccountKind;
use finance_core::errors::FinanceError;
use rust_decimal_macros::dec;

#[test]
fn account_deletion_is_blocked_while_referenced() {
    let fx = fixture();
    let bank = fx.bank_account("bank", dec!(100.00));

    // Referenced by its opening balance snapshot.
    let err = fx.accounts.delete(bank.id).unwrap_err();
    assert!(matches!(err, FinanceError::Validation { .. }));

    // An account with no snapshots but a transaction is still blocked.
    let untouched = fx
        .accounts
        .create("empty", AccountKind::Asset, "Other Assets")
        .unwrap();
    fx.ledger
        .record(transfer(dec!(10.00), Some(bank.id), untouched.id, date(2024, 1, 5)))
        .unwrap();
    // The transfer wrote a snapshot for the destination too, so both ways
    // of being referenced apply here.
    assert!(fx.accounts.delete(untouched.id).is_err());

    // A genuinely unreferenced account deletes cleanly.
    let fresh = fx
        .accounts
        .create("fresh", AccountKind::Asset, "Other Assets")
        .unwrap();
    fx.accounts.delete(fresh.id).unwrap();
    assert!(fx.accounts.get(fresh.id).is_err());
}

#[test]
fn kind_change_locks_once_balances_exist() {
    let fx = fixture();
    let account = fx
        .accounts
        .create("flex", AccountKind::Asset, "Investments")
        .unwrap();
    fx.accounts
        .change_kind(account.id, AccountKind::Liability)
        .unwrap();

    fx.accounts
        .record_balance(account.id, dec!(10.00), None)
        .unwrap();
    let err = fx
        .accounts
        .change_kind(account.id, AccountKind::Asset)
        .unwrap_err();
    assert!(matches!(err, FinanceError::Validation { field: "kind", .. }));
}

#[test]
fn card_utilization_holds_through_mixed_operations() {
    let fx = fixture();
    let bank = fx.bank_account("bank", dec!(2000.00));
    let card = fx.credit_card("card", dec!(1500));

    fx.ledger
        .record(expense(dec!(200.00), Some(card.id), date(2024, 2, 1)))
        .unwrap();
    fx.ledger
        .record(income(dec!(50.00), Some(card.id), date(2024, 2, 2)))
        .unwrap();
    fx.ledger
        .record(transfer(dec!(100.00), Some(bank.id), card.id, date(2024, 2, 3)))
        .unwrap();

    let state = fx.card_state(card.id);
    assert_eq!(state.current_balance, dec!(50.00));
    assert!(state.utilization_consistent());

    // Raising the limit keeps the invariant against the unchanged debt.
    let updated = fx
        .cards
        .update_details(
            card.id,
            CardDetails {
                name: "card".into(),
                bank: "Test Bank".into(),
                credit_limit: dec!(3000),
                expiry_date: "12/28".into(),
                closing_date: Some(15),
            },
        )
        .unwrap();
    assert_eq!(updated.available_credit, dec!(2950.00));
    assert!(updated.utilization_consistent());
}

#[test]
fn card_deletion_is_blocked_while_referenced() {
    let fx = fixture();
    let card = fx.credit_card("card", dec!(500));
    fx.ledger
        .record(expense(dec!(20.00), Some(card.id), date(2024, 2, 1)))
        .unwrap();
    assert!(fx.cards.delete(card.id).is_err());

    let spare = fx.credit_card("spare", dec!(500));
    fx.cards.delete(spare.id).unwrap();
}

#[test]
fn budget_status_tracks_category_spend() {
    let fx = fixture();
    let bank = fx.bank_account("bank", dec!(1000.00));
    let budgets = BudgetService::new(Arc::clone(&fx.store), fx.owner.clone());

    budgets.set_budget("Groceries", dec!(200.00)).unwrap();
    fx.ledger
        .record(expense(dec!(80.00), Some(bank.id), date(2024, 6, 5)))
        .unwrap();
    fx.ledger
        .record(expense(dec!(40.00), Some(bank.id), date(2024, 6, 9)))
        .unwrap();

    let status = budgets.budget_status("Groceries", "June", "2024").unwrap();
    assert_eq!(status.spent, dec!(120.00));
    assert_eq!(status.remaining, dec!(80.00));
    assert_eq!(status.percentage, dec!(60));

    // Upserting by category keeps a single budget per category.
    budgets.set_budget("Groceries", dec!(300.00)).unwrap();
    assert_eq!(budgets.budgets().unwrap().len(), 1);
}

#[test]
fn spend_alerts_fire_once_per_level() {
    let fx = fixture();
    let bank = fx.bank_account("bank", dec!(5000.00));
    let budgets = BudgetService::new(Arc::clone(&fx.store), fx.owner.clone());

    budgets
        .set_levels(vec![dec!(100), dec!(250), dec!(500)])
        .unwrap();
    fx.ledger
        .record(expense(dec!(300.00), Some(bank.id), date(2024, 6, 1)))
        .unwrap();

    let raised = budgets.sweep_spend_alerts("June", "2024").unwrap();
    assert_eq!(raised.len(), 2);
    assert_eq!(raised[0].level, Some(1));
    assert_eq!(raised[1].level, Some(2));

    // Sweeping again raises nothing new.
    assert!(budgets.sweep_spend_alerts("June", "2024").unwrap().is_empty());

    // Clearing hides the alert without letting the sweep re-create it.
    let alerts = budgets.alerts("June", "2024").unwrap();
    assert_eq!(alerts.len(), 2);
    budgets.clear_alert(&alerts[0].id).unwrap();
    assert_eq!(budgets.alerts("June", "2024").unwrap().len(), 1);
    assert!(budgets.sweep_spend_alerts("June", "2024").unwrap().is_empty());
}

#[test]
fn ascending_level_validation() {
    let fx = fixture();
    let budgets = BudgetService::new(Arc::clone(&fx.store), fx.owner.clone());
    let err = budgets
        .set_levels(vec![dec!(500), dec!(100)])
        .unwrap_err();
    assert!(matches!(err, FinanceError::Validation { field: "levels", .. }));
}

#[test]
fn net_worth_combines_accounts_and_cards() {
    let fx = fixture();
    fx.bank_account("savings", dec!(500.00));
    let loan = fx
        .accounts
        .create("loan", AccountKind::Liability, "Loans")
        .unwrap();
    fx.accounts
        .record_balance(loan.id, dec!(200.00), None)
        .unwrap();
    let card = fx.credit_card("card", dec!(1000));
    fx.ledger
        .record(expense(dec!(50.00), Some(card.id), date(2024, 3, 1)))
        .unwrap();

    assert_eq!(fx.accounts.net_worth().unwrap(), dec!(250.00));
}

#[test]
fn overviews_resolve_latest_snapshots() {
    let fx = fixture();
    let bank = fx.bank_account("bank", dec!(100.00));
    fx.ledger
        .record(expense(dec!(30.00), Some(bank.id), date(2024, 4, 1)))
        .unwrap();

    let overviews = fx.accounts.overviews().unwrap();
    assert_eq!(overviews.len(), 1);
    assert_eq!(overviews[0].current_balance, dec!(70.00));

    let history = fx.accounts.history(bank.id).unwrap();
    assert_eq!(history.history.len(), 2);
    assert_eq!(history.history[0].amount, dec!(70.00));
    assert_eq!(history.history[1].amount, dec!(100.00));
}
