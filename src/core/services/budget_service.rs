use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Alert, AlertKind, Budget, BudgetConfig, BudgetStatus, OwnerId};
use crate::errors::{FinanceError, Result};
use crate::ledger::TransactionLedger;
use crate::storage::{Collection, DocumentStore};

/// Budgets, spend-level configuration, and the alerts both generate.
pub struct BudgetService {
    store: Arc<dyn DocumentStore>,
    owner: OwnerId,
    ledger: TransactionLedger,
}

impl BudgetService {
    pub fn new(store: Arc<dyn DocumentStore>, owner: OwnerId) -> Self {
        let ledger = TransactionLedger::new(Arc::clone(&store), owner.clone());
        Self { store, owner, ledger }
    }

    /// Creates or updates the budget for a category.
    pub fn set_budget(&self, category: impl Into<String>, limit: Decimal) -> Result<Budget> {
        let category = category.into();
        if category.trim().is_empty() {
            return Err(FinanceError::validation("category", "must not be empty"));
        }
        if limit < Decimal::ZERO {
            return Err(FinanceError::validation("limit", "must not be negative"));
        }
        if let Some((doc, mut existing)) = self.find_by_category(&category)? {
            existing.limit = limit;
            let body = serde_json::to_value(&existing)?;
            self.store
                .update(Collection::Budgets, &self.owner, &doc.key, doc.version, body)?;
            return Ok(existing);
        }
        let budget = Budget::new(category, limit);
        let body = serde_json::to_value(&budget)?;
        self.store
            .insert(Collection::Budgets, &self.owner, &budget.id.to_string(), body)?;
        Ok(budget)
    }

    pub fn delete_budget(&self, id: Uuid) -> Result<()> {
        self.store
            .delete(Collection::Budgets, &self.owner, &id.to_string())
    }

    pub fn budgets(&self) -> Result<Vec<Budget>> {
        self.store
            .list(Collection::Budgets, &self.owner)?
            .iter()
            .map(|doc| doc.decode())
            .collect()
    }

    /// Spend position for one category in one month. A category without a
    /// budget reports a zero limit.
    pub fn budget_status(&self, category: &str, month: &str, year: &str) -> Result<BudgetStatus> {
        let limit = self
            .find_by_category(category)?
            .map(|(_, budget)| budget.limit)
            .unwrap_or(Decimal::ZERO);
        let summary = self.ledger.monthly_summary(month, year)?;
        let spent = summary
            .by_category
            .get(category)
            .copied()
            .unwrap_or(Decimal::ZERO);
        let percentage = if limit > Decimal::ZERO {
            spent / limit * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };
        Ok(BudgetStatus {
            category: category.to_string(),
            limit,
            spent,
            remaining: limit - spent,
            percentage,
        })
    }

    pub fn all_budget_statuses(&self, month: &str, year: &str) -> Result<Vec<BudgetStatus>> {
        self.budgets()?
            .into_iter()
            .map(|budget| self.budget_status(&budget.category, month, year))
            .collect()
    }

    /// The owner's spend-level configuration, defaulting to disabled levels.
    pub fn config(&self) -> Result<BudgetConfig> {
        match self.store.get_singleton(Collection::BudgetConfigs, &self.owner)? {
            Some(doc) => doc.decode(),
            None => Ok(BudgetConfig::default()),
        }
    }

    pub fn set_levels(&self, levels: Vec<Decimal>) -> Result<BudgetConfig> {
        let config = BudgetConfig::new(levels)?;
        let body = serde_json::to_value(&config)?;
        self.store
            .put_singleton(Collection::BudgetConfigs, &self.owner, body)?;
        info!("updated budget levels");
        Ok(config)
    }

    /// Compares the month's total spend against the configured levels and
    /// raises one alert per newly crossed level. Keys are deterministic per
    /// (level, month, year) so concurrent sweeps cannot duplicate an alert.
    pub fn sweep_spend_alerts(&self, month: &str, year: &str) -> Result<Vec<Alert>> {
        let config = self.config()?;
        let summary = self.ledger.monthly_summary(month, year)?;
        let mut raised = Vec::new();
        for (level, limit) in config.crossed_levels(summary.total_expenses) {
            let key = format!("budget-level-{level}-{month}-{year}");
            let alert = Alert {
                id: key.clone(),
                kind: AlertKind::BudgetLevel,
                title: format!("Budget Limit Reached: Level {level}"),
                message: format!(
                    "Your total spending ({}) has crossed the level {} limit of {}.",
                    summary.total_expenses, level, limit
                ),
                date: Utc::now(),
                is_read: false,
                cleared: false,
                level: Some(level),
                month: month.to_string(),
                year: year.to_string(),
            };
            let body = serde_json::to_value(&alert)?;
            match self.store.insert(Collection::Alerts, &self.owner, &key, body) {
                Ok(_) => {
                    info!(alert = %key, "raised budget level alert");
                    raised.push(alert);
                }
                // Already raised, possibly by another session.
                Err(err) if err.is_retryable() => {}
                Err(err) => return Err(err),
            }
        }
        Ok(raised)
    }

    /// Non-cleared alerts for one month, newest first.
    pub fn alerts(&self, month: &str, year: &str) -> Result<Vec<Alert>> {
        let mut alerts: Vec<Alert> = self
            .store
            .list(Collection::Alerts, &self.owner)?
            .iter()
            .map(|doc| doc.decode())
            .collect::<Result<Vec<Alert>>>()?
            .into_iter()
            .filter(|alert| !alert.cleared && alert.month == month && alert.year == year)
            .collect();
        alerts.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(alerts)
    }

    /// Hides an alert without deleting it, so the next sweep does not raise
    /// it again.
    pub fn clear_alert(&self, id: &str) -> Result<()> {
        self.mutate_alert(id, |alert| alert.cleared = true)
    }

    pub fn mark_alert_read(&self, id: &str) -> Result<()> {
        self.mutate_alert(id, |alert| alert.is_read = true)
    }

    fn mutate_alert<F>(&self, id: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Alert),
    {
        let doc = self
            .store
            .get(Collection::Alerts, &self.owner, id)?
            .ok_or_else(|| FinanceError::not_found("alert", id))?;
        let mut alert: Alert = doc.decode()?;
        mutate(&mut alert);
        let body = serde_json::to_value(&alert)?;
        self.store
            .update(Collection::Alerts, &self.owner, id, doc.version, body)?;
        Ok(())
    }

    fn find_by_category(
        &self,
        category: &str,
    ) -> Result<Option<(crate::storage::Document, Budget)>> {
        for doc in self.store.list(Collection::Budgets, &self.owner)? {
            let budget: Budget = doc.decode()?;
            if budget.category == category {
                return Ok(Some((doc, budget)));
            }
        }
        Ok(None)
    }
}
