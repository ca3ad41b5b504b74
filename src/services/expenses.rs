use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use tokio::sync::{mpsc, oneshot};

use super::gamification::GamificationRequest;
use super::{call, RequestHandler, Service, ServiceError};
use crate::{
    models::expenses::{self, Expense, MonthlySummary, NewExpense},
    repositories::ExpenseStore,
};

pub enum ExpenseRequest {
    ListExpenses {
        user_id: String,
        response: oneshot::Sender<Result<Vec<Expense>, ServiceError>>,
    },
    ListExpensesSince {
        user_id: String,
        since: DateTime<Utc>,
        response: oneshot::Sender<Result<Vec<Expense>, ServiceError>>,
    },
    AddExpense {
        user_id: String,
        expense: NewExpense,
        response: oneshot::Sender<Result<Expense, ServiceError>>,
    },
    DeleteExpense {
        user_id: String,
        expense_id: String,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    CategorySummary {
        user_id: String,
        response: oneshot::Sender<Result<BTreeMap<String, f64>, ServiceError>>,
    },
    MonthlySummary {
        user_id: String,
        income: f64,
        response: oneshot::Sender<Result<MonthlySummary, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct ExpenseRequestHandler {
    repository: Arc<dyn ExpenseStore>,
    gamification_channel: mpsc::Sender<GamificationRequest>,
}

impl ExpenseRequestHandler {
    pub fn new(
        repository: Arc<dyn ExpenseStore>,
        gamification_channel: mpsc::Sender<GamificationRequest>,
    ) -> Self {
        ExpenseRequestHandler {
            repository,
            gamification_channel,
        }
    }

    async fn list_expenses(&self, user_id: &str) -> Result<Vec<Expense>, ServiceError> {
        self.repository
            .list_expenses(user_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }

    async fn list_expenses_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Expense>, ServiceError> {
        self.repository
            .list_expenses_between(user_id, since, None)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }

    async fn add_expense(
        &self,
        user_id: &str,
        expense: NewExpense,
    ) -> Result<Expense, ServiceError> {
        expense.validate().map_err(ServiceError::Validation)?;

        let expense = self
            .repository
            .insert_expense(user_id, expense)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        // The expense stands even when the stats update fails.
        let stats = call(&self.gamification_channel, "Gamification", |response| {
            GamificationRequest::RecordExpense {
                user_id: user_id.to_string(),
                response,
            }
        })
        .await;
        if let Err(e) = stats {
            log::warn!(
                "Could not update gamification after expense {}: {}",
                expense.id,
                e
            );
        }

        Ok(expense)
    }

    async fn delete_expense(&self, user_id: &str, expense_id: &str) -> Result<(), ServiceError> {
        let expense = self
            .repository
            .get_expense(expense_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or_else(|| ServiceError::NotFound("Expense not found".to_string()))?;

        if expense.user_id != user_id {
            log::warn!(
                "User {} tried to delete expense {} owned by {}.",
                user_id,
                expense_id,
                expense.user_id
            );
            return Err(ServiceError::Forbidden("Unauthorized".to_string()));
        }

        let deleted = self
            .repository
            .delete_expense(expense_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;
        if !deleted {
            return Err(ServiceError::NotFound("Expense not found".to_string()));
        }

        Ok(())
    }

    async fn category_summary(
        &self,
        user_id: &str,
    ) -> Result<BTreeMap<String, f64>, ServiceError> {
        let expenses = self.list_expenses(user_id).await?;
        Ok(expenses::totals_by_category(&expenses))
    }

    async fn monthly_summary(
        &self,
        user_id: &str,
        income: f64,
    ) -> Result<MonthlySummary, ServiceError> {
        let now = Utc::now();
        let month_start = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
            .and_then(|day| day.and_hms_opt(0, 0, 0))
            .map(|start| start.and_utc())
            .ok_or_else(|| ServiceError::Internal("Invalid month start".to_string()))?;

        let expenses = self
            .repository
            .list_expenses_between(user_id, month_start, Some(now))
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;
        let total: f64 = expenses.iter().map(|expense| expense.amount).sum();

        Ok(MonthlySummary::compute(income, total))
    }
}

#[async_trait]
impl RequestHandler<ExpenseRequest> for ExpenseRequestHandler {
    async fn handle_request(&self, request: ExpenseRequest) {
        match request {
            ExpenseRequest::ListExpenses { user_id, response } => {
                let expenses = self.list_expenses(&user_id).await;
                let _ = response.send(expenses);
            }
            ExpenseRequest::ListExpensesSince {
                user_id,
                since,
                response,
            } => {
                let expenses = self.list_expenses_since(&user_id, since).await;
                let _ = response.send(expenses);
            }
            ExpenseRequest::AddExpense {
                user_id,
                expense,
                response,
            } => {
                let expense = self.add_expense(&user_id, expense).await;
                let _ = response.send(expense);
            }
            ExpenseRequest::DeleteExpense {
                user_id,
                expense_id,
                response,
            } => {
                let result = self.delete_expense(&user_id, &expense_id).await;
                let _ = response.send(result);
            }
            ExpenseRequest::CategorySummary { user_id, response } => {
                let summary = self.category_summary(&user_id).await;
                let _ = response.send(summary);
            }
            ExpenseRequest::MonthlySummary {
                user_id,
                income,
                response,
            } => {
                let summary = self.monthly_summary(&user_id, income).await;
                let _ = response.send(summary);
            }
        }
    }
}

pub struct ExpenseService;

impl ExpenseService {
    pub fn new() -> Self {
        ExpenseService {}
    }
}

#[async_trait]
impl Service<ExpenseRequest, ExpenseRequestHandler> for ExpenseService {}
