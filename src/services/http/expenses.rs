use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::{
    json_body, msg_error, parse_income, query_params, AppState, AuthenticatedUser, JsonResponse,
};
use crate::models::expenses::NewExpense;
use crate::services::{call, expenses::ExpenseRequest};

#[derive(Deserialize)]
pub struct MonthlyQuery {
    income: Option<String>,
}

pub async fn list_expenses(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> JsonResponse {
    let expenses = call(&state.channels.expenses, "Expense", |response| {
        ExpenseRequest::ListExpenses {
            user_id: user.id,
            response,
        }
    })
    .await;

    match expenses {
        Ok(expenses) => (StatusCode::OK, Json(json!(expenses))),
        Err(e) => msg_error(e),
    }
}

pub async fn add_expense(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<NewExpense>, JsonRejection>,
) -> JsonResponse {
    let expense = match json_body(payload) {
        Ok(expense) => expense,
        Err(e) => return msg_error(e),
    };

    let created = call(&state.channels.expenses, "Expense", |response| {
        ExpenseRequest::AddExpense {
            user_id: user.id,
            expense,
            response,
        }
    })
    .await;

    match created {
        Ok(created) => (StatusCode::CREATED, Json(json!(created))),
        Err(e) => msg_error(e),
    }
}

pub async fn delete_expense(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(expense_id): Path<String>,
) -> JsonResponse {
    let deleted = call(&state.channels.expenses, "Expense", |response| {
        ExpenseRequest::DeleteExpense {
            user_id: user.id,
            expense_id,
            response,
        }
    })
    .await;

    match deleted {
        Ok(()) => (StatusCode::OK, Json(json!({ "msg": "Deleted successfully" }))),
        Err(e) => msg_error(e),
    }
}

pub async fn category_summary(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> JsonResponse {
    let summary = call(&state.channels.expenses, "Expense", |response| {
        ExpenseRequest::CategorySummary {
            user_id: user.id,
            response,
        }
    })
    .await;

    match summary {
        Ok(summary) => (StatusCode::OK, Json(json!(summary))),
        Err(e) => msg_error(e),
    }
}

pub async fn monthly_summary(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    query: Result<Query<MonthlyQuery>, QueryRejection>,
) -> JsonResponse {
    let query = match query_params(query) {
        Ok(query) => query,
        Err(e) => return msg_error(e),
    };
    let income = parse_income(query.income.as_deref()).unwrap_or(0.0);

    let summary = call(&state.channels.expenses, "Expense", |response| {
        ExpenseRequest::MonthlySummary {
            user_id: user.id,
            income,
            response,
        }
    })
    .await;

    match summary {
        Ok(summary) => (StatusCode::OK, Json(json!(summary))),
        Err(e) => msg_error(e),
    }
}
