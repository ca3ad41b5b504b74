use crate::models::expenses::{Expense, NewExpense};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::ExpenseStore;

#[derive(Clone)]
pub struct ExpenseRepository {
    conn: PgPool,
}

impl ExpenseRepository {
    pub fn new(conn: PgPool) -> Self {
        ExpenseRepository { conn }
    }
}

#[async_trait]
impl ExpenseStore for ExpenseRepository {
    async fn insert_expense(
        &self,
        user_id: &str,
        expense: NewExpense,
    ) -> Result<Expense, anyhow::Error> {
        let expense_id = Uuid::new_v4().hyphenated().to_string();
        let now = Utc::now();

        let expense = sqlx::query_as::<_, Expense>(
            r#"INSERT INTO expenses
            (id, user_id, title, amount, category, date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&expense_id)
        .bind(user_id)
        .bind(expense.title.trim())
        .bind(expense.amount)
        .bind(expense.category.trim())
        .bind(expense.date.unwrap_or(now))
        .bind(now)
        .fetch_one(&self.conn)
        .await?;

        Ok(expense)
    }

    async fn list_expenses(&self, user_id: &str) -> Result<Vec<Expense>, anyhow::Error> {
        let expenses = sqlx::query_as::<_, Expense>(
            "SELECT * FROM expenses WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(expenses)
    }

    async fn list_expenses_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Expense>, anyhow::Error> {
        let expenses = sqlx::query_as::<_, Expense>(
            r#"SELECT * FROM expenses
            WHERE user_id = $1 AND date >= $2 AND ($3::timestamptz IS NULL OR date <= $3)
            ORDER BY created_at"#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.conn)
        .await?;

        Ok(expenses)
    }

    async fn get_expense(&self, expense_id: &str) -> Result<Option<Expense>, anyhow::Error> {
        let expense = sqlx::query_as::<_, Expense>("SELECT * FROM expenses WHERE id = $1")
            .bind(expense_id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(expense)
    }

    async fn delete_expense(&self, expense_id: &str) -> Result<bool, anyhow::Error> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(expense_id)
            .execute(&self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
