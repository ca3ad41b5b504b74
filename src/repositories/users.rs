use crate::models::{
    gamification::{Gamification, GamificationUpdate},
    users::{NewUserRecord, User},
};

use anyhow::bail;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{GamificationMutation, UserStore};

const MAX_UPDATE_ATTEMPTS: usize = 8;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    password_hash: String,
    points: i64,
    level: i64,
    total_expenses: i64,
    expenses_this_month: i64,
    streak: i64,
    last_expense_date: Option<DateTime<Utc>>,
    badges: Vec<String>,
    achievements: Vec<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn gamification(&self) -> Gamification {
        Gamification {
            points: self.points,
            level: self.level,
            total_expenses: self.total_expenses,
            expenses_this_month: self.expenses_this_month,
            streak: self.streak,
            last_expense_date: self.last_expense_date,
            badges: self.badges.clone(),
            achievements: self.achievements.clone(),
        }
    }

    fn into_user(self) -> User {
        let gamification = self.gamification();

        User {
            id: self.id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            gamification,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct UserRepository {
    conn: PgPool,
}

impl UserRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }

    async fn get_row(&self, user_id: &str) -> Result<Option<UserRow>, anyhow::Error> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(row)
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn insert_user(&self, user: NewUserRecord) -> Result<Option<User>, anyhow::Error> {
        let user_id = Uuid::new_v4().hyphenated().to_string();

        let row = sqlx::query_as::<_, UserRow>(
            r#"
                INSERT INTO users (id, name, email, password_hash)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (email) DO NOTHING
                RETURNING *
            "#,
        )
        .bind(&user_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_optional(&self.conn)
        .await?;

        Ok(row.map(UserRow::into_user))
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<User>, anyhow::Error> {
        Ok(self.get_row(user_id).await?.map(UserRow::into_user))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.conn)
            .await?;

        Ok(row.map(UserRow::into_user))
    }

    async fn update_gamification(
        &self,
        user_id: &str,
        mutation: &GamificationMutation<'_>,
    ) -> Result<Option<GamificationUpdate>, anyhow::Error> {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let Some(row) = self.get_row(user_id).await? else {
                return Ok(None);
            };

            let previous = row.gamification();
            let mut current = previous.clone();
            mutation(&mut current);

            let result = sqlx::query(
                r#"
                    UPDATE users SET
                        points = $1,
                        level = $2,
                        total_expenses = $3,
                        expenses_this_month = $4,
                        streak = $5,
                        last_expense_date = $6,
                        badges = $7,
                        achievements = $8,
                        version = version + 1,
                        updated_at = CURRENT_TIMESTAMP
                    WHERE id = $9 AND version = $10
                "#,
            )
            .bind(current.points)
            .bind(current.level)
            .bind(current.total_expenses)
            .bind(current.expenses_this_month)
            .bind(current.streak)
            .bind(current.last_expense_date)
            .bind(&current.badges)
            .bind(&current.achievements)
            .bind(user_id)
            .bind(row.version)
            .execute(&self.conn)
            .await?;

            if result.rows_affected() == 1 {
                return Ok(Some(GamificationUpdate { previous, current }));
            }

            log::debug!(
                "Concurrent gamification update for user {} (attempt {}), retrying.",
                user_id,
                attempt
            );
        }

        bail!(
            "Could not update gamification for user {} after {} attempts",
            user_id,
            MAX_UPDATE_ATTEMPTS
        )
    }

    async fn reset_monthly_counters(&self) -> Result<u64, anyhow::Error> {
        let result = sqlx::query(
            "UPDATE users SET expenses_this_month = 0, version = version + 1, updated_at = CURRENT_TIMESTAMP",
        )
        .execute(&self.conn)
        .await?;

        Ok(result.rows_affected())
    }
}
