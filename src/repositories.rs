use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;

use crate::models::{
    expenses::{Expense, NewExpense},
    gamification::{Gamification, GamificationUpdate},
    users::{NewUserRecord, User},
};
use crate::settings::{Settings, StorageBackend};

pub mod assistant;
pub mod expenses;
pub mod memory;
pub mod users;

/// A mutation applied to one user's gamification block as a single unit.
pub type GamificationMutation<'a> = dyn Fn(&mut Gamification) + Send + Sync + 'a;

#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Returns `None` when the email is already taken.
    async fn insert_user(&self, user: NewUserRecord) -> Result<Option<User>, anyhow::Error>;

    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<User>, anyhow::Error>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error>;

    /// Applies `mutation` atomically with respect to other updates of the
    /// same user. Returns `None` when the user does not exist.
    async fn update_gamification(
        &self,
        user_id: &str,
        mutation: &GamificationMutation<'_>,
    ) -> Result<Option<GamificationUpdate>, anyhow::Error>;

    /// Returns the number of users touched.
    async fn reset_monthly_counters(&self) -> Result<u64, anyhow::Error>;
}

#[async_trait]
pub trait ExpenseStore: Send + Sync + 'static {
    async fn insert_expense(
        &self,
        user_id: &str,
        expense: NewExpense,
    ) -> Result<Expense, anyhow::Error>;

    async fn list_expenses(&self, user_id: &str) -> Result<Vec<Expense>, anyhow::Error>;

    /// A missing `to` leaves the window open towards the future.
    async fn list_expenses_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Expense>, anyhow::Error>;

    async fn get_expense(&self, expense_id: &str) -> Result<Option<Expense>, anyhow::Error>;

    /// Returns whether a row was removed.
    async fn delete_expense(&self, expense_id: &str) -> Result<bool, anyhow::Error>;
}

#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub expenses: Arc<dyn ExpenseStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        let store = memory::MemoryStore::new();

        Self {
            users: Arc::new(store.clone()),
            expenses: Arc::new(store),
        }
    }

    pub async fn connect(settings: &Settings) -> Result<Self, anyhow::Error> {
        match settings.storage.backend {
            StorageBackend::Memory => {
                log::warn!("Using in-memory storage, data is lost on restart.");
                Ok(Self::in_memory())
            }
            StorageBackend::Postgres => {
                let conn = PgPoolOptions::new()
                    .max_connections(settings.postgres.max_connections)
                    .connect(&settings.postgres.url)
                    .await?;

                if settings.postgres.run_migrations {
                    log::info!("Running database migrations.");
                    sqlx::migrate!("./migrations").run(&conn).await?;
                }

                Ok(Self {
                    users: Arc::new(users::UserRepository::new(conn.clone())),
                    expenses: Arc::new(expenses::ExpenseRepository::new(conn)),
                })
            }
        }
    }
}
