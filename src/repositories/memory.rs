use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    expenses::{Expense, NewExpense},
    gamification::{Gamification, GamificationUpdate},
    users::{NewUserRecord, User},
};

use super::{ExpenseStore, GamificationMutation, UserStore};

/// Process-local store for development runs and tests. Every mutation
/// happens under the write lock, which makes gamification updates atomic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<String, User>>>,
    expenses: Arc<RwLock<Vec<Expense>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUserRecord) -> Result<Option<User>, anyhow::Error> {
        let mut users = self.users.write().await;
        if users.values().any(|existing| existing.email == user.email) {
            return Ok(None);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().hyphenated().to_string(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            gamification: Gamification::default(),
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id.clone(), user.clone());

        Ok(Some(user))
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<User>, anyhow::Error> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error> {
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    async fn update_gamification(
        &self,
        user_id: &str,
        mutation: &GamificationMutation<'_>,
    ) -> Result<Option<GamificationUpdate>, anyhow::Error> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(user_id) else {
            return Ok(None);
        };

        let previous = user.gamification.clone();
        mutation(&mut user.gamification);
        user.updated_at = Utc::now();

        Ok(Some(GamificationUpdate {
            previous,
            current: user.gamification.clone(),
        }))
    }

    async fn reset_monthly_counters(&self) -> Result<u64, anyhow::Error> {
        let mut users = self.users.write().await;
        for user in users.values_mut() {
            user.gamification.reset_monthly_counters();
        }

        Ok(users.len() as u64)
    }
}

#[async_trait]
impl ExpenseStore for MemoryStore {
    async fn insert_expense(
        &self,
        user_id: &str,
        expense: NewExpense,
    ) -> Result<Expense, anyhow::Error> {
        let now = Utc::now();
        let expense = Expense {
            id: Uuid::new_v4().hyphenated().to_string(),
            user_id: user_id.to_string(),
            title: expense.title.trim().to_string(),
            amount: expense.amount,
            category: expense.category.trim().to_string(),
            date: expense.date.unwrap_or(now),
            created_at: now,
        };
        self.expenses.write().await.push(expense.clone());

        Ok(expense)
    }

    async fn list_expenses(&self, user_id: &str) -> Result<Vec<Expense>, anyhow::Error> {
        let expenses = self.expenses.read().await;
        Ok(expenses
            .iter()
            .filter(|expense| expense.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_expenses_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Expense>, anyhow::Error> {
        let expenses = self.expenses.read().await;
        Ok(expenses
            .iter()
            .filter(|expense| expense.user_id == user_id)
            .filter(|expense| expense.date >= from && to.map_or(true, |to| expense.date <= to))
            .cloned()
            .collect())
    }

    async fn get_expense(&self, expense_id: &str) -> Result<Option<Expense>, anyhow::Error> {
        let expenses = self.expenses.read().await;
        Ok(expenses.iter().find(|expense| expense.id == expense_id).cloned())
    }

    async fn delete_expense(&self, expense_id: &str) -> Result<bool, anyhow::Error> {
        let mut expenses = self.expenses.write().await;
        let before = expenses.len();
        expenses.retain(|expense| expense.id != expense_id);

        Ok(expenses.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::gamification::Gamification;

    fn record(email: &str) -> NewUserRecord {
        NewUserRecord {
            name: "Asha".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        assert!(store.insert_user(record("a@example.com")).await.unwrap().is_some());
        assert!(store.insert_user(record("a@example.com")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_user_update_returns_none() {
        let store = MemoryStore::new();
        let update = store
            .update_gamification("nobody", &|g: &mut Gamification| {
                g.award_points(5);
            })
            .await
            .unwrap();
        assert!(update.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_awards_are_all_reflected() {
        let store = MemoryStore::new();
        let user = store.insert_user(record("b@example.com")).await.unwrap().unwrap();

        let mut tasks = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            let user_id = user.id.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .update_gamification(&user_id, &|g: &mut Gamification| {
                        g.award_points(3);
                    })
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let stats = store.get_user_by_id(&user.id).await.unwrap().unwrap().gamification;
        assert_eq!(stats.points, 150);
        assert_eq!(stats.level, 2);
    }

    #[tokio::test]
    async fn reset_clears_monthly_counter_for_everyone() {
        let store = MemoryStore::new();
        let first = store.insert_user(record("c@example.com")).await.unwrap().unwrap();
        let second = store.insert_user(record("d@example.com")).await.unwrap().unwrap();
        for user in [&first, &second] {
            store
                .update_gamification(&user.id, &|g: &mut Gamification| {
                    g.record_expense_activity(Utc::now());
                })
                .await
                .unwrap();
        }

        assert_eq!(store.reset_monthly_counters().await.unwrap(), 2);
        for user in [&first, &second] {
            let stats = store.get_user_by_id(&user.id).await.unwrap().unwrap().gamification;
            assert_eq!(stats.expenses_this_month, 0);
            assert_eq!(stats.total_expenses, 1);
        }
    }

    #[tokio::test]
    async fn expenses_are_scoped_to_owner() {
        let store = MemoryStore::new();
        let new_expense = NewExpense {
            title: "Lunch".to_string(),
            amount: 12.0,
            category: "food".to_string(),
            date: None,
        };
        let expense = store.insert_expense("owner", new_expense).await.unwrap();

        assert_eq!(store.list_expenses("owner").await.unwrap().len(), 1);
        assert!(store.list_expenses("someone-else").await.unwrap().is_empty());
        assert!(store.delete_expense(&expense.id).await.unwrap());
        assert!(!store.delete_expense(&expense.id).await.unwrap());
    }

    #[tokio::test]
    async fn open_window_includes_future_dated_expenses() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let future = NewExpense {
            title: "Concert".to_string(),
            amount: 40.0,
            category: "entertainment".to_string(),
            date: Some(now + chrono::Duration::days(10)),
        };
        store.insert_expense("owner", future).await.unwrap();

        let since = now - chrono::Duration::days(30);
        assert_eq!(store.list_expenses_between("owner", since, None).await.unwrap().len(), 1);
        assert!(store
            .list_expenses_between("owner", since, Some(now))
            .await
            .unwrap()
            .is_empty());
    }
}
