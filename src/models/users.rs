use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::gamification::Gamification;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub gamification: Gamification,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What the stores need to create a user row.
#[derive(Clone, Debug)]
pub struct NewUserRecord {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: UserProfile,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
