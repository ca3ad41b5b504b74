use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{
    auth::{self, TokenKeys},
    RequestHandler, Service, ServiceError,
};
use crate::{
    models::users::{self, AuthSession, Credentials, NewUserRecord, Registration, UserProfile},
    repositories::UserStore,
};

pub enum UserRequest {
    Register {
        registration: Registration,
        response: oneshot::Sender<Result<AuthSession, ServiceError>>,
    },
    Login {
        credentials: Credentials,
        response: oneshot::Sender<Result<AuthSession, ServiceError>>,
    },
    GetUser {
        id: String,
        response: oneshot::Sender<Result<users::User, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct UserRequestHandler {
    repository: Arc<dyn UserStore>,
    tokens: TokenKeys,
}

impl UserRequestHandler {
    pub fn new(repository: Arc<dyn UserStore>, tokens: TokenKeys) -> Self {
        UserRequestHandler { repository, tokens }
    }

    fn session(&self, user: &users::User) -> Result<AuthSession, ServiceError> {
        Ok(AuthSession {
            token: self.tokens.issue(&user.id, &user.email)?,
            user: UserProfile::from(user),
        })
    }

    async fn register(&self, registration: Registration) -> Result<AuthSession, ServiceError> {
        let name = registration.name.trim().to_string();
        let email = users::normalize_email(&registration.email);

        if name.is_empty() || email.is_empty() || registration.password.is_empty() {
            return Err(ServiceError::Validation(
                "Name, email and password are required".to_string(),
            ));
        }

        let password_hash = auth::hash_password(registration.password).await?;
        let user = self
            .repository
            .insert_user(NewUserRecord {
                name,
                email,
                password_hash,
            })
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or_else(|| ServiceError::Validation("User already exists".to_string()))?;

        log::info!("Registered user {}.", user.id);
        self.session(&user)
    }

    async fn login(&self, credentials: Credentials) -> Result<AuthSession, ServiceError> {
        let email = users::normalize_email(&credentials.email);
        if email.is_empty() || credentials.password.is_empty() {
            return Err(ServiceError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        let invalid = || ServiceError::Unauthorized("Invalid credentials".to_string());

        let user = self
            .repository
            .get_user_by_email(&email)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or_else(invalid)?;

        if !auth::verify_password(credentials.password, user.password_hash.clone()).await? {
            return Err(invalid());
        }

        self.session(&user)
    }

    async fn get_user(&self, id: &str) -> Result<users::User, ServiceError> {
        self.repository
            .get_user_by_id(id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }
}

#[async_trait]
impl RequestHandler<UserRequest> for UserRequestHandler {
    async fn handle_request(&self, request: UserRequest) {
        match request {
            UserRequest::Register {
                registration,
                response,
            } => {
                let session = self.register(registration).await;
                let _ = response.send(session);
            }
            UserRequest::Login {
                credentials,
                response,
            } => {
                let session = self.login(credentials).await;
                let _ = response.send(session);
            }
            UserRequest::GetUser { id, response } => {
                let user = self.get_user(&id).await;
                let _ = response.send(user);
            }
        }
    }
}

pub struct UserService;

impl UserService {
    pub fn new() -> Self {
        UserService {}
    }
}

#[async_trait]
impl Service<UserRequest, UserRequestHandler> for UserService {}
