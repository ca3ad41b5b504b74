use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::repositories::{assistant::AssistantApi, Stores};
use crate::settings::Settings;

pub mod advisor;
pub mod auth;
pub mod expenses;
pub mod gamification;
pub mod http;
pub mod users;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{message}: {details}")]
    Upstream { message: String, details: String },
    #[error("Database error: {0}")]
    Database(String),
    #[error("Communication error: {0} - {1}")]
    Communication(String, String),
    #[error("Internal error: {0}")]
    Internal(String),
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

/// Sends a request carrying a fresh response channel and waits for the
/// service's answer.
pub async fn call<R, T>(
    channel: &mpsc::Sender<R>,
    service: &str,
    build: impl FnOnce(oneshot::Sender<Result<T, ServiceError>>) -> R,
) -> Result<T, ServiceError> {
    let (response_tx, response_rx) = oneshot::channel();

    channel
        .send(build(response_tx))
        .await
        .map_err(|e| ServiceError::Communication(service.to_string(), e.to_string()))?;

    response_rx
        .await
        .map_err(|e| ServiceError::Communication(service.to_string(), e.to_string()))?
}

#[derive(Clone)]
pub struct Channels {
    pub users: mpsc::Sender<users::UserRequest>,
    pub expenses: mpsc::Sender<expenses::ExpenseRequest>,
    pub gamification: mpsc::Sender<gamification::GamificationRequest>,
    pub advisor: mpsc::Sender<advisor::AdvisorRequest>,
}

/// Spawns every service loop and returns the channels that reach them.
pub fn spawn_services(
    stores: Stores,
    settings: &Settings,
    picker: Arc<dyn advisor::knowledge::ResponsePicker>,
) -> Result<Channels, anyhow::Error> {
    let (user_tx, mut user_rx) = mpsc::channel(512);
    let (expense_tx, mut expense_rx) = mpsc::channel(512);
    let (gamification_tx, mut gamification_rx) = mpsc::channel(512);
    let (advisor_tx, mut advisor_rx) = mpsc::channel(512);

    let mut user_service = users::UserService::new();
    let mut expense_service = expenses::ExpenseService::new();
    let mut gamification_service = gamification::GamificationService::new();
    let mut advisor_service = advisor::AdvisorService::new();

    log::info!("Starting user service.");
    let user_handler = users::UserRequestHandler::new(
        stores.users.clone(),
        auth::TokenKeys::new(&settings.auth),
    );
    tokio::spawn(async move {
        user_service.run(user_handler, &mut user_rx).await;
    });

    log::info!("Starting gamification service.");
    let gamification_handler =
        gamification::GamificationRequestHandler::new(stores.users.clone());
    tokio::spawn(async move {
        gamification_service
            .run(gamification_handler, &mut gamification_rx)
            .await;
    });

    log::info!("Starting expense service.");
    let expense_handler =
        expenses::ExpenseRequestHandler::new(stores.expenses.clone(), gamification_tx.clone());
    tokio::spawn(async move {
        expense_service.run(expense_handler, &mut expense_rx).await;
    });

    log::info!("Starting advisor service.");
    let advisor_handler = advisor::AdvisorRequestHandler::new(
        AssistantApi::new(&settings.assistant)?,
        picker,
        expense_tx.clone(),
        gamification_tx.clone(),
    );
    tokio::spawn(async move {
        advisor_service.run(advisor_handler, &mut advisor_rx).await;
    });

    Ok(Channels {
        users: user_tx,
        expenses: expense_tx,
        gamification: gamification_tx,
        advisor: advisor_tx,
    })
}

pub async fn start_services(stores: Stores, settings: Settings) -> Result<(), anyhow::Error> {
    let channels = spawn_services(
        stores,
        &settings,
        Arc::new(advisor::knowledge::RandomPicker),
    )?;

    log::info!("Starting HTTP server.");
    http::start_http_server(channels, &settings).await
}
