use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequestParts, Query,
    },
    http::{header::AUTHORIZATION, request::Parts, HeaderValue, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::{auth::TokenKeys, Channels, ServiceError};
use crate::settings::Settings;

mod advisor;
mod expenses;
mod gamification;
mod users;

pub type JsonResponse = (StatusCode, Json<Value>);

#[derive(Clone)]
pub struct AppState {
    pub channels: Channels,
    pub tokens: Arc<TokenKeys>,
    pub admin_emails: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(channels: Channels, settings: &Settings) -> Self {
        AppState {
            channels,
            tokens: Arc::new(TokenKeys::new(&settings.auth)),
            admin_emails: Arc::new(
                settings
                    .auth
                    .admin_emails
                    .iter()
                    .map(|email| email.trim().to_lowercase())
                    .collect(),
            ),
        }
    }

    /// An empty admin list leaves admin routes open to every signed-in user.
    pub fn is_admin(&self, email: &str) -> bool {
        self.admin_emails.is_empty() || self.admin_emails.iter().any(|admin| admin == email)
    }
}

/// Caller identity taken from a `Bearer` token.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = JsonResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                msg_error(ServiceError::Unauthorized(
                    "Not authorized, no token".to_string(),
                ))
            })?;

        let claims = state.tokens.verify(token).map_err(msg_error)?;

        Ok(AuthenticatedUser {
            id: claims.sub,
            email: claims.email,
        })
    }
}

fn status_of(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Upstream { .. }
        | ServiceError::Database(_)
        | ServiceError::Communication(..)
        | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `{ "msg": ... }` body used by the auth, expense, summary and AI routes.
pub fn msg_error(error: ServiceError) -> JsonResponse {
    let status = status_of(&error);
    if status.is_server_error() {
        log::error!("Request failed: {}", error);
    }

    let body = match error {
        ServiceError::Upstream { message, details } => json!({ "msg": message, "error": details }),
        ServiceError::Database(_) | ServiceError::Communication(..) | ServiceError::Internal(_) => {
            json!({ "msg": "Server error" })
        }
        other => json!({ "msg": other.to_string() }),
    };

    (status, Json(body))
}

/// `{ "success": false, "message": ... }` body used by the gamification routes.
pub fn message_error(error: ServiceError) -> JsonResponse {
    let status = status_of(&error);
    if status.is_server_error() {
        log::error!("Gamification request failed: {}", error);
    }

    let body = match error {
        ServiceError::NotFound(message) => json!({ "message": message }),
        _ if status.is_server_error() => json!({ "success": false, "message": "Server error" }),
        other => json!({ "success": false, "message": other.to_string() }),
    };

    (status, Json(body))
}

/// Unwraps a JSON body, turning malformed input into a 400 validation error.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ServiceError::Validation(rejection.body_text()))
}

/// Unwraps a query string the same way as [`json_body`].
pub fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ServiceError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| ServiceError::Validation(rejection.body_text()))
}

/// Reads `income` leniently: blank or non-numeric input counts as absent.
pub fn parse_income(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|raw| !raw.is_empty())
        .and_then(|raw| raw.parse::<f64>().ok())
        .filter(|income| income.is_finite())
}

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let cors = if allowed_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(origin) => Some(origin),
                Err(e) => {
                    log::warn!("Ignoring invalid CORS origin {}: {}", origin, e);
                    None
                }
            })
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let api = Router::new()
        .route("/auth/register", post(users::register))
        .route("/auth/login", post(users::login))
        .route("/auth/me", get(users::me))
        .route(
            "/expenses",
            get(expenses::list_expenses).post(expenses::add_expense),
        )
        .route("/expenses/{id}", delete(expenses::delete_expense))
        .route("/summary/categories", get(expenses::category_summary))
        .route("/summary/monthly", get(expenses::monthly_summary))
        .route(
            "/gamification/stats",
            get(gamification::get_stats).put(gamification::overwrite_stats),
        )
        .route("/gamification/points", post(gamification::award_points))
        .route("/gamification/expense", post(gamification::record_expense))
        .route("/gamification/badge", post(gamification::award_badge))
        .route("/gamification/badges", get(gamification::list_badges))
        .route(
            "/gamification/reset-monthly",
            post(gamification::reset_monthly),
        )
        .route("/ai/debug", post(advisor::debug))
        .route("/ai/insights", get(advisor::insights))
        .route("/ai/{mode}", post(advisor::ask));

    Router::new()
        .route("/", get(|| async { "FinSavvy API is running" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", api)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_http_server(
    channels: Channels,
    settings: &Settings,
) -> Result<(), anyhow::Error> {
    let app = router(
        AppState::new(channels, settings),
        &settings.server.allowed_origins,
    );

    let listener = tokio::net::TcpListener::bind(&settings.server.listen).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
