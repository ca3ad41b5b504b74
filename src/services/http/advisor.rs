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
use crate::services::{
    advisor::{AdvisorRequest, AssistantMode},
    call,
};

#[derive(Deserialize)]
pub struct AskBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
pub struct InsightsQuery {
    income: Option<String>,
}

async fn dispatch(
    state: &AppState,
    mode: AssistantMode,
    user_id: Option<String>,
    payload: Result<Json<AskBody>, JsonRejection>,
) -> JsonResponse {
    let body = match json_body(payload) {
        Ok(body) => body,
        Err(e) => return msg_error(e),
    };

    let reply = call(&state.channels.advisor, "Advisor", |response| {
        AdvisorRequest::Ask {
            mode,
            message: body.message,
            user_id,
            response,
        }
    })
    .await;

    match reply {
        Ok(reply) => (StatusCode::OK, Json(json!(reply))),
        Err(e) => msg_error(e),
    }
}

pub async fn ask(
    State(state): State<AppState>,
    Path(mode): Path<String>,
    user: AuthenticatedUser,
    payload: Result<Json<AskBody>, JsonRejection>,
) -> JsonResponse {
    let Ok(mode) = mode.parse::<AssistantMode>() else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "msg": format!("Unknown assistant {}", mode) })),
        );
    };

    dispatch(&state, mode, Some(user.id), payload).await
}

/// Production assistant without authentication or point awards.
pub async fn debug(
    State(state): State<AppState>,
    payload: Result<Json<AskBody>, JsonRejection>,
) -> JsonResponse {
    dispatch(&state, AssistantMode::Production, None, payload).await
}

pub async fn insights(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    query: Result<Query<InsightsQuery>, QueryRejection>,
) -> JsonResponse {
    let query = match query_params(query) {
        Ok(query) => query,
        Err(e) => return msg_error(e),
    };

    let reply = call(&state.channels.advisor, "Advisor", |response| {
        AdvisorRequest::Insights {
            user_id: user.id,
            income: parse_income(query.income.as_deref()),
            response,
        }
    })
    .await;

    match reply {
        Ok(reply) => (StatusCode::OK, Json(json!(reply))),
        Err(e) => msg_error(e),
    }
}
