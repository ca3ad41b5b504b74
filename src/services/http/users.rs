use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde_json::json;

use super::{json_body, msg_error, AppState, AuthenticatedUser, JsonResponse};
use crate::models::users::{Credentials, Registration, UserProfile};
use crate::services::{call, users::UserRequest};

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> JsonResponse {
    let registration = match json_body(payload) {
        Ok(registration) => registration,
        Err(e) => return msg_error(e),
    };

    let session = call(&state.channels.users, "User", |response| {
        UserRequest::Register {
            registration,
            response,
        }
    })
    .await;

    match session {
        Ok(session) => (StatusCode::CREATED, Json(json!(session))),
        Err(e) => msg_error(e),
    }
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> JsonResponse {
    let credentials = match json_body(payload) {
        Ok(credentials) => credentials,
        Err(e) => return msg_error(e),
    };

    let session = call(&state.channels.users, "User", |response| {
        UserRequest::Login {
            credentials,
            response,
        }
    })
    .await;

    match session {
        Ok(session) => (StatusCode::OK, Json(json!(session))),
        Err(e) => msg_error(e),
    }
}

pub async fn me(State(state): State<AppState>, user: AuthenticatedUser) -> JsonResponse {
    let found = call(&state.channels.users, "User", |response| UserRequest::GetUser {
        id: user.id,
        response,
    })
    .await;

    match found {
        Ok(found) => (
            StatusCode::OK,
            Json(json!({ "user": UserProfile::from(&found) })),
        ),
        Err(e) => msg_error(e),
    }
}
