use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::{json_body, message_error, AppState, AuthenticatedUser, JsonResponse};
use crate::models::{badges::BadgeTrigger, gamification::GamificationPatch};
use crate::services::{call, gamification::GamificationRequest, ServiceError};

#[derive(Deserialize)]
pub struct OverwriteBody {
    #[serde(default)]
    stats: GamificationPatch,
}

#[derive(Deserialize)]
pub struct PointsBody {
    points: i64,
    #[serde(default)]
    action: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeBody {
    #[serde(default)]
    badge_id: String,
    points: Option<i64>,
}

#[derive(Deserialize)]
pub struct BadgesQuery {
    trigger: Option<BadgeTrigger>,
}

pub async fn get_stats(State(state): State<AppState>, user: AuthenticatedUser) -> JsonResponse {
    let stats = call(&state.channels.gamification, "Gamification", |response| {
        GamificationRequest::GetStats {
            user_id: user.id,
            response,
        }
    })
    .await;

    match stats {
        Ok(stats) => (StatusCode::OK, Json(json!({ "success": true, "data": stats }))),
        Err(e) => message_error(e),
    }
}

pub async fn overwrite_stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<OverwriteBody>, JsonRejection>,
) -> JsonResponse {
    let body = match json_body(payload) {
        Ok(body) => body,
        Err(e) => return message_error(e),
    };

    let stats = call(&state.channels.gamification, "Gamification", |response| {
        GamificationRequest::OverwriteStats {
            user_id: user.id,
            stats: body.stats,
            response,
        }
    })
    .await;

    match stats {
        Ok(stats) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": stats,
                "message": "Stats updated successfully"
            })),
        ),
        Err(e) => message_error(e),
    }
}

pub async fn award_points(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<PointsBody>, JsonRejection>,
) -> JsonResponse {
    let body = match json_body(payload) {
        Ok(body) => body,
        Err(e) => return message_error(e),
    };
    let message = format!("Awarded {} points for {}", body.points, body.action);

    let award = call(&state.channels.gamification, "Gamification", |response| {
        GamificationRequest::AwardPoints {
            user_id: user.id,
            points: body.points,
            reason: body.action,
            response,
        }
    })
    .await;

    match award {
        Ok(award) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": award.gamification,
                "leveledUp": award.leveled_up,
                "message": message
            })),
        ),
        Err(e) => message_error(e),
    }
}

pub async fn record_expense(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> JsonResponse {
    let stats = call(&state.channels.gamification, "Gamification", |response| {
        GamificationRequest::RecordExpense {
            user_id: user.id,
            response,
        }
    })
    .await;

    match stats {
        Ok(stats) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": stats,
                "message": "Expense stats updated"
            })),
        ),
        Err(e) => message_error(e),
    }
}

pub async fn award_badge(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<BadgeBody>, JsonRejection>,
) -> JsonResponse {
    let body = match json_body(payload) {
        Ok(body) => body,
        Err(e) => return message_error(e),
    };
    let badge_id = body.badge_id.trim().to_string();

    let award = call(&state.channels.gamification, "Gamification", |response| {
        GamificationRequest::AwardBadge {
            user_id: user.id,
            badge_id: badge_id.clone(),
            points: body.points,
            response,
        }
    })
    .await;

    match award {
        Ok(award) if award.newly_awarded => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": award.gamification,
                "newBadge": true,
                "message": format!("Badge {} awarded with {} points", badge_id, award.points)
            })),
        ),
        Ok(award) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": award.gamification,
                "message": "Badge already awarded"
            })),
        ),
        Err(e) => message_error(e),
    }
}

pub async fn list_badges(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    query: Result<Query<BadgesQuery>, QueryRejection>,
) -> JsonResponse {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return message_error(ServiceError::Validation(rejection.body_text())),
    };

    let badges = call(&state.channels.gamification, "Gamification", |response| {
        GamificationRequest::ListBadges {
            user_id: user.id,
            trigger: query.trigger,
            response,
        }
    })
    .await;

    match badges {
        Ok(badges) => (StatusCode::OK, Json(json!({ "success": true, "data": badges }))),
        Err(e) => message_error(e),
    }
}

pub async fn reset_monthly(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> JsonResponse {
    if !state.is_admin(&user.email) {
        log::warn!("User {} is not allowed to reset monthly stats.", user.id);
        return message_error(ServiceError::Forbidden(
            "Not authorized as admin".to_string(),
        ));
    }

    let reset = call(&state.channels.gamification, "Gamification", |response| {
        GamificationRequest::ResetMonthly { response }
    })
    .await;

    match reset {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Monthly stats reset for all users"
            })),
        ),
        Err(e) => message_error(e),
    }
}
