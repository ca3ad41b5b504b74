use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::{
    models::{
        badges::{self, BadgeStatus, BadgeTrigger},
        gamification::{Gamification, GamificationPatch, GamificationUpdate},
    },
    repositories::{GamificationMutation, UserStore},
};

pub enum GamificationRequest {
    GetStats {
        user_id: String,
        response: oneshot::Sender<Result<Gamification, ServiceError>>,
    },
    OverwriteStats {
        user_id: String,
        stats: GamificationPatch,
        response: oneshot::Sender<Result<Gamification, ServiceError>>,
    },
    AwardPoints {
        user_id: String,
        points: i64,
        reason: String,
        response: oneshot::Sender<Result<PointsAward, ServiceError>>,
    },
    RecordExpense {
        user_id: String,
        response: oneshot::Sender<Result<Gamification, ServiceError>>,
    },
    AwardBadge {
        user_id: String,
        badge_id: String,
        points: Option<i64>,
        response: oneshot::Sender<Result<BadgeAward, ServiceError>>,
    },
    /// `trigger` names the action that just happened, for event-bound badges.
    ListBadges {
        user_id: String,
        trigger: Option<BadgeTrigger>,
        response: oneshot::Sender<Result<Vec<BadgeStatus>, ServiceError>>,
    },
    ResetMonthly {
        response: oneshot::Sender<Result<u64, ServiceError>>,
    },
}

#[derive(Clone, Debug)]
pub struct PointsAward {
    pub gamification: Gamification,
    pub leveled_up: bool,
}

#[derive(Clone, Debug)]
pub struct BadgeAward {
    pub gamification: Gamification,
    pub newly_awarded: bool,
    /// Points granted with the badge, zero when it was already held.
    pub points: i64,
}

#[derive(Clone)]
pub struct GamificationRequestHandler {
    repository: Arc<dyn UserStore>,
}

impl GamificationRequestHandler {
    pub fn new(repository: Arc<dyn UserStore>) -> Self {
        GamificationRequestHandler { repository }
    }

    async fn update(
        &self,
        user_id: &str,
        mutation: &GamificationMutation<'_>,
    ) -> Result<GamificationUpdate, ServiceError> {
        self.repository
            .update_gamification(user_id, mutation)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    async fn get_stats(&self, user_id: &str) -> Result<Gamification, ServiceError> {
        self.repository
            .get_user_by_id(user_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .map(|user| user.gamification)
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    async fn overwrite_stats(
        &self,
        user_id: &str,
        stats: GamificationPatch,
    ) -> Result<Gamification, ServiceError> {
        let patch = stats.validate().map_err(ServiceError::Validation)?;

        let update = self
            .update(user_id, &|g: &mut Gamification| g.apply_patch(&patch))
            .await?;

        Ok(update.current)
    }

    async fn award_points(
        &self,
        user_id: &str,
        points: i64,
        reason: &str,
    ) -> Result<PointsAward, ServiceError> {
        let update = self
            .update(user_id, &|g: &mut Gamification| {
                g.award_points(points);
            })
            .await?;

        log::info!("Awarded {} points to {} for {}.", points, user_id, reason);
        if update.leveled_up() {
            log::info!("User {} reached level {}.", user_id, update.current.level);
        }

        Ok(PointsAward {
            leveled_up: update.leveled_up(),
            gamification: update.current,
        })
    }

    async fn record_expense(&self, user_id: &str) -> Result<Gamification, ServiceError> {
        let now = Utc::now();
        let update = self
            .update(user_id, &|g: &mut Gamification| {
                g.record_expense_activity(now);
            })
            .await?;

        Ok(update.current)
    }

    async fn award_badge(
        &self,
        user_id: &str,
        badge_id: &str,
        points: Option<i64>,
    ) -> Result<BadgeAward, ServiceError> {
        let badge_id = badge_id.trim();
        if badge_id.is_empty() {
            return Err(ServiceError::Validation("badgeId is required".to_string()));
        }

        let points = points
            .or_else(|| badges::find(badge_id).map(|badge| badge.points))
            .unwrap_or(0);

        let update = self
            .update(user_id, &|g: &mut Gamification| {
                g.award_badge(badge_id, points);
            })
            .await?;

        let newly_awarded = update.newly_awarded(badge_id);
        if newly_awarded {
            log::info!("User {} earned badge {}.", user_id, badge_id);
        }

        Ok(BadgeAward {
            gamification: update.current,
            newly_awarded,
            points: if newly_awarded { points } else { 0 },
        })
    }

    async fn list_badges(
        &self,
        user_id: &str,
        trigger: Option<BadgeTrigger>,
    ) -> Result<Vec<BadgeStatus>, ServiceError> {
        let stats = self.get_stats(user_id).await?;
        Ok(badges::statuses(&stats, trigger))
    }

    async fn reset_monthly(&self) -> Result<u64, ServiceError> {
        let count = self
            .repository
            .reset_monthly_counters()
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        log::info!("Reset monthly counters for {} users.", count);
        Ok(count)
    }
}

#[async_trait]
impl RequestHandler<GamificationRequest> for GamificationRequestHandler {
    async fn handle_request(&self, request: GamificationRequest) {
        match request {
            GamificationRequest::GetStats { user_id, response } => {
                let stats = self.get_stats(&user_id).await;
                let _ = response.send(stats);
            }
            GamificationRequest::OverwriteStats {
                user_id,
                stats,
                response,
            } => {
                let stats = self.overwrite_stats(&user_id, stats).await;
                let _ = response.send(stats);
            }
            GamificationRequest::AwardPoints {
                user_id,
                points,
                reason,
                response,
            } => {
                let award = self.award_points(&user_id, points, &reason).await;
                let _ = response.send(award);
            }
            GamificationRequest::RecordExpense { user_id, response } => {
                let stats = self.record_expense(&user_id).await;
                let _ = response.send(stats);
            }
            GamificationRequest::AwardBadge {
                user_id,
                badge_id,
                points,
                response,
            } => {
                let award = self.award_badge(&user_id, &badge_id, points).await;
                let _ = response.send(award);
            }
            GamificationRequest::ListBadges {
                user_id,
                trigger,
                response,
            } => {
                let statuses = self.list_badges(&user_id, trigger).await;
                let _ = response.send(statuses);
            }
            GamificationRequest::ResetMonthly { response } => {
                let count = self.reset_monthly().await;
                let _ = response.send(count);
            }
        }
    }
}

pub struct GamificationService;

impl GamificationService {
    pub fn new() -> Self {
        GamificationService {}
    }
}

#[async_trait]
impl Service<GamificationRequest, GamificationRequestHandler> for GamificationService {}
