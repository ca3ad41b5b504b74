use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const POINTS_PER_LEVEL: i64 = 100;
pub const EXPENSE_POINTS: i64 = 5;
pub const AI_CHAT_POINTS: i64 = 5;
pub const AI_INSIGHTS_POINTS: i64 = 15;

/// Per-user gamification block. Serialized in the camelCase shape the web
/// client reads.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Gamification {
    pub points: i64,
    pub level: i64,
    pub total_expenses: i64,
    pub expenses_this_month: i64,
    pub streak: i64,
    pub last_expense_date: Option<DateTime<Utc>>,
    pub badges: Vec<String>,
    pub achievements: Vec<String>,
}

impl Default for Gamification {
    fn default() -> Self {
        Self {
            points: 0,
            level: 1,
            total_expenses: 0,
            expenses_this_month: 0,
            streak: 0,
            last_expense_date: None,
            badges: Vec::new(),
            achievements: Vec::new(),
        }
    }
}

pub fn level_for(points: i64) -> i64 {
    points.max(0) / POINTS_PER_LEVEL + 1
}

impl Gamification {
    fn recompute_level(&mut self) {
        self.level = level_for(self.points);
    }

    /// Adds `points` (negative amounts saturate at zero) and returns whether
    /// the level went up.
    pub fn award_points(&mut self, points: i64) -> bool {
        let previous_level = self.level;
        self.points = self.points.saturating_add(points).max(0);
        self.recompute_level();

        self.level > previous_level
    }

    pub fn record_expense_activity(&mut self, now: DateTime<Utc>) {
        self.streak = match self.last_expense_date {
            None => 1,
            Some(last) => match (now.date_naive() - last.date_naive()).num_days() {
                0 => self.streak,
                1 => self.streak.saturating_add(1),
                _ => 1,
            },
        };

        self.total_expenses = self.total_expenses.saturating_add(1);
        self.expenses_this_month = self.expenses_this_month.saturating_add(1);
        self.last_expense_date = Some(now);
        self.award_points(EXPENSE_POINTS);
    }

    /// Returns false, leaving everything untouched, when the badge is
    /// already held.
    pub fn award_badge(&mut self, badge_id: &str, points: i64) -> bool {
        if self.has_badge(badge_id) {
            return false;
        }

        self.badges.push(badge_id.to_string());
        self.award_points(points);
        true
    }

    pub fn has_badge(&self, badge_id: &str) -> bool {
        self.badges.iter().any(|badge| badge == badge_id)
    }

    pub fn reset_monthly_counters(&mut self) {
        self.expenses_this_month = 0;
    }

    /// Bulk overwrite from the stats endpoint. The level is always derived
    /// from the resulting points.
    pub fn apply_patch(&mut self, patch: &ValidatedPatch) {
        let ValidatedPatch(patch) = patch;

        if let Some(points) = patch.points {
            self.points = points;
        }
        if let Some(total_expenses) = patch.total_expenses {
            self.total_expenses = total_expenses;
        }
        if let Some(expenses_this_month) = patch.expenses_this_month {
            self.expenses_this_month = expenses_this_month;
        }
        if let Some(streak) = patch.streak {
            self.streak = streak;
        }
        if let Some(last_expense_date) = patch.last_expense_date {
            self.last_expense_date = last_expense_date;
        }
        if let Some(badges) = &patch.badges {
            self.badges = dedup(badges);
        }
        if let Some(achievements) = &patch.achievements {
            self.achievements = dedup(achievements);
        }

        self.recompute_level();
    }
}

fn dedup(values: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(value) {
            unique.push(value.clone());
        }
    }
    unique
}

fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Partial gamification block. A `level` field sent by the client is
/// accepted and ignored.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamificationPatch {
    pub points: Option<i64>,
    pub level: Option<i64>,
    pub total_expenses: Option<i64>,
    pub expenses_this_month: Option<i64>,
    pub streak: Option<i64>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub last_expense_date: Option<Option<DateTime<Utc>>>,
    pub badges: Option<Vec<String>>,
    pub achievements: Option<Vec<String>>,
}

/// A patch whose counters are known to be non-negative.
#[derive(Clone, Debug)]
pub struct ValidatedPatch(GamificationPatch);

impl GamificationPatch {
    pub fn validate(self) -> Result<ValidatedPatch, String> {
        let counters = [
            ("points", self.points),
            ("totalExpenses", self.total_expenses),
            ("expensesThisMonth", self.expenses_this_month),
            ("streak", self.streak),
        ];

        for (name, value) in counters {
            if matches!(value, Some(v) if v < 0) {
                return Err(format!("{} must not be negative", name));
            }
        }

        Ok(ValidatedPatch(self))
    }
}

/// State before and after a single atomic gamification mutation.
#[derive(Clone, Debug)]
pub struct GamificationUpdate {
    pub previous: Gamification,
    pub current: Gamification,
}

impl GamificationUpdate {
    pub fn leveled_up(&self) -> bool {
        self.current.level > self.previous.level
    }

    pub fn newly_awarded(&self, badge_id: &str) -> bool {
        !self.previous.has_badge(badge_id) && self.current.has_badge(badge_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn level_tracks_points_after_every_award() {
        let mut stats = Gamification::default();
        for points in [5, 95, 1, 250, -40, 0, 3, -1000, 199] {
            stats.award_points(points);
            assert_eq!(stats.level, stats.points / 100 + 1);
            assert!(stats.points >= 0);
        }
    }

    #[test]
    fn award_reports_level_up() {
        let mut stats = Gamification::default();
        assert!(!stats.award_points(99));
        assert!(stats.award_points(1));
        assert_eq!(stats.level, 2);
    }

    #[test]
    fn negative_award_saturates_at_zero() {
        let mut stats = Gamification::default();
        stats.award_points(30);
        stats.award_points(-100);
        assert_eq!(stats.points, 0);
        assert_eq!(stats.level, 1);
    }

    #[test]
    fn first_expense_starts_streak() {
        let mut stats = Gamification::default();
        stats.record_expense_activity(at(1, 9));

        assert_eq!(stats.streak, 1);
        assert_eq!(stats.total_expenses, 1);
        assert_eq!(stats.expenses_this_month, 1);
        assert_eq!(stats.points, EXPENSE_POINTS);
        assert_eq!(stats.last_expense_date, Some(at(1, 9)));
    }

    #[test]
    fn same_day_expenses_keep_streak() {
        let mut stats = Gamification::default();
        stats.record_expense_activity(at(1, 9));
        stats.record_expense_activity(at(1, 22));

        assert_eq!(stats.streak, 1);
        assert_eq!(stats.total_expenses, 2);
        assert_eq!(stats.expenses_this_month, 2);
    }

    #[test]
    fn consecutive_days_extend_streak() {
        let mut stats = Gamification::default();
        for day in 1..=5 {
            stats.record_expense_activity(at(day, 23));
            assert_eq!(stats.streak, i64::from(day));
        }
    }

    #[test]
    fn late_night_then_early_morning_counts_as_next_day() {
        let mut stats = Gamification::default();
        stats.record_expense_activity(at(1, 23));
        stats.record_expense_activity(at(1, 23) + Duration::hours(2));
        assert_eq!(stats.streak, 2);
    }

    #[test]
    fn gap_resets_streak() {
        let mut stats = Gamification::default();
        stats.record_expense_activity(at(1, 9));
        stats.record_expense_activity(at(2, 9));
        assert_eq!(stats.streak, 2);

        stats.record_expense_activity(at(4, 9));
        assert_eq!(stats.streak, 1);
        assert_eq!(stats.total_expenses, 3);
    }

    #[test]
    fn badge_award_is_idempotent() {
        let mut stats = Gamification::default();
        assert!(stats.award_badge("first_expense", 10));
        let after_first = stats.clone();

        assert!(!stats.award_badge("first_expense", 10));
        assert_eq!(stats, after_first);
        assert_eq!(stats.badges, vec!["first_expense".to_string()]);
        assert_eq!(stats.points, 10);
    }

    #[test]
    fn patch_recomputes_level_and_dedups() {
        let mut stats = Gamification::default();
        let patch = GamificationPatch {
            points: Some(350),
            level: Some(42),
            badges: Some(vec!["saver".into(), "saver".into(), "first_expense".into()]),
            ..Default::default()
        };

        stats.apply_patch(&patch.validate().unwrap());
        assert_eq!(stats.level, 4);
        assert_eq!(stats.badges, vec!["saver".to_string(), "first_expense".to_string()]);
    }

    #[test]
    fn patch_rejects_negative_counters() {
        let patch = GamificationPatch {
            streak: Some(-1),
            ..Default::default()
        };

        assert_eq!(patch.validate().unwrap_err(), "streak must not be negative");
    }

    #[test]
    fn counters_saturate_instead_of_overflowing() {
        let mut stats = Gamification {
            streak: i64::MAX,
            total_expenses: i64::MAX,
            expenses_this_month: i64::MAX,
            last_expense_date: Some(at(1, 9)),
            ..Default::default()
        };
        stats.record_expense_activity(at(2, 9));

        assert_eq!(stats.streak, i64::MAX);
        assert_eq!(stats.total_expenses, i64::MAX);
        assert_eq!(stats.expenses_this_month, i64::MAX);
        assert_eq!(stats.points, EXPENSE_POINTS);
    }

    #[test]
    fn patch_distinguishes_null_from_missing_date() {
        let cleared: GamificationPatch =
            serde_json::from_str(r#"{"lastExpenseDate": null}"#).unwrap();
        assert_eq!(cleared.last_expense_date, Some(None));

        let untouched: GamificationPatch = serde_json::from_str(r#"{"points": 3}"#).unwrap();
        assert_eq!(untouched.last_expense_date, None);
    }
}
