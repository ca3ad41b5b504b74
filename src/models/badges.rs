use serde::{Deserialize, Serialize};

use super::gamification::Gamification;

#[derive(Clone, Debug, Serialize)]
pub struct Badge {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub points: i64,
}

pub const CATALOG: [Badge; 7] = [
    Badge {
        id: "first_expense",
        name: "First Step",
        description: "Added your first expense",
        icon: "👶",
        points: 10,
    },
    Badge {
        id: "expense_tracker",
        name: "Expense Tracker",
        description: "Added 10 expenses",
        icon: "📝",
        points: 50,
    },
    Badge {
        id: "budget_master",
        name: "Budget Master",
        description: "Added 50 expenses",
        icon: "💰",
        points: 100,
    },
    Badge {
        id: "streak_master",
        name: "Streak Master",
        description: "7-day expense tracking streak",
        icon: "🔥",
        points: 75,
    },
    Badge {
        id: "ai_enthusiast",
        name: "AI Enthusiast",
        description: "Used AI assistant 10 times",
        icon: "🤖",
        points: 60,
    },
    Badge {
        id: "insights_seeker",
        name: "Insights Seeker",
        description: "Generated AI insights",
        icon: "🧠",
        points: 40,
    },
    Badge {
        id: "saver",
        name: "Smart Saver",
        description: "Maintained 20%+ savings rate",
        icon: "💎",
        points: 150,
    },
];

pub fn find(id: &str) -> Option<&'static Badge> {
    CATALOG.iter().find(|badge| badge.id == id)
}

/// The action that just happened, for badges tied to a specific event.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTrigger {
    ExpenseAdded,
    AiChat,
    AiInsights,
}

fn condition_holds(badge: &Badge, stats: &Gamification, trigger: Option<BadgeTrigger>) -> bool {
    match badge.id {
        "first_expense" => {
            trigger == Some(BadgeTrigger::ExpenseAdded) && stats.total_expenses == 1
        }
        "expense_tracker" => stats.total_expenses >= 10,
        "budget_master" => stats.total_expenses >= 50,
        "streak_master" => stats.streak >= 7,
        "insights_seeker" => trigger == Some(BadgeTrigger::AiInsights),
        // ai_enthusiast and saver depend on data this block does not track.
        _ => false,
    }
}

/// Badges not yet held whose unlock condition is met.
pub fn eligible(stats: &Gamification, trigger: Option<BadgeTrigger>) -> Vec<&'static Badge> {
    CATALOG
        .iter()
        .filter(|badge| !stats.has_badge(badge.id))
        .filter(|badge| condition_holds(badge, stats, trigger))
        .collect()
}

#[derive(Clone, Debug, Serialize)]
pub struct BadgeStatus {
    #[serde(flatten)]
    pub badge: &'static Badge,
    pub earned: bool,
    pub eligible: bool,
}

pub fn statuses(stats: &Gamification, trigger: Option<BadgeTrigger>) -> Vec<BadgeStatus> {
    let eligible = eligible(stats, trigger);

    CATALOG
        .iter()
        .map(|badge| BadgeStatus {
            badge,
            earned: stats.has_badge(badge.id),
            eligible: eligible.iter().any(|e| e.id == badge.id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(badges: Vec<&'static Badge>) -> Vec<&'static str> {
        badges.into_iter().map(|badge| badge.id).collect()
    }

    #[test]
    fn first_expense_needs_expense_trigger() {
        let stats = Gamification {
            total_expenses: 1,
            ..Default::default()
        };

        assert_eq!(ids(eligible(&stats, Some(BadgeTrigger::ExpenseAdded))), vec!["first_expense"]);
        assert!(eligible(&stats, Some(BadgeTrigger::AiChat)).is_empty());
    }

    #[test]
    fn held_badges_are_not_eligible_again() {
        let stats = Gamification {
            total_expenses: 12,
            streak: 7,
            badges: vec!["expense_tracker".into()],
            ..Default::default()
        };

        assert_eq!(ids(eligible(&stats, None)), vec!["streak_master"]);
    }

    #[test]
    fn insights_trigger_unlocks_insights_seeker() {
        let stats = Gamification::default();
        assert_eq!(ids(eligible(&stats, Some(BadgeTrigger::AiInsights))), vec!["insights_seeker"]);
    }

    #[test]
    fn statuses_cover_whole_catalog() {
        let stats = Gamification {
            total_expenses: 50,
            badges: vec!["budget_master".into()],
            ..Default::default()
        };
        let statuses = statuses(&stats, None);

        assert_eq!(statuses.len(), CATALOG.len());
        let master = statuses.iter().find(|s| s.badge.id == "budget_master").unwrap();
        assert!(master.earned && !master.eligible);
        let tracker = statuses.iter().find(|s| s.badge.id == "expense_tracker").unwrap();
        assert!(!tracker.earned && tracker.eligible);
    }

    #[test]
    fn trigger_names_follow_client_actions() {
        let trigger: BadgeTrigger = serde_json::from_str(r#""expense_added""#).unwrap();
        assert_eq!(trigger, BadgeTrigger::ExpenseAdded);
        assert!(serde_json::from_str::<BadgeTrigger>(r#""ai_chat""#).is_ok());
        assert!(serde_json::from_str::<BadgeTrigger>(r#""ai_insights""#).is_ok());
    }

    #[test]
    fn find_looks_up_catalog_points() {
        assert_eq!(find("saver").map(|b| b.points), Some(150));
        assert!(find("unknown").is_none());
    }
}
