use rand::Rng;

/// Source of the index used to choose among candidate responses.
pub trait ResponsePicker: Send + Sync {
    /// Returns an index in `0..candidates`. `candidates` is never zero.
    fn pick(&self, candidates: usize) -> usize;
}

/// Uniform draw from the thread-local RNG.
pub struct RandomPicker;

impl ResponsePicker for RandomPicker {
    fn pick(&self, candidates: usize) -> usize {
        rand::thread_rng().gen_range(0..candidates)
    }
}

pub enum Matcher {
    /// Any keyword is a substring of the lowercased message.
    Any(&'static [&'static str]),
    /// Every keyword is a substring of the lowercased message.
    All(&'static [&'static str]),
}

impl Matcher {
    fn matches(&self, message: &str) -> bool {
        match self {
            Matcher::Any(keywords) => keywords.iter().any(|keyword| message.contains(keyword)),
            Matcher::All(keywords) => keywords.iter().all(|keyword| message.contains(keyword)),
        }
    }
}

pub struct Topic {
    pub category: &'static str,
    pub matcher: Matcher,
    pub responses: &'static [&'static str],
}

pub struct KnowledgeBase {
    topics: &'static [Topic],
    fallback: &'static [&'static str],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Advice {
    pub category: &'static str,
    pub response: &'static str,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Message is required")]
pub struct EmptyMessage;

pub const GENERAL: &str = "general";

impl KnowledgeBase {
    pub const fn new(topics: &'static [Topic], fallback: &'static [&'static str]) -> Self {
        Self { topics, fallback }
    }

    /// First topic in table order whose matcher accepts the message wins.
    /// Unmatched messages draw from the fallback list under `general`.
    pub fn classify(
        &self,
        message: &str,
        picker: &dyn ResponsePicker,
    ) -> Result<Advice, EmptyMessage> {
        if message.trim().is_empty() {
            return Err(EmptyMessage);
        }

        let lowered = message.to_lowercase();
        let (category, responses) = self
            .topics
            .iter()
            .find(|topic| topic.matcher.matches(&lowered))
            .map(|topic| (topic.category, topic.responses))
            .unwrap_or((GENERAL, self.fallback));

        Ok(Advice {
            category,
            response: choose(responses, picker),
        })
    }
}

fn choose(responses: &'static [&'static str], picker: &dyn ResponsePicker) -> &'static str {
    match responses.len() {
        0 => "",
        1 => responses[0],
        n => responses[picker.pick(n).min(n - 1)],
    }
}

pub static PRODUCTION: KnowledgeBase = KnowledgeBase::new(
    &[
        Topic {
            category: "budgeting",
            matcher: Matcher::Any(&["budget", "budgeting", "monthly", "plan", "allocate", "spending plan"]),
            responses: &[
                "Start with the 50/30/20 rule: 50% for needs (rent, utilities, groceries), 30% for wants (entertainment, dining out), and 20% for savings and debt repayment.",
                "Try zero-based budgeting: Give every dollar a job before the month begins. Income minus expenses should equal zero.",
                "Use the envelope method: Allocate cash for each spending category and stick to it.",
                "Track your expenses for 30 days first to see where your money actually goes, then create realistic budget categories.",
            ],
        },
        Topic {
            category: "saving",
            matcher: Matcher::Any(&["save", "saving", "savings", "emergency fund", "rainy day"]),
            responses: &[
                "Build an emergency fund first: Start with $1,000, then work toward 3-6 months of expenses.",
                "Automate your savings: Set up automatic transfers on payday so you 'pay yourself first'.",
                "Use the 52-week challenge: Save the dollar amount equal to the week number (Week 1 = $1, Week 52 = $52).",
                "Open a high-yield savings account to earn more interest on your emergency fund.",
            ],
        },
        Topic {
            category: "debt",
            matcher: Matcher::Any(&["debt", "loan", "credit card", "payoff", "owe"]),
            responses: &[
                "Choose your debt strategy: Snowball (smallest balance first) for motivation, or Avalanche (highest interest first) for math optimization.",
                "Pay minimums on all debts, then put extra money toward one debt using your chosen strategy.",
                "Consider debt consolidation if you have good credit and can get a lower interest rate.",
                "Stop using credit cards while paying off debt to avoid digging a deeper hole.",
            ],
        },
        Topic {
            category: "investing",
            matcher: Matcher::Any(&["invest", "investing", "investment", "stocks", "401k", "ira", "retirement"]),
            responses: &[
                "Start with your employer's 401(k) match - it's free money! Contribute at least enough to get the full match.",
                "Open a Roth IRA and contribute up to the annual limit ($6,500 for 2024, $7,500 if 50+).",
                "Consider low-cost index funds like VTSAX or FZROX for broad market exposure.",
                "Invest regularly using dollar-cost averaging to reduce the impact of market volatility.",
            ],
        },
        Topic {
            category: "creditScore",
            matcher: Matcher::Any(&["credit", "score", "credit report", "credit history"]),
            responses: &[
                "Pay all bills on time - payment history is 35% of your credit score.",
                "Keep credit utilization below 30% (ideally below 10%) of your available credit limits.",
                "Don't close old credit cards - length of credit history matters.",
                "Check your credit report annually at annualcreditreport.com for errors.",
            ],
        },
        Topic {
            category: "income",
            matcher: Matcher::Any(&["income", "salary", "raise", "side hustle", "earn more"]),
            responses: &[
                "Ask for a raise: Research market rates and document your achievements before the conversation.",
                "Develop marketable skills: Take online courses, get certifications, or learn new technologies.",
                "Start a side hustle: Freelancing, tutoring, or selling products can supplement your income.",
                "Consider a career change to a higher-paying field if you've maximized your current role.",
            ],
        },
    ],
    &[
        "I specialize in budgeting, saving, debt management, investing, and credit improvement. What specific financial goal can I help you with?",
        "Personal finance is about spending less than you earn and investing the difference. What area would you like to focus on?",
        "The key to financial success is consistency. Whether it's budgeting, saving, or investing - small actions compound over time.",
        "Financial wellness has four pillars: budgeting, saving, debt management, and investing. Which pillar needs your attention?",
    ],
);

pub static ENHANCED: KnowledgeBase = KnowledgeBase::new(
    &[
        Topic {
            category: "emergencyFund",
            matcher: Matcher::All(&["emergency", "fund"]),
            responses: &["Build an emergency fund with 3-6 months of expenses. Start with $1000, then save 10% of income monthly until you reach your target."],
        },
        Topic {
            category: "creditScore",
            matcher: Matcher::All(&["credit", "score"]),
            responses: &["Improve credit score by: paying bills on time, keeping credit utilization below 30%, don't close old accounts, and check your credit report annually."],
        },
        Topic {
            category: "saving",
            matcher: Matcher::Any(&["save", "saving"]),
            responses: &[
                "Set up automatic transfers to savings (pay yourself first principle)",
                "Use the 52-week challenge: save week number in dollars each week",
                "Cut one subscription and redirect that money to savings",
                "Use cashback apps and redirect earnings to savings account",
            ],
        },
        Topic {
            category: "budgeting",
            matcher: Matcher::Any(&["budget", "budgeting"]),
            responses: &[
                "Try the 50/30/20 rule: 50% needs, 30% wants, 20% savings/debt",
                "Use the envelope method: allocate cash for each spending category",
                "Track expenses for a month to identify spending patterns",
                "Start with zero-based budgeting: assign every dollar a purpose",
            ],
        },
        Topic {
            category: "debt",
            matcher: Matcher::Any(&["debt"]),
            responses: &["Choose debt payoff strategy: Snowball method (smallest balance first) for motivation, or Avalanche method (highest interest first) for math optimization."],
        },
        Topic {
            category: "investing",
            matcher: Matcher::Any(&["invest"]),
            responses: &["Investment basics: Start with index funds, diversify across asset classes, invest regularly (dollar-cost averaging), and think long-term (10+ years)."],
        },
        Topic {
            category: "retirement",
            matcher: Matcher::Any(&["retirement", "401k"]),
            responses: &["Maximize employer 401k match (free money!), then contribute to Roth IRA, then max out 401k. Start early - compound interest is powerful!"],
        },
    ],
    &[
        "Focus on increasing income, reducing expenses, and investing the difference.",
        "Track your net worth monthly to see progress over time.",
        "Automate your finances: bills, savings, and investments.",
        "Read 'The Total Money Makeover' or 'The Simple Path to Wealth' for foundational knowledge.",
    ],
);

pub static SIMPLE: KnowledgeBase = KnowledgeBase::new(
    &[
        Topic {
            category: "saving",
            matcher: Matcher::Any(&["save", "saving"]),
            responses: &["Here are some saving tips: Set up automatic transfers to savings, use the 50/30/20 budgeting rule, and track your expenses daily."],
        },
        Topic {
            category: "budgeting",
            matcher: Matcher::Any(&["budget", "budgeting"]),
            responses: &["For budgeting: Try the envelope method, use budgeting apps, and review your spending monthly to identify areas to cut back."],
        },
        Topic {
            category: "debt",
            matcher: Matcher::Any(&["debt", "loan"]),
            responses: &["For debt management: Pay minimums on all debts, then focus extra payments on highest interest debt first (avalanche method)."],
        },
        Topic {
            category: "investing",
            matcher: Matcher::Any(&["invest", "investment"]),
            responses: &["Investment basics: Start with an emergency fund, consider low-cost index funds, and diversify your portfolio based on your risk tolerance."],
        },
        Topic {
            category: "expenses",
            matcher: Matcher::Any(&["expense", "spending"]),
            responses: &["Track your expenses using apps, categorize spending, and identify unnecessary subscriptions or impulse purchases to reduce."],
        },
    ],
    &["I can help with budgeting, saving, debt management, investments, and expense tracking. What specific financial topic would you like advice on?"],
);

pub static TIPS: KnowledgeBase = KnowledgeBase::new(
    &[],
    &[
        "Here's a great tip: Track your expenses daily to identify spending patterns.",
        "Consider creating a budget with the 50/30/20 rule - 50% needs, 30% wants, 20% savings.",
        "Try the envelope method for budgeting your monthly expenses.",
        "Set up automatic transfers to your savings account to build wealth consistently.",
        "Review your subscriptions monthly and cancel unused services.",
    ],
);

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPicker(usize);

    impl ResponsePicker for FixedPicker {
        fn pick(&self, _candidates: usize) -> usize {
            self.0
        }
    }

    #[test]
    fn emergency_saving_question_is_always_saving() {
        for _ in 0..20 {
            let advice = PRODUCTION
                .classify("How do I save money for emergencies?", &RandomPicker)
                .unwrap();
            assert_eq!(advice.category, "saving");
        }
    }

    #[test]
    fn matching_is_case_insensitive() {
        let advice = PRODUCTION.classify("PAYOFF my LOAN", &FixedPicker(0)).unwrap();
        assert_eq!(advice.category, "debt");
    }

    #[test]
    fn table_order_decides_between_matches() {
        // "monthly" (budgeting) comes before "save" (saving).
        let advice = PRODUCTION
            .classify("how much should I save monthly", &FixedPicker(0))
            .unwrap();
        assert_eq!(advice.category, "budgeting");
    }

    #[test]
    fn picker_selects_the_response() {
        let advice = PRODUCTION.classify("tips on savings", &FixedPicker(2)).unwrap();
        assert!(advice.response.starts_with("Use the 52-week challenge"));
    }

    #[test]
    fn out_of_range_pick_is_clamped() {
        let advice = PRODUCTION.classify("tips on savings", &FixedPicker(99)).unwrap();
        assert!(advice.response.starts_with("Open a high-yield savings account"));
    }

    #[test]
    fn unmatched_message_falls_back_to_general() {
        let advice = PRODUCTION.classify("hello there", &FixedPicker(1)).unwrap();
        assert_eq!(advice.category, GENERAL);
        assert!(advice.response.starts_with("Personal finance is about"));
    }

    #[test]
    fn blank_message_is_rejected() {
        assert_eq!(PRODUCTION.classify("   ", &FixedPicker(0)), Err(EmptyMessage));
    }

    #[test]
    fn all_matcher_needs_every_keyword() {
        let advice = ENHANCED
            .classify("is an emergency fund worth it", &FixedPicker(0))
            .unwrap();
        assert_eq!(advice.category, "emergencyFund");

        let advice = ENHANCED.classify("emergency!", &FixedPicker(0)).unwrap();
        assert_eq!(advice.category, GENERAL);
    }

    #[test]
    fn tips_always_answer_general() {
        let advice = TIPS.classify("budget", &FixedPicker(4)).unwrap();
        assert_eq!(advice.category, GENERAL);
        assert!(advice.response.starts_with("Review your subscriptions"));
    }
}
