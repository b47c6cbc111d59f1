use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::{BETTER_VIEW_IMPORTANCE, DEFAULT_LIMIT, MIN_ALLOWED_PRICE};
use crate::preferences::{AcImportance, LocationPreference, Preferences};
use crate::scoring::{MatchTier, Recommendation, ScoringWeights, format_price, rank};
use crate::seat::Seat;

/// A relative adjustment applied after an initial recommendation set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Refinement {
    Cheaper,
    BetterView,
    FrontSection,
    WithAc,
    NoAc,
}

impl Refinement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cheaper => "cheaper",
            Self::BetterView => "better_view",
            Self::FrontSection => "front_section",
            Self::WithAc => "with_ac",
            Self::NoAc => "no_ac",
        }
    }

    /// Recognise a refinement request in free text ("show cheaper",
    /// "I need AC", "AC is not important"). Negated AC phrasing is checked
    /// before the positive form.
    pub fn parse(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        if CHEAPER.is_match(&lower) {
            Some(Self::Cheaper)
        } else if NO_AC.is_match(&lower) {
            Some(Self::NoAc)
        } else if WITH_AC.is_match(&lower) {
            Some(Self::WithAc)
        } else if BETTER_VIEW.is_match(&lower) {
            Some(Self::BetterView)
        } else if FRONT.is_match(&lower) {
            Some(Self::FrontSection)
        } else {
            None
        }
    }
}

static CHEAPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(cheaper|less expensive|lower price|cheapest)\b").unwrap());
static NO_AC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(no ac|without ac|no air.?conditioning)\b|\b(ac|air.?conditioning)\b.*\b(not important|doesn.?t matter|don.?t care|not needed)\b",
    )
    .unwrap()
});
static WITH_AC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(need|with|want|require|must have)\b.*\b(ac|air.?conditioning)\b").unwrap()
});
static BETTER_VIEW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(better|best|great|improved)\b.*\bview\b").unwrap());
static FRONT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bfront\b").unwrap());

/// Why a refinement could not be applied.
#[derive(Debug, Clone, PartialEq)]
pub enum RefineError {
    /// "Cheaper" was requested before any recommendations were shown.
    NoPriorResults,
    /// The price floor is not below the cheapest previous recommendation.
    PriceFloorReached { floor: f64, cheapest: f64 },
}

impl fmt::Display for RefineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefineError::NoPriorResults => {
                write!(f, "no prior recommendations to compare against")
            }
            RefineError::PriceFloorReached { floor, cheapest } => write!(
                f,
                "already at the lowest price range (cheapest ${}, floor ${})",
                format_price(*cheapest),
                format_price(*floor)
            ),
        }
    }
}

impl std::error::Error for RefineError {}

/// Apply `refinement` to `current`, deriving a new model. `previous_prices`
/// are the prices of the last recommendation set shown to the user.
pub fn refine(
    current: &Preferences,
    refinement: Refinement,
    previous_prices: &[f64],
) -> Result<Preferences, RefineError> {
    match refinement {
        Refinement::Cheaper => {
            let cheapest = previous_prices
                .iter()
                .copied()
                .filter(|p| p.is_finite())
                .min_by(f64::total_cmp)
                .ok_or(RefineError::NoPriorResults)?;
            let budget = (cheapest - 1.0).max(MIN_ALLOWED_PRICE);
            if budget >= cheapest {
                return Err(RefineError::PriceFloorReached {
                    floor: MIN_ALLOWED_PRICE,
                    cheapest,
                });
            }
            let mut next = current.with_budget_max(Some(budget));
            next.strict_budget = true;
            Ok(next)
        }
        Refinement::BetterView => Ok(current
            .with_view_importance(current.view_importance.max(BETTER_VIEW_IMPORTANCE))),
        Refinement::FrontSection => {
            Ok(current.with_location(Some(LocationPreference::Front)))
        }
        Refinement::WithAc => Ok(current.with_ac(AcImportance::Required)),
        Refinement::NoAc => Ok(current.with_ac(AcImportance::Optional)),
    }
}

/// A ranked recommendation set with presentation metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub recommendations: Vec<Recommendation>,
    pub total_available: usize,
    pub preferences_used: Preferences,
    pub summary: String,
}

impl RecommendationSet {
    pub fn prices(&self) -> Vec<f64> {
        self.recommendations.iter().map(|r| r.seat.price).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.recommendations.is_empty()
    }
}

/// Orchestrates scoring over the catalog and produces summaries.
#[derive(Clone, Debug, Default)]
pub struct Recommender {
    weights: ScoringWeights,
}

impl Recommender {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn recommend(
        &self,
        seats: &[Seat],
        prefs: &Preferences,
        limit: Option<usize>,
    ) -> RecommendationSet {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        let recommendations = rank(seats, prefs, &self.weights, limit);
        let total_available = seats.iter().filter(|s| s.is_available).count();
        tracing::debug!(
            total_available,
            returned = recommendations.len(),
            "ranked seats"
        );
        let summary = summarize(&recommendations, prefs, total_available);
        RecommendationSet {
            recommendations,
            total_available,
            preferences_used: prefs.clone(),
            summary,
        }
    }

    /// Derive refined preferences and re-rank in one step.
    pub fn refine_and_recommend(
        &self,
        seats: &[Seat],
        current: &Preferences,
        refinement: Refinement,
        previous_prices: &[f64],
        limit: Option<usize>,
    ) -> Result<RecommendationSet, RefineError> {
        let next = refine(current, refinement, previous_prices)?;
        Ok(self.recommend(seats, &next, limit))
    }
}

fn summarize(recs: &[Recommendation], prefs: &Preferences, total_available: usize) -> String {
    if total_available == 0 {
        return "No available seats found.".to_string();
    }
    let Some(best) = recs.first() else {
        let mut hint = String::from("No seats match your criteria.");
        let mut relax = Vec::new();
        if prefs.budget_max.is_some() {
            relax.push("raising your budget");
        }
        if prefs.ac_importance == AcImportance::Required {
            relax.push("making air conditioning optional");
        }
        if relax.is_empty() {
            hint.push_str(" Try adjusting your preferences.");
        } else {
            hint.push_str(&format!(" Try {}.", relax.join(" or ")));
        }
        return hint;
    };

    let mut summary = vec![match best.match_quality {
        MatchTier::Excellent => "We found excellent matches for you!".to_string(),
        MatchTier::Great => "We found some great options for you!".to_string(),
        MatchTier::Good => "We found several good options.".to_string(),
        MatchTier::Fair => {
            "Limited options available. Consider adjusting your preferences.".to_string()
        }
    }];

    summary.push(format!(
        "Showing {} of {} available seats.",
        recs.len(),
        total_available
    ));

    if let Some(budget) = prefs.budget_max {
        let within = recs.iter().filter(|r| r.seat.price <= budget).count();
        summary.push(format!(
            "Found {within} seats within your budget of ${}.",
            format_price(budget)
        ));
    }
    if prefs.ac_importance == AcImportance::Required {
        summary.push("All top recommendations have air conditioning.".to_string());
    }
    if prefs.famous_people {
        let famous = recs.iter().filter(|r| r.seat.is_famous()).count();
        if famous > 0 {
            summary.push(format!("Found {famous} seats with historical significance!"));
        }
    }
    summary.join(" ")
}
