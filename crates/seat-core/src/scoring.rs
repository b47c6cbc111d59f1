//! Weighted additive seat scoring.
//!
//! Each active preference dimension contributes up to its weight. The final
//! score is the earned share of the attainable points, scaled to 0–100, so a
//! seat that satisfies everything the user asked for scores 100 no matter
//! how many dimensions were active. Budget is always active; an unset budget
//! grants full credit.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    AC_PREFERRED_WEIGHT, AC_REQUIRED_WEIGHT, BUDGET_HARD_MARGIN, BUDGET_TOLERANCE,
    BUDGET_WEIGHT, CENTER_POSITIONS, HISTORY_WEIGHT, LOCATION_WEIGHT, POSITION_WEIGHT,
    SEATS_PER_ROW, VIEW_WEIGHT,
};
use crate::preferences::{AcImportance, LocationPreference, PositionPreference, Preferences};
use crate::seat::{Band, Seat};

/// Tunable scoring constants. Defaults come from [`crate::constants`];
/// any field may be overridden from configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub budget_weight: f64,
    pub ac_required_weight: f64,
    pub ac_preferred_weight: f64,
    pub view_weight: f64,
    pub history_weight: f64,
    pub position_weight: f64,
    pub location_weight: f64,
    pub budget_tolerance: f64,
    pub budget_hard_margin: f64,
    pub seats_per_row: i64,
    pub center_first: i64,
    pub center_last: i64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            budget_weight: BUDGET_WEIGHT,
            ac_required_weight: AC_REQUIRED_WEIGHT,
            ac_preferred_weight: AC_PREFERRED_WEIGHT,
            view_weight: VIEW_WEIGHT,
            history_weight: HISTORY_WEIGHT,
            position_weight: POSITION_WEIGHT,
            location_weight: LOCATION_WEIGHT,
            budget_tolerance: BUDGET_TOLERANCE,
            budget_hard_margin: BUDGET_HARD_MARGIN,
            seats_per_row: SEATS_PER_ROW,
            center_first: CENTER_POSITIONS.0,
            center_last: CENTER_POSITIONS.1,
        }
    }
}

/// Coarse user-facing label derived from a score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchTier {
    Fair,
    Good,
    Great,
    Excellent,
}

impl MatchTier {
    pub fn from_score(score: u8) -> Self {
        match score {
            90.. => Self::Excellent,
            75..=89 => Self::Great,
            60..=74 => Self::Good,
            _ => Self::Fair,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Great => "Great",
            Self::Good => "Good",
            Self::Fair => "Fair",
        }
    }
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of scoring one seat that was not excluded.
#[derive(Clone, Debug, PartialEq)]
pub struct Assessment {
    pub score: u8,
    pub tier: MatchTier,
    /// Positively contributing dimensions, largest contribution first.
    pub explanation: Vec<String>,
}

/// A scored seat ready for presentation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub seat: Seat,
    pub score: u8,
    pub match_quality: MatchTier,
    pub explanation: Vec<String>,
}

struct Contribution {
    points: f64,
    clause: String,
}

/// Score `seat` against `prefs`. Returns `None` when a hard exclusion
/// applies (budget hard margin, strict budget, or required AC).
pub fn score(seat: &Seat, prefs: &Preferences, weights: &ScoringWeights) -> Option<Assessment> {
    let mut attainable = 0.0;
    let mut parts: Vec<Contribution> = Vec::new();
    let mut push = |points: f64, clause: String| {
        if points > 0.0 {
            parts.push(Contribution { points, clause });
        }
    };

    // Budget
    attainable += weights.budget_weight;
    match prefs.budget_max {
        None => push(weights.budget_weight, "no budget limit set".to_string()),
        Some(max) if seat.price <= max => push(
            weights.budget_weight,
            format!("within your budget (${})", format_price(seat.price)),
        ),
        Some(_) if prefs.strict_budget => return None,
        Some(max) => {
            let over = if max > 0.0 {
                (seat.price - max) / max
            } else {
                f64::INFINITY
            };
            if over > weights.budget_hard_margin {
                return None;
            }
            if weights.budget_tolerance > 0.0 && over < weights.budget_tolerance {
                push(
                    weights.budget_weight * (1.0 - over / weights.budget_tolerance),
                    format!("only slightly over budget (${})", format_price(seat.price)),
                );
            }
        }
    }

    // Climate
    match prefs.ac_importance {
        AcImportance::Required => {
            if !seat.has_ac {
                return None;
            }
            attainable += weights.ac_required_weight;
            push(
                weights.ac_required_weight,
                "has air conditioning (required)".to_string(),
            );
        }
        AcImportance::Preferred => {
            attainable += weights.ac_preferred_weight;
            if seat.has_ac {
                push(weights.ac_preferred_weight, "has air conditioning".to_string());
            }
        }
        AcImportance::Optional => {}
    }

    // View
    let view_attainable = weights.view_weight * f64::from(prefs.view_importance.min(10)) / 10.0;
    if view_attainable > 0.0 {
        attainable += view_attainable;
        let quality = seat.view_quality.min(10);
        let clause = match quality {
            8.. => format!("excellent view ({quality}/10)"),
            6..=7 => format!("good view ({quality}/10)"),
            _ => format!("view rated {quality}/10"),
        };
        push(view_attainable * f64::from(quality) / 10.0, clause);
    }

    // History
    if prefs.famous_people {
        attainable += weights.history_weight;
        if let Some(note) = &seat.famous_note {
            push(weights.history_weight, format!("historical seat: {note}"));
        }
    }

    // Position
    match prefs.position_preference {
        Some(PositionPreference::Aisle) => {
            attainable += weights.position_weight;
            if seat.position == 1 || seat.position == weights.seats_per_row {
                push(weights.position_weight, "aisle seat".to_string());
            }
        }
        Some(PositionPreference::Center) => {
            attainable += weights.position_weight;
            if (weights.center_first..=weights.center_last).contains(&seat.position) {
                push(weights.position_weight, "center position".to_string());
            }
        }
        Some(PositionPreference::Any) | None => {}
    }

    // Location
    if let Some(wanted) = prefs.location_preference.and_then(band_for) {
        attainable += weights.location_weight;
        if seat.band() == wanted {
            push(
                weights.location_weight,
                format!("{} section", wanted.as_str()),
            );
        }
    }

    let earned: f64 = parts.iter().map(|c| c.points).sum();
    let raw = if attainable > 0.0 {
        100.0 * earned / attainable
    } else {
        0.0
    };
    let score = raw.round().clamp(0.0, 100.0) as u8;

    // Stable sort keeps dimension order for equal contributions.
    parts.sort_by(|a, b| b.points.total_cmp(&a.points));

    Some(Assessment {
        score,
        tier: MatchTier::from_score(score),
        explanation: parts.into_iter().map(|c| c.clause).collect(),
    })
}

fn band_for(location: LocationPreference) -> Option<Band> {
    match location {
        LocationPreference::Front => Some(Band::Front),
        LocationPreference::Middle => Some(Band::Middle),
        LocationPreference::Back => Some(Band::Back),
        LocationPreference::Any => None,
    }
}

/// Score every available seat and return the best `limit`, ordered by
/// score desc, then price asc, then id asc.
pub fn rank(
    seats: &[Seat],
    prefs: &Preferences,
    weights: &ScoringWeights,
    limit: usize,
) -> Vec<Recommendation> {
    let mut scored: Vec<Recommendation> = seats
        .iter()
        .filter(|s| s.is_available)
        .filter_map(|seat| {
            score(seat, prefs, weights).map(|a| Recommendation {
                seat: seat.clone(),
                score: a.score,
                match_quality: a.tier,
                explanation: a.explanation,
            })
        })
        .collect();

    scored.sort_by(compare_recommendations);
    scored.truncate(limit);
    scored
}

fn compare_recommendations(a: &Recommendation, b: &Recommendation) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.seat.price.total_cmp(&b.seat.price))
        .then_with(|| a.seat.id.cmp(&b.seat.id))
}

/// Render a price without a trailing ".00" for whole amounts.
pub fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{price:.0}")
    } else {
        format!("{price:.2}")
    }
}
