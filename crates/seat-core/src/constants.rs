/// Number of recommendations returned when the caller does not ask for a count.
pub const DEFAULT_LIMIT: usize = 3;

/// Largest count a transport accepts for `limit`.
pub const MAX_LIMIT: usize = 50;

/// Budget weight in the additive score (points out of 100).
pub const BUDGET_WEIGHT: f64 = 30.0;

/// Climate weight when air conditioning is required.
pub const AC_REQUIRED_WEIGHT: f64 = 20.0;

/// Climate weight when air conditioning is merely preferred.
pub const AC_PREFERRED_WEIGHT: f64 = 10.0;

/// View weight at view_importance = 10. Scales linearly down to 0.
pub const VIEW_WEIGHT: f64 = 25.0;

/// History weight, only active when the user asked for famous seats.
pub const HISTORY_WEIGHT: f64 = 15.0;

/// Position (aisle/center) weight.
pub const POSITION_WEIGHT: f64 = 10.0;

/// Location band (front/middle/back) weight.
pub const LOCATION_WEIGHT: f64 = 15.0;

/// Fraction over budget at which budget credit has decayed to zero.
pub const BUDGET_TOLERANCE: f64 = 0.10;

/// Fraction over budget beyond which a seat is excluded outright.
pub const BUDGET_HARD_MARGIN: f64 = 0.25;

/// Seats per row segment; positions 1 and this value sit on an aisle.
pub const SEATS_PER_ROW: i64 = 10;

/// Inclusive center band of positions within a row segment.
pub const CENTER_POSITIONS: (i64, i64) = (4, 7);

/// Last layer counted as "front" for straight and perpendicular rows.
pub const FRONT_MAX_LAYER: i64 = 5;

/// Last layer counted as "middle" for straight and perpendicular rows.
pub const MIDDLE_MAX_LAYER: i64 = 10;

/// Last `regular_top` layer counted as "front".
pub const TOP_FRONT_MAX_LAYER: i64 = 3;

/// Budget floor the "cheaper" refinement never goes below.
pub const MIN_ALLOWED_PRICE: f64 = 100.0;

/// view_importance applied by the "better view" refinement.
pub const BETTER_VIEW_IMPORTANCE: u8 = 8;

/// Default view_importance when the user has not said anything.
pub const DEFAULT_VIEW_IMPORTANCE: u8 = 5;

/// Budget recorded when the guided dialog's "No limit" option is chosen.
pub const NO_LIMIT_BUDGET: f64 = 1000.0;

/// Proximity search: per-axis cap on layer and position difference.
pub const NEARBY_MAX_DISTANCE: i64 = 3;

/// Proximity search: maximum number of seats returned.
pub const NEARBY_LIMIT: usize = 10;

/// Session: preference snapshots retained per session.
pub const PREFERENCE_HISTORY_LIMIT: usize = 20;

/// Session: user/assistant exchanges retained per session.
pub const TRANSCRIPT_LIMIT: usize = 10;
