use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_VIEW_IMPORTANCE;

/// How much the user cares about air conditioning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AcImportance {
    /// Seats without AC are excluded.
    Required,
    /// AC earns a bonus; no AC is not penalized.
    Preferred,
    #[default]
    Optional,
}

impl AcImportance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Preferred => "preferred",
            Self::Optional => "optional",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "required" | "require" | "must" => Self::Required,
            "preferred" | "prefer" | "nice" => Self::Preferred,
            _ => Self::Optional,
        }
    }
}

/// Aisle vs center seating. `Any` records an explicit "no preference".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionPreference {
    Aisle,
    Center,
    Any,
}

impl PositionPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aisle => "aisle",
            Self::Center => "center",
            Self::Any => "any",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aisle" | "edge" => Some(Self::Aisle),
            "center" | "centre" => Some(Self::Center),
            "any" | "none" | "no preference" => Some(Self::Any),
            _ => None,
        }
    }
}

/// Front/middle/back section. `Any` records an explicit "no preference".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationPreference {
    Front,
    Middle,
    Back,
    Any,
}

impl LocationPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Middle => "middle",
            Self::Back => "back",
            Self::Any => "any",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "front" => Some(Self::Front),
            "middle" | "mid" => Some(Self::Middle),
            "back" | "rear" => Some(Self::Back),
            "any" | "none" | "no preference" => Some(Self::Any),
            _ => None,
        }
    }
}

/// The user's soft preferences. Treated as an immutable value: every
/// `with_*` method returns a new model and leaves the receiver untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub budget_max: Option<f64>,
    #[serde(default)]
    pub budget_min: f64,
    #[serde(default)]
    pub ac_importance: AcImportance,
    #[serde(default = "default_view_importance")]
    pub view_importance: u8,
    #[serde(default)]
    pub famous_people: bool,
    #[serde(default)]
    pub position_preference: Option<PositionPreference>,
    #[serde(default)]
    pub location_preference: Option<LocationPreference>,
    /// Treat budget_max as a hard ceiling. Set by the "cheaper" refinement.
    #[serde(default)]
    pub strict_budget: bool,
}

fn default_view_importance() -> u8 {
    DEFAULT_VIEW_IMPORTANCE
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            budget_max: None,
            budget_min: 0.0,
            ac_importance: AcImportance::Optional,
            view_importance: DEFAULT_VIEW_IMPORTANCE,
            famous_people: false,
            position_preference: None,
            location_preference: None,
            strict_budget: false,
        }
    }
}

impl Preferences {
    #[must_use]
    pub fn with_budget_max(&self, budget_max: Option<f64>) -> Self {
        Self {
            budget_max,
            ..self.clone()
        }
        .sanitized()
    }

    #[must_use]
    pub fn with_ac(&self, ac_importance: AcImportance) -> Self {
        Self {
            ac_importance,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_view_importance(&self, view_importance: u8) -> Self {
        Self {
            view_importance: view_importance.min(10),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_famous_people(&self, famous_people: bool) -> Self {
        Self {
            famous_people,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_position(&self, position: Option<PositionPreference>) -> Self {
        Self {
            position_preference: position,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_location(&self, location: Option<LocationPreference>) -> Self {
        Self {
            location_preference: location,
            ..self.clone()
        }
    }

    /// Clamp every field into its valid range. Preferences are soft, so
    /// bad values are repaired rather than rejected.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.budget_max = self.budget_max.filter(|b| b.is_finite() && *b >= 0.0);
        if !self.budget_min.is_finite() || self.budget_min < 0.0 {
            self.budget_min = 0.0;
        }
        if let Some(max) = self.budget_max
            && self.budget_min > max
        {
            self.budget_min = max;
        }
        if self.budget_max.is_none() {
            self.strict_budget = false;
        }
        self.view_importance = self.view_importance.min(10);
        self
    }

    /// Overlay the fields present in `input` onto this model.
    #[must_use]
    pub fn merged(&self, input: &PreferenceInput) -> Self {
        let mut next = self.clone();
        if let Some(max) = input.budget_max {
            next.budget_max = Some(max);
            next.strict_budget = false;
        }
        if let Some(min) = input.budget_min {
            next.budget_min = min;
        }
        if let Some(ac) = &input.ac_importance {
            next.ac_importance = AcImportance::from_str_lossy(ac);
        }
        if let Some(view) = input.view_importance {
            next.view_importance = clamp_importance(view);
        }
        if let Some(famous) = input.famous_people {
            next.famous_people = famous;
        }
        if let Some(position) = &input.position_preference {
            next.position_preference = PositionPreference::parse(position);
        }
        if let Some(location) = &input.location_preference {
            next.location_preference = LocationPreference::parse(location);
        }
        next.sanitized()
    }

    /// Number of fields that differ from the defaults.
    pub fn specified_count(&self) -> usize {
        let defaults = Self::default();
        [
            self.budget_max.is_some(),
            self.budget_min != defaults.budget_min,
            self.ac_importance != defaults.ac_importance,
            self.view_importance != defaults.view_importance,
            self.famous_people,
            self.position_preference.is_some(),
            self.location_preference.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}

/// Loosely-typed preference fields as they arrive over the wire. Every
/// field is optional; unknown enum strings fall back to defaults and
/// numbers are clamped.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferenceInput {
    pub budget_max: Option<f64>,
    pub budget_min: Option<f64>,
    pub ac_importance: Option<String>,
    pub view_importance: Option<f64>,
    pub famous_people: Option<bool>,
    pub position_preference: Option<String>,
    pub location_preference: Option<String>,
}

impl PreferenceInput {
    pub fn into_preferences(self) -> Preferences {
        Preferences::default().merged(&self)
    }
}

fn clamp_importance(value: f64) -> u8 {
    if !value.is_finite() {
        return DEFAULT_VIEW_IMPORTANCE;
    }
    value.round().clamp(0.0, 10.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = Preferences::default();
        assert_eq!(p.budget_max, None);
        assert_eq!(p.budget_min, 0.0);
        assert_eq!(p.ac_importance, AcImportance::Optional);
        assert_eq!(p.view_importance, 5);
        assert!(!p.famous_people);
        assert!(p.position_preference.is_none());
        assert!(p.location_preference.is_none());
        assert_eq!(p.specified_count(), 0);
    }

    #[test]
    fn test_with_methods_leave_original_untouched() {
        let base = Preferences::default();
        let next = base.with_ac(AcImportance::Required).with_view_importance(9);
        assert_eq!(base.ac_importance, AcImportance::Optional);
        assert_eq!(base.view_importance, 5);
        assert_eq!(next.ac_importance, AcImportance::Required);
        assert_eq!(next.view_importance, 9);
    }

    #[test]
    fn test_input_clamps_out_of_range_values() {
        let p = PreferenceInput {
            budget_max: Some(-50.0),
            budget_min: Some(-10.0),
            view_importance: Some(42.0),
            ac_importance: Some("MUST".to_string()),
            position_preference: Some("sideways".to_string()),
            location_preference: Some("Rear".to_string()),
            ..Default::default()
        }
        .into_preferences();

        assert_eq!(p.budget_max, None);
        assert_eq!(p.budget_min, 0.0);
        assert_eq!(p.view_importance, 10);
        assert_eq!(p.ac_importance, AcImportance::Required);
        assert_eq!(p.position_preference, None);
        assert_eq!(p.location_preference, Some(LocationPreference::Back));
    }

    #[test]
    fn test_budget_min_capped_at_budget_max() {
        let p = PreferenceInput {
            budget_max: Some(300.0),
            budget_min: Some(500.0),
            ..Default::default()
        }
        .into_preferences();
        assert_eq!(p.budget_min, 300.0);
    }

    #[test]
    fn test_negative_view_importance_clamps_to_zero() {
        let p = PreferenceInput {
            view_importance: Some(-3.0),
            ..Default::default()
        }
        .into_preferences();
        assert_eq!(p.view_importance, 0);
    }

    #[test]
    fn test_merge_new_budget_clears_strict_flag() {
        let mut strict = Preferences::default().with_budget_max(Some(299.0));
        strict.strict_budget = true;
        let merged = strict.merged(&PreferenceInput {
            budget_max: Some(500.0),
            ..Default::default()
        });
        assert!(!merged.strict_budget);
        assert_eq!(merged.budget_max, Some(500.0));
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let p = Preferences::default()
            .with_ac(AcImportance::Preferred)
            .with_position(Some(PositionPreference::Any));
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["ac_importance"], "preferred");
        assert_eq!(json["position_preference"], "any");
        assert!(json["location_preference"].is_null());
    }
}
