//! Open-text preference extraction.
//!
//! The advisor only depends on the [`PreferenceExtractor`] trait. The
//! bundled [`KeywordExtractor`] is a rule-based implementation that needs no
//! network access; richer language-model backends live behind the same trait.

use std::fmt;
use std::sync::{LazyLock, Mutex};

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_VIEW_IMPORTANCE;
use crate::preferences::{AcImportance, LocationPreference, PositionPreference, Preferences};
use crate::scoring::format_price;

/// One user/assistant exchange kept as conversational context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
}

/// Input to an extractor call.
#[derive(Clone, Copy, Debug)]
pub struct ExtractRequest<'a> {
    pub message: &'a str,
    pub prior: &'a Preferences,
    pub session_id: &'a str,
    pub history: &'a [Exchange],
}

/// What an extractor hands back for one free-text turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub preferences: Preferences,
    pub confidence: f64,
    pub reply: String,
    pub ready: bool,
    pub session_id: String,
}

impl Extraction {
    /// Clamp confidence into [0, 1] and repair the preference values.
    pub fn normalized(mut self) -> Self {
        self.confidence = if self.confidence.is_finite() {
            self.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.preferences = self.preferences.sanitized();
        self
    }
}

#[derive(Debug)]
pub enum ExtractorError {
    /// The backend could not be reached or timed out.
    Unavailable(String),
    /// The backend answered with something we could not use.
    InvalidResponse(String),
}

impl fmt::Display for ExtractorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractorError::Unavailable(msg) => write!(f, "extractor unavailable: {msg}"),
            ExtractorError::InvalidResponse(msg) => write!(f, "invalid extractor response: {msg}"),
        }
    }
}

impl std::error::Error for ExtractorError {}

/// Turns a free-text message plus prior state into updated preferences.
pub trait PreferenceExtractor: Send + Sync {
    fn extract(&self, request: &ExtractRequest<'_>) -> Result<Extraction, ExtractorError>;
}

static DOLLAR_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\s*(\d[\d,]*)").unwrap());
static DOLLAR_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d,]*)\s*dollars?").unwrap());
static UNDER_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:under|below|less than|max(?:imum)?)\s+(\d[\d,]*)").unwrap());
static CHEAP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(cheap|budget|affordable|inexpensive|low cost)\b").unwrap()
});
static PREMIUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(expensive|premium|luxury|high.end)\b").unwrap());
static MID_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(mid.range|moderate|average)\b").unwrap());

static AC_OPTIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(don.?t|doesn.?t|no|not)\b.*\b(care|matter|important|need)\b.*\b(ac|air)\b|\bno (ac|air.conditioning)\b|\b(ac|air.conditioning)\b.*\b(not important|doesn.?t matter|optional)")
        .unwrap()
});
static AC_REQUIRED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(need|must|require|essential|necessary)\b.*\b(ac|air.conditioning|cooling|cool)\b|\b(ac|air.conditioning|cooling)\b.*\b(need|must|require|essential)")
        .unwrap()
});
static AC_PREFERRED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(prefer|like|want|would like)\b.*\b(ac|air.conditioning|cooling)\b|\b(ac|air.conditioning|cooling)\b.*\b(prefer|nice|good)")
        .unwrap()
});
static AC_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(ac|air.conditioning|cooling|cool|cold)\b").unwrap());

static VIEW_INDIFFERENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(don.?t|doesn.?t|not)\b.*\b(care|matter|important)\b.*\bview\b|\bview\b.*(don.?t|doesn.?t|not)\b.*\b(care|matter|important)")
        .unwrap()
});
static VIEW_EXCELLENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(excellent|perfect|amazing|best|great|fantastic|outstanding)\b.*\bview\b|\bview\b.*\b(excellent|perfect|amazing|best|great|fantastic|critical|essential)")
        .unwrap()
});
static VIEW_GOOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(good|nice|decent)\b.*\bview\b|\bview\b.*\b(good|nice|decent|important)").unwrap()
});
static VIEW_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(view|see|watch|look|visibility)\b").unwrap());

static FAMOUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(famous|celebrity|historic|history|notable|renowned|legend)").unwrap()
});
static AISLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(aisle|end|edge|side)\b").unwrap());
static CENTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(center|centre|middle)\b").unwrap());
static FRONT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(front|close.*stage|near.*stage|up front|forward)\b").unwrap()
});
static BACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(back|rear|far.*stage|behind)\b").unwrap());
static MIDDLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(middle|center|centre|mid)\b").unwrap());
static GREETING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(hi|hello|hey|howdy|greetings|good morning|good afternoon|good evening)\b")
        .unwrap()
});

const GREETING_REPLIES: &[&str] = &[
    "Hi! I'd love to help you find the perfect seat. What are you looking for?",
    "Hello! Tell me what kind of seat you're interested in.",
    "Hey there! What seat features are important to you?",
];
const BUDGET_REPLIES: &[&str] = &[
    "Got it! Looking for seats up to {budget}.",
    "Perfect! I'll focus on seats within your {budget} budget.",
    "Understood - {budget} maximum.",
];
const AC_REPLIES: &[&str] = &[
    "Noted - air conditioning is {importance} for you.",
    "AC preference recorded as {importance}.",
];
const VIEW_REPLIES: &[&str] = &[
    "Great! View quality is {importance} to you.",
    "Got it - view quality is {importance} to you.",
];
const LOCATION_REPLIES: &[&str] = &[
    "Perfect! Looking at {location} seats.",
    "Understood - {location} section preference noted.",
];
const MORE_INFO_REPLIES: &[&str] = &[
    "That helps! Anything else? (budget, AC, view quality, location)",
    "Thanks! Any other preferences like price range or features?",
    "Good to know! What else matters to you?",
];
const READY_REPLIES: &[&str] = &[
    "Perfect! I have enough info. Let me find the best seats for you!",
    "Great! Searching for your ideal seats now...",
    "Excellent! Let me pull up the top recommendations for you!",
];
const CLARIFY_REPLIES: &[&str] = &[
    "Could you tell me more about what you're looking for?",
    "I want to help! Can you specify your preferences? (budget, AC, view, location)",
    "Let me know your priorities - price? features? location?",
];

/// Fields recognised in a single message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Parsed {
    pub budget_max: Option<f64>,
    pub ac_importance: Option<AcImportance>,
    pub view_importance: Option<u8>,
    pub famous_people: bool,
    pub position: Option<PositionPreference>,
    pub location: Option<LocationPreference>,
    pub greeting: bool,
}

impl Parsed {
    pub fn parse(message: &str) -> Self {
        let text = message.to_lowercase();
        Self {
            budget_max: parse_budget(&text),
            ac_importance: parse_ac(&text),
            view_importance: parse_view(&text),
            famous_people: FAMOUS.is_match(&text),
            position: if AISLE.is_match(&text) {
                Some(PositionPreference::Aisle)
            } else if CENTER.is_match(&text) {
                Some(PositionPreference::Center)
            } else {
                None
            },
            location: if FRONT.is_match(&text) {
                Some(LocationPreference::Front)
            } else if BACK.is_match(&text) {
                Some(LocationPreference::Back)
            } else if MIDDLE.is_match(&text) {
                Some(LocationPreference::Middle)
            } else {
                None
            },
            greeting: GREETING.is_match(&text),
        }
    }

    /// Number of preference dimensions recognised.
    pub fn recognized(&self) -> usize {
        [
            self.budget_max.is_some(),
            self.ac_importance.is_some(),
            self.view_importance.is_some(),
            self.famous_people,
            self.position.is_some(),
            self.location.is_some(),
        ]
        .iter()
        .filter(|hit| **hit)
        .count()
    }

    /// Overlay recognised fields onto `prior`.
    pub fn apply(&self, prior: &Preferences) -> Preferences {
        let mut next = prior.clone();
        if let Some(budget) = self.budget_max {
            next = next.with_budget_max(Some(budget));
            next.strict_budget = false;
        }
        if let Some(ac) = self.ac_importance {
            next = next.with_ac(ac);
        }
        if let Some(view) = self.view_importance {
            next = next.with_view_importance(view);
        }
        if self.famous_people {
            next = next.with_famous_people(true);
        }
        if self.position.is_some() {
            next = next.with_position(self.position);
        }
        if self.location.is_some() {
            next = next.with_location(self.location);
        }
        next
    }
}

fn parse_amount(s: &str) -> Option<f64> {
    s.replace(',', "").parse::<f64>().ok()
}

fn parse_budget(text: &str) -> Option<f64> {
    for re in [&*DOLLAR_AMOUNT, &*DOLLAR_WORD, &*UNDER_AMOUNT] {
        if let Some(caps) = re.captures(text)
            && let Some(amount) = caps.get(1).and_then(|m| parse_amount(m.as_str()))
        {
            return Some(amount);
        }
    }
    if CHEAP.is_match(text) {
        Some(200.0)
    } else if PREMIUM.is_match(text) {
        Some(600.0)
    } else if MID_RANGE.is_match(text) {
        Some(400.0)
    } else {
        None
    }
}

fn parse_ac(text: &str) -> Option<AcImportance> {
    if AC_OPTIONAL.is_match(text) {
        Some(AcImportance::Optional)
    } else if AC_REQUIRED.is_match(text) {
        Some(AcImportance::Required)
    } else if AC_PREFERRED.is_match(text) || AC_MENTION.is_match(text) {
        Some(AcImportance::Preferred)
    } else {
        None
    }
}

fn parse_view(text: &str) -> Option<u8> {
    if VIEW_INDIFFERENT.is_match(text) {
        Some(3)
    } else if VIEW_EXCELLENT.is_match(text) {
        Some(10)
    } else if VIEW_GOOD.is_match(text) || VIEW_MENTION.is_match(text) {
        Some(7)
    } else {
        None
    }
}

/// Confidence grows with the number of dimensions recognised in one message.
pub fn confidence_for(recognized: usize) -> f64 {
    match recognized {
        0 => 0.0,
        1 => 0.5,
        2 => 0.7,
        3 => 0.85,
        4 => 0.9,
        5 => 0.95,
        _ => 1.0,
    }
}

/// Enough is known to rank: a budget, or a feature preference plus at
/// least one other non-default field.
pub fn is_ready(prefs: &Preferences) -> bool {
    let has_feature = prefs.ac_importance != AcImportance::Optional
        || prefs.view_importance != DEFAULT_VIEW_IMPORTANCE
        || matches!(
            prefs.location_preference,
            Some(l) if l != LocationPreference::Any
        )
        || prefs.famous_people;
    prefs.budget_max.is_some() || (has_feature && prefs.specified_count() >= 2)
}

fn view_words(importance: u8) -> &'static str {
    if importance >= 8 {
        "very important"
    } else if importance >= 5 {
        "somewhat important"
    } else {
        "not very important"
    }
}

/// Rule-based extractor. Reply wording is picked from small template pools.
pub struct KeywordExtractor {
    rng: Mutex<SmallRng>,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordExtractor {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(SmallRng::from_os_rng()),
        }
    }

    /// Deterministic reply selection.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(SmallRng::seed_from_u64(seed)),
        }
    }

    fn reply(&self, parsed: &Parsed, ready: bool) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let mut pick = |pool: &[&'static str]| -> &'static str {
            pool.choose(&mut *rng).copied().unwrap_or_default()
        };

        if parsed.greeting && parsed.recognized() == 0 {
            return pick(GREETING_REPLIES).to_string();
        }
        if parsed.recognized() == 0 {
            return pick(CLARIFY_REPLIES).to_string();
        }

        let mut parts: Vec<String> = Vec::new();
        if let Some(budget) = parsed.budget_max {
            parts.push(pick(BUDGET_REPLIES).replace("{budget}", &format!("${}", format_price(budget))));
        }
        if let Some(ac) = parsed.ac_importance {
            parts.push(pick(AC_REPLIES).replace("{importance}", ac.as_str()));
        }
        if let Some(view) = parsed.view_importance {
            parts.push(pick(VIEW_REPLIES).replace("{importance}", view_words(view)));
        }
        if let Some(location) = parsed.location {
            parts.push(pick(LOCATION_REPLIES).replace("{location}", location.as_str()));
        }
        if parsed.famous_people {
            parts.push("Noted - seats with historical significance!".to_string());
        }
        if let Some(position) = parsed.position {
            parts.push(format!("Looking for {} seats.", position.as_str()));
        }

        parts.push(
            if ready {
                pick(READY_REPLIES)
            } else {
                pick(MORE_INFO_REPLIES)
            }
            .to_string(),
        );
        parts.join(" ")
    }
}

impl PreferenceExtractor for KeywordExtractor {
    fn extract(&self, request: &ExtractRequest<'_>) -> Result<Extraction, ExtractorError> {
        let parsed = Parsed::parse(request.message);
        let preferences = parsed.apply(request.prior);
        let ready = is_ready(&preferences);
        let reply = self.reply(&parsed, ready);

        Ok(Extraction {
            confidence: confidence_for(parsed.recognized()),
            preferences,
            reply,
            ready,
            session_id: request.session_id.to_string(),
        })
    }
}
