//! Guided, fixed-order question flow.
//!
//! `welcome → budget → ac → view → famous → position → location → results`.
//! Each question offers fixed choices; one answer sets one preference field
//! and advances. `results` is terminal apart from `restart`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::NO_LIMIT_BUDGET;
use crate::preferences::{AcImportance, LocationPreference, PositionPreference, Preferences};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogStep {
    Welcome,
    Budget,
    Ac,
    View,
    Famous,
    Position,
    Location,
    Results,
}

impl DialogStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Budget => "budget",
            Self::Ac => "ac",
            Self::View => "view",
            Self::Famous => "famous",
            Self::Position => "position",
            Self::Location => "location",
            Self::Results => "results",
        }
    }

    fn next(self) -> Self {
        match self {
            Self::Welcome => Self::Budget,
            Self::Budget => Self::Ac,
            Self::Ac => Self::View,
            Self::View => Self::Famous,
            Self::Famous => Self::Position,
            Self::Position => Self::Location,
            Self::Location | Self::Results => Self::Results,
        }
    }

    fn question(&self) -> Option<(&'static str, &'static [Choice])> {
        match self {
            Self::Budget => Some(("What's your maximum budget per year for a seat?", BUDGET)),
            Self::Ac => Some(("How important is air conditioning to you?", AC)),
            Self::View => Some((
                "How important is the view quality? (0-10, where 10 is extremely important)",
                VIEW,
            )),
            Self::Famous => Some((
                "Are you interested in seats with historical significance (where famous people sat)?",
                FAMOUS,
            )),
            Self::Position => Some(("Do you have a seating position preference?", POSITION)),
            Self::Location => Some(("Which location do you prefer?", LOCATION)),
            Self::Welcome | Self::Results => None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Answer {
    Budget(f64),
    Ac(AcImportance),
    View(u8),
    Famous(bool),
    Position(PositionPreference),
    Location(LocationPreference),
}

#[derive(Clone, Copy, Debug)]
struct Choice {
    label: &'static str,
    answer: Answer,
}

const fn choice(label: &'static str, answer: Answer) -> Choice {
    Choice { label, answer }
}

const BUDGET: &[Choice] = &[
    choice("Up to $200", Answer::Budget(200.0)),
    choice("Up to $400", Answer::Budget(400.0)),
    choice("Up to $600", Answer::Budget(600.0)),
    choice("No limit", Answer::Budget(NO_LIMIT_BUDGET)),
];

const AC: &[Choice] = &[
    choice("Required - must have AC", Answer::Ac(AcImportance::Required)),
    choice("Preferred - nice to have", Answer::Ac(AcImportance::Preferred)),
    choice("Optional - don't care", Answer::Ac(AcImportance::Optional)),
];

const VIEW: &[Choice] = &[
    choice("Critical (10)", Answer::View(10)),
    choice("Very important (8)", Answer::View(8)),
    choice("Somewhat important (5)", Answer::View(5)),
    choice("Not very important (3)", Answer::View(3)),
    choice("Don't care (0)", Answer::View(0)),
];

const FAMOUS: &[Choice] = &[
    choice("Yes, that would be special!", Answer::Famous(true)),
    choice("No, doesn't matter", Answer::Famous(false)),
];

const POSITION: &[Choice] = &[
    choice("Aisle - easy access", Answer::Position(PositionPreference::Aisle)),
    choice("Center - best view", Answer::Position(PositionPreference::Center)),
    choice("No preference", Answer::Position(PositionPreference::Any)),
];

const LOCATION: &[Choice] = &[
    choice("Front - close to stage", Answer::Location(LocationPreference::Front)),
    choice("Middle - balanced", Answer::Location(LocationPreference::Middle)),
    choice("Back - overview", Answer::Location(LocationPreference::Back)),
    choice("No preference", Answer::Location(LocationPreference::Any)),
];

/// A question presented to the user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub step: DialogStep,
    pub question: String,
    pub options: Vec<String>,
}

/// Illegal transition in the guided flow.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogError {
    /// The requested action is not legal in the current step.
    OutOfOrder {
        step: DialogStep,
        action: &'static str,
    },
    /// The option index does not exist for the current question.
    InvalidChoice {
        step: DialogStep,
        choice: usize,
        options: usize,
    },
}

impl fmt::Display for DialogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialogError::OutOfOrder { step, action } => {
                write!(f, "cannot {action} during the {} step", step.as_str())
            }
            DialogError::InvalidChoice {
                step,
                choice,
                options,
            } => write!(
                f,
                "choice {choice} is out of range for the {} step ({options} options)",
                step.as_str()
            ),
        }
    }
}

impl std::error::Error for DialogError {}

/// The guided dialog as an immutable value: every transition returns a new
/// dialog carrying a new preference snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GuidedDialog {
    step: DialogStep,
    preferences: Preferences,
}

impl Default for GuidedDialog {
    fn default() -> Self {
        Self::new()
    }
}

impl GuidedDialog {
    pub fn new() -> Self {
        Self {
            step: DialogStep::Welcome,
            preferences: Preferences::default(),
        }
    }

    pub fn step(&self) -> DialogStep {
        self.step
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn is_complete(&self) -> bool {
        self.step == DialogStep::Results
    }

    /// The current question, or `None` at `welcome` and `results`.
    pub fn prompt(&self) -> Option<Prompt> {
        let (question, choices) = self.step.question()?;
        Some(Prompt {
            step: self.step,
            question: question.to_string(),
            options: choices.iter().map(|c| c.label.to_string()).collect(),
        })
    }

    /// Leave `welcome` and ask the first question.
    pub fn start(&self) -> Result<Self, DialogError> {
        if self.step != DialogStep::Welcome {
            return Err(DialogError::OutOfOrder {
                step: self.step,
                action: "start",
            });
        }
        Ok(Self {
            step: self.step.next(),
            preferences: self.preferences.clone(),
        })
    }

    /// Answer the current question with the option at index `choice`.
    pub fn answer(&self, choice: usize) -> Result<Self, DialogError> {
        let Some((_, choices)) = self.step.question() else {
            return Err(DialogError::OutOfOrder {
                step: self.step,
                action: "answer",
            });
        };
        let picked = choices.get(choice).ok_or(DialogError::InvalidChoice {
            step: self.step,
            choice,
            options: choices.len(),
        })?;

        let prefs = &self.preferences;
        let preferences = match picked.answer {
            Answer::Budget(max) => prefs.with_budget_max(Some(max)),
            Answer::Ac(ac) => prefs.with_ac(ac),
            Answer::View(view) => prefs.with_view_importance(view),
            Answer::Famous(famous) => prefs.with_famous_people(famous),
            Answer::Position(position) => prefs.with_position(Some(position)),
            Answer::Location(location) => prefs.with_location(Some(location)),
        };

        Ok(Self {
            step: self.step.next(),
            preferences,
        })
    }

    /// Answer by option label (case-insensitive prefix match), for
    /// transports that send the label text rather than an index.
    pub fn answer_label(&self, label: &str) -> Result<Self, DialogError> {
        let wanted = label.trim().to_lowercase();
        let index = self
            .step
            .question()
            .and_then(|(_, choices)| {
                choices
                    .iter()
                    .position(|c| c.label.to_lowercase().starts_with(&wanted))
            })
            .unwrap_or(usize::MAX);
        self.answer(index)
    }

    /// Reset to `welcome` with default preferences. Only legal from `results`.
    pub fn restart(&self) -> Result<Self, DialogError> {
        if self.step != DialogStep::Results {
            return Err(DialogError::OutOfOrder {
                step: self.step,
                action: "restart",
            });
        }
        Ok(Self::new())
    }
}
