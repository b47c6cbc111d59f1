//! Turn handling: routes free text to the extractor, guided answers to the
//! dialog, and refinement phrases to the recommender, with all per-session
//! state kept in the [`SessionStore`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dialog::{DialogError, DialogStep, GuidedDialog, Prompt};
use crate::extractor::{ExtractRequest, KeywordExtractor, PreferenceExtractor};
use crate::preferences::{PreferenceInput, Preferences};
use crate::refine::{RecommendationSet, Recommender, RefineError, Refinement};
use crate::scoring::format_price;
use crate::seat::Seat;
use crate::session::{Session, SessionPhase, SessionStore};

const RETRY_REPLY: &str =
    "Sorry, I had trouble understanding that just now. Could you try again?";
const WELCOME_REPLY: &str =
    "Welcome! I'll ask you six quick questions to find your ideal seat.";

/// What happened on a chat turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The extractor updated the preferences.
    Extracted,
    /// A refinement phrase was applied to the previous results.
    Refined { refinement: Refinement },
    /// A refinement was recognised but could not be applied.
    RefinementUnavailable { reason: String },
    /// The extractor failed; preferences were left untouched.
    ExtractorFailed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: String,
    pub preferences: Preferences,
    pub reply: String,
    pub confidence: f64,
    pub ready: bool,
    /// `free`, a guided step name, or `results`.
    pub phase: String,
    pub outcome: TurnOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<RecommendationSet>,
}

/// Input to the guided flow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GuidedInput {
    Start,
    /// Pick an option by zero-based index.
    Choice { index: usize },
    /// Pick an option by its label.
    Label { label: String },
    Restart,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GuidedReply {
    pub session_id: String,
    pub step: DialogStep,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<Prompt>,
    pub preferences: Preferences,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<RecommendationSet>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdvisorError {
    /// The referenced session does not exist (or has expired).
    SessionNotFound(String),
    Dialog(DialogError),
}

impl fmt::Display for AdvisorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdvisorError::SessionNotFound(id) => write!(f, "session not found: {id}"),
            AdvisorError::Dialog(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for AdvisorError {}

impl From<DialogError> for AdvisorError {
    fn from(e: DialogError) -> Self {
        AdvisorError::Dialog(e)
    }
}

/// Owns the extractor, the recommender and all sessions.
pub struct Advisor {
    extractor: Box<dyn PreferenceExtractor>,
    recommender: Recommender,
    sessions: SessionStore,
}

impl Default for Advisor {
    fn default() -> Self {
        Self::new(
            Box::new(KeywordExtractor::new()),
            Recommender::default(),
            SessionStore::new(),
        )
    }
}

impl Advisor {
    pub fn new(
        extractor: Box<dyn PreferenceExtractor>,
        recommender: Recommender,
        sessions: SessionStore,
    ) -> Self {
        Self {
            extractor,
            recommender,
            sessions,
        }
    }

    pub fn recommender(&self) -> &Recommender {
        &self.recommender
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Stateless recommendation request.
    pub fn recommend(
        &self,
        catalog: &[Seat],
        input: PreferenceInput,
        limit: Option<usize>,
    ) -> RecommendationSet {
        self.recommender
            .recommend(catalog, &input.into_preferences(), limit)
    }

    /// One free-text turn. Never fails: extractor and refinement problems
    /// are reported through [`TurnOutcome`] with the prior state preserved.
    pub fn chat_turn(&self, catalog: &[Seat], message: &str, session_id: Option<&str>) -> ChatReply {
        let mut session = self.sessions.checkout(session_id);
        if session_id != Some(session.id.as_str()) {
            tracing::debug!(session = %session.id, "new chat session");
        }

        let reply = if session.phase.is_results()
            && let Some(refinement) = Refinement::parse(message)
        {
            self.refine_turn(catalog, &mut session, refinement)
        } else {
            self.extract_turn(catalog, &mut session, message)
        };

        session.record_exchange(message, &reply.reply);
        self.sessions.commit(session);
        reply
    }

    fn refine_turn(
        &self,
        catalog: &[Seat],
        session: &mut Session,
        refinement: Refinement,
    ) -> ChatReply {
        let result = self.recommender.refine_and_recommend(
            catalog,
            &session.preferences,
            refinement,
            &session.last_prices,
            None,
        );
        match result {
            Ok(set) => {
                session.record_preferences(set.preferences_used.clone());
                session.record_results(&set);
                session.phase = SessionPhase::Results;
                ChatReply {
                    session_id: session.id.clone(),
                    preferences: session.preferences.clone(),
                    reply: format!("{} {}", refinement_opener(refinement), set.summary),
                    confidence: 1.0,
                    ready: true,
                    phase: session.phase.as_str().to_string(),
                    outcome: TurnOutcome::Refined { refinement },
                    recommendations: Some(set),
                }
            }
            Err(e) => {
                tracing::debug!(session = %session.id, error = %e, "refinement rejected");
                let reply = match &e {
                    RefineError::NoPriorResults => {
                        "I don't have earlier results to compare against yet. Tell me your budget and I'll start there.".to_string()
                    }
                    RefineError::PriceFloorReached { cheapest, .. } => format!(
                        "The ${} seat is already the lowest price I can go below.",
                        format_price(*cheapest)
                    ),
                };
                ChatReply {
                    session_id: session.id.clone(),
                    preferences: session.preferences.clone(),
                    reply,
                    confidence: 1.0,
                    ready: false,
                    phase: session.phase.as_str().to_string(),
                    outcome: TurnOutcome::RefinementUnavailable {
                        reason: e.to_string(),
                    },
                    recommendations: None,
                }
            }
        }
    }

    fn extract_turn(&self, catalog: &[Seat], session: &mut Session, message: &str) -> ChatReply {
        let request = ExtractRequest {
            message,
            prior: &session.preferences,
            session_id: &session.id,
            history: &session.transcript,
        };
        let extraction = match self.extractor.extract(&request) {
            Ok(extraction) => extraction.normalized(),
            Err(e) => {
                tracing::warn!(session = %session.id, error = %e, "preference extraction failed");
                return ChatReply {
                    session_id: session.id.clone(),
                    preferences: session.preferences.clone(),
                    reply: RETRY_REPLY.to_string(),
                    confidence: 0.0,
                    ready: false,
                    phase: session.phase.as_str().to_string(),
                    outcome: TurnOutcome::ExtractorFailed,
                    recommendations: None,
                };
            }
        };

        let in_results = session.phase.is_results();
        session.record_preferences(extraction.preferences);
        if !in_results && matches!(session.phase, SessionPhase::Guided(_)) {
            session.phase = SessionPhase::Free;
        }

        let recommendations = if extraction.ready || in_results {
            let set = self
                .recommender
                .recommend(catalog, &session.preferences, None);
            session.record_results(&set);
            session.phase = SessionPhase::Results;
            Some(set)
        } else {
            None
        };

        ChatReply {
            session_id: session.id.clone(),
            preferences: session.preferences.clone(),
            reply: extraction.reply,
            confidence: extraction.confidence,
            ready: extraction.ready,
            phase: session.phase.as_str().to_string(),
            outcome: TurnOutcome::Extracted,
            recommendations,
        }
    }

    /// Drive the guided flow for a session.
    pub fn guided(
        &self,
        catalog: &[Seat],
        session_id: Option<&str>,
        input: GuidedInput,
    ) -> Result<GuidedReply, AdvisorError> {
        let mut session = match (&input, session_id) {
            (GuidedInput::Start, id) => self.sessions.checkout(id),
            (_, Some(id)) => self
                .sessions
                .get(id)
                .ok_or_else(|| AdvisorError::SessionNotFound(id.to_string()))?,
            (_, None) => return Err(AdvisorError::SessionNotFound(String::new())),
        };

        // Free-text sessions enter the guided flow at welcome.
        let current = match &session.phase {
            SessionPhase::Guided(dialog) => dialog.clone(),
            SessionPhase::Free | SessionPhase::Results => GuidedDialog::new(),
        };

        let (next, message) = match input {
            GuidedInput::Start => (current.start()?, WELCOME_REPLY.to_string()),
            GuidedInput::Choice { index } => (current.answer(index)?, String::new()),
            GuidedInput::Label { label } => (current.answer_label(&label)?, String::new()),
            GuidedInput::Restart => {
                let restarted = current.restart()?;
                session.reset();
                (restarted, "Let's start over.".to_string())
            }
        };

        session.record_preferences(next.preferences().clone());
        let recommendations = if next.is_complete() {
            let set = self
                .recommender
                .recommend(catalog, &session.preferences, None);
            session.record_results(&set);
            Some(set)
        } else {
            None
        };

        let message = match (&recommendations, message.is_empty()) {
            (Some(set), _) => set.summary.clone(),
            (None, false) => message,
            (None, true) => "Got it.".to_string(),
        };
        let reply = GuidedReply {
            session_id: session.id.clone(),
            step: next.step(),
            message,
            prompt: next.prompt(),
            preferences: session.preferences.clone(),
            recommendations,
        };
        session.phase = SessionPhase::Guided(next);
        self.sessions.commit(session);
        Ok(reply)
    }

    /// Reset a session to defaults. False when the session is unknown.
    pub fn restart(&self, session_id: &str) -> bool {
        let restarted = self.sessions.restart(session_id);
        if restarted {
            tracing::info!(session = session_id, "session restarted");
        }
        restarted
    }
}

fn refinement_opener(refinement: Refinement) -> &'static str {
    match refinement {
        Refinement::Cheaper => "Here are some cheaper options.",
        Refinement::BetterView => "Here are seats with a better view.",
        Refinement::FrontSection => "Here are seats in the front section.",
        Refinement::WithAc => "Here are seats with air conditioning.",
        Refinement::NoAc => "Air conditioning is now optional.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{ExtractorError, Extraction};
    use crate::preferences::AcImportance;
    use crate::seat::fixtures::seat;

    struct FailingExtractor;

    impl PreferenceExtractor for FailingExtractor {
        fn extract(&self, _: &ExtractRequest<'_>) -> Result<Extraction, ExtractorError> {
            Err(ExtractorError::Unavailable("connection refused".into()))
        }
    }

    fn catalog() -> Vec<Seat> {
        let with = |id, price, has_ac, view_quality| Seat {
            has_ac,
            view_quality,
            ..seat(id, price)
        };
        vec![
            with(1, 350.0, true, 9),
            with(2, 380.0, false, 8),
            with(3, 250.0, true, 5),
            with(4, 150.0, false, 3),
            with(5, 500.0, true, 10),
        ]
    }

    fn advisor() -> Advisor {
        Advisor::new(
            Box::new(KeywordExtractor::with_seed(1)),
            Recommender::default(),
            SessionStore::new(),
        )
    }

    #[test]
    fn test_chat_creates_session_and_ranks_when_ready() {
        let a = advisor();
        let reply = a.chat_turn(&catalog(), "I need AC, budget $400", None);
        assert!(reply.ready);
        assert_eq!(reply.outcome, TurnOutcome::Extracted);
        assert_eq!(reply.phase, "results");
        let set = reply.recommendations.unwrap();
        assert!(set.recommendations.iter().all(|r| r.seat.has_ac));
        assert!(a.sessions().get(&reply.session_id).is_some());
    }

    #[test]
    fn test_chat_not_ready_returns_no_results() {
        let a = advisor();
        let reply = a.chat_turn(&catalog(), "hello", None);
        assert!(!reply.ready);
        assert!(reply.recommendations.is_none());
        assert_eq!(reply.phase, "free");
    }

    #[test]
    fn test_cheaper_refinement_is_strictly_cheaper() {
        let a = advisor();
        let first = a.chat_turn(&catalog(), "$600 with an excellent view", None);
        let before = first.recommendations.unwrap().prices();
        let min_before = before.iter().copied().fold(f64::INFINITY, f64::min);

        let second = a.chat_turn(&catalog(), "show me something cheaper", Some(&first.session_id));
        assert_eq!(
            second.outcome,
            TurnOutcome::Refined {
                refinement: Refinement::Cheaper
            }
        );
        let after = second.recommendations.unwrap().prices();
        assert_eq!(min_before, 350.0);
        assert!(!after.is_empty());
        assert!(after.iter().all(|p| *p < min_before));
        assert!(second.preferences.strict_budget);
    }

    #[test]
    fn test_cheaper_without_prior_results_is_distinct() {
        let a = advisor();
        let mut session = Session::new("s");
        session.phase = SessionPhase::Results;
        a.sessions().commit(session);

        let reply = a.chat_turn(&catalog(), "cheaper please", Some("s"));
        assert!(matches!(
            reply.outcome,
            TurnOutcome::RefinementUnavailable { .. }
        ));
        assert!(reply.recommendations.is_none());
    }

    #[test]
    fn test_extractor_failure_preserves_preferences() {
        let a = Advisor::new(
            Box::new(FailingExtractor),
            Recommender::default(),
            SessionStore::new(),
        );
        let mut session = Session::new("s");
        session.preferences = Preferences::default().with_ac(AcImportance::Required);
        a.sessions().commit(session);

        let reply = a.chat_turn(&catalog(), "anything", Some("s"));
        assert_eq!(reply.outcome, TurnOutcome::ExtractorFailed);
        assert_eq!(reply.reply, RETRY_REPLY);
        assert!(!reply.ready);
        assert_eq!(reply.preferences.ac_importance, AcImportance::Required);
        assert_eq!(
            a.sessions().get("s").unwrap().preferences.ac_importance,
            AcImportance::Required
        );
    }

    #[test]
    fn test_guided_flow_runs_recommender_once_at_results() {
        let a = advisor();
        let start = a.guided(&catalog(), None, GuidedInput::Start).unwrap();
        assert_eq!(start.step, DialogStep::Budget);
        assert!(start.prompt.is_some());

        let id = start.session_id.clone();
        let mut last = start;
        for index in [1, 0, 2, 1, 2, 3] {
            last = a
                .guided(&catalog(), Some(&id), GuidedInput::Choice { index })
                .unwrap();
        }
        assert_eq!(last.step, DialogStep::Results);
        let set = last.recommendations.unwrap();
        assert!(set.recommendations.iter().all(|r| r.seat.has_ac));
        assert!(!a.sessions().get(&id).unwrap().last_prices.is_empty());

        let again = a.guided(&catalog(), Some(&id), GuidedInput::Choice { index: 0 });
        assert!(matches!(
            again,
            Err(AdvisorError::Dialog(DialogError::OutOfOrder { .. }))
        ));
    }

    #[test]
    fn test_guided_restart_only_from_results() {
        let a = advisor();
        let start = a.guided(&catalog(), None, GuidedInput::Start).unwrap();
        let id = start.session_id;
        assert!(a.guided(&catalog(), Some(&id), GuidedInput::Restart).is_err());

        for _ in 0..6 {
            a.guided(&catalog(), Some(&id), GuidedInput::Choice { index: 0 })
                .unwrap();
        }
        let restarted = a.guided(&catalog(), Some(&id), GuidedInput::Restart).unwrap();
        assert_eq!(restarted.step, DialogStep::Welcome);
        assert_eq!(restarted.preferences, Preferences::default());
        assert!(a.sessions().get(&id).unwrap().last_prices.is_empty());
    }

    #[test]
    fn test_guided_answer_unknown_session() {
        let a = advisor();
        let err = a
            .guided(&catalog(), Some("ghost"), GuidedInput::Choice { index: 0 })
            .unwrap_err();
        assert_eq!(err, AdvisorError::SessionNotFound("ghost".into()));
    }

    #[test]
    fn test_restart_resets_session() {
        let a = advisor();
        let reply = a.chat_turn(&catalog(), "budget $300", None);
        assert!(a.restart(&reply.session_id));
        let s = a.sessions().get(&reply.session_id).unwrap();
        assert!(s.last_prices.is_empty());
        assert_eq!(s.preferences, Preferences::default());
        assert!(!a.restart("missing"));
    }
}
