//! Seat recommendation and conversational preference engine.
//!
//! Scores venue seats against soft user preferences, applies relative
//! refinements ("cheaper", "better view"), runs a guided question flow, and
//! finds available seats near an existing booking. Per-session state lives
//! in an in-process [`SessionStore`].
//!
//! Zero I/O: the catalog is passed in as a snapshot, and free-text
//! understanding is injected through [`PreferenceExtractor`].

pub mod advisor;
pub mod catalog;
pub mod constants;
pub mod dialog;
pub mod extractor;
pub mod preferences;
pub mod proximity;
pub mod refine;
pub mod scoring;
pub mod seat;
pub mod session;

pub use advisor::{Advisor, AdvisorError, ChatReply, GuidedInput, GuidedReply, TurnOutcome};
pub use catalog::{CATALOG_VERSION, Catalog, export_json, import_json, reference_venue};
pub use constants::{DEFAULT_LIMIT, MAX_LIMIT, NEARBY_LIMIT, NEARBY_MAX_DISTANCE};
pub use dialog::{DialogError, DialogStep, GuidedDialog, Prompt};
pub use extractor::{
    Exchange, ExtractRequest, Extraction, ExtractorError, KeywordExtractor, PreferenceExtractor,
};
pub use preferences::{
    AcImportance, LocationPreference, PositionPreference, PreferenceInput, Preferences,
};
pub use proximity::{
    CustomerMatch, NearbyOutcome, NearbySeat, find_nearby, resolve_customer, seats_near_customer,
};
pub use refine::{RecommendationSet, Recommender, RefineError, Refinement, refine};
pub use scoring::{Assessment, MatchTier, Recommendation, ScoringWeights, rank, score};
pub use seat::{Band, Booking, Seat, SeatId, SeatType, Side};
pub use session::{Session, SessionPhase, SessionStore};
