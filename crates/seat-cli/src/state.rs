use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use seat_core::{
    Advisor, Catalog, KeywordExtractor, NEARBY_LIMIT, NEARBY_MAX_DISTANCE, NearbyOutcome,
    PreferenceExtractor, Recommender, SessionStore, seats_near_customer,
};
use seat_store::{CatalogStore, StoreError};

use crate::config::Config;
use crate::remote::HttpExtractor;

/// Everything a transport needs: the advisor with its sessions, and the
/// catalog it reads seats and bookings from.
pub struct AppState {
    pub advisor: Advisor,
    store: Mutex<CatalogStore>,
}

impl AppState {
    pub fn new(advisor: Advisor, store: CatalogStore) -> Self {
        Self {
            advisor,
            store: Mutex::new(store),
        }
    }

    /// Build the advisor from configuration.
    pub fn from_config(config: &Config, store: CatalogStore) -> Self {
        let extractor: Box<dyn PreferenceExtractor> = match &config.extractor.endpoint {
            Some(endpoint) => {
                tracing::info!("using remote extractor at {endpoint}");
                Box::new(HttpExtractor::new(
                    endpoint.clone(),
                    Duration::from_secs(config.extractor.timeout_secs),
                ))
            }
            None => Box::new(KeywordExtractor::new()),
        };
        let advisor = Advisor::new(
            extractor,
            Recommender::new(config.scoring),
            SessionStore::with_idle_timeout(config.session.idle_timeout()),
        );
        Self::new(advisor, store)
    }

    fn store(&self) -> MutexGuard<'_, CatalogStore> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fresh snapshot of seats and bookings.
    pub fn catalog(&self) -> Result<Catalog, StoreError> {
        self.store().load_catalog()
    }

    pub fn nearby(
        &self,
        customer: &str,
        booking_id: Option<i64>,
        max_distance: Option<i64>,
        limit: Option<usize>,
    ) -> Result<NearbyOutcome, StoreError> {
        let catalog = self.catalog()?;
        Ok(seats_near_customer(
            customer,
            booking_id,
            &catalog.bookings,
            &catalog.seats,
            max_distance.unwrap_or(NEARBY_MAX_DISTANCE).max(0),
            limit.unwrap_or(NEARBY_LIMIT),
        ))
    }

    pub fn stats_json(&self) -> Result<serde_json::Value, StoreError> {
        let store = self.store();
        Ok(serde_json::json!({
            "seats": store.seat_count()?,
            "available": store.available_count()?,
            "bookings": store.load_bookings()?.len(),
            "sessions": self.advisor.sessions().len(),
        }))
    }
}

#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    let store = CatalogStore::open_in_memory().unwrap();
    store.seed_default_venue().unwrap();
    store
        .record_booking("Maria Lopez", "maria@example.com", 45)
        .unwrap();
    store
        .record_booking("John Smith", "john@example.com", 101)
        .unwrap();
    store
        .record_booking("John Smithers", "johns@example.com", 160)
        .unwrap();
    let advisor = Advisor::new(
        Box::new(KeywordExtractor::with_seed(7)),
        Recommender::default(),
        SessionStore::new(),
    );
    AppState::new(advisor, store)
}
