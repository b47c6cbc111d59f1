//! Extractor client for a language-model service reached over HTTP.
//!
//! Blocking: callers inside the tokio runtime must go through
//! `spawn_blocking`.

use std::time::Duration;

use seat_core::{
    Exchange, ExtractRequest, Extraction, ExtractorError, PreferenceExtractor, PreferenceInput,
    Preferences,
};
use serde::{Deserialize, Serialize};

pub struct HttpExtractor {
    endpoint: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct ExtractPayload<'a> {
    message: &'a str,
    session_id: &'a str,
    current_preferences: &'a Preferences,
    conversation_history: &'a [Exchange],
}

/// `preferences` carries only the fields the service picked up this turn.
#[derive(Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    preferences: PreferenceInput,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    response: String,
    #[serde(default)]
    ready_for_recommendations: bool,
}

impl HttpExtractor {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

impl PreferenceExtractor for HttpExtractor {
    fn extract(&self, request: &ExtractRequest<'_>) -> Result<Extraction, ExtractorError> {
        // Built per call so the client's runtime lives and dies on this thread.
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ExtractorError::Unavailable(e.to_string()))?;

        let payload = ExtractPayload {
            message: request.message,
            session_id: request.session_id,
            current_preferences: request.prior,
            conversation_history: request.history,
        };
        let response = client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .map_err(|e| ExtractorError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractorError::Unavailable(format!(
                "{} returned {status}",
                self.endpoint
            )));
        }

        let body: ExtractResponse = response
            .json()
            .map_err(|e| ExtractorError::InvalidResponse(e.to_string()))?;
        tracing::debug!(
            confidence = body.confidence,
            ready = body.ready_for_recommendations,
            "remote extraction"
        );
        Ok(Extraction {
            preferences: request.prior.merged(&body.preferences),
            confidence: body.confidence,
            reply: body.response,
            ready: body.ready_for_recommendations,
            session_id: request.session_id.to_string(),
        }
        .normalized())
    }
}
