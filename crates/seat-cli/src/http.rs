//! JSON API over axum.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use seat_core::{AdvisorError, ChatReply, GuidedReply, NearbyOutcome, RecommendationSet};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::server::{ChatRequest, GuidedRequest, NearbyRequest, RecommendRequest, check_limit};
use crate::state::AppState;

type SharedState = Arc<AppState>;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{}", self.message);
        }
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

impl From<seat_store::StoreError> for ApiError {
    fn from(e: seat_store::StoreError) -> Self {
        Self::internal(format!("catalog unavailable: {e}"))
    }
}

impl From<AdvisorError> for ApiError {
    fn from(e: AdvisorError) -> Self {
        match e {
            AdvisorError::SessionNotFound(_) => Self::not_found(e.to_string()),
            AdvisorError::Dialog(_) => Self::bad_request(e.to_string()),
        }
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/seat-recommendations", post(recommend))
        .route("/api/chat", post(chat))
        .route("/api/guided", post(guided))
        .route("/api/nearby", post(nearby))
        .route("/api/sessions/{id}", delete(restart_session))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until `shutdown` is cancelled, then drain in-flight requests.
pub async fn serve(
    listener: TcpListener,
    state: SharedState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn healthz(State(state): State<SharedState>) -> Result<Json<serde_json::Value>, ApiError> {
    let mut stats = state.stats_json()?;
    stats["status"] = serde_json::json!("ok");
    Ok(Json(stats))
}

async fn recommend(
    State(state): State<SharedState>,
    Json(req): Json<RecommendRequest>,
) -> Result<Json<RecommendationSet>, ApiError> {
    let (input, limit) = req.into_parts().map_err(ApiError::bad_request)?;
    let catalog = state.catalog()?;
    Ok(Json(state.advisor.recommend(&catalog.seats, input, limit)))
}

async fn chat(
    State(state): State<SharedState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }
    let reply = tokio::task::spawn_blocking(move || {
        let catalog = state.catalog()?;
        Ok::<_, ApiError>(state.advisor.chat_turn(
            &catalog.seats,
            &req.message,
            req.session_id.as_deref(),
        ))
    })
    .await
    .map_err(|e| ApiError::internal(e.to_string()))??;
    Ok(Json(reply))
}

async fn guided(
    State(state): State<SharedState>,
    Json(req): Json<GuidedRequest>,
) -> Result<Json<GuidedReply>, ApiError> {
    let input = req.input().map_err(ApiError::bad_request)?;
    let catalog = state.catalog()?;
    let reply = state
        .advisor
        .guided(&catalog.seats, req.session_id.as_deref(), input)?;
    Ok(Json(reply))
}

async fn nearby(
    State(state): State<SharedState>,
    Json(req): Json<NearbyRequest>,
) -> Result<(StatusCode, Json<NearbyOutcome>), ApiError> {
    let limit = check_limit(req.limit).map_err(ApiError::bad_request)?;
    let outcome = state.nearby(&req.customer, req.booking_id, req.max_distance, limit)?;
    let status = match outcome {
        NearbyOutcome::Found { .. } | NearbyOutcome::Ambiguous { .. } => StatusCode::OK,
        NearbyOutcome::CustomerNotFound | NearbyOutcome::SeatMissing { .. } => {
            StatusCode::NOT_FOUND
        }
    };
    Ok((status, Json(outcome)))
}

async fn restart_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.advisor.restart(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("session not found: {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;
    use seat_core::DialogStep;

    fn shared() -> SharedState {
        Arc::new(test_state())
    }

    fn chat_request(message: &str, session_id: Option<&str>) -> Json<ChatRequest> {
        Json(ChatRequest {
            message: message.to_string(),
            session_id: session_id.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_recommend_handler() {
        let Json(set) = recommend(
            State(shared()),
            Json(RecommendRequest {
                budget_max: Some(300.0),
                view_importance: Some(9.0),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(set.recommendations.len(), 3);
        assert_eq!(set.total_available, 247);
        let scores: Vec<u8> = set.recommendations.iter().map(|r| r.score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn test_recommend_rejects_bad_limit() {
        let err = recommend(
            State(shared()),
            Json(RecommendRequest {
                limit: Some(1000),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_keeps_session() {
        let state = shared();
        let Json(first) = chat(State(state.clone()), chat_request("hello there", None))
            .await
            .unwrap();
        assert!(!first.ready);
        assert!(first.recommendations.is_none());

        let Json(second) = chat(
            State(state.clone()),
            chat_request("under $300 with AC please", Some(&first.session_id)),
        )
        .await
        .unwrap();
        assert_eq!(second.session_id, first.session_id);
        assert!(second.ready);
        assert_eq!(second.preferences.budget_max, Some(300.0));
        assert_eq!(state.advisor.sessions().len(), 1);
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_message() {
        let err = chat(State(shared()), chat_request("   ", None))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_guided_errors_map_to_status() {
        let state = shared();
        let err = guided(
            State(state.clone()),
            Json(GuidedRequest {
                session_id: Some("nope".into()),
                action: "choice".into(),
                index: Some(0),
                label: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let Json(start) = guided(
            State(state.clone()),
            Json(GuidedRequest {
                session_id: None,
                action: "start".into(),
                index: None,
                label: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(start.step, DialogStep::Budget);

        let err = guided(
            State(state),
            Json(GuidedRequest {
                session_id: Some(start.session_id),
                action: "restart".into(),
                index: None,
                label: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_nearby_status_codes() {
        let state = shared();
        let request = |customer: &str| {
            Json(NearbyRequest {
                customer: customer.to_string(),
                booking_id: None,
                max_distance: None,
                limit: None,
            })
        };

        let (status, Json(outcome)) = nearby(State(state.clone()), request("lopez"))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert!(matches!(outcome, NearbyOutcome::Found { .. }));

        let (status, _) = nearby(State(state.clone()), request("smith"))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);

        let (status, _) = nearby(State(state), request("nobody"))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_restart_session() {
        let state = shared();
        let Json(reply) = chat(State(state.clone()), chat_request("my budget is $450", None))
            .await
            .unwrap();
        let status = restart_session(State(state.clone()), Path(reply.session_id.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        let session = state.advisor.sessions().get(&reply.session_id).unwrap();
        assert_eq!(session.preferences.budget_max, None);

        let err = restart_session(State(state), Path("missing".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_serve_until_cancelled() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let token = CancellationToken::new();
        let server = tokio::spawn(serve(listener, shared(), token.clone()));

        let body: serde_json::Value = reqwest::get(format!("http://{addr}/healthz"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["seats"], 250);

        token.cancel();
        server.await.unwrap().unwrap();
    }
}
