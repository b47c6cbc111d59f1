use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use seat_core::{GuidedInput, MAX_LIMIT, PreferenceInput};
use serde::Deserialize;

use crate::state::AppState;

#[derive(Clone)]
pub struct SeatServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

impl SeatServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }
}

// --- Tool parameter types (shared with the HTTP API) ---

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct RecommendRequest {
    /// Maximum price the user wants to pay
    pub budget_max: Option<f64>,
    /// Minimum price (rarely used)
    pub budget_min: Option<f64>,
    /// "required", "preferred" or "optional"
    pub ac_importance: Option<String>,
    /// How much the view matters, 0-10
    pub view_importance: Option<f64>,
    /// Prefer seats with a historical note about a famous occupant
    pub famous_people: Option<bool>,
    /// "aisle", "center" or "any"
    pub position_preference: Option<String>,
    /// "front", "middle", "back" or "any"
    pub location_preference: Option<String>,
    /// Number of seats to return (default 3)
    pub limit: Option<usize>,
}

impl RecommendRequest {
    pub fn into_parts(self) -> Result<(PreferenceInput, Option<usize>), String> {
        let limit = check_limit(self.limit)?;
        let input = PreferenceInput {
            budget_max: self.budget_max,
            budget_min: self.budget_min,
            ac_importance: self.ac_importance,
            view_importance: self.view_importance,
            famous_people: self.famous_people,
            position_preference: self.position_preference,
            location_preference: self.location_preference,
        };
        Ok((input, limit))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ChatRequest {
    /// The user's free-text message
    pub message: String,
    /// Session to continue. Omit to start a new one.
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GuidedRequest {
    /// Session to continue. Omit only with action "start".
    pub session_id: Option<String>,
    /// "start", "choice", "label" or "restart"
    pub action: String,
    /// Zero-based option index for action "choice"
    pub index: Option<usize>,
    /// Option label (or its prefix) for action "label"
    pub label: Option<String>,
}

impl GuidedRequest {
    pub fn input(&self) -> Result<GuidedInput, String> {
        match self.action.trim().to_lowercase().as_str() {
            "start" => Ok(GuidedInput::Start),
            "restart" => Ok(GuidedInput::Restart),
            "choice" => self
                .index
                .map(|index| GuidedInput::Choice { index })
                .ok_or_else(|| "action \"choice\" needs an index".to_string()),
            "label" => self
                .label
                .clone()
                .map(|label| GuidedInput::Label { label })
                .ok_or_else(|| "action \"label\" needs a label".to_string()),
            other => Err(format!(
                "unknown action {other:?}, expected start, choice, label or restart"
            )),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NearbyRequest {
    /// Name (or part of a name) the booking was made under
    pub customer: String,
    /// Booking id, to pick one of several matching bookings
    pub booking_id: Option<i64>,
    /// Maximum layer and position offset (default 3)
    pub max_distance: Option<i64>,
    /// Number of seats to return (default 10)
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RestartRequest {
    pub session_id: String,
}

pub fn check_limit(limit: Option<usize>) -> Result<Option<usize>, String> {
    match limit {
        Some(0) => Err("limit must be at least 1".to_string()),
        Some(n) if n > MAX_LIMIT => Err(format!("limit must be at most {MAX_LIMIT}")),
        other => Ok(other),
    }
}

fn json_result(value: &impl serde::Serialize) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn store_error(e: seat_store::StoreError) -> McpError {
    McpError::internal_error(format!("catalog unavailable: {e}"), None)
}

#[tool_router]
impl SeatServer {
    #[tool(
        description = "Recommend seats for a set of preferences. Every field is optional; unknown values fall back to defaults. Returns ranked seats with a 0-100 score, a match tier, per-seat explanations and a summary."
    )]
    async fn seat_recommend(
        &self,
        Parameters(req): Parameters<RecommendRequest>,
    ) -> Result<CallToolResult, McpError> {
        let (input, limit) = req
            .into_parts()
            .map_err(|e| McpError::invalid_params(e, None))?;
        let catalog = self.state.catalog().map_err(store_error)?;
        let set = self.state.advisor.recommend(&catalog.seats, input, limit);
        json_result(&set)
    }

    #[tool(
        description = "Send one free-text chat message. Extracts preferences, replies conversationally and, once enough is known, returns recommendations. After results, phrases like \"cheaper\", \"better view\", \"front\", \"with AC\" or \"no AC\" refine them. Pass back the returned session_id to continue."
    )]
    async fn seat_chat(
        &self,
        Parameters(req): Parameters<ChatRequest>,
    ) -> Result<CallToolResult, McpError> {
        let state = Arc::clone(&self.state);
        let reply = tokio::task::spawn_blocking(move || {
            let catalog = state.catalog()?;
            Ok::<_, seat_store::StoreError>(state.advisor.chat_turn(
                &catalog.seats,
                &req.message,
                req.session_id.as_deref(),
            ))
        })
        .await
        .map_err(|e| McpError::internal_error(e.to_string(), None))?
        .map_err(store_error)?;
        json_result(&reply)
    }

    #[tool(
        description = "Drive the six-question guided flow (budget, AC, view, famous occupants, position, location). Call with action \"start\", then answer each prompt with action \"choice\" and an option index, or \"label\" and the option text. The final answer returns recommendations; \"restart\" begins again."
    )]
    async fn seat_guided(
        &self,
        Parameters(req): Parameters<GuidedRequest>,
    ) -> Result<CallToolResult, McpError> {
        let input = req
            .input()
            .map_err(|e| McpError::invalid_params(e, None))?;
        let catalog = self.state.catalog().map_err(store_error)?;
        let reply = self
            .state
            .advisor
            .guided(&catalog.seats, req.session_id.as_deref(), input)
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
        json_result(&reply)
    }

    #[tool(
        description = "Find available seats near a customer's existing booking. Matches the customer name case-insensitively; when several bookings match, returns them all so the caller can pass booking_id."
    )]
    async fn seat_nearby(
        &self,
        Parameters(req): Parameters<NearbyRequest>,
    ) -> Result<CallToolResult, McpError> {
        let limit = check_limit(req.limit).map_err(|e| McpError::invalid_params(e, None))?;
        let outcome = self
            .state
            .nearby(&req.customer, req.booking_id, req.max_distance, limit)
            .map_err(store_error)?;
        json_result(&outcome)
    }

    #[tool(description = "Reset a session's preferences and dialog state.")]
    async fn seat_restart(
        &self,
        Parameters(req): Parameters<RestartRequest>,
    ) -> Result<CallToolResult, McpError> {
        if !self.state.advisor.restart(&req.session_id) {
            return Err(McpError::invalid_params(
                format!("session not found: {}", req.session_id),
                None,
            ));
        }
        json_result(&serde_json::json!({
            "session_id": req.session_id,
            "restarted": true,
        }))
    }

    #[tool(description = "Catalog and session statistics: seats, available seats, bookings, active sessions.")]
    async fn seat_stats(&self) -> Result<CallToolResult, McpError> {
        let stats = self.state.stats_json().map_err(store_error)?;
        json_result(&stats)
    }
}

#[tool_handler]
impl ServerHandler for SeatServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Seat advisor for a tiered venue.\n\n\
                 - For a one-shot request with known preferences, call seat_recommend.\n\
                 - For a conversation, relay each user message to seat_chat and keep the \
                   returned session_id. Once recommendations appear, relative requests \
                   (\"cheaper\", \"better view\") refine them.\n\
                 - For a structured flow, call seat_guided with action \"start\" and answer \
                   each prompt by option index.\n\
                 - To seat someone next to an existing booking, call seat_nearby with their name."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;

    fn make_server() -> SeatServer {
        SeatServer::new(Arc::new(test_state()))
    }

    fn text_from_result(result: &CallToolResult) -> String {
        result
            .content
            .iter()
            .filter_map(|c| match &c.raw {
                RawContent::Text(t) => Some(t.text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    fn parse_result(result: &CallToolResult) -> serde_json::Value {
        let text = text_from_result(result);
        serde_json::from_str(&text).expect("handler should return valid JSON")
    }

    fn guided(session_id: Option<&str>, action: &str, index: Option<usize>) -> GuidedRequest {
        GuidedRequest {
            session_id: session_id.map(str::to_string),
            action: action.to_string(),
            index,
            label: None,
        }
    }

    #[tokio::test]
    async fn test_seat_stats() {
        let server = make_server();
        let json = parse_result(&server.seat_stats().await.unwrap());
        assert_eq!(json["seats"], 250);
        assert_eq!(json["available"], 247);
        assert_eq!(json["bookings"], 3);
    }

    #[tokio::test]
    async fn test_seat_recommend() {
        let server = make_server();
        let result = server
            .seat_recommend(Parameters(RecommendRequest {
                budget_max: Some(400.0),
                ac_importance: Some("required".into()),
                limit: Some(5),
                ..Default::default()
            }))
            .await
            .unwrap();
        let json = parse_result(&result);
        let recs = json["recommendations"].as_array().unwrap();
        assert_eq!(recs.len(), 5);
        for rec in recs {
            assert_eq!(rec["seat"]["has_ac"], true);
            let score = rec["score"].as_u64().unwrap();
            assert!(score <= 100);
        }
        assert!(json["summary"].as_str().unwrap().contains("air conditioning"));
    }

    #[tokio::test]
    async fn test_seat_recommend_rejects_zero_limit() {
        let server = make_server();
        let err = server
            .seat_recommend(Parameters(RecommendRequest {
                limit: Some(0),
                ..Default::default()
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_seat_chat_then_cheaper() {
        let server = make_server();
        let first = parse_result(
            &server
                .seat_chat(Parameters(ChatRequest {
                    message: "My budget is $500".into(),
                    session_id: None,
                }))
                .await
                .unwrap(),
        );
        assert_eq!(first["ready"], true);
        assert_eq!(first["preferences"]["budget_max"], 500.0);
        let session_id = first["session_id"].as_str().unwrap().to_string();
        let min_price = first["recommendations"]["recommendations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["seat"]["price"].as_f64().unwrap())
            .fold(f64::INFINITY, f64::min);

        let second = parse_result(
            &server
                .seat_chat(Parameters(ChatRequest {
                    message: "show me something cheaper".into(),
                    session_id: Some(session_id.clone()),
                }))
                .await
                .unwrap(),
        );
        assert_eq!(second["session_id"], session_id.as_str());
        assert_eq!(second["outcome"]["kind"], "refined");
        for rec in second["recommendations"]["recommendations"].as_array().unwrap() {
            assert!(rec["seat"]["price"].as_f64().unwrap() < min_price);
        }
    }

    #[tokio::test]
    async fn test_seat_guided_flow() {
        let server = make_server();
        let start = parse_result(
            &server
                .seat_guided(Parameters(guided(None, "start", None)))
                .await
                .unwrap(),
        );
        assert_eq!(start["step"], "budget");
        assert_eq!(start["prompt"]["options"].as_array().unwrap().len(), 4);
        let id = start["session_id"].as_str().unwrap().to_string();

        let mut last = serde_json::Value::Null;
        for index in [1, 1, 2, 1, 2, 3] {
            last = parse_result(
                &server
                    .seat_guided(Parameters(guided(Some(&id), "choice", Some(index))))
                    .await
                    .unwrap(),
            );
        }
        assert_eq!(last["step"], "results");
        assert_eq!(last["preferences"]["budget_max"], 400.0);
        assert!(!last["recommendations"]["recommendations"]
            .as_array()
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_seat_guided_usage_errors() {
        let server = make_server();
        let err = server
            .seat_guided(Parameters(guided(None, "choice", Some(0))))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);

        let err = server
            .seat_guided(Parameters(guided(None, "dance", None)))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);

        let start = parse_result(
            &server
                .seat_guided(Parameters(guided(None, "start", None)))
                .await
                .unwrap(),
        );
        let id = start["session_id"].as_str().unwrap();
        let err = server
            .seat_guided(Parameters(guided(Some(id), "choice", Some(9))))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_seat_nearby() {
        let server = make_server();
        let found = parse_result(
            &server
                .seat_nearby(Parameters(NearbyRequest {
                    customer: "MARIA".into(),
                    booking_id: None,
                    max_distance: None,
                    limit: Some(4),
                }))
                .await
                .unwrap(),
        );
        assert_eq!(found["status"], "found");
        assert_eq!(found["reference"]["id"], 45);
        assert_eq!(found["nearby"].as_array().unwrap().len(), 4);
        assert_eq!(found["nearby"][0]["distance"], 1);

        let ambiguous = parse_result(
            &server
                .seat_nearby(Parameters(NearbyRequest {
                    customer: "john".into(),
                    booking_id: None,
                    max_distance: None,
                    limit: None,
                }))
                .await
                .unwrap(),
        );
        assert_eq!(ambiguous["status"], "ambiguous");
        assert_eq!(ambiguous["matches"].as_array().unwrap().len(), 2);

        let missing = parse_result(
            &server
                .seat_nearby(Parameters(NearbyRequest {
                    customer: "nobody".into(),
                    booking_id: None,
                    max_distance: None,
                    limit: None,
                }))
                .await
                .unwrap(),
        );
        assert_eq!(missing["status"], "customer_not_found");
    }

    #[tokio::test]
    async fn test_seat_restart() {
        let server = make_server();
        let chat = parse_result(
            &server
                .seat_chat(Parameters(ChatRequest {
                    message: "I need AC".into(),
                    session_id: None,
                }))
                .await
                .unwrap(),
        );
        let id = chat["session_id"].as_str().unwrap().to_string();
        let json = parse_result(
            &server
                .seat_restart(Parameters(RestartRequest {
                    session_id: id.clone(),
                }))
                .await
                .unwrap(),
        );
        assert_eq!(json["restarted"], true);

        let err = server
            .seat_restart(Parameters(RestartRequest {
                session_id: "missing".into(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn test_guided_request_input() {
        let label = GuidedRequest {
            session_id: None,
            action: "Label".into(),
            index: None,
            label: Some("Required".into()),
        };
        assert_eq!(
            label.input().unwrap(),
            GuidedInput::Label {
                label: "Required".into()
            }
        );
        assert!(guided(None, "choice", None).input().is_err());
        assert_eq!(guided(None, "restart", None).input().unwrap(), GuidedInput::Restart);
    }

    #[test]
    fn test_tool_registration() {
        let server = make_server();
        let info = server.get_info();

        assert!(info.instructions.is_some());
        assert!(info.capabilities.tools.is_some());
    }
}
