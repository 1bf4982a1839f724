use dream_core::DreamError;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::service::{DreamService, ServiceError};

const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Clone)]
pub struct DreamServer {
    service: DreamService,
    tool_router: ToolRouter<Self>,
}

impl DreamServer {
    pub fn new(service: DreamService) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }
}

fn to_mcp(e: ServiceError) -> McpError {
    match e {
        ServiceError::Dream(DreamError::InvalidInput(msg)) => McpError::invalid_params(msg, None),
        ServiceError::NotFound(msg) => McpError::invalid_params(msg, None),
        other => McpError::internal_error(other.to_string(), None),
    }
}

fn json_result(value: &serde_json::Value) -> CallToolResult {
    CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(value).unwrap_or_default(),
    )])
}

// --- Tool parameter types ---

#[derive(Debug, Deserialize, JsonSchema)]
struct ClassifyRequest {
    /// Dream narrative to classify. Nothing is stored.
    text: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SubmitRequest {
    /// Dreamer whose profile the dream is added to
    user_id: String,
    /// Dream narrative
    text: String,
    /// Optional keywords the dreamer associates with the dream
    keywords: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SymbolRequest {
    user_id: String,
    /// Include the rendered SVG document in the response
    include_svg: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct StatsRequest {
    user_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct HistoryRequest {
    user_id: String,
    /// Most recent dreams to return (default 20)
    limit: Option<usize>,
}

#[tool_router]
impl DreamServer {
    #[tool(
        description = "Classify a dream narrative on the valence (Upper/Downer) and energy (Dynamic/Static) axes without recording it. Returns both axis scores, the quadrant, a confidence in [0, 1] and the matched keywords."
    )]
    async fn dream_classify(
        &self,
        Parameters(req): Parameters<ClassifyRequest>,
    ) -> Result<CallToolResult, McpError> {
        let classified = self
            .service
            .run(move |s| s.classify(&req.text))
            .await
            .map_err(to_mcp)?;

        Ok(json_result(&serde_json::json!({
            "valence": classified.axis_score.valence,
            "energy": classified.axis_score.energy,
            "quadrant": classified.quadrant,
            "description": classified.quadrant.describe(),
            "confidence": classified.confidence,
            "keywords": classified.matched_keywords,
        })))
    }

    #[tool(
        description = "Record a dream for a user: classify it, fold it into the user's aggregate and return the updated symbol parameters."
    )]
    async fn dream_submit(
        &self,
        Parameters(req): Parameters<SubmitRequest>,
    ) -> Result<CallToolResult, McpError> {
        let submission = self
            .service
            .run(move |s| s.submit(&req.user_id, &req.text, &req.keywords.unwrap_or_default()))
            .await
            .map_err(to_mcp)?;

        let record = &submission.record;
        Ok(json_result(&serde_json::json!({
            "id": record.id,
            "sequence": record.sequence,
            "valence": record.classified.axis_score.valence,
            "energy": record.classified.axis_score.energy,
            "quadrant": record.classified.quadrant,
            "confidence": record.classified.confidence,
            "keywords": record.classified.matched_keywords,
            "created_at": record.created_at,
            "symbol": submission.params,
        })))
    }

    #[tool(
        description = "Current symbol parameters of a user: complexity, palette bias, symmetry factor and dominant quadrant, plus the latest dream's coordinates. Optionally includes an SVG rendering."
    )]
    async fn dream_symbol(
        &self,
        Parameters(req): Parameters<SymbolRequest>,
    ) -> Result<CallToolResult, McpError> {
        let include_svg = req.include_svg.unwrap_or(false);
        let view = self
            .service
            .run(move |s| s.symbol(&req.user_id, include_svg))
            .await
            .map_err(to_mcp)?;

        let value =
            serde_json::to_value(&view).map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(json_result(&value))
    }

    #[tool(description = "Aggregate statistics of a user's dreams.")]
    async fn dream_stats(
        &self,
        Parameters(req): Parameters<StatsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let stats = self
            .service
            .run(move |s| s.stats(&req.user_id))
            .await
            .map_err(to_mcp)?;

        let mut value =
            serde_json::to_value(&stats).map_err(|e| McpError::internal_error(e.to_string(), None))?;
        value["dominant_description"] = serde_json::json!(stats.dominant_quadrant.describe());
        Ok(json_result(&value))
    }

    #[tool(description = "A user's recorded dreams, oldest first, limited to the most recent ones.")]
    async fn dream_history(
        &self,
        Parameters(req): Parameters<HistoryRequest>,
    ) -> Result<CallToolResult, McpError> {
        let limit = req.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        let dreams = self
            .service
            .run(move |s| s.history(&req.user_id, Some(limit)))
            .await
            .map_err(to_mcp)?;

        let entries: Vec<serde_json::Value> = dreams
            .iter()
            .map(|d| {
                serde_json::json!({
                    "id": d.id,
                    "sequence": d.sequence,
                    "text": d.text,
                    "quadrant": d.classified.quadrant,
                    "valence": d.classified.axis_score.valence,
                    "energy": d.classified.axis_score.energy,
                    "confidence": d.classified.confidence,
                    "created_at": d.created_at,
                })
            })
            .collect();
        Ok(json_result(&serde_json::json!({
            "count": entries.len(),
            "dreams": entries,
        })))
    }
}

#[tool_handler]
impl ServerHandler for DreamServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Dream signal engine. Dreams are placed on two axes: valence (Upper = positive, \
                 Downer = negative) and energy (Dynamic = active, Static = still).\n\n\
                 - dream_classify scores a narrative without storing it.\n\
                 - dream_submit records a dream for a user and returns the updated symbol.\n\
                 - dream_symbol, dream_stats and dream_history read a user's profile.\n\n\
                 A user's symbol grows more complex as dreams accumulate and never shrinks."
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
    use dream_store::DataDir;
    use tempfile::TempDir;

    fn make_server() -> (TempDir, DreamServer) {
        let tmp = TempDir::new().unwrap();
        let dir = DataDir::resolve(Some(tmp.path())).unwrap();
        let service = DreamService::open(dir).unwrap();
        (tmp, DreamServer::new(service))
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

    async fn submit(server: &DreamServer, user: &str, text: &str) -> serde_json::Value {
        let result = server
            .dream_submit(Parameters(SubmitRequest {
                user_id: user.to_string(),
                text: text.to_string(),
                keywords: None,
            }))
            .await
            .unwrap();
        parse_result(&result)
    }

    #[tokio::test]
    async fn test_dream_classify() {
        let (_tmp, server) = make_server();
        let result = server
            .dream_classify(Parameters(ClassifyRequest {
                text: "I was flying joyfully over a bright city".to_string(),
            }))
            .await
            .unwrap();
        let json = parse_result(&result);
        assert_eq!(json["quadrant"], "UpperDynamic");
        assert!(json["confidence"].as_f64().unwrap() > 0.6);
        assert!(json["keywords"].as_array().unwrap().contains(&"flying".into()));

        // Classifying stores nothing.
        let stats = server
            .dream_stats(Parameters(StatsRequest {
                user_id: "anyone".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(parse_result(&stats)["total_dreams"], 0);
    }

    #[tokio::test]
    async fn test_dream_classify_empty_is_invalid_params() {
        let (_tmp, server) = make_server();
        let err = server
            .dream_classify(Parameters(ClassifyRequest {
                text: "  ".to_string(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_dream_submit_then_symbol() {
        let (_tmp, server) = make_server();
        let first = submit(&server, "alice", "I was flying joyfully over a bright city").await;
        assert_eq!(first["sequence"], 1);
        assert_eq!(first["symbol"]["complexity"], 1);
        assert!(first["created_at"].is_string());

        submit(&server, "alice", "I sat frozen in a dark empty room").await;
        let third = submit(&server, "alice", "I was in a quiet hallway").await;
        assert_eq!(third["sequence"], 3);
        assert_eq!(third["symbol"]["complexity"], 2);

        let result = server
            .dream_symbol(Parameters(SymbolRequest {
                user_id: "alice".to_string(),
                include_svg: Some(true),
            }))
            .await
            .unwrap();
        let json = parse_result(&result);
        assert_eq!(json["dream_count"], 3);
        assert_eq!(json["params"], third["symbol"]);
        assert!(json["svg"].as_str().unwrap().starts_with("<svg"));
    }

    #[tokio::test]
    async fn test_dream_symbol_without_svg() {
        let (_tmp, server) = make_server();
        let result = server
            .dream_symbol(Parameters(SymbolRequest {
                user_id: "nobody".to_string(),
                include_svg: None,
            }))
            .await
            .unwrap();
        let json = parse_result(&result);
        assert_eq!(json["dream_count"], 0);
        assert!(json.get("svg").is_none());
    }

    #[tokio::test]
    async fn test_dream_stats_and_history() {
        let (_tmp, server) = make_server();
        for _ in 0..3 {
            submit(&server, "bob", "I sat frozen in a dark empty room").await;
        }
        let stats = parse_result(
            &server
                .dream_stats(Parameters(StatsRequest {
                    user_id: "bob".to_string(),
                }))
                .await
                .unwrap(),
        );
        assert_eq!(stats["total_dreams"], 3);
        assert_eq!(stats["dominant_quadrant"], "DownerStatic");
        assert_eq!(
            stats["dominant_description"],
            "Static Downer (Stagnant Negative)"
        );

        let history = parse_result(
            &server
                .dream_history(Parameters(HistoryRequest {
                    user_id: "bob".to_string(),
                    limit: Some(2),
                }))
                .await
                .unwrap(),
        );
        assert_eq!(history["count"], 2);
        assert_eq!(history["dreams"][0]["sequence"], 2);
        assert_eq!(history["dreams"][1]["sequence"], 3);
    }

    #[tokio::test]
    async fn test_empty_user_rejected() {
        let (_tmp, server) = make_server();
        let err = server
            .dream_history(Parameters(HistoryRequest {
                user_id: String::new(),
                limit: None,
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn test_tool_registration() {
        let (_tmp, server) = make_server();
        let info = server.get_info();

        assert!(info.instructions.is_some());
        assert!(info.capabilities.tools.is_some());
    }
}
