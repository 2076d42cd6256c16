//! Web dashboard for the outreach agent.
//!
//! A small axum app: a chat endpoint that drives the agent, a reset
//! endpoint, HCP listings read straight from the contact store, and a
//! health check. The agent never surfaces an error through `/chat` — a
//! failed run still answers with readable text, so the handler has no
//! 500 path of its own.

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, Json},
    routing::{get, post},
};
use runtime::{Agent, LlmBackend};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::{ContactStore, HcpFilter, HcpRecord};
use thiserror::Error;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Shared application state.
///
/// One agent session serves the whole dashboard; requests serialize on
/// the mutex, so two chat messages never interleave over one
/// conversation.
pub struct AppState<B: LlmBackend> {
    agent: Mutex<Agent<B>>,
    store: Arc<ContactStore>,
}

impl<B: LlmBackend> AppState<B> {
    pub fn new(agent: Agent<B>, store: Arc<ContactStore>) -> Self {
        Self {
            agent: Mutex::new(agent),
            store,
        }
    }
}

#[derive(Deserialize)]
struct ChatParams {
    message: String,
}

#[derive(Serialize)]
struct ChatReply {
    answer: String,
    status: String,
    iterations: u32,
}

#[derive(Deserialize, Default)]
struct HcpQuery {
    specialty: Option<String>,
    city: Option<String>,
    contacted: Option<bool>,
}

/// Build the dashboard router.
pub fn router<B: LlmBackend + 'static>(state: Arc<AppState<B>>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .route("/reset", post(reset_handler))
        .route("/hcps", get(hcps_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve the dashboard until the process exits.
pub async fn serve<B: LlmBackend + 'static>(addr: &str, state: Arc<AppState<B>>) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "dashboard listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn chat_handler<B: LlmBackend>(
    State(state): State<Arc<AppState<B>>>,
    Json(params): Json<ChatParams>,
) -> Json<ChatReply> {
    let mut agent = state.agent.lock().await;
    let report = agent.run(&params.message).await;
    Json(ChatReply {
        answer: report.answer,
        status: report.status.to_string(),
        iterations: report.iterations,
    })
}

async fn reset_handler<B: LlmBackend>(
    State(state): State<Arc<AppState<B>>>,
) -> Json<serde_json::Value> {
    state.agent.lock().await.reset();
    Json(serde_json::json!({"ok": true}))
}

async fn hcps_handler<B: LlmBackend>(
    State(state): State<Arc<AppState<B>>>,
    Query(query): Query<HcpQuery>,
) -> std::result::Result<Json<Vec<HcpRecord>>, (StatusCode, String)> {
    let mut filter = HcpFilter::default();
    if let Some(specialty) = query.specialty {
        filter = filter.specialty(specialty);
    }
    if let Some(city) = query.city {
        filter = filter.city(city);
    }
    if let Some(contacted) = query.contacted {
        filter = filter.contacted(contacted);
    }

    let records = state
        .store
        .find(&filter)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(records))
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8">
  <title>Nova</title>
  <style>
    body { font-family: sans-serif; max-width: 720px; margin: 2rem auto; }
    #log { border: 1px solid #ccc; padding: 1rem; min-height: 16rem;
           white-space: pre-wrap; }
    form { display: flex; gap: .5rem; margin-top: .5rem; }
    input { flex: 1; padding: .5rem; }
  </style>
</head>
<body>
  <h1>Nova</h1>
  <div id="log"></div>
  <form id="form">
    <input id="message" autocomplete="off"
           placeholder="Ask about HCPs, literature, or outreach...">
    <button>Send</button>
    <button type="button" id="reset">Reset</button>
  </form>
  <script>
    const log = document.getElementById('log');
    document.getElementById('form').addEventListener('submit', async (e) => {
      e.preventDefault();
      const input = document.getElementById('message');
      const message = input.value.trim();
      if (!message) return;
      input.value = '';
      log.textContent += 'You: ' + message + '\n';
      const res = await fetch('/chat', {
        method: 'POST',
        headers: {'Content-Type': 'application/json'},
        body: JSON.stringify({message})
      });
      const reply = await res.json();
      log.textContent += 'Nova: ' + reply.answer + '\n\n';
    });
    document.getElementById('reset').addEventListener('click', async () => {
      await fetch('/reset', {method: 'POST'});
      log.textContent = '';
    });
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use runtime::tools::{ArgSpec, ArgType, ToolRegistry, ToolSpec};
    use runtime::{ChatRequest, ChatResponse, Usage};
    use tower::ServiceExt;

    struct CannedBackend {
        reply: String,
    }

    impl LlmBackend for CannedBackend {
        async fn chat(&self, _request: ChatRequest<'_>) -> runtime::Result<ChatResponse> {
            Ok(ChatResponse {
                content: self.reply.clone(),
                usage: Usage::default(),
            })
        }
    }

    struct NullHandler;

    #[async_trait::async_trait]
    impl runtime::tools::ToolHandler for NullHandler {
        async fn call(
            &self,
            _args: runtime::tools::ToolArgs,
        ) -> std::result::Result<serde_json::Value, runtime::tools::ToolError> {
            Ok(serde_json::json!(null))
        }
    }

    fn state_with(reply: &str, store: Arc<ContactStore>) -> Arc<AppState<CannedBackend>> {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolSpec::new("QueryHCPDatabase", "Query the HCP database.")
                    .arg(ArgSpec::optional("specialty", ArgType::String)),
                Arc::new(NullHandler),
            )
            .unwrap();
        let agent = Agent::new(
            CannedBackend {
                reply: reply.to_string(),
            },
            Arc::new(registry),
        );
        Arc::new(AppState::new(agent, store))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let store = Arc::new(ContactStore::in_memory().unwrap());
        let app = router(state_with("", store));

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn chat_returns_the_final_answer() {
        let store = Arc::new(ContactStore::in_memory().unwrap());
        let app = router(state_with(
            r#"{"action": "Final Answer", "action_input": "Hello from Nova"}"#,
            store,
        ));

        let response = app
            .oneshot(
                Request::post("/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"message": "hi"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let reply = body_json(response).await;
        assert_eq!(reply["answer"], "Hello from Nova");
        assert_eq!(reply["status"], "completed");
    }

    #[tokio::test]
    async fn hcps_listing_honors_query_filters() {
        let store = Arc::new(ContactStore::in_memory().unwrap());
        for (id, specialty, city) in [
            (1, "Cardiology", "Berlin"),
            (2, "Oncology", "Berlin"),
            (3, "Cardiology", "Munich"),
        ] {
            store
                .insert_new(&HcpRecord {
                    id,
                    name: format!("Dr. {id}"),
                    specialty: specialty.into(),
                    city: city.into(),
                    preferred_channel: "email".into(),
                    contacted: false,
                })
                .unwrap();
        }
        let app = router(state_with("", store));

        let response = app
            .oneshot(
                Request::get("/hcps?specialty=Cardiology&city=Berlin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let records = body_json(response).await;
        assert_eq!(records.as_array().unwrap().len(), 1);
        assert_eq!(records[0]["id"], 1);
    }
}
