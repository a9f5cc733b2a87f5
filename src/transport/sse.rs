//! Legacy HTTP+SSE transport.
//!
//! `GET /sse` opens a session: the first event (`endpoint`) tells the client
//! where to POST, every later `message` event is one JSON-RPC message from
//! the server. `POST /message?sessionId=<id>` feeds one JSON-RPC message to
//! that session. Each session runs its own `McpServer` over an in-memory
//! duplex pipe carrying newline-delimited JSON.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Result;
use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
};
use rmcp::service::ServiceExt;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::api::{self, ApiState};
use crate::config::TransportMode;
use crate::dispatch::ServerStats;
use crate::server::McpServer;

const PIPE_CAPACITY: usize = 64 * 1024;
const KEEP_ALIVE: Duration = Duration::from_secs(15);

type SessionWriter = Arc<tokio::sync::Mutex<WriteHalf<DuplexStream>>>;

#[derive(Clone)]
pub struct SseState {
    server: McpServer,
    sessions: Arc<Mutex<HashMap<String, SessionWriter>>>,
}

impl SseState {
    pub fn new(server: McpServer) -> Self {
        Self {
            server,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn session_count(&self) -> usize {
        self.lock_sessions().len()
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionWriter>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stats(&self) -> &Arc<ServerStats> {
        self.server.stats()
    }
}

/// Removes the session when the client's event stream is dropped.
struct SessionGuard {
    id: String,
    state: SseState,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.state.lock_sessions().remove(&self.id).is_some() {
            self.state.stats().session_closed();
            debug!(session = %self.id, "SSE session closed");
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: String,
}

/// Build the SSE router: `/sse`, `/message` and the operational routes.
pub fn router(state: SseState) -> Router {
    let api_state = ApiState::new(TransportMode::Sse, state.stats().clone());

    api::with_layers(
        Router::new()
            .route("/sse", get(open_stream))
            .route("/message", post(post_message))
            .with_state(state)
            .merge(api::create_router(api_state)),
    )
}

/// Serve the SSE transport on `bind`.
pub async fn serve(server: McpServer, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("MCP SSE server listening on http://{}/sse", bind);

    axum::serve(listener, router(SseState::new(server))).await?;
    Ok(())
}

async fn open_stream(
    State(state): State<SseState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = uuid::Uuid::new_v4().simple().to_string();

    let (server_io, client_io) = tokio::io::duplex(PIPE_CAPACITY);
    let (server_rx, server_tx) = tokio::io::split(server_io);
    let (client_rx, client_tx) = tokio::io::split(client_io);

    state
        .lock_sessions()
        .insert(session_id.clone(), Arc::new(tokio::sync::Mutex::new(client_tx)));
    state.stats().session_opened();
    info!(session = %session_id, "SSE session opened");

    tokio::spawn(run_session(
        state.server.clone(),
        server_rx,
        server_tx,
        session_id.clone(),
    ));

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/message?sessionId={}", session_id));
    let guard = SessionGuard {
        id: session_id,
        state,
    };

    let messages = LinesStream::new(BufReader::new(client_rx).lines())
        .map_while(|line| line.ok())
        .map(move |line| {
            let _session = &guard;
            Ok(Event::default().event("message").data(line))
        });

    Sse::new(tokio_stream::once(Ok(endpoint)).chain(messages))
        .keep_alive(KeepAlive::new().interval(KEEP_ALIVE))
}

async fn run_session(
    server: McpServer,
    rx: ReadHalf<DuplexStream>,
    tx: WriteHalf<DuplexStream>,
    session_id: String,
) {
    match server.serve((rx, tx)).await {
        Ok(service) => match service.waiting().await {
            Ok(reason) => debug!(session = %session_id, "MCP session ended: {:?}", reason),
            Err(e) => warn!(session = %session_id, "MCP session task failed: {}", e),
        },
        Err(e) => warn!(session = %session_id, "MCP session failed to initialize: {:?}", e),
    }
}

async fn post_message(
    State(state): State<SseState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> StatusCode {
    let Some(writer) = state.lock_sessions().get(&query.session_id).cloned() else {
        return StatusCode::NOT_FOUND;
    };

    // Re-encode so the frame is a single line regardless of client formatting.
    let message: serde_json::Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) => {
            debug!(session = %query.session_id, "Rejected malformed message: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };
    let mut frame = message.to_string();
    frame.push('\n');

    let mut writer = writer.lock().await;
    if let Err(e) = writer.write_all(frame.as_bytes()).await {
        warn!(session = %query.session_id, "Session pipe closed: {}", e);
        return StatusCode::GONE;
    }
    StatusCode::ACCEPTED
}
