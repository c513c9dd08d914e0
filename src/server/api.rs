//! Handlers for the ritual API.
//!
//! Request/response shapes mirror the original client contract: every
//! ritual route returns a [`PondResp`] whose `html` is a ready-to-embed
//! card. LLM-backed routes run under a hard timeout so a stalled model
//! server surfaces as 504 instead of a hung connection.

use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::archive::MemoryRecord;
use crate::error::AppError;
use crate::ritual::intent::ArchiveChoice;
use crate::ritual::render;

use super::AppState;

/// Budget for any route that may call the model (the ritual fires up to two
/// completions per turn).
const LLM_BUDGET: Duration = Duration::from_secs(120);

// ── Request / response types ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(super) struct BeginRequest {
    session_id: String,
    title: String,
    offering: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct AdvanceRequest {
    session_id: String,
    reply: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ArchiveRequest {
    session_id: String,
    #[serde(default)]
    save: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ResetRequest {
    session_id: String,
}

#[derive(Debug, Serialize)]
pub(super) struct PondResp {
    html: String,
    finished: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    archive_choice: Option<ArchiveChoice>,
    timestamp: String,
}

impl PondResp {
    fn new(html: String, finished: bool, archive_choice: Option<ArchiveChoice>) -> Self {
        Self {
            html,
            finished,
            archive_choice,
            timestamp: MemoryRecord::now_timestamp(),
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Build a JSON error response body.
fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}

fn respond(result: Result<Result<PondResp, AppError>, tokio::time::error::Elapsed>, route: &str) -> Response {
    match result {
        Ok(Ok(resp)) => (StatusCode::OK, Json(resp)).into_response(),
        Ok(Err(e)) => {
            warn!(%route, "request failed: {e}");
            (StatusCode::BAD_GATEWAY, json_error("internal", e)).into_response()
        }
        Err(_) => (
            StatusCode::GATEWAY_TIMEOUT,
            json_error("timeout", "LLM request timed out"),
        )
            .into_response(),
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// POST /begin — start (or restart) the session's ritual.
pub(super) async fn begin(State(state): State<AppState>, Json(req): Json<BeginRequest>) -> Response {
    let result = tokio::time::timeout(LLM_BUDGET, async {
        let mut store = state.store.lock().await;
        let session = store.get_or_create(&req.session_id);
        let html = session.begin(&state.llm, &req.title, &req.offering).await?;
        let finished = session.is_finished();
        let choice = session.archive_choice();
        store.save();
        Ok(PondResp::new(html, finished, choice))
    })
    .await;
    respond(result, "/begin")
}

/// POST /advance — feed one player reply to the ritual.
pub(super) async fn advance(
    State(state): State<AppState>,
    Json(req): Json<AdvanceRequest>,
) -> Response {
    let result = tokio::time::timeout(LLM_BUDGET, async {
        let mut store = state.store.lock().await;
        let session = store.get_or_create(&req.session_id);
        let html = session.advance(&state.llm, &req.reply).await?;
        let finished = session.is_finished();
        let choice = session.archive_choice();
        store.save();
        Ok(PondResp::new(html, finished, choice))
    })
    .await;
    respond(result, "/advance")
}

/// POST /archive — write a finished ritual to `memories.jsonl`.
pub(super) async fn archive(
    State(state): State<AppState>,
    Json(req): Json<ArchiveRequest>,
) -> Response {
    let save = req.save.unwrap_or(true);
    let result = tokio::time::timeout(LLM_BUDGET, async {
        let mut store = state.store.lock().await;
        let session = store.get_or_create(&req.session_id);

        if !session.is_finished() {
            let choice = session.archive_choice();
            return Ok(PondResp::new(render::finish_first_card(), false, choice));
        }
        if !save {
            let choice = session.archive_choice();
            return Ok(PondResp::new(render::nothing_stored_card(), true, choice));
        }

        let record = session.archive_record(&state.llm).await?;
        let choice = session.archive_choice();
        store.save();
        state.archive.append(&record)?;
        Ok(PondResp::new(render::saved_card(), true, choice))
    })
    .await;
    respond(result, "/archive")
}

/// POST /reset — replace the session with an empty one.
pub(super) async fn reset(State(state): State<AppState>, Json(req): Json<ResetRequest>) -> Response {
    let mut store = state.store.lock().await;
    store.reset(&req.session_id);
    store.save();
    (
        StatusCode::OK,
        Json(json!({ "ok": true, "session_id": req.session_id })),
    )
        .into_response()
}

/// GET /api/health — liveness plus session count.
pub(super) async fn health(State(state): State<AppState>) -> Response {
    let store = state.store.lock().await;
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "sessions": store.len() })),
    )
        .into_response()
}
