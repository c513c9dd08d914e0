//! Persisted session registry.
//!
//! One session per client-supplied id, each holding at most one ritual.
//! The registry is a single JSON file (`sessions.json` under the work dir):
//! loaded once at startup, written back after every mutating request. Load
//! failures degrade to an empty registry — a corrupt sessions file must
//! never keep the service from starting.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::archive::MemoryRecord;
use crate::error::AppError;
use crate::llm::LlmProvider;
use crate::ritual::intent::ArchiveChoice;
use crate::ritual::{render, RitualState};

/// One client session: an id slot that may hold a ritual in progress.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pond: Option<RitualState>,
}

impl Session {
    pub fn ritual(&self) -> Option<&RitualState> {
        self.pond.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.pond.as_ref().is_some_and(|p| p.is_finished())
    }

    pub fn archive_choice(&self) -> Option<ArchiveChoice> {
        self.pond.as_ref().and_then(|p| p.archive_choice())
    }

    /// Start (or restart) the ritual for this session and return the first
    /// card. A blank title refuses without touching existing state.
    pub async fn begin(
        &mut self,
        llm: &LlmProvider,
        title: &str,
        offering: &str,
    ) -> Result<String, AppError> {
        if title.trim().is_empty() {
            return Ok(render::title_missing_card());
        }
        let offering = offering.trim().to_string();
        let state = self.pond.insert(RitualState::new(title, &offering));
        state.advance(llm, &offering).await
    }

    /// Feed one player reply to the ritual.
    pub async fn advance(&mut self, llm: &LlmProvider, reply: &str) -> Result<String, AppError> {
        match &mut self.pond {
            None => Ok(render::begin_first_card()),
            Some(state) => state.advance(llm, reply).await,
        }
    }

    /// Build the archive record for a finished ritual. Reuses the artifact
    /// already in history; only a finished session that somehow lacks one
    /// (a legacy save) re-invokes the model.
    pub async fn archive_record(&mut self, llm: &LlmProvider) -> Result<MemoryRecord, AppError> {
        let Some(state) = &mut self.pond else {
            return Err(AppError::Session("no ritual in session".into()));
        };
        if !state.is_finished() {
            return Err(AppError::Session("ritual is not finished".into()));
        }

        let choice = state.archive_choice().unwrap_or(ArchiveChoice::Hold);
        let artifact = match state.last_artifact() {
            Some(html) => html.to_string(),
            None => state.final_artifact(llm, choice).await?,
        };

        Ok(MemoryRecord {
            timestamp: MemoryRecord::now_timestamp(),
            title: state.title().to_string(),
            offering: state.offering().to_string(),
            summaries: state.summaries().to_vec(),
            archive_choice: choice,
            artifact,
        })
    }
}

/// All sessions, keyed by client-supplied id.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    sessions: HashMap<String, Session>,
}

impl SessionStore {
    /// Load the registry from `path`. Missing file → empty registry;
    /// unreadable or malformed file → warn and start empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let sessions = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<HashMap<String, Session>>(&text) {
                Ok(map) => {
                    info!(sessions = map.len(), path = %path.display(), "sessions loaded");
                    map
                }
                Err(e) => {
                    warn!(path = %path.display(), "could not parse sessions file: {e}");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!(path = %path.display(), "could not read sessions file: {e}");
                HashMap::new()
            }
        };
        Self { path, sessions }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Existing session, or a fresh empty one inserted under `id`.
    pub fn get_or_create(&mut self, id: &str) -> &mut Session {
        self.sessions.entry(id.to_string()).or_default()
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Replace the session under `id` with an empty one.
    pub fn reset(&mut self, id: &str) {
        self.sessions.insert(id.to_string(), Session::default());
    }

    /// Write the registry back to disk. A failed save is logged, not fatal:
    /// the in-memory state stays authoritative for the process lifetime.
    pub fn save(&self) {
        let result = serde_json::to_string_pretty(&self.sessions)
            .map_err(|e| AppError::Session(format!("serialise sessions: {e}")))
            .and_then(|data| {
                fs::write(&self.path, data).map_err(|e| {
                    AppError::Session(format!("cannot write {}: {e}", self.path.display()))
                })
            });
        if let Err(e) = result {
            warn!("could not save sessions: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::dummy::DummyProvider;
    use tempfile::TempDir;

    fn dummy() -> LlmProvider {
        LlmProvider::Dummy(DummyProvider)
    }

    #[tokio::test]
    async fn begin_requires_title() {
        let llm = dummy();
        let mut session = Session::default();
        let card = session.begin(&llm, "   ", "an offering").await.unwrap();
        assert!(card.contains("short title"));
        assert!(session.ritual().is_none());
    }

    #[tokio::test]
    async fn begin_starts_round_one() {
        let llm = dummy();
        let mut session = Session::default();
        let card = session.begin(&llm, "First Swim", "The lake was cold.").await.unwrap();
        assert!(card.contains("Round 1"));
        assert!(session.ritual().is_some());
        assert!(!session.is_finished());
    }

    #[tokio::test]
    async fn advance_without_begin_refuses() {
        let llm = dummy();
        let mut session = Session::default();
        let card = session.advance(&llm, "hello").await.unwrap();
        assert!(card.contains("<b>Begin</b>"));
    }

    #[tokio::test]
    async fn archive_record_requires_finished() {
        let llm = dummy();
        let mut session = Session::default();
        session.begin(&llm, "Swim", "cold lake").await.unwrap();
        let err = session.archive_record(&llm).await.unwrap_err();
        assert!(err.to_string().contains("not finished"));
    }

    #[test]
    fn store_round_trips_sessions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.json");

        let mut store = SessionStore::load(&path);
        store.get_or_create("abc");
        store.save();

        let reloaded = SessionStore::load(&path);
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.get("abc").is_some());
    }

    #[test]
    fn corrupt_sessions_file_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SessionStore::load(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn reset_replaces_session() {
        let dir = TempDir::new().unwrap();
        let mut store = SessionStore::load(dir.path().join("sessions.json"));
        store.get_or_create("abc");
        store.reset("abc");
        assert!(store.get("abc").unwrap().ritual().is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn finished_session_survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.json");
        let llm = dummy();

        let mut store = SessionStore::load(&path);
        let session = store.get_or_create("abc");
        session.begin(&llm, "Swim", "cold lake at dawn").await.unwrap();
        // Walk the whole ritual: 3 levels × 3 rounds with decisions between.
        for reply in [
            "more detail",
            "yet more detail",
            "continue",
            "more detail",
            "yet more detail",
            "continue",
            "more detail",
            "yet more detail",
            "float",
        ] {
            session.advance(&llm, reply).await.unwrap();
        }
        assert!(session.is_finished());
        store.save();

        let mut reloaded = SessionStore::load(&path);
        let session = reloaded.get_or_create("abc");
        assert!(session.is_finished());
        assert_eq!(session.archive_choice(), Some(ArchiveChoice::Float));
        let record = session.archive_record(&llm).await.unwrap();
        assert_eq!(record.title, "Swim");
        assert_eq!(record.summaries.len(), 3);
    }
}
