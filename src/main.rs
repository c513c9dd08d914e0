//! Memory Pond — service entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Init logger at the configured level (RUST_LOG wins when set)
//!   4. Ensure the work dir, load sessions, open the archive
//!   5. Build the LLM provider and probe reachability
//!   6. Serve until ctrl-c

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use memory_pond::archive::MemoryArchive;
use memory_pond::error::AppError;
use memory_pond::llm::{self, LlmProvider};
use memory_pond::server::{self, AppState};
use memory_pond::sessions::SessionStore;
use memory_pond::{config, logger};

const SESSIONS_FILE: &str = "sessions.json";
const MEMORIES_FILE: &str = "memories.jsonl";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let config = config::load()?;

    logger::init(&config.log_level)?;

    info!(
        app_name = %config.app_name,
        work_dir = %config.work_dir.display(),
        bind = %config.server.bind,
        provider = %config.llm.provider,
        "config loaded"
    );

    std::fs::create_dir_all(&config.work_dir)?;

    let provider = llm::build(&config.llm, config.llm_api_key.clone())?;
    if let LlmProvider::OpenAiCompatible(p) = &provider {
        // Warn-only: the model server may come up after the pond does.
        if let Err(e) = p.ping().await {
            warn!(url = %config.llm.openai.api_base_url, "LLM endpoint not reachable yet: {e}");
        }
    }

    let store = SessionStore::load(config.work_dir.join(SESSIONS_FILE));
    let archive = MemoryArchive::new(config.work_dir.join(MEMORIES_FILE));
    let state = AppState::new(store, provider, archive);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
            signal_token.cancel();
        }
    });

    server::run(&config.server.bind, state, shutdown).await
}
