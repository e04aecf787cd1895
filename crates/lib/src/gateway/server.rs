//! Gateway HTTP server (single port).

use crate::channels::{Messenger, WhatsAppChannel};
use crate::config::{self, Config};
use crate::gateway::webhook::message_webhook;
use crate::llm::{CompletionBackend, CompletionParams, OpenAiClient};
use crate::store::{ConversationStore, SqliteConversationStore};
use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

/// Collaborators shared by every request. Built once at startup; read-only afterwards.
#[derive(Clone)]
pub struct GatewayState {
    pub completion: Arc<dyn CompletionBackend>,
    pub messenger: Arc<dyn Messenger>,
    pub store: Arc<dyn ConversationStore>,
}

impl GatewayState {
    pub fn new(
        completion: Arc<dyn CompletionBackend>,
        messenger: Arc<dyn Messenger>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            completion,
            messenger,
            store,
        }
    }
}

/// Routes: `GET /` health, `POST /message` webhook.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/message", post(message_webhook))
        .with_state(state)
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// Fails at startup when the OpenAI key or Twilio credentials cannot be resolved.
/// Blocks until shutdown (e.g. Ctrl+C).
/// `config_path` is the path to the config file (used to place the default database).
pub async fn run_gateway(config: Config, config_path: PathBuf) -> Result<()> {
    let api_key = config::resolve_openai_api_key(&config).context(
        "no OpenAI API key configured (set openai.apiKey or OPENAI_API_KEY)",
    )?;
    let twilio = config::resolve_twilio_credentials(&config).context(
        "Twilio credentials incomplete (set twilio.accountSid/authToken/whatsappNumber or TWILIO_ACCOUNT_SID/TWILIO_AUTH_TOKEN/TWILIO_NUMBER)",
    )?;

    let database_url = config::resolve_database_url(&config, &config_path);
    let store = SqliteConversationStore::connect(&database_url)
        .await
        .with_context(|| format!("opening conversation store {}", database_url))?;
    log::info!("conversation store ready at {}", database_url);

    let completion = OpenAiClient::new(
        config.openai.base_url.clone(),
        api_key,
        CompletionParams::from(&config.openai),
    );
    let messenger = WhatsAppChannel::new(twilio, config.twilio.base_url.clone());
    log::info!(
        "completion model {} (max_tokens {}, temperature {}); replies via {}",
        config.openai.model,
        config.openai.max_tokens,
        config.openai.temperature,
        messenger.id()
    );

    let state = GatewayState::new(
        Arc::new(completion),
        Arc::new(messenger),
        Arc::new(store.clone()),
    );
    let app = router(state);

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    store.close().await;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / returns a fixed status JSON (for probes and Twilio console checks).
async fn health_http() -> Json<serde_json::Value> {
    Json(json!({ "msg": "working" }))
}
