//! Relay daemon: messaging transport in, completion replies out.
//!
//! No CLI surface; configuration comes from the environment (see
//! `config.rs`) and the process runs until signalled.

mod config;
mod pairing;

use std::net::SocketAddr;

use anyhow::Context as _;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_relay_completion::{GeminiClient, GeminiConfig};
use chat_relay_core::ContextStore;
use chat_relay_session::{LifecycleController, MessageRouter, SessionHandles};
use chat_relay_transport::{BridgeTransport, CredentialStore};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env().context("configuration")?;

    let credentials = CredentialStore::new(&config.session_dir);
    credentials.ensure_dir().await.with_context(|| {
        format!(
            "cannot create session directory {}",
            config.session_dir.display()
        )
    })?;

    let backend = GeminiClient::from_config(GeminiConfig {
        api_key: config.gemini_key.clone(),
        model: config.gemini_model.clone(),
        base_url: config.gemini_base_url.clone(),
        timeout: config.completion_timeout,
    })
    .context("cannot build completion client")?;

    let transport = BridgeTransport::new(&config.bridge_url, credentials);
    let (controller, handles) = LifecycleController::new(transport);
    let SessionHandles {
        view,
        inbound,
        outbound,
    } = handles;

    let store = ContextStore::new(&config.system_prompt)
        .with_max_turns(config.max_turns)
        .with_max_conversations(config.max_conversations);
    let router = MessageRouter::new(store, backend, outbound)
        .with_fallback_text(&config.fallback_text)
        .with_failure_policy(config.failure_policy);

    if config.pair_port > 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.pair_port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("cannot bind pairing display port {addr}"))?;
        tracing::info!("pairing display on http://{addr}");
        let app = pairing::router(view.clone());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "pairing display server failed");
            }
        });
    } else {
        tracing::info!("pairing display disabled (PAIR_PORT=0)");
    }

    tokio::spawn(controller.run());
    tokio::spawn(router.run(inbound));

    tokio::signal::ctrl_c().await.context("signal handler")?;
    tracing::info!("shutting down");
    Ok(())
}
