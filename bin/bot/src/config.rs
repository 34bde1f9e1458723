//! Environment-sourced process configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result};

use chat_relay_completion::gemini;
use chat_relay_session::FailurePolicy;
use chat_relay_session::router::DEFAULT_FALLBACK_TEXT;

const DEFAULT_BRIDGE_URL: &str = "ws://127.0.0.1:8055";
const DEFAULT_SESSION_DIR: &str = "./relay-session";
const DEFAULT_PAIR_PORT: u16 = 3310;

const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a helpful assistant replying inside an instant-messaging chat. \
Introduce yourself only once, not in every reply. \
Keep replies short and friendly, and remember what was said earlier in the \
conversation.";

/// Everything the process needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub completion_timeout: Duration,
    pub bridge_url: String,
    pub session_dir: PathBuf,
    /// Port for the pairing display page; 0 disables it.
    pub pair_port: u16,
    pub system_prompt: String,
    pub fallback_text: String,
    pub failure_policy: FailurePolicy,
    pub max_turns: usize,
    pub max_conversations: usize,
}

impl Config {
    /// Load from the environment.
    ///
    /// # Errors
    /// Returns an error when `GEMINI_KEY` is absent or any override fails
    /// to parse; both are fatal to startup.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            gemini_key: std::env::var("GEMINI_KEY")
                .context("GEMINI_KEY must be set to the completion API key")?,
            gemini_model: var_or("GEMINI_MODEL", gemini::DEFAULT_MODEL),
            gemini_base_url: var_or("GEMINI_BASE_URL", gemini::DEFAULT_BASE_URL),
            completion_timeout: Duration::from_secs(parsed_or("COMPLETION_TIMEOUT_SECS", 30)?),
            bridge_url: var_or("BRIDGE_URL", DEFAULT_BRIDGE_URL),
            session_dir: PathBuf::from(var_or("SESSION_DIR", DEFAULT_SESSION_DIR)),
            pair_port: parsed_or("PAIR_PORT", DEFAULT_PAIR_PORT)?,
            system_prompt: var_or("SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),
            fallback_text: var_or("FALLBACK_TEXT", DEFAULT_FALLBACK_TEXT),
            failure_policy: parsed_or("FAILURE_POLICY", FailurePolicy::default())?,
            max_turns: parsed_or("MAX_TURNS", chat_relay_core::context::DEFAULT_MAX_TURNS)?,
            max_conversations: parsed_or(
                "MAX_CONVERSATIONS",
                chat_relay_core::context::DEFAULT_MAX_CONVERSATIONS,
            )?,
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {name} `{raw}`: {e}")),
        Err(_) => Ok(default),
    }
}
