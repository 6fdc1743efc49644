//! Environment configuration.
//!
//! Everything the process needs is read from the environment exactly once at
//! startup and held immutable for the process lifetime. `dotenvy` loads a
//! `.env` file in development before this runs (see `main.rs`).

use anyhow::{Context, Result};

/// Origins the service ships with when `ALLOWED_ORIGINS` is not set.
const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://f16532ea-7934-49ea-98e0-8f3562d2b8ce.lovableproject.com",
    "https://preview--polisee-ai-multiple-prompts-test.lovable.app",
    "https://tarnglobal.com",
];

/// Immutable process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cloud project that hosts the generation service.
    pub project_id: String,
    /// Region of the generation service endpoint.
    pub location: String,
    /// Generative model identifier.
    pub model_name: String,
    /// HTTP listening port.
    pub port: u16,
    /// Allowed-origin entries: bare hostnames or full origin URLs.
    pub allowed_origins: Vec<String>,
    /// Output-length ceiling passed to the generation service.
    pub max_output_tokens: u32,
    /// Bearer token for the generation endpoint. Only required when a real
    /// generation call is made, so its absence is not a startup error.
    pub access_token: Option<String>,
}

impl Config {
    /// Reads configuration from the environment, applying defaults for
    /// anything unset.
    pub fn from_env() -> Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(v) => v
                .parse::<u16>()
                .with_context(|| format!("PORT must be a valid port number, got '{}'", v))?,
            Err(_) => 8080,
        };

        let max_output_tokens = match std::env::var("MAX_OUTPUT_TOKENS") {
            Ok(v) => v
                .parse::<u32>()
                .with_context(|| format!("MAX_OUTPUT_TOKENS must be an integer, got '{}'", v))?,
            Err(_) => 2048,
        };

        let allowed_origins = match std::env::var("ALLOWED_ORIGINS") {
            Ok(v) => v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        Ok(Self {
            project_id: env_or("PROJECT_ID", "general-testing-450104"),
            location: env_or("LOCATION", "us-central1"),
            model_name: env_or("MODEL_NAME", "gemini-2.0-flash-001"),
            port,
            allowed_origins,
            max_output_tokens,
            access_token: std::env::var("VERTEX_ACCESS_TOKEN").ok(),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_env() {
        // Env-var tests share a process; only touch keys no other test sets.
        let config = Config::from_env().unwrap();
        assert_eq!(config.model_name, "gemini-2.0-flash-001");
        assert_eq!(config.max_output_tokens, 2048);
        assert_eq!(config.allowed_origins.len(), 3);
        assert!(config
            .allowed_origins
            .contains(&"https://tarnglobal.com".to_string()));
    }
}
