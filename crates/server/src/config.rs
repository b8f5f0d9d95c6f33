use std::{env, time::Duration};

use crate::services::ai::{DEFAULT_API_URL, DEFAULT_MODELS};

const PLACEHOLDER_API_KEY: &str = "your_openrouter_api_key_here";

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub session_secret: String,
    pub cookie_secure: bool,
    pub public_url: String,
    pub ai: AiConfig,
}

/// Settings for the chat-completion gateway
#[derive(Clone, Debug)]
pub struct AiConfig {
    /// `None` disables every AI feature
    pub api_key: Option<String>,
    pub api_url: String,
    pub models: Vec<String>,
    pub timeout: Duration,
    /// Sent as `HTTP-Referer`
    pub referer: String,
}

impl Config {
    pub fn from_env() -> Self {
        let public_url =
            env::var("PUBLIC_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./data/studyhub.db?mode=rwc".to_string()),
            session_secret: env::var("SESSION_SECRET").unwrap_or_else(|_| {
                tracing::warn!("SESSION_SECRET not set, using the development secret");
                "development-secret-change-in-production".to_string()
            }),
            cookie_secure: env::var("COOKIE_SECURE")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            ai: AiConfig {
                api_key: env::var("OPENROUTER_API_KEY")
                    .ok()
                    .and_then(|key| usable_api_key(&key)),
                api_url: env::var("AI_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
                models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
                timeout: Duration::from_secs(
                    env::var("AI_TIMEOUT_SECS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(30),
                ),
                referer: public_url.clone(),
            },
            public_url,
        }
    }
}

fn usable_api_key(key: &str) -> Option<String> {
    let key = key.trim();
    if key.is_empty() || key == PLACEHOLDER_API_KEY {
        None
    } else {
        Some(key.to_string())
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            session_secret: "test-secret".to_string(),
            cookie_secure: false,
            public_url: "http://localhost:3000".to_string(),
            ai: AiConfig {
                api_key: None,
                api_url: DEFAULT_API_URL.to_string(),
                models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
                timeout: Duration::from_secs(1),
                referer: "http://localhost:3000".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::usable_api_key;

    #[test]
    fn placeholder_key_disables_ai() {
        assert_eq!(usable_api_key(""), None);
        assert_eq!(usable_api_key("  "), None);
        assert_eq!(usable_api_key("your_openrouter_api_key_here"), None);
        assert_eq!(usable_api_key(" sk-or-123 "), Some("sk-or-123".to_string()));
    }
}
