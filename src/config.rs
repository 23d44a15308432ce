//! Server configuration loaded from the environment (after `.env`)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::prompts::PromptConfig;
use crate::types::GameConfig;

const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory served for every path that is not an API or WebSocket route
    pub static_dir: PathBuf,
    pub game: GameConfig,
    pub prompts: PromptConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            static_dir: PathBuf::from("static"),
            game: GameConfig::default(),
            prompts: PromptConfig::default(),
        }
    }
}

/// Parse an env var, falling back to `None` when unset or malformed
fn parse_var<T: FromStr>(key: &str) -> Option<T> {
    let value = std::env::var(key).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("Ignoring invalid value {:?} for {}", value, key);
            None
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let game_defaults = GameConfig::default();

        let bind_addr = parse_var::<SocketAddr>("BIND_ADDR").unwrap_or_else(|| {
            let port = parse_var::<u16>("PORT").unwrap_or(DEFAULT_PORT);
            SocketAddr::from(([0, 0, 0, 0], port))
        });

        let game = GameConfig {
            answering_seconds: parse_var::<u32>("ANSWERING_SECONDS")
                .unwrap_or(game_defaults.answering_seconds)
                .max(1),
            quiz_seconds: parse_var::<u32>("QUIZ_SECONDS")
                .unwrap_or(game_defaults.quiz_seconds)
                .max(1),
            max_code_attempts: parse_var("MAX_CODE_ATTEMPTS")
                .unwrap_or(game_defaults.max_code_attempts),
            ..game_defaults
        };

        let static_dir = std::env::var("STATIC_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.static_dir);

        let config = Self {
            bind_addr,
            static_dir,
            game,
            prompts: PromptConfig::from_env(),
        };

        tracing::info!(
            answering_seconds = config.game.answering_seconds,
            quiz_seconds = config.game.quiz_seconds,
            "Server config loaded"
        );
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::time::Duration;

    const VARS: &[&str] = &[
        "BIND_ADDR",
        "PORT",
        "ANSWERING_SECONDS",
        "QUIZ_SECONDS",
        "MAX_CODE_ATTEMPTS",
        "STATIC_DIR",
        "PROMPTS_FILE",
        "PROMPTS_URL",
        "PROMPTS_TIMEOUT",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = ServerConfig::from_env();

        assert_eq!(config.bind_addr.port(), 3001);
        assert_eq!(config.static_dir, PathBuf::from("static"));
        assert_eq!(config.game.answering_seconds, 300);
        assert_eq!(config.game.quiz_seconds, 15);
        assert_eq!(config.game.max_code_attempts, 64);
        assert!(config.prompts.url.is_none());
        assert!(config.prompts.file.is_none());
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        std::env::set_var("BIND_ADDR", "127.0.0.1:8080");
        std::env::set_var("ANSWERING_SECONDS", "60");
        std::env::set_var("QUIZ_SECONDS", " 10 ");
        std::env::set_var("PROMPTS_FILE", "prompts.json");
        std::env::set_var("PROMPTS_TIMEOUT", "2");

        let config = ServerConfig::from_env();
        clear_env();

        assert_eq!(config.bind_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.game.answering_seconds, 60);
        assert_eq!(config.game.quiz_seconds, 10);
        assert_eq!(config.prompts.file, Some(PathBuf::from("prompts.json")));
        assert_eq!(config.prompts.timeout, Duration::from_secs(2));
    }

    #[test]
    #[serial]
    fn test_port_and_invalid_values() {
        clear_env();
        std::env::set_var("PORT", "4000");
        std::env::set_var("QUIZ_SECONDS", "soon");
        std::env::set_var("ANSWERING_SECONDS", "0");

        let config = ServerConfig::from_env();
        clear_env();

        assert_eq!(config.bind_addr.port(), 4000);
        assert_eq!(config.game.quiz_seconds, 15);
        assert_eq!(config.game.answering_seconds, 1);
    }
}
