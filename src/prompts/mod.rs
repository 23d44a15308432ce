mod file;
mod http;

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::types::Prompt;

pub use file::FilePromptRepository;
pub use http::HttpPromptRepository;

/// Result type for prompt repository operations
pub type PromptResult<T> = Result<T, PromptError>;

/// Errors that can occur while fetching prompts
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("Prompt source returned no prompts")]
    Empty,

    #[error("Failed to read prompt file: {0}")]
    Io(String),

    #[error("Prompt request failed: {0}")]
    Http(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Prompt parsing failed: {0}")]
    Parse(String),
}

/// Read-only source of candidate prompts, consulted once per game start
#[async_trait]
pub trait PromptRepository: Send + Sync {
    async fn fetch_prompts(&self) -> PromptResult<Vec<Prompt>>;

    /// Name used in logs
    fn name(&self) -> &str;
}

/// Prompt record as stored in files or served over HTTP.
/// Either a bare string or an object with optional id.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PromptRecord {
    Text(String),
    Full { id: Option<String>, text: String },
}

/// Parse a JSON array of prompt records, assigning index-based ids where missing
pub(crate) fn parse_prompts(raw: &str) -> PromptResult<Vec<Prompt>> {
    let records: Vec<PromptRecord> =
        serde_json::from_str(raw).map_err(|e| PromptError::Parse(e.to_string()))?;
    non_empty(
        records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| {
                let (id, text) = match record {
                    PromptRecord::Text(text) => (None, text),
                    PromptRecord::Full { id, text } => (id, text),
                };
                let text = text.trim().to_string();
                (!text.is_empty()).then(|| Prompt {
                    id: id.unwrap_or_else(|| index.to_string()),
                    text,
                })
            })
            .collect(),
    )
}

fn non_empty(prompts: Vec<Prompt>) -> PromptResult<Vec<Prompt>> {
    if prompts.is_empty() {
        Err(PromptError::Empty)
    } else {
        Ok(prompts)
    }
}

/// Fixed in-memory prompt list
pub struct StaticPromptRepository {
    prompts: Vec<Prompt>,
}

impl StaticPromptRepository {
    pub fn new(prompts: Vec<Prompt>) -> Self {
        Self { prompts }
    }

    /// Build from plain texts, ids are the list positions
    pub fn from_texts<S: AsRef<str>>(texts: &[S]) -> Self {
        Self::new(
            texts
                .iter()
                .enumerate()
                .map(|(index, text)| Prompt {
                    id: index.to_string(),
                    text: text.as_ref().to_string(),
                })
                .collect(),
        )
    }

    /// Prompts shipped with the server, used when no external source is configured
    pub fn builtin() -> Self {
        Self::from_texts(BUILTIN_PROMPTS)
    }
}

#[async_trait]
impl PromptRepository for StaticPromptRepository {
    async fn fetch_prompts(&self) -> PromptResult<Vec<Prompt>> {
        non_empty(self.prompts.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

const BUILTIN_PROMPTS: &[&str] = &[
    "What was your first job?",
    "What is the worst haircut you ever had?",
    "Which food could you eat every day?",
    "What was your favourite toy as a child?",
    "Where would you go on a dream holiday?",
    "What is your most useless talent?",
    "Which song always gets stuck in your head?",
    "What did you want to be when you grew up?",
    "What is the strangest thing in your fridge right now?",
    "Which film can you quote from start to finish?",
    "What is your go-to karaoke song?",
    "What is the best gift you have ever received?",
    "What is your biggest pet peeve?",
    "Which celebrity would you like to have dinner with?",
    "What is the most embarrassing thing you have said to a stranger?",
    "What would your superhero name be?",
];

/// Configuration for the prompt source
#[derive(Debug, Clone)]
pub struct PromptConfig {
    /// JSON file with prompts, re-read on every fetch
    pub file: Option<PathBuf>,
    /// URL serving a JSON array of prompts (takes precedence over the file)
    pub url: Option<String>,
    /// Timeout for HTTP fetches
    pub timeout: Duration,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            file: None,
            url: None,
            timeout: Duration::from_secs(5),
        }
    }
}

impl PromptConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let non_empty_var = |key: &str| {
            std::env::var(key).ok().and_then(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
        };

        Self {
            file: non_empty_var("PROMPTS_FILE").map(PathBuf::from),
            url: non_empty_var("PROMPTS_URL"),
            timeout: std::env::var("PROMPTS_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(5)),
        }
    }

    /// Build the repository for the configured source
    pub fn build_repository(&self) -> Arc<dyn PromptRepository> {
        if let Some(url) = &self.url {
            tracing::info!("Using HTTP prompt repository at {}", url);
            return Arc::new(HttpPromptRepository::new(url.clone(), self.timeout));
        }

        if let Some(path) = &self.file {
            tracing::info!("Using prompt file {}", path.display());
            return Arc::new(FilePromptRepository::new(path.clone()));
        }

        tracing::info!("No prompt source configured, using built-in prompts");
        Arc::new(StaticPromptRepository::builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_records() {
        let prompts =
            parse_prompts(r#"["First?", {"id": "q7", "text": "Second?"}, {"text": "Third?"}]"#)
                .unwrap();

        assert_eq!(prompts.len(), 3);
        assert_eq!(prompts[0].id, "0");
        assert_eq!(prompts[1].id, "q7");
        assert_eq!(prompts[2].id, "2");
        assert_eq!(prompts[2].text, "Third?");
    }

    #[test]
    fn test_parse_skips_blank_texts() {
        let prompts = parse_prompts(r#"["  ", "Real?"]"#).unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].text, "Real?");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_prompts("[]"), Err(PromptError::Empty)));
        assert!(matches!(parse_prompts("{"), Err(PromptError::Parse(_))));
    }

    #[tokio::test]
    async fn test_static_repository() {
        let repo = StaticPromptRepository::from_texts(&["A?", "B?"]);
        let prompts = repo.fetch_prompts().await.unwrap();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[1].id, "1");

        let empty = StaticPromptRepository::new(Vec::new());
        assert!(matches!(
            empty.fetch_prompts().await,
            Err(PromptError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_builtin_has_enough_prompts() {
        let prompts = StaticPromptRepository::builtin()
            .fetch_prompts()
            .await
            .unwrap();
        assert!(prompts.len() >= 8);
    }

    #[test]
    fn test_default_config() {
        let config = PromptConfig::default();
        assert!(config.file.is_none());
        assert!(config.url.is_none());
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
