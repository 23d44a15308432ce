use super::*;
use std::path::PathBuf;

/// Prompts stored as a JSON array on disk
pub struct FilePromptRepository {
    path: PathBuf,
}

impl FilePromptRepository {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl PromptRepository for FilePromptRepository {
    async fn fetch_prompts(&self) -> PromptResult<Vec<Prompt>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| PromptError::Io(format!("{}: {}", self.path.display(), e)))?;
        parse_prompts(&raw)
    }

    fn name(&self) -> &str {
        "file"
    }
}
