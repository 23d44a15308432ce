use super::*;
use std::time::Duration;

/// Prompts served as a JSON array by a remote endpoint
pub struct HttpPromptRepository {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpPromptRepository {
    pub fn new(url: String, timeout: Duration) -> Self {
        Self {
            url,
            timeout,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PromptRepository for HttpPromptRepository {
    async fn fetch_prompts(&self) -> PromptResult<Vec<Prompt>> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PromptError::Timeout(self.timeout)
                } else {
                    PromptError::Http(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(PromptError::Http(format!(
                "Prompt source returned status {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PromptError::Http(format!("Failed to read body: {}", e)))?;
        parse_prompts(&body)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_source() {
        // Port 9 (discard) on localhost is not expected to serve HTTP
        let repo = HttpPromptRepository::new(
            "http://127.0.0.1:9/prompts.json".to_string(),
            Duration::from_secs(2),
        );

        let result = repo.fetch_prompts().await;
        assert!(matches!(
            result,
            Err(PromptError::Http(_)) | Err(PromptError::Timeout(_))
        ));
    }
}
