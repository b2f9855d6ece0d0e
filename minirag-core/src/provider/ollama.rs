//! Ollama provider implementation.
//!
//! This module provides an Ollama HTTP API client that implements the
//! [`EmbeddingFunction`] trait.

use super::types::*;
use crate::config::EmbeddingConfig;
use async_trait::async_trait;
use tracing::debug;

/// Embeds text through a running Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    dimension: usize,
    http_client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dimension,
            http_client: reqwest::Client::new(),
        }
    }

    /// Creates an embedder from the `embedding` config section.
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(&config.base_url, &config.model, config.dimension)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn embed_url(&self) -> String {
        format!("{}/api/embed", self.base_url)
    }
}

#[async_trait]
impl EmbeddingFunction for OllamaEmbedder {
    fn name(&self) -> String {
        format!("ollama:{}", self.model)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(model = %self.model, count = texts.len(), "Requesting embeddings from Ollama");

        let embed_request = EmbedRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };

        let response = self.http_client
            .post(self.embed_url())
            .json(&embed_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(ProviderError::Api(error_text));
        }

        let embed_response = response.json::<EmbedResponse>().await?;
        check_embeddings(&embed_response.embeddings, texts.len(), self.dimension)?;

        Ok(embed_response.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_includes_model() {
        let embedder = OllamaEmbedder::new("http://localhost:11434", "all-minilm", 384);
        assert_eq!(embedder.name(), "ollama:all-minilm");
        assert_eq!(embedder.dimension(), 384);
    }

    #[test]
    fn test_embed_url_trims_trailing_slash() {
        let embedder = OllamaEmbedder::new("http://localhost:11434/", "all-minilm", 384);
        assert_eq!(embedder.embed_url(), "http://localhost:11434/api/embed");
    }

    #[test]
    fn test_from_config() {
        let embedder = OllamaEmbedder::from_config(&EmbeddingConfig::default());
        assert_eq!(embedder.model(), "all-minilm");
        assert_eq!(embedder.dimension(), 384);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        // Nothing listens on port 1; an empty batch must not touch the network.
        let embedder = OllamaEmbedder::new("http://127.0.0.1:1", "all-minilm", 384);
        let embeddings = embedder.embed(&[]).await.unwrap();
        assert!(embeddings.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_request_error() {
        let embedder = OllamaEmbedder::new("http://127.0.0.1:1", "all-minilm", 384);
        let result = embedder.embed(&["hello".to_string()]).await;
        assert!(matches!(result, Err(ProviderError::Request(_))));
    }
}
