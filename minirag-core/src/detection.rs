//! Ollama availability detection and setup guidance.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Ollama is not reachable at {0}")]
    NotRunning(String),

    #[error("Embedding model '{0}' has not been pulled")]
    ModelMissing(String),

    #[error("Failed to check Ollama status: {0}")]
    CheckFailed(String),
}

pub type Result<T> = std::result::Result<T, DetectionError>;

/// Information about a reachable Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaInfo {
    pub base_url: String,
    /// Names of the locally available models, as reported by `/api/tags`.
    pub models: Vec<String>,
}

impl OllamaInfo {
    /// Whether `model` is available, with or without an explicit tag.
    ///
    /// `all-minilm` matches `all-minilm:latest`.
    pub fn has_model(&self, model: &str) -> bool {
        self.models
            .iter()
            .any(|name| name == model || name.strip_prefix(model).is_some_and(|rest| rest.starts_with(':')))
    }
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagsModel>,
}

#[derive(Deserialize)]
struct TagsModel {
    name: String,
}

/// Checks that Ollama is serving at `base_url` and has `model` pulled,
/// printing setup guidance to stderr if not.
///
/// # Example
///
/// ```no_run
/// # async fn check() {
/// use minirag_core::detection;
///
/// match detection::detect_ollama("http://localhost:11434", "all-minilm").await {
///     Ok(_) => println!("Ready to go!"),
///     Err(e) => eprintln!("Setup required: {}", e),
/// }
/// # }
/// ```
pub async fn detect_ollama(base_url: &str, model: &str) -> Result<OllamaInfo> {
    let result = check_ollama_silent(base_url, model).await;

    match &result {
        Ok(_) => {}
        Err(DetectionError::NotRunning(_)) => print_startup_help(base_url),
        Err(DetectionError::ModelMissing(model)) => print_pull_help(model),
        Err(DetectionError::CheckFailed(e)) => eprintln!("⚠️  Could not verify Ollama status: {}", e),
    }

    result
}

/// Quietly checks Ollama availability without printing help messages.
///
/// Useful for programmatic checks where you want to handle the error yourself.
pub async fn check_ollama_silent(base_url: &str, model: &str) -> Result<OllamaInfo> {
    let base_url = base_url.trim_end_matches('/');
    let url = format!("{}/api/tags", base_url);

    let response = reqwest::get(&url)
        .await
        .map_err(|_| DetectionError::NotRunning(base_url.to_string()))?;

    if !response.status().is_success() {
        return Err(DetectionError::CheckFailed(format!(
            "Ollama returned {}",
            response.status()
        )));
    }

    let tags: TagsResponse = response
        .json()
        .await
        .map_err(|e| DetectionError::CheckFailed(e.to_string()))?;

    let info = OllamaInfo {
        base_url: base_url.to_string(),
        models: tags.models.into_iter().map(|m| m.name).collect(),
    };

    if !info.has_model(model) {
        return Err(DetectionError::ModelMissing(model.to_string()));
    }

    Ok(info)
}

fn print_startup_help(base_url: &str) {
    eprintln!("❌ Ollama is not running at {}!", base_url);
    eprintln!();
    eprintln!("  Install Ollama:");

    #[cfg(not(target_os = "windows"))]
    {
        eprintln!("   curl -fsSL https://ollama.ai/install.sh | sh");
    }

    #[cfg(target_os = "windows")]
    {
        eprintln!("   Download from https://ollama.ai/download");
    }

    eprintln!();
    eprintln!("  Start Ollama:");
    eprintln!("   ollama serve");
    eprintln!();
    eprintln!("  Or run fully offline by setting `embedding.provider: hashing` in config.yaml");
}

fn print_pull_help(model: &str) {
    eprintln!("❌ Embedding model '{}' not found!", model);
    eprintln!();
    eprintln!("  Pull it with:");
    eprintln!("   ollama pull {}", model);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(models: &[&str]) -> OllamaInfo {
        OllamaInfo {
            base_url: "http://localhost:11434".to_string(),
            models: models.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn test_has_model_matches_tags() {
        let info = info(&["all-minilm:latest", "llama3.2:3b"]);
        assert!(info.has_model("all-minilm"));
        assert!(info.has_model("all-minilm:latest"));
        assert!(info.has_model("llama3.2"));
        assert!(!info.has_model("all-mini"));
        assert!(!info.has_model("nomic-embed-text"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_not_running() {
        let result = check_ollama_silent("http://127.0.0.1:1/", "all-minilm").await;
        match result {
            Err(DetectionError::NotRunning(url)) => assert_eq!(url, "http://127.0.0.1:1"),
            other => panic!("expected NotRunning, got {:?}", other),
        }
    }
}
