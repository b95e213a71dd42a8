//! Embedding service trait and implementations.
//!
//! - `OllamaEmbedding` calls an Ollama server's `/api/embeddings` endpoint.
//! - `MockEmbedding` provides deterministic hash-based vectors for testing
//!   and for running without a model.

use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use trellis_core::config::EmbeddingConfig;
use trellis_core::error::{Result, TrellisError};

/// Service for generating text embeddings.
///
/// Implementations convert text into fixed-dimensional vectors. Used both
/// when ingesting nodes and when embedding text queries.
pub trait EmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send;

    /// Dimensionality of produced vectors, if known before the first call.
    fn dimensions(&self) -> Option<usize>;
}

/// Object-safe version of [`EmbeddingService`] for dynamic dispatch.
///
/// `EmbeddingService::embed` returns `impl Future`, so it cannot be used as a
/// trait object. This trait boxes the future instead; a blanket impl covers
/// every `EmbeddingService`.
pub trait DynEmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text (boxed future).
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>>> + Send + 'a>>;

    fn dimensions(&self) -> Option<usize>;
}

impl<T: EmbeddingService> DynEmbeddingService for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>>> + Send + 'a>> {
        Box::pin(self.embed(text))
    }

    fn dimensions(&self) -> Option<usize> {
        EmbeddingService::dimensions(self)
    }
}

// ---------------------------------------------------------------------------
// OllamaEmbedding - HTTP client for an Ollama server
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

/// Embedding provider backed by Ollama (`POST {endpoint}/api/embeddings`).
///
/// Performs a single request per call. Retrying is left to the caller.
#[derive(Debug, Clone)]
pub struct OllamaEmbedding {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimensions: Option<usize>,
}

impl OllamaEmbedding {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TrellisError::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(endpoint = %config.endpoint, model = %config.model, "Ollama embedding provider configured");

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

impl EmbeddingService for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(TrellisError::embedding("Cannot embed empty text"));
        }

        let url = format!("{}/api/embeddings", self.endpoint);
        debug!(url = %url, chars = text.len(), "Sending embedding request");

        let response = self
            .client
            .post(&url)
            .json(&OllamaEmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| TrellisError::embedding(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TrellisError::embedding(format!("HTTP {}: {}", status, body)));
        }

        let parsed: OllamaEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| TrellisError::embedding(format!("malformed response: {}", e)))?;

        if parsed.embedding.is_empty() {
            return Err(TrellisError::embedding("provider returned an empty vector"));
        }
        Ok(parsed.embedding)
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }
}

// ---------------------------------------------------------------------------
// MockEmbedding - deterministic hash-based vectors
// ---------------------------------------------------------------------------

/// Dimensionality of [`MockEmbedding`] vectors unless overridden.
pub const MOCK_DIMENSIONS: usize = 384;

/// Mock embedding service that returns deterministic unit vectors.
///
/// The output is derived from a hash of the input text, so identical inputs
/// always produce identical outputs.
#[derive(Debug, Clone)]
pub struct MockEmbedding {
    dimensions: usize,
}

impl MockEmbedding {
    pub fn new() -> Self {
        Self::with_dimensions(MOCK_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        let mut result = Vec::with_capacity(self.dimensions);
        for i in 0..self.dimensions {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let h = hasher.finish();
            let val = ((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0;
            result.push(val as f32);
        }

        let norm: f32 = result.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut result {
                *val /= norm;
            }
        }

        result
    }
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingService for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(TrellisError::embedding("Cannot embed empty text"));
        }
        Ok(self.hash_to_vector(text))
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dimensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::error::ErrorKind;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_mock_embedding_dimension() {
        let service = MockEmbedding::new();
        let vec = service.embed("hello world").await.unwrap();
        assert_eq!(vec.len(), 384);

        let small = MockEmbedding::with_dimensions(8);
        assert_eq!(small.embed("hello").await.unwrap().len(), 8);
        assert_eq!(EmbeddingService::dimensions(&small), Some(8));
    }

    #[tokio::test]
    async fn test_mock_embedding_deterministic() {
        let service = MockEmbedding::new();
        let v1 = service.embed("same text").await.unwrap();
        let v2 = service.embed("same text").await.unwrap();
        assert_eq!(v1, v2);
    }

    #[tokio::test]
    async fn test_mock_embedding_different_inputs() {
        let service = MockEmbedding::new();
        let v1 = service.embed("text one").await.unwrap();
        let v2 = service.embed("text two").await.unwrap();
        assert_ne!(v1, v2);
    }

    #[tokio::test]
    async fn test_mock_embedding_is_unit_length() {
        let v = MockEmbedding::new().embed("norm").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_mock_embedding_empty_text() {
        let err = MockEmbedding::new().embed("").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CollaboratorFailure);
    }

    #[tokio::test]
    async fn test_dyn_dispatch() {
        let service: Box<dyn DynEmbeddingService> = Box::new(MockEmbedding::with_dimensions(4));
        assert_eq!(service.embed_boxed("x").await.unwrap().len(), 4);
        assert_eq!(service.dimensions(), Some(4));
    }

    fn ollama_config(endpoint: String) -> EmbeddingConfig {
        EmbeddingConfig {
            endpoint,
            model: "all-minilm".into(),
            timeout_secs: 5,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_ollama_embed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(body_json(serde_json::json!({"model": "all-minilm", "prompt": "Paris"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"embedding": [0.1, 0.2, 0.3]})),
            )
            .mount(&server)
            .await;

        let service = OllamaEmbedding::new(&ollama_config(server.uri())).unwrap();
        let v = service.embed("Paris").await.unwrap();
        assert_eq!(v, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_ollama_http_error_is_collaborator_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let service = OllamaEmbedding::new(&ollama_config(server.uri())).unwrap();
        let err = service.embed("Paris").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CollaboratorFailure);
        assert!(err.to_string().contains("model not loaded"));
    }

    #[tokio::test]
    async fn test_ollama_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"vector": []})))
            .mount(&server)
            .await;

        let service = OllamaEmbedding::new(&ollama_config(server.uri())).unwrap();
        let err = service.embed("Paris").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CollaboratorFailure);
    }
}
