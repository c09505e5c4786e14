// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Ollama embedding client.
//!
//! Single-text embedding over the Ollama HTTP API. Batch embedding is
//! sequential (the API has no native batch endpoint); failed items come
//! back as empty vectors so the caller can decide per-item policy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::EmbeddingError;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
const PULL_TIMEOUT: Duration = Duration::from_secs(300);

/// Generates fixed-dimension embeddings for text.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Sequential batch; failed items yield empty vectors.
    async fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            match self.embed(text).await {
                Ok(embedding) => embeddings.push(embedding),
                Err(e) => {
                    warn!(index = i, error = %e, "batch embedding item failed");
                    embeddings.push(Vec::new());
                }
            }
        }
        embeddings
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    #[serde(default)]
    name: String,
}

pub struct OllamaEmbeddingClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaEmbeddingClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            timeout_secs,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Probe the model registry. Returns true when the server is reachable;
    /// a missing model is only logged since a pull may still be pending.
    pub async fn health_check(&self) -> bool {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await;

        let tags: TagsResponse = match response.and_then(|r| r.error_for_status()) {
            Ok(r) => match r.json().await {
                Ok(tags) => tags,
                Err(_) => return false,
            },
            Err(e) => {
                warn!(error = %e, "embedding service health check failed");
                return false;
            }
        };

        let base = self.model.split(':').next().unwrap_or(&self.model);
        if !tags.models.iter().any(|m| m.name.split(':').next() == Some(base)) {
            warn!(model = %self.model, "embedding model not present in registry");
        }
        true
    }

    /// Ensure the embedding model is present, pulling it when missing.
    pub async fn ensure_model_available(&self) -> bool {
        let tags: TagsResponse = match self
            .client
            .get(self.url("/api/tags"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
        {
            Ok(r) => r.json().await.unwrap_or(TagsResponse { models: vec![] }),
            Err(e) => {
                warn!(error = %e, "could not list embedding models");
                return false;
            }
        };

        let base = self.model.split(':').next().unwrap_or(&self.model);
        if tags
            .models
            .iter()
            .any(|m| m.name == self.model || m.name.starts_with(base))
        {
            return true;
        }

        info!(model = %self.model, "pulling embedding model");
        let pull = self
            .client
            .post(self.url("/api/pull"))
            .json(&serde_json::json!({ "name": self.model }))
            .timeout(PULL_TIMEOUT)
            .send()
            .await;

        match pull.and_then(|r| r.error_for_status()) {
            Ok(_) => true,
            Err(e) => {
                warn!(model = %self.model, error = %e, "model pull failed");
                false
            }
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(self.url("/api/embeddings"))
            .json(&request)
            .timeout(Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout(self.timeout_secs)
                } else {
                    EmbeddingError::Request(e.to_string())
                }
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(EmbeddingError::ModelNotFound(self.model.clone()));
        }
        let response = response
            .error_for_status()
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        if body.embedding.is_empty() {
            return Err(EmbeddingError::Empty);
        }
        Ok(body.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embed_parses_vector() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/embeddings")
            .with_status(200)
            .with_body(r#"{"embedding": [0.1, 0.2, 0.3]}"#)
            .create_async()
            .await;

        let client = OllamaEmbeddingClient::new(server.url(), "nomic-embed-text", 30);
        let embedding = client.embed("hello").await.unwrap();
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_embedding_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/embeddings")
            .with_status(200)
            .with_body(r#"{"embedding": []}"#)
            .create_async()
            .await;

        let client = OllamaEmbeddingClient::new(server.url(), "nomic-embed-text", 30);
        assert!(matches!(client.embed("hello").await, Err(EmbeddingError::Empty)));
    }

    #[tokio::test]
    async fn missing_model_is_typed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/embeddings")
            .with_status(404)
            .create_async()
            .await;

        let client = OllamaEmbeddingClient::new(server.url(), "missing-model", 30);
        assert!(matches!(
            client.embed("hello").await,
            Err(EmbeddingError::ModelNotFound(_))
        ));
    }

    #[tokio::test]
    async fn batch_returns_empty_vectors_for_failures() {
        let mut server = mockito::Server::new_async().await;
        // First call succeeds, second fails.
        server
            .mock("POST", "/api/embeddings")
            .with_status(200)
            .with_body(r#"{"embedding": [1.0]}"#)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("POST", "/api/embeddings")
            .with_status(500)
            .create_async()
            .await;

        let client = OllamaEmbeddingClient::new(server.url(), "nomic-embed-text", 30);
        let batch = client
            .embed_batch(&["one".to_string(), "two".to_string()])
            .await;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], vec![1.0]);
        assert!(batch[1].is_empty());
    }

    #[tokio::test]
    async fn health_check_tolerates_missing_model() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models": [{"name": "other-model:latest"}]}"#)
            .create_async()
            .await;

        let client = OllamaEmbeddingClient::new(server.url(), "nomic-embed-text", 30);
        assert!(client.health_check().await);
    }
}
