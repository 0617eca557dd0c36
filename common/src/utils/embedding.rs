use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    sync::Arc,
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use async_openai::{types::CreateEmbeddingRequestArgs, Client};
use serde::Deserialize;

use super::config::{AppConfig, EmbeddingBackend};

/// Turns free text into fixed-length vectors. Callers that must not fail on
/// provider trouble (the vector search engine) treat any `Err` as "no
/// embedding"; the provider itself reports errors normally.
#[derive(Clone)]
pub struct EmbeddingProvider {
    inner: EmbeddingInner,
}

#[derive(Clone)]
enum EmbeddingInner {
    Remote {
        http: reqwest::Client,
        url: String,
        dimension: usize,
    },
    OpenAI {
        client: Arc<Client<async_openai::config::OpenAIConfig>>,
        model: String,
        dimensions: u32,
    },
    Hashed {
        dimension: usize,
    },
}

/// The remote endpoint answers with either one vector or a batch of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RemoteEmbedResponse {
    Single(Vec<f32>),
    Batch(Vec<Vec<f32>>),
}

impl EmbeddingProvider {
    pub fn from_config(
        config: &AppConfig,
        openai_client: Option<Arc<Client<async_openai::config::OpenAIConfig>>>,
    ) -> Result<Self> {
        match config.embedding_backend {
            EmbeddingBackend::Remote => Ok(Self::new_remote(
                config.embedding_api_url.clone(),
                config.embedding_dimensions,
            )),
            EmbeddingBackend::Openai => {
                let client = openai_client
                    .ok_or_else(|| anyhow!("openai embedding backend requires a client"))?;
                Ok(Self::new_openai(
                    client,
                    config.embedding_model.clone(),
                    config.embedding_dimensions as u32,
                ))
            }
            EmbeddingBackend::Hashed => Ok(Self::new_hashed(config.embedding_dimensions)),
        }
    }

    pub fn new_remote(url: String, dimension: usize) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            inner: EmbeddingInner::Remote {
                http,
                url,
                dimension: dimension.max(1),
            },
        }
    }

    pub fn new_openai(
        client: Arc<Client<async_openai::config::OpenAIConfig>>,
        model: String,
        dimensions: u32,
    ) -> Self {
        Self {
            inner: EmbeddingInner::OpenAI {
                client,
                model,
                dimensions,
            },
        }
    }

    pub fn new_hashed(dimension: usize) -> Self {
        Self {
            inner: EmbeddingInner::Hashed {
                dimension: dimension.max(1),
            },
        }
    }

    pub fn backend_label(&self) -> &'static str {
        match self.inner {
            EmbeddingInner::Remote { .. } => "remote",
            EmbeddingInner::OpenAI { .. } => "openai",
            EmbeddingInner::Hashed { .. } => "hashed",
        }
    }

    pub fn dimension(&self) -> usize {
        match &self.inner {
            EmbeddingInner::Remote { dimension, .. } => *dimension,
            EmbeddingInner::OpenAI { dimensions, .. } => *dimensions as usize,
            EmbeddingInner::Hashed { dimension } => *dimension,
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match &self.inner {
            EmbeddingInner::Remote { http, url, .. } => {
                let response = http
                    .post(url)
                    .json(&serde_json::json!({ "inputs": text }))
                    .send()
                    .await
                    .context("calling remote embedding endpoint")?
                    .error_for_status()
                    .context("remote embedding endpoint status")?
                    .json::<RemoteEmbedResponse>()
                    .await
                    .context("decoding remote embedding response")?;

                match response {
                    RemoteEmbedResponse::Single(vector) => Ok(vector),
                    RemoteEmbedResponse::Batch(mut vectors) => {
                        if vectors.is_empty() {
                            Err(anyhow!("remote endpoint returned an empty batch"))
                        } else {
                            Ok(vectors.swap_remove(0))
                        }
                    }
                }
            }
            EmbeddingInner::OpenAI {
                client,
                model,
                dimensions,
            } => {
                let request = CreateEmbeddingRequestArgs::default()
                    .model(model.clone())
                    .input([text])
                    .dimensions(*dimensions)
                    .build()?;

                let response = client.embeddings().create(request).await?;

                response
                    .data
                    .into_iter()
                    .next()
                    .map(|item| item.embedding)
                    .ok_or_else(|| anyhow!("No embedding data received from API"))
            }
            EmbeddingInner::Hashed { dimension } => Ok(hashed_embedding(text, *dimension)),
        }
    }

    pub async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        match &self.inner {
            EmbeddingInner::Hashed { dimension } => Ok(texts
                .into_iter()
                .map(|text| hashed_embedding(&text, *dimension))
                .collect()),
            _ => {
                let mut vectors = Vec::with_capacity(texts.len());
                for text in texts {
                    vectors.push(self.embed(&text).await?);
                }
                Ok(vectors)
            }
        }
    }
}

// L2-normalized token-bucket vectors; deterministic, so similar texts with
// shared tokens land close together under cosine similarity.
fn hashed_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let dim = dimension.max(1);
    let mut vector = vec![0.0f32; dim];
    if text.is_empty() {
        return vector;
    }

    for token in tokens(text) {
        let idx = bucket(&token, dim);
        vector[idx] += 1.0;
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }

    vector
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

fn bucket(token: &str, dimension: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    (hasher.finish() as usize) % dimension
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashed_embedding_is_deterministic_and_normalized() {
        let provider = EmbeddingProvider::new_hashed(16);
        let a = provider.embed("phim hành động").await.expect("embed failed");
        let b = provider.embed("phim hành động").await.expect("embed failed");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);

        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "expected unit norm, got {norm}");
    }

    #[tokio::test]
    async fn hashed_batch_matches_single_calls() {
        let provider = EmbeddingProvider::new_hashed(8);
        let single = provider.embed("one").await.expect("embed failed");
        let batch = provider
            .embed_batch(vec!["one".into(), "two".into()])
            .await
            .expect("batch failed");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], single);
    }

    #[test]
    fn remote_response_parses_flat_and_nested() {
        let flat: RemoteEmbedResponse =
            serde_json::from_str("[0.1, 0.2]").expect("flat parse failed");
        assert!(matches!(flat, RemoteEmbedResponse::Single(v) if v.len() == 2));

        let nested: RemoteEmbedResponse =
            serde_json::from_str("[[0.1, 0.2], [0.3, 0.4]]").expect("nested parse failed");
        assert!(matches!(nested, RemoteEmbedResponse::Batch(v) if v.len() == 2));
    }
}
