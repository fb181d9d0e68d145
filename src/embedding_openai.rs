//! OpenAI-compatible embedding provider using the `/v1/embeddings` endpoint.

use serde::{Deserialize, Serialize};

use crate::{
    embedding::EmbeddingProvider,
    error::{Error, Result},
};

/// Default model and output dimension for api.openai.com.
const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DEFAULT_DIMENSION: usize = 1536;

pub struct OpenAiEmbeddingProvider {
    client: reqwest::blocking::Client,
    api_key: String,
    endpoint: String,
    model: String,
    dimension: usize,
}

fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn has_version_suffix(base_url: &str) -> bool {
    let Some(last_segment) = base_url.rsplit('/').next() else {
        return false;
    };
    let Some(rest) = last_segment.strip_prefix('v') else {
        return false;
    };
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}

/// Join a base URL with the embeddings path, tolerating bases that already
/// carry a version segment or the full path.
fn embeddings_endpoint(base_url: &str) -> String {
    let normalized = normalize_base_url(base_url);
    if normalized.ends_with("/embeddings") {
        return normalized;
    }
    if has_version_suffix(&normalized) {
        return format!("{normalized}/embeddings");
    }
    format!("{normalized}/v1/embeddings")
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            api_key,
            endpoint: embeddings_endpoint("https://api.openai.com"),
            model: DEFAULT_MODEL.to_string(),
            dimension: DEFAULT_DIMENSION,
        }
    }

    pub fn with_model(mut self, model: String, dimension: usize) -> Self {
        self.model = model;
        self.dimension = dimension;
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.endpoint = embeddings_endpoint(url);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingsRequest {
                model: &self.model,
                input: text,
            })
            .send()?
            .error_for_status()?;

        let body: EmbeddingsResponse = response.json()?;
        let embedding = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| {
                Error::Config(
                    "embeddings response contained no data entries".into(),
                )
            })?;

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

impl std::fmt::Debug for OpenAiEmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbeddingProvider")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joining() {
        assert_eq!(
            embeddings_endpoint("https://api.openai.com"),
            "https://api.openai.com/v1/embeddings"
        );
        assert_eq!(
            embeddings_endpoint("https://api.openai.com/"),
            "https://api.openai.com/v1/embeddings"
        );
        assert_eq!(
            embeddings_endpoint("http://localhost:8080/v1"),
            "http://localhost:8080/v1/embeddings"
        );
        assert_eq!(
            embeddings_endpoint("http://localhost:8080/v1/embeddings"),
            "http://localhost:8080/v1/embeddings"
        );
        assert_eq!(
            embeddings_endpoint("http://localhost:8080/v2"),
            "http://localhost:8080/v2/embeddings"
        );
    }

    #[test]
    fn version_suffix_detection() {
        assert!(has_version_suffix("http://x/v1"));
        assert!(has_version_suffix("http://x/v12"));
        assert!(!has_version_suffix("http://x/vector"));
        assert!(!has_version_suffix("http://x/api"));
    }
}
