use super::{ExpandedTerms, TermExpander};
use crate::config::GeminiConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Remote expander backed by the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiExpander {
    config: GeminiConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

impl GeminiExpander {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model,
            self.config.api_key
        )
    }
}

pub fn build_prompt(query: &str, entity_name: &str) -> String {
    format!(
        "You help search a catalog of \"{entity_name}\" records.\n\
         Search query: \"{query}\"\n\n\
         1. Correct any spelling mistakes in the query.\n\
         2. Extract the terms that should match records exactly.\n\
         3. Suggest related or broader terms that would also indicate relevance.\n\
         4. Give every term an importance weight greater than 0 and at most 1.\n\n\
         Respond with JSON only, exactly in this shape:\n\
         {{\"exactTerms\": [\"...\"], \"relatedTerms\": [\"...\"], \"importance\": {{\"term\": 1.0}}}}"
    )
}

fn first_candidate_text(response: GenerateResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()?
        .content
        .parts
        .into_iter()
        .map(|part| part.text)
        .reduce(|mut acc, text| {
            acc.push_str(&text);
            acc
        })
}

#[async_trait]
impl TermExpander for GeminiExpander {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn expand(&self, query: &str, entity_name: &str) -> Result<ExpandedTerms> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: build_prompt(query, entity_name),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.0,
            },
        };

        let response = self
            .client
            .post(self.url())
            .json(&request)
            .send()
            .await
            .context("Failed to call expansion API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Expansion API returned {status}: {body}");
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse expansion response")?;
        let text = first_candidate_text(parsed).context("Expansion response has no candidates")?;
        debug!(model = %self.config.model, bytes = text.len(), "Received expansion");

        ExpandedTerms::parse(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_query_and_entity_hint() {
        let prompt = build_prompt("runing shoes", "products");
        assert!(prompt.contains("\"runing shoes\""));
        assert!(prompt.contains("\"products\""));
        assert!(prompt.contains("\"exactTerms\""));
    }

    #[test]
    fn url_targets_configured_model() {
        let mut config = GeminiConfig::new("secret");
        config.endpoint = "http://localhost:9/v1beta/".to_string();
        config.model = "test-model".to_string();
        let expander = GeminiExpander::new(config).unwrap();
        assert_eq!(
            expander.url(),
            "http://localhost:9/v1beta/models/test-model:generateContent?key=secret"
        );
    }

    #[test]
    fn candidate_text_joins_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"{\"exactTerms\":"},{"text":"[]}"}]}}]}"#;
        let response: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(first_candidate_text(response).unwrap(), r#"{"exactTerms":[]}"#);
    }

    #[test]
    fn empty_candidates_yield_none() {
        let response: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(first_candidate_text(response).is_none());
    }

    #[test]
    fn unreachable_endpoint_is_an_error() {
        let mut config = GeminiConfig::new("k");
        config.endpoint = "http://127.0.0.1:9".to_string();
        config.request_timeout = std::time::Duration::from_millis(500);
        let expander = GeminiExpander::new(config).unwrap();
        let result = tokio_test::block_on(expander.expand("tea", "products"));
        assert!(result.is_err());
    }
}
