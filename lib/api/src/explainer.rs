//! Taxon explanation client
//!
//! Asks a Gemini model to explain how a taxon could live in the given soil
//! conditions. The call is fully isolated from matching: every failure
//! (missing credential, network error, non-2xx status, malformed body)
//! degrades to a fixed message instead of an error.

use anyhow::{anyhow, bail, Result};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::warn;

/// Returned when no API key is configured
pub const MISSING_KEY_MESSAGE: &str = "Gemini API key not set. Please add it to your environment.";

/// Returned when the explanation service fails
pub const UNAVAILABLE_MESSAGE: &str = "Explanation service is currently unavailable.";

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro-latest";

#[derive(Debug, Clone)]
pub struct ExplainerConfig {
    pub api_key: Option<String>,
    pub model: String,
    /// Base URL; the request goes to `{endpoint}/{model}:generateContent`
    pub endpoint: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 30,
            temperature: 0.7,
            max_output_tokens: 256,
        }
    }
}

impl ExplainerConfig {
    /// Default settings with the key taken from `GEMINI_API_KEY`
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            ..Self::default()
        }
    }
}

/// Gemini-backed explanation client
pub struct GeminiExplainer {
    config: ExplainerConfig,
    client: reqwest::Client,
}

impl GeminiExplainer {
    pub fn new(config: ExplainerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Explanation text for a taxon, or a fallback message. Never fails.
    pub async fn explain(&self, taxon: &str, soil_conditions: &str) -> String {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return MISSING_KEY_MESSAGE.to_string();
        };
        match self.generate(api_key, &build_prompt(taxon, soil_conditions)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(taxon, error = %format!("{:#}", e), "Explanation request failed");
                UNAVAILABLE_MESSAGE.to_string()
            }
        }
    }

    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {
                "temperature": self.config.temperature,
                "maxOutputTokens": self.config.max_output_tokens,
            },
        });

        // The key must stay out of the URL: reqwest errors render it
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Gemini API error {}: {}", status, body_text);
        }

        let json: Value = response.json().await.map_err(reqwest::Error::without_url)?;
        parse_response(&json)
    }
}

pub fn build_prompt(taxon: &str, soil_conditions: &str) -> String {
    format!(
        "Explain, in 2-3 sentences, how the microbe '{}' could survive in the following soil conditions: {}. \
         Focus on the relationship between the microbe's biology and the soil properties.",
        taxon, soil_conditions
    )
}

/// Extract `candidates[0].content.parts[0].text`
fn parse_response(json: &Value) -> Result<String> {
    json.pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid Gemini response: missing candidate text"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt() {
        let prompt = build_prompt("Bacillus X", "Soil pH=3.0");
        assert!(prompt.starts_with("Explain, in 2-3 sentences, how the microbe 'Bacillus X'"));
        assert!(prompt.contains("soil conditions: Soil pH=3.0."));
    }

    #[test]
    fn test_parse_response() {
        let ok = json!({"candidates": [{"content": {"parts": [{"text": "It thrives."}]}}]});
        assert_eq!(parse_response(&ok).unwrap(), "It thrives.");
        assert!(parse_response(&json!({"candidates": []})).is_err());
    }

    #[actix_web::test]
    async fn test_missing_key_degrades() {
        let explainer = GeminiExplainer::new(ExplainerConfig::default()).unwrap();
        assert!(!explainer.is_configured());
        assert_eq!(explainer.explain("Bacillus X", "").await, MISSING_KEY_MESSAGE);
    }

    #[actix_web::test]
    async fn test_unreachable_service_degrades() {
        let explainer = GeminiExplainer::new(ExplainerConfig {
            api_key: Some("test-key".to_string()),
            endpoint: "http://127.0.0.1:1".to_string(),
            timeout_secs: 2,
            ..ExplainerConfig::default()
        })
        .unwrap();
        assert_eq!(explainer.explain("Bacillus X", "Soil pH=3.0").await, UNAVAILABLE_MESSAGE);
    }

    #[actix_web::test]
    async fn test_failed_request_error_omits_key() {
        let explainer = GeminiExplainer::new(ExplainerConfig {
            api_key: Some("SECRET-KEY-123".to_string()),
            endpoint: "http://127.0.0.1:1".to_string(),
            timeout_secs: 2,
            ..ExplainerConfig::default()
        })
        .unwrap();
        let err = explainer.generate("SECRET-KEY-123", "prompt").await.unwrap_err();
        let rendered = format!("{:#} {:?}", err, err);
        assert!(!rendered.contains("SECRET-KEY-123"));
        assert!(!rendered.contains("key="));
    }
}
