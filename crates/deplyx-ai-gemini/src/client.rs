use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use deplyx_interfaces::{AiAnalysisClient, AiImpactAnalysis, ChangeContext, TopologySnapshot};

use crate::prompt;

/// Configuration for the Gemini analysis client
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key; the client reports unavailable when absent or empty
    pub api_key: Option<String>,

    /// Base URL of the generative language API
    pub api_base: String,

    /// Models to try in order; the first is the primary
    pub models: Vec<String>,

    /// Attempts against the primary model before falling through
    pub max_attempts: u32,

    /// Output token budget for the first attempt
    pub initial_output_tokens: u32,

    /// Hard ceiling the token budget doubles toward on truncation
    pub max_output_tokens: u32,

    /// Per-attempt request timeout
    pub request_timeout: Duration,

    /// Base wait on rate limiting; attempt N waits N times this
    pub rate_limit_backoff: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            // 2.0-flash is much faster for structured JSON output; 2.5-flash
            // carries thinking overhead
            models: vec![
                "gemini-2.0-flash".to_string(),
                "gemini-2.5-flash".to_string(),
            ],
            max_attempts: 3,
            initial_output_tokens: 8192,
            max_output_tokens: 65536,
            request_timeout: Duration::from_secs(60),
            rate_limit_backoff: Duration::from_secs(5),
        }
    }
}

impl GeminiConfig {
    /// Config with the given API key and library defaults
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }
}

/// Outcome of a single model attempt
#[derive(Error, Debug)]
enum AttemptError {
    /// Output hit the token budget; retry the same model with a bigger one
    #[error("response truncated at {chars} chars")]
    Truncated { chars: usize },

    /// Rate limited; back off and retry the same model
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Non-JSON output from a normal finish; a model defect, not a
    /// transient fault
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Transport or server error; move on to the next model
    #[error("request failed: {0}")]
    Failed(String),
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// AI analysis client backed by the Gemini REST API
pub struct GeminiAnalysisClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiAnalysisClient {
    /// Create a client from configuration
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn try_model(
        &self,
        model: &str,
        api_key: &str,
        user_prompt: &str,
        max_output_tokens: u32,
    ) -> Result<AiImpactAnalysis, AttemptError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            model
        );
        let body = json!({
            "contents": [{
                "parts": [
                    {"text": prompt::SYSTEM_PROMPT},
                    {"text": user_prompt},
                ],
            }],
            "generationConfig": {
                "temperature": 0.1,
                "maxOutputTokens": max_output_tokens,
                "responseMimeType": "application/json",
            },
        });

        debug!(
            "Sending request to {model} (prompt: {} chars, max_tokens: {max_output_tokens})",
            user_prompt.len()
        );
        let response = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| AttemptError::Failed(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(AttemptError::RateLimited(format!("HTTP {status}")));
        }
        let raw = response
            .text()
            .await
            .map_err(|e| AttemptError::Failed(e.to_string()))?;
        if !status.is_success() {
            let lower = raw.to_lowercase();
            if lower.contains("quota") || lower.contains("resource exhausted") {
                return Err(AttemptError::RateLimited(format!("HTTP {status}")));
            }
            return Err(AttemptError::Failed(format!("HTTP {status}")));
        }

        let envelope: GenerateContentResponse = serde_json::from_str(&raw)
            .map_err(|e| AttemptError::Failed(format!("undecodable response envelope: {e}")))?;
        let Some(candidate) = envelope.candidates.first() else {
            return Err(AttemptError::Failed("no candidates in response".to_string()));
        };
        let finish_reason = candidate.finish_reason.clone().unwrap_or_default();
        let text: String = candidate
            .content
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        let text = text.trim();
        debug!(
            "Response from {model}: finish_reason={finish_reason}, {} chars",
            text.len()
        );
        if text.is_empty() {
            return Err(AttemptError::Malformed("empty response text".to_string()));
        }

        let cleaned = strip_markdown_fences(text);
        match serde_json::from_str::<AiImpactAnalysis>(cleaned) {
            Ok(result) => Ok(result),
            Err(_) if finish_reason == "MAX_TOKENS" => {
                // The parse failure came from output truncation
                Err(AttemptError::Truncated {
                    chars: cleaned.len(),
                })
            }
            Err(e) => Err(AttemptError::Malformed(e.to_string())),
        }
    }
}

#[async_trait]
impl AiAnalysisClient for GeminiAnalysisClient {
    fn is_available(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .map(|key| !key.is_empty())
            .unwrap_or(false)
    }

    async fn analyze(
        &self,
        topology: &TopologySnapshot,
        change: &ChangeContext,
    ) -> Option<AiImpactAnalysis> {
        let api_key = match self.config.api_key.as_deref() {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => {
                warn!("Gemini API key not configured, AI analysis unavailable");
                return None;
            }
        };
        let (primary, fallbacks) = self.config.models.split_first()?;
        let user_prompt = prompt::build_user_prompt(topology, change);
        info!(
            "AI analysis request: action={:?}, targets={:?}, topology {} nodes / {} edges",
            change.action,
            change.target_node_ids,
            topology.nodes.len(),
            topology.edges.len(),
        );

        let mut max_tokens = self.config.initial_output_tokens;
        for attempt in 1..=self.config.max_attempts {
            match self
                .try_model(primary, &api_key, &user_prompt, max_tokens)
                .await
            {
                Ok(result) => {
                    info!("AI analysis succeeded ({primary}, attempt {attempt})");
                    return Some(result);
                }
                Err(AttemptError::Truncated { chars }) => {
                    max_tokens = (max_tokens * 2).min(self.config.max_output_tokens);
                    warn!(
                        "Truncated response from {primary} at {chars} chars (attempt {attempt}), \
                         retrying with max_tokens={max_tokens}"
                    );
                }
                Err(AttemptError::RateLimited(msg)) => {
                    let wait = self.config.rate_limit_backoff * attempt;
                    warn!(
                        "Rate limited on {primary} (attempt {attempt}): {msg}, waiting {wait:?}"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(AttemptError::Malformed(msg)) => {
                    error!("Malformed output from {primary} (attempt {attempt}): {msg}");
                    return None;
                }
                Err(AttemptError::Failed(msg)) => {
                    error!("Attempt on {primary} failed: {msg}");
                    break;
                }
            }
        }

        info!("Primary model exhausted, trying fallbacks: {fallbacks:?}");
        for model in fallbacks {
            match self.try_model(model, &api_key, &user_prompt, max_tokens).await {
                Ok(result) => {
                    info!("AI analysis succeeded on fallback {model}");
                    return Some(result);
                }
                Err(AttemptError::Malformed(msg)) => {
                    error!("Malformed output from fallback {model}: {msg}");
                    return None;
                }
                Err(e) => {
                    warn!("Fallback {model} failed: {e}");
                }
            }
        }

        error!("All AI models exhausted");
        None
    }
}

/// Strip surrounding markdown code fences and a leading `json` tag
fn strip_markdown_fences(text: &str) -> &str {
    let mut t = text.trim();
    if t.starts_with("```") {
        t = match t.find('\n') {
            Some(i) => &t[i + 1..],
            None => &t[3..],
        };
    }
    t = t.trim();
    if let Some(stripped) = t.strip_suffix("```") {
        t = stripped.trim_end();
    }
    if let Some(stripped) = t.strip_prefix("json") {
        t = stripped.trim_start();
    }
    t.trim()
}
