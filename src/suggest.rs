//! Child-node suggestions from a Gemini-compatible text generation API.
//!
//! The client only produces strings. Turning them into nodes is the caller's
//! job, through [`crate::session::Session::accept_suggestion`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SUGGESTIONS: usize = 3;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_suggestions")]
    pub suggestions: usize,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_suggestions() -> usize {
    DEFAULT_SUGGESTIONS
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            suggestions: DEFAULT_SUGGESTIONS,
        }
    }
}

/// What the model is asked about.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestRequest {
    pub parent_node_text: String,
    /// Usually the map title.
    pub mind_map_context: Option<String>,
    /// Path from the root, e.g. `Root > Category > Current Node`.
    pub branch_context: Option<String>,
    pub number_of_suggestions: usize,
}

impl SuggestRequest {
    pub fn new(parent_node_text: impl Into<String>) -> Self {
        Self {
            parent_node_text: parent_node_text.into(),
            mind_map_context: None,
            branch_context: None,
            number_of_suggestions: DEFAULT_SUGGESTIONS,
        }
    }

    pub fn prompt(&self) -> String {
        format!(
            "You are a mind map assistant that helps users brainstorm ideas.\n\
             The user is working on a mind map node.\n\
             The overall mind map context is: {}\n\
             The current branch leading to the parent node is: {}\n\
             The parent node text is: \"{}\".\n\n\
             Please suggest {} child nodes that would be relevant and helpful to expand on this parent node, \
             considering its position within the branch and the overall mind map context.\n\
             The suggestions should be concise and directly related to the parent node and its context.\n\n\
             Return the suggestions as a JSON object of the form {{\"suggestions\": [\"...\"]}}.",
            self.mind_map_context.as_deref().unwrap_or(""),
            self.branch_context.as_deref().unwrap_or(""),
            self.parent_node_text,
            self.number_of_suggestions,
        )
    }

    fn body(&self) -> Value {
        json!({
            "contents": [{ "role": "user", "parts": [{ "text": self.prompt() }] }],
            "generationConfig": { "responseMimeType": "application/json" },
        })
    }
}

pub struct SuggestClient {
    agent: ureq::Agent,
    config: SuggestConfig,
    api_key: String,
}

impl std::fmt::Debug for SuggestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuggestClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SuggestClient {
    pub fn new(config: SuggestConfig, api_key: impl Into<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();
        Self {
            agent,
            config,
            api_key: api_key.into(),
        }
    }

    /// Reads the API key from the environment.
    pub fn from_env(config: SuggestConfig) -> Result<Self, String> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| format!("{} is not set; suggestions are unavailable", API_KEY_ENV))?;
        Ok(Self::new(config, api_key))
    }

    pub fn config(&self) -> &SuggestConfig {
        &self.config
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    pub fn suggest(&self, request: &SuggestRequest) -> Result<Vec<String>, String> {
        let payload = request.body().to_string();
        tracing::debug!(model = %self.config.model, parent = %request.parent_node_text, "requesting suggestions");

        let mut response = self
            .agent
            .post(&self.url())
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .send(payload.as_str())
            .map_err(|e| format!("Suggestion request failed: {}", e))?;
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| format!("Failed to read suggestion response: {}", e))?;

        let suggestions = parse_response(&body)?;
        tracing::info!(count = suggestions.len(), "received suggestions");
        Ok(suggestions)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// Extracts the suggestion list from a `generateContent` response body.
pub fn parse_response(body: &str) -> Result<Vec<String>, String> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| format!("Failed to parse suggestion response: {}", e))?;
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().map(|p| p.text).collect())
        .ok_or("Suggestion response contained no candidates")?;
    parse_suggestions(&text)
}

/// Accepts `{"suggestions": [...]}` or a bare JSON array of strings, possibly
/// wrapped in a Markdown code fence. Blank entries are dropped.
pub fn parse_suggestions(text: &str) -> Result<Vec<String>, String> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    let value: Value = serde_json::from_str(unfenced.trim())
        .map_err(|e| format!("Suggestions are not valid JSON: {}", e))?;
    let items = match &value {
        Value::Array(items) => items,
        Value::Object(object) => match object.get("suggestions") {
            Some(Value::Array(items)) => items,
            _ => return Err("Suggestions object has no \"suggestions\" array".to_string()),
        },
        _ => return Err("Suggestions must be a JSON array or object".to_string()),
    };

    Ok(items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}
