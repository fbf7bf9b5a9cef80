//! OpenAI implementation of the remote extractor.
//!
//! Uses chat completions with a strict `json_schema` response format derived
//! from [`RemoteEntities`], so the reply is either the shape we asked for or
//! an error.
//!
//! # Example
//!
//! ```rust,ignore
//! use discovery::ai::OpenAiExtractor;
//!
//! let extractor = OpenAiExtractor::from_env()?.with_model("gpt-4o-mini");
//! let discovery = Discovery::new(catalog, fetcher).with_remote_extractor(extractor);
//! ```

use async_trait::async_trait;
use chrono::Datelike;
use reqwest::Client;
use schemars::schema_for;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, instrument};

use crate::error::{ExtractorError, ExtractorResult};
use crate::security::SecretString;
use crate::traits::extractor::{RemoteEntities, RemoteExtractor};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT: &str = "You extract search entities from questions about Italian public \
statistics. Reply only with the requested JSON. Use Italian place names (Milano, not Milan). \
`topic` is the statistical subject in one or two Italian words; `synonyms` are Italian words \
likely to appear in dataset titles on that subject. List every year the question covers, \
expanding relative ranges against the current year given below. Use null for anything the \
question does not state or clearly imply.";

/// Remote extractor backed by OpenAI chat completions.
#[derive(Clone)]
pub struct OpenAiExtractor {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
    current_year: i32,
}

impl OpenAiExtractor {
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            current_year: chrono::Utc::now().year(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> ExtractorResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ExtractorError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set a custom HTTP client (timeouts).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Year the model expands "last N years" against.
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Debug for OpenAiExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiExtractor")
            .field("api_key", &self.api_key)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Schema for [`RemoteEntities`] in the form strict mode accepts: every
/// object closed, every property required, no `format` or `default` keywords.
pub fn strict_schema() -> Value {
    let mut schema = serde_json::to_value(schema_for!(RemoteEntities)).unwrap_or_default();
    make_strict(&mut schema);
    if let Value::Object(map) = &mut schema {
        map.remove("$schema");
        map.remove("definitions");
    }
    schema
}

fn make_strict(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.remove("format");
            map.remove("default");
            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
                if let Some(Value::Object(props)) = map.get("properties") {
                    let required = props.keys().cloned().map(Value::String).collect();
                    map.insert("required".to_string(), Value::Array(required));
                }
            }
            for (_, nested) in map.iter_mut() {
                make_strict(nested);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(make_strict),
        _ => {}
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Serialize)]
struct JsonSchemaFormat {
    name: &'static str,
    strict: bool,
    schema: Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Parse the model's reply into entities.
pub fn parse_reply(content: &str) -> ExtractorResult<RemoteEntities> {
    serde_json::from_str(content.trim()).map_err(|e| ExtractorError::Parse(e.to_string()))
}

#[async_trait]
impl RemoteExtractor for OpenAiExtractor {
    #[instrument(skip(self), fields(model = %self.model))]
    async fn extract(&self, question: &str) -> ExtractorResult<RemoteEntities> {
        if self.api_key.is_empty() {
            return Err(ExtractorError::Config("empty API key".into()));
        }

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: format!("{}\nCurrent year: {}.", SYSTEM_PROMPT, self.current_year),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: question.to_string(),
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: "question_entities",
                    strict: true,
                    schema: strict_schema(),
                },
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractorError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractorError::Api(format!("{}: {}", status, body)));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractorError::Parse(e.to_string()))?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ExtractorError::Api("no choices in response".into()))?;

        debug!(bytes = content.len(), "Extraction reply received");
        parse_reply(&content)
    }
}
