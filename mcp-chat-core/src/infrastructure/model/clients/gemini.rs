//! Gemini `generateContent` session

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info};

use super::base::HttpClientBase;
use crate::application::schema::FunctionDeclaration;
use crate::config::AppConfig;
use crate::constants::{DEFAULT_GEMINI_API_PATH, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TEMPERATURE};
use crate::domain::{Blob, ChatRole, Content, FunctionCall, FunctionResponse, Part, TurnContent};
use crate::infrastructure::model::factory::resolve_api_key;
use crate::infrastructure::model::traits::ModelSession;
use crate::infrastructure::model::types::{BlockReason, LlmResponse, ModelError};

const PROVIDER_ID: &str = "gemini";

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

/// Finish reasons that mean the candidate was withheld.
const BLOCKING_FINISH_REASONS: [&str; 5] = [
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

/// Chat session against the Gemini REST API with function calling.
pub struct GeminiSession {
    base: HttpClientBase,
    api_path: String,
    model: String,
    temperature: f32,
    system_prompt: Option<String>,
    declarations: Vec<FunctionDeclaration>,
    history: Vec<Content>,
}

impl GeminiSession {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            base: HttpClientBase::new(
                PROVIDER_ID.to_string(),
                endpoint.into(),
                api_key,
                Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            api_path: DEFAULT_GEMINI_API_PATH.to_string(),
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            system_prompt: None,
            declarations: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let api_key = resolve_api_key(PROVIDER_ID, config.gemini.api_key.as_deref());
        Self::new(config.gemini.endpoint.clone(), api_key, config.model.clone())
            .with_api_path(config.gemini.api_path.clone())
            .with_temperature(config.gemini.temperature)
            .with_system_prompt(config.system_prompt.clone())
            .with_timeout(config.orchestrator.request_timeout())
    }

    pub fn with_api_path(mut self, api_path: impl Into<String>) -> Self {
        self.api_path = api_path.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.base.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn available_functions(&self) -> &[FunctionDeclaration] {
        &self.declarations
    }

    fn build_model_url(&self) -> String {
        let path = format!(
            "{}/{}:generateContent",
            self.api_path.trim_matches('/'),
            self.model
        );
        self.base.build_url(&path)
    }

    fn build_request(&self, user: &Content) -> GenerateContentRequest<'_> {
        let mut contents: Vec<WireContent> = self.history.iter().map(WireContent::from).collect();
        contents.push(WireContent::from(user));

        let tools = if self.declarations.is_empty() {
            Vec::new()
        } else {
            vec![WireTool {
                function_declarations: &self.declarations,
            }]
        };

        GenerateContentRequest {
            contents,
            tools,
            safety_settings: SAFETY_CATEGORIES
                .into_iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: SAFETY_THRESHOLD,
                })
                .collect(),
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
            system_instruction: self.system_prompt.as_ref().map(|prompt| WireContent {
                role: None,
                parts: vec![WirePart::text(prompt.clone())],
            }),
        }
    }
}

impl GeminiSession {
    /// A turn that ended before its tool results were sent back (attempt
    /// ceiling or a failed send) leaves a trailing model `functionCall` in
    /// history. Gemini rejects a new user turn after one, so drop it.
    fn drop_unanswered_calls(&mut self, user: &Content) {
        let answers_calls = user
            .parts
            .iter()
            .any(|part| matches!(part, Part::FunctionResponse(_)));
        if answers_calls {
            return;
        }
        let dangling = self.history.last().is_some_and(|last| {
            last.role == ChatRole::Model
                && last
                    .parts
                    .iter()
                    .any(|part| matches!(part, Part::FunctionCall(_)))
        });
        if dangling {
            self.history.pop();
            debug!("Dropped unanswered function calls from history");
        }
    }
}

#[async_trait]
impl ModelSession for GeminiSession {
    async fn send(&mut self, content: TurnContent) -> Result<LlmResponse, ModelError> {
        let user = Content::user(content.into_parts());
        self.drop_unanswered_calls(&user);
        let url = self.build_model_url();

        info!(
            model = self.model.as_str(),
            history = self.history.len(),
            functions = self.declarations.len(),
            "Sending request to Gemini"
        );
        let response: GenerateContentResponse = {
            let request = self.build_request(&user);
            self.base.post_with_query_key(&url, &request).await?
        };
        debug!(
            candidates = response.candidates.len(),
            "Received response from Gemini"
        );

        let (reply, model_content) = interpret(response);
        if let Some(model_content) = model_content {
            self.history.push(user);
            if !model_content.parts.is_empty() {
                self.history.push(model_content);
            }
        }
        Ok(reply)
    }

    fn set_available_functions(&mut self, declarations: Vec<FunctionDeclaration>) {
        info!(
            model = self.model.as_str(),
            functions = declarations.len(),
            "Gemini function declarations updated"
        );
        self.declarations = declarations;
    }

    fn history(&self) -> &[Content] {
        &self.history
    }

    fn reset(&mut self) {
        self.history.clear();
    }
}

/// Reduce a raw response to the reply and the model content to record in
/// history. No candidate means nothing is recorded.
fn interpret(response: GenerateContentResponse) -> (LlmResponse, Option<Content>) {
    let candidate = response.candidates.into_iter().next();
    let finish_reason = candidate.as_ref().and_then(|c| c.finish_reason.clone());

    let model_content = candidate.map(|candidate| {
        let parts = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter(|part| part.thought != Some(true))
            .filter_map(WirePart::into_part)
            .collect();
        Content::model(parts)
    });

    let parts = model_content
        .as_ref()
        .map(|content| content.parts.as_slice())
        .unwrap_or_default();
    let text: String = parts.iter().filter_map(Part::as_text).collect();
    let text = (!text.is_empty()).then_some(text);
    let function_calls: Vec<FunctionCall> = parts
        .iter()
        .filter_map(|part| match part {
            Part::FunctionCall(call) => Some(call.clone()),
            _ => None,
        })
        .collect();

    let block = response
        .prompt_feedback
        .and_then(|feedback| {
            feedback.block_reason.map(|reason| BlockReason {
                reason,
                detail: feedback.block_reason_message,
            })
        })
        .or_else(|| {
            finish_reason
                .as_deref()
                .filter(|reason| BLOCKING_FINISH_REASONS.contains(reason))
                .filter(|_| text.is_none() && function_calls.is_empty())
                .map(|reason| BlockReason {
                    reason: reason.to_string(),
                    detail: None,
                })
        });

    let reply = LlmResponse {
        text,
        function_calls,
        block,
        finish_reason,
    };
    (reply, model_content)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    safety_settings: Vec<SafetySetting>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool<'a> {
    function_declarations: &'a [FunctionDeclaration],
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

impl From<&Content> for WireContent {
    fn from(content: &Content) -> Self {
        Self {
            role: Some(content.role.as_str().to_string()),
            parts: content.parts.iter().map(WirePart::from).collect(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<Blob>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: Map<String, Value>,
}

impl WirePart {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            ..Self::default()
        }
    }

    fn into_part(self) -> Option<Part> {
        if let Some(call) = self.function_call {
            return Some(Part::FunctionCall(FunctionCall {
                name: call.name,
                args: call.args,
                signature: self.thought_signature,
            }));
        }
        if let Some(response) = self.function_response {
            return Some(Part::FunctionResponse(response));
        }
        if let Some(blob) = self.inline_data {
            return Some(Part::InlineData(blob));
        }
        self.text.map(Part::Text)
    }
}

impl From<&Part> for WirePart {
    fn from(part: &Part) -> Self {
        match part {
            Part::Text(text) => WirePart::text(text.clone()),
            Part::InlineData(blob) => WirePart {
                inline_data: Some(blob.clone()),
                ..WirePart::default()
            },
            Part::FunctionCall(call) => WirePart {
                function_call: Some(WireFunctionCall {
                    name: call.name.clone(),
                    args: call.args.clone(),
                }),
                thought_signature: call.signature.clone(),
                ..WirePart::default()
            },
            Part::FunctionResponse(response) => WirePart {
                function_response: Some(response.clone()),
                ..WirePart::default()
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<WireContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}
