//! OpenAI-compatible classifier adapter.
//!
//! Sends one chat-completions request per call with a single function tool
//! and `tool_choice` forcing that function, then reads the decision from
//! `choices[0].message.tool_calls[0].function.arguments`. Works against any
//! endpoint that speaks the OpenAI chat-completions dialect.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AmortizationTechnique, CategoryChangeDecision, CategoryFeedbackPrompt, ClassifierConfig,
    ItemFeedbackPrompt, ItemReclassification, RevenueRecognitionTiming,
};
use crate::domain::ports::Classifier;
use crate::infrastructure::logging::scrub_secrets;

const CATEGORY_CHANGE_TOOL: &str = "record_category_change";
const RECLASSIFY_TOOL: &str = "reclassify_line_item";

/// Configuration for the OpenAI classifier.
#[derive(Debug, Clone)]
pub struct OpenAiClassifierConfig {
    /// API key. Falls back to `REVCLASS_CLASSIFIER_API_KEY`, then `OPENAI_API_KEY`.
    pub api_key: Option<String>,
    /// Base URL for the API. Default: `https://api.openai.com/v1`.
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for OpenAiClassifierConfig {
    fn default() -> Self {
        Self::from(&ClassifierConfig::default())
    }
}

impl From<&ClassifierConfig> for OpenAiClassifierConfig {
    fn from(config: &ClassifierConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        }
    }
}

impl OpenAiClassifierConfig {
    fn get_api_key(&self) -> DomainResult<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("REVCLASS_CLASSIFIER_API_KEY").ok())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                DomainError::Validation(
                    "Classifier API key not set. Set REVCLASS_CLASSIFIER_API_KEY or OPENAI_API_KEY, \
                     or configure classifier.api_key."
                        .to_string(),
                )
            })
    }
}

/// Classifier backed by an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiClassifier {
    config: OpenAiClassifierConfig,
    client: reqwest::Client,
}

impl OpenAiClassifier {
    pub fn new(config: OpenAiClassifierConfig) -> DomainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::ClassifierUnavailable(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Make the single forced tool call and decode its arguments.
    async fn call_tool<T: DeserializeOwned>(
        &self,
        system: String,
        user: String,
        tool: FunctionSpec,
    ) -> DomainResult<T> {
        let api_key = self.config.get_api_key()?;
        let url = format!("{}/chat/completions", self.config.base_url);
        let tool_name = tool.name;

        let request_body = ChatRequest {
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            tools: vec![ToolSpec {
                kind: "function",
                function: tool,
            }],
            tool_choice: json!({"type": "function", "function": {"name": tool_name}}),
        };

        debug!(model = %self.config.model, tool = tool_name, "calling classifier");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                let message = scrub_secrets(&e.to_string());
                warn!(error = %message, "classifier request failed");
                DomainError::ClassifierUnavailable(format!("Classifier request failed: {message}"))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DomainError::ClassifierUnavailable(format!("Failed to read classifier response: {e}")))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), body = %scrub_secrets(&body), "classifier returned an error status");
            return Err(DomainError::ClassifierUnavailable(format!("Classifier returned {status}")));
        }

        let arguments = extract_tool_arguments(&body, tool_name).map_err(|reason| violation(reason, &body))?;

        serde_json::from_str(&arguments)
            .map_err(|e| violation(format!("Tool arguments do not match the schema: {e}"), &body))
    }
}

/// Pull `choices[0].message.tool_calls[0].function.arguments` out of a response body.
fn extract_tool_arguments(body: &str, expected_tool: &str) -> Result<String, String> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| format!("Response is not a chat completion: {e}"))?;

    let call = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.tool_calls)
        .and_then(|calls| calls.into_iter().next())
        .ok_or_else(|| "Response contains no tool call".to_string())?;

    if call.function.name != expected_tool {
        return Err(format!(
            "Expected a call to '{expected_tool}', got '{}'",
            call.function.name
        ));
    }

    Ok(call.function.arguments)
}

fn violation(reason: impl Into<String>, raw: &str) -> DomainError {
    let reason = reason.into();
    let raw = scrub_secrets(raw);
    warn!(reason = %reason, raw = %raw, "classifier contract violation");
    DomainError::contract_violation(reason, raw)
}

fn category_change_tool() -> FunctionSpec {
    FunctionSpec {
        name: CATEGORY_CHANGE_TOOL,
        description: "Record which category the described line items belong to and the text pattern that identifies them.",
        parameters: json!({
            "type": "object",
            "properties": {
                "new_category": {
                    "type": "string",
                    "description": "The category the matching line items should move to."
                },
                "pattern_to_match": {
                    "type": "string",
                    "description": "Case-insensitive text found in the product, rate plan or charge name of every affected line item."
                },
                "rationale": {
                    "type": "string",
                    "description": "One or two sentences explaining the change."
                }
            },
            "required": ["new_category", "pattern_to_match", "rationale"],
            "additionalProperties": false
        }),
    }
}

fn reclassify_tool() -> FunctionSpec {
    let timings: Vec<&str> = RevenueRecognitionTiming::ALL.iter().map(RevenueRecognitionTiming::as_str).collect();
    let techniques: Vec<&str> = AmortizationTechnique::ALL.iter().map(AmortizationTechnique::as_str).collect();

    FunctionSpec {
        name: RECLASSIFY_TOOL,
        description: "Record the corrected classification of a single line item.",
        parameters: json!({
            "type": "object",
            "properties": {
                "category": { "type": "string" },
                "pob": { "type": "string", "description": "Pattern of business." },
                "revenue_recognition_timing": { "type": "string", "enum": timings },
                "amortization_technique": { "type": "string", "enum": techniques },
                "rationale": { "type": "string" },
                "confidence": { "type": "number", "minimum": 0, "maximum": 1 }
            },
            "required": [
                "category",
                "pob",
                "revenue_recognition_timing",
                "amortization_technique",
                "rationale",
                "confidence"
            ],
            "additionalProperties": false
        }),
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn propose_category_change(&self, prompt: &CategoryFeedbackPrompt) -> DomainResult<CategoryChangeDecision> {
        let decision: CategoryChangeDecision = self
            .call_tool(prompt.system_message(), prompt.user_message(), category_change_tool())
            .await?;

        decision
            .validate()
            .map_err(|reason| violation(reason, &serde_json::to_string(&decision).unwrap_or_default()))?;
        Ok(decision)
    }

    async fn reclassify_item(&self, prompt: &ItemFeedbackPrompt) -> DomainResult<ItemReclassification> {
        let decision: ItemReclassification = self
            .call_tool(prompt.system_message(), prompt.user_message(), reclassify_tool())
            .await?;

        decision
            .validate()
            .map_err(|reason| violation(reason, &serde_json::to_string(&decision).unwrap_or_default()))?;
        Ok(decision)
    }
}

// -- Chat completions request/response types --

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    temperature: f32,
    messages: Vec<ChatMessage>,
    tools: Vec<ToolSpec>,
    tool_choice: Value,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ToolSpec {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionSpec,
}

#[derive(Debug, Serialize)]
struct FunctionSpec {
    name: &'static str,
    description: &'static str,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{FeedbackRequest, LineItemClassification};
    use mockito::Matcher;
    use uuid::Uuid;

    fn tool_call_body(name: &str, arguments: &Value) -> String {
        json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": name, "arguments": arguments.to_string() }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })
        .to_string()
    }

    fn classifier(base_url: String) -> OpenAiClassifier {
        OpenAiClassifier::new(OpenAiClassifierConfig {
            api_key: Some("test-key".to_string()),
            base_url,
            ..Default::default()
        })
        .unwrap()
    }

    fn category_prompt() -> CategoryFeedbackPrompt {
        let customer = Uuid::new_v4();
        let items = vec![LineItemClassification::new(customer, "Server Pro", "Annual", "Base", "SaaS")];
        CategoryFeedbackPrompt::build(
            &FeedbackRequest::new(customer, "servers are hardware not saas"),
            &items,
            100,
        )
    }

    fn item_prompt() -> ItemFeedbackPrompt {
        let item = LineItemClassification::new(Uuid::new_v4(), "Server Pro", "Annual", "Base", "SaaS");
        ItemFeedbackPrompt::build(&item, "this is a physical box")
    }

    fn reclassification_args() -> Value {
        json!({
            "category": "Hardware",
            "pob": "Point in time",
            "revenue_recognition_timing": "upon booking",
            "amortization_technique": "immediate",
            "rationale": "Physical server shipped once",
            "confidence": 0.87
        })
    }

    #[tokio::test]
    async fn test_category_change_success_forces_tool_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o-mini",
                "tool_choice": {"type": "function", "function": {"name": CATEGORY_CHANGE_TOOL}}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(tool_call_body(
                CATEGORY_CHANGE_TOOL,
                &json!({"new_category": "Hardware", "pattern_to_match": "server", "rationale": "Physical goods"}),
            ))
            .create_async()
            .await;

        let decision = classifier(server.url())
            .propose_category_change(&category_prompt())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(decision.new_category, "Hardware");
        assert_eq!(decision.pattern_to_match, "server");
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body(r#"{"error": "internal"}"#)
            .create_async()
            .await;

        let err = classifier(server.url())
            .propose_category_change(&category_prompt())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ClassifierUnavailable(_)));
    }

    #[tokio::test]
    async fn test_missing_tool_call_is_contract_violation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(
                json!({"choices": [{"message": {"role": "assistant", "content": "Hardware, probably."}}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let err = classifier(server.url())
            .propose_category_change(&category_prompt())
            .await
            .unwrap_err();
        match err {
            DomainError::ClassifierContractViolation { reason, raw } => {
                assert!(reason.contains("no tool call"));
                assert!(raw.contains("Hardware, probably."));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_field_is_contract_violation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(tool_call_body(
                CATEGORY_CHANGE_TOOL,
                &json!({"new_category": "Hardware", "pattern_to_match": "server"}),
            ))
            .create_async()
            .await;

        let err = classifier(server.url())
            .propose_category_change(&category_prompt())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ClassifierContractViolation { .. }));
    }

    #[tokio::test]
    async fn test_reclassify_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::PartialJson(json!({
                "tool_choice": {"function": {"name": RECLASSIFY_TOOL}}
            })))
            .with_status(200)
            .with_body(tool_call_body(RECLASSIFY_TOOL, &reclassification_args()))
            .create_async()
            .await;

        let decision = classifier(server.url()).reclassify_item(&item_prompt()).await.unwrap();

        assert_eq!(decision.category, "Hardware");
        assert_eq!(decision.revenue_recognition_timing, RevenueRecognitionTiming::UponBooking);
        assert_eq!(decision.amortization_technique, AmortizationTechnique::Immediate);
        assert_eq!(decision.xp_earned(), 87);
    }

    #[tokio::test]
    async fn test_out_of_range_confidence_is_contract_violation() {
        let mut args = reclassification_args();
        args["confidence"] = json!(1.4);

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(tool_call_body(RECLASSIFY_TOOL, &args))
            .create_async()
            .await;

        let err = classifier(server.url()).reclassify_item(&item_prompt()).await.unwrap_err();
        assert!(matches!(err, DomainError::ClassifierContractViolation { .. }));
    }

    #[tokio::test]
    async fn test_unknown_timing_is_contract_violation() {
        let mut args = reclassification_args();
        args["revenue_recognition_timing"] = json!("eventually");

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(tool_call_body(RECLASSIFY_TOOL, &args))
            .create_async()
            .await;

        let err = classifier(server.url()).reclassify_item(&item_prompt()).await.unwrap_err();
        assert!(matches!(err, DomainError::ClassifierContractViolation { .. }));
    }

    #[tokio::test]
    async fn test_wrong_tool_name_is_contract_violation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(tool_call_body("something_else", &reclassification_args()))
            .create_async()
            .await;

        let err = classifier(server.url()).reclassify_item(&item_prompt()).await.unwrap_err();
        assert!(matches!(err, DomainError::ClassifierContractViolation { .. }));
    }

    #[test]
    fn test_api_key_fallback_order() {
        let config = OpenAiClassifierConfig::default();

        temp_env::with_vars(
            [
                ("REVCLASS_CLASSIFIER_API_KEY", Some("revclass-key")),
                ("OPENAI_API_KEY", Some("openai-key")),
            ],
            || assert_eq!(config.get_api_key().unwrap(), "revclass-key"),
        );
        temp_env::with_vars(
            [
                ("REVCLASS_CLASSIFIER_API_KEY", None::<&str>),
                ("OPENAI_API_KEY", Some("openai-key")),
            ],
            || assert_eq!(config.get_api_key().unwrap(), "openai-key"),
        );
        temp_env::with_vars(
            [
                ("REVCLASS_CLASSIFIER_API_KEY", None::<&str>),
                ("OPENAI_API_KEY", None::<&str>),
            ],
            || assert!(matches!(config.get_api_key(), Err(DomainError::Validation(_)))),
        );

        let configured = OpenAiClassifierConfig {
            api_key: Some("configured".to_string()),
            ..Default::default()
        };
        assert_eq!(configured.get_api_key().unwrap(), "configured");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = OpenAiClassifierConfig::from(&ClassifierConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..Default::default()
        });
        assert_eq!(config.base_url, "http://localhost:8080/v1");
    }
}
