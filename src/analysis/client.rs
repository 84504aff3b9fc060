//! Analysis Prompt Client
//!
//! Sends extracted document content to the external document-understanding
//! model: a text-only chat completion for PDF transcripts, a vision call
//! with an inlined base64 data URI for images. One fixed instruction
//! template; low temperature and a bounded output-token budget keep replies
//! short and close to deterministic.
//!
//! Call failures (auth, rate limit, network) are returned to the caller with
//! the response body preserved; "no credential configured" is a distinct
//! non-call outcome handled by the orchestrator.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::config::AnalysisConfig;
use super::error::{AnalysisError, Result};
use super::types::ExtractedContent;

/// Process-wide HTTP client, built once on first use.
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .unwrap_or_default()
});

/// Shared HTTP client for model calls and plain document fetches.
pub(crate) fn http_client() -> &'static reqwest::Client {
    &HTTP_CLIENT
}

/// Seam for the external model so the orchestrator can be tested against
/// mock responses.
#[async_trait]
pub trait DocumentModel: Send + Sync {
    /// Analyze one document's content, returning the model's raw reply text.
    async fn analyze(
        &self,
        content: &ExtractedContent,
        filename: &str,
        filing_status: Option<&str>,
    ) -> Result<String>;
}

/// Production client against a chat-completions API.
pub struct ChatModelClient {
    api_key: String,
    base_url: String,
    text_model: String,
    vision_model: String,
    max_output_tokens: u32,
    temperature: f32,
}

impl ChatModelClient {
    /// Build a client from config. `None` when no credential is present;
    /// the pipeline then runs in degraded "not configured" mode instead of
    /// failing calls.
    pub fn from_config(cfg: &AnalysisConfig) -> Option<Self> {
        let api_key = cfg.api_key.clone()?;
        Some(Self {
            api_key,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            text_model: cfg.text_model.clone(),
            vision_model: cfg.vision_model.clone(),
            max_output_tokens: cfg.max_output_tokens,
            temperature: cfg.temperature,
        })
    }

    async fn send(&self, request: &ChatRequest) -> Result<String> {
        let response = http_client()
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Keep the body: operators need to tell rate limits from bad keys
            let message = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Model {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(AnalysisError::EmptyResponse)
    }
}

#[async_trait]
impl DocumentModel for ChatModelClient {
    async fn analyze(
        &self,
        content: &ExtractedContent,
        filename: &str,
        filing_status: Option<&str>,
    ) -> Result<String> {
        let instructions = build_instructions(filename);

        let (model, message_content) = match content {
            ExtractedContent::Text(text) => {
                let mut prompt = format!("{}\n\nDocument text:\n{}", instructions, text);
                if let Some(status) = filing_status {
                    prompt.push_str(&format!(
                        "\n\nThe client's filing status is: {}. Tailor the strategy notes to it.",
                        status
                    ));
                }
                (self.text_model.clone(), MessageContent::Text(prompt))
            }
            ExtractedContent::Image { base64, format } => {
                let data_url = format!("data:{};base64,{}", format.mime(), base64);
                (
                    self.vision_model.clone(),
                    MessageContent::Parts(vec![
                        ContentPart::Text { text: instructions },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl { url: data_url },
                        },
                    ]),
                )
            }
        };

        tracing::debug!("[PromptClient] Analyzing {} with {}", filename, model);

        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: message_content,
            }],
            max_tokens: self.max_output_tokens,
            temperature: self.temperature,
        };

        self.send(&request).await
    }
}

/// The fixed instruction template for tax-document understanding.
fn build_instructions(filename: &str) -> String {
    format!(
        r#"You are analyzing a tax document uploaded by a client. Filename: {}

Extract the following when present:
- Document type (e.g. W-2, 1099-NEC, 1099-INT, 1098, K-1, or Unknown)
- Tax year
- All labeled monetary amounts (wages, federal withholding, state withholding, box amounts)
- W-2 box 12 codes and their amounts
- Employer or payer name
- Recipient name and SSN with all but the last four digits masked
- Any significant dates

Respond with JSON in this exact shape:
{{
  "documentType": "W-2",
  "confidence": "high|medium|low",
  "extractedData": {{
    "year": "2024",
    "amounts": [{{"label": "Wages", "value": 52000.00, "description": "Box 1"}}],
    "employer": "...",
    "payer": "...",
    "recipient": "...",
    "dates": [{{"label": "...", "value": "..."}}],
    "other": {{}}
  }},
  "summary": "2-4 sentences. State the tax year and the key dollar amounts explicitly.",
  "notes": ["2-5 one-sentence actionable tax strategy suggestions."]
}}

Only include fields you actually found. If you cannot read the document, say so in the summary and use "Unknown" as the documentType."#,
        filename
    )
}

// API request/response types

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::ImageFormat;

    #[test]
    fn test_instructions_cover_required_fields() {
        let prompt = build_instructions("w2-2024.pdf");
        assert!(prompt.contains("w2-2024.pdf"));
        assert!(prompt.contains("box 12"));
        assert!(prompt.contains("masked"));
        assert!(prompt.contains("documentType"));
        assert!(prompt.contains("tax year"));
    }

    #[test]
    fn test_unconfigured_yields_no_client() {
        let cfg = AnalysisConfig::default();
        assert!(ChatModelClient::from_config(&cfg).is_none());

        let cfg = AnalysisConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert!(ChatModelClient::from_config(&cfg).is_some());
    }

    #[test]
    fn test_text_message_serializes_as_string() {
        let msg = ChatMessage {
            role: "user".to_string(),
            content: MessageContent::Text("hello".to_string()),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["content"], "hello");
    }

    #[test]
    fn test_image_parts_carry_data_uri() {
        let data_url = format!("data:{};base64,{}", ImageFormat::Png.mime(), "Zm9v");
        let parts = MessageContent::Parts(vec![
            ContentPart::Text {
                text: "analyze".to_string(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl { url: data_url },
            },
        ]);
        let json = serde_json::to_value(&parts).unwrap();
        assert_eq!(json[0]["type"], "text");
        assert_eq!(json[1]["type"], "image_url");
        assert!(json[1]["image_url"]["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
    }
}
