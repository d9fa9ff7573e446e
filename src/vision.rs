//! Vision tagging: hand a box photo to an AI provider, get item tags back.
//!
//! One trait, one implementation per vendor, selected from config when the
//! tagger is built. Tagging is strictly optional: any failure here is
//! surfaced as a notice and never blocks manual tagging or saving.

use base64::Engine;
use serde_json::json;
use std::time::Duration;

const TAG_PROMPT: &str = "List the main visible items in this image related to \
storage/inventory. Return ONLY a comma-separated list of items \
(e.g. 'Winter coat, boots, scarf'). Be concise.";

const GEMINI_MODEL: &str = "gemini-1.5-flash";
const OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("No vision API key configured. Set vision.api_key in config.yaml")]
    NotConfigured,

    #[error("Unsupported vision provider: {0}")]
    UnsupportedProvider(String),

    #[error("Provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected provider response: {0}")]
    BadResponse(String),
}

pub trait VisionTagger: Send + Sync {
    /// Analyze a JPEG photo and return candidate item tags.
    fn analyze(&self, image: &[u8]) -> Result<Vec<String>, VisionError>;
}

/// Build the tagger the config selects. Fails fast on a missing key or an
/// unknown provider name, before any network traffic.
pub fn build_tagger(
    provider: &str,
    api_key: &str,
    timeout_secs: u64,
) -> Result<Box<dyn VisionTagger>, VisionError> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err(VisionError::NotConfigured);
    }

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;

    match provider {
        "gemini" => Ok(Box::new(GeminiTagger {
            api_key: api_key.to_string(),
            client,
        })),
        "openai" => Ok(Box::new(OpenAiTagger {
            api_key: api_key.to_string(),
            client,
        })),
        other => Err(VisionError::UnsupportedProvider(other.to_string())),
    }
}

/// Split a comma-separated model answer into clean tags.
fn parse_tag_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(|tag| tag.to_string())
        .collect()
}

pub struct GeminiTagger {
    api_key: String,
    client: reqwest::blocking::Client,
}

impl VisionTagger for GeminiTagger {
    fn analyze(&self, image: &[u8]) -> Result<Vec<String>, VisionError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            GEMINI_MODEL, self.api_key
        );

        let body = json!({
            "contents": [{
                "parts": [
                    { "text": TAG_PROMPT },
                    { "inline_data": {
                        "mime_type": "image/jpeg",
                        "data": base64::engine::general_purpose::STANDARD.encode(image),
                    }},
                ],
            }],
        });

        let response: serde_json::Value = self.client.post(&url).json(&body).send()?.json()?;

        if let Some(error) = response.get("error") {
            return Err(VisionError::BadResponse(error.to_string()));
        }

        let text = response
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                VisionError::BadResponse("Gemini response has no text part".to_string())
            })?;

        Ok(parse_tag_list(text))
    }
}

pub struct OpenAiTagger {
    api_key: String,
    client: reqwest::blocking::Client,
}

impl VisionTagger for OpenAiTagger {
    fn analyze(&self, image: &[u8]) -> Result<Vec<String>, VisionError> {
        let data_url = format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(image)
        );

        let body = json!({
            "model": OPENAI_MODEL,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": TAG_PROMPT },
                    { "type": "image_url", "image_url": { "url": data_url } },
                ],
            }],
            "max_tokens": 300,
        });

        let response: serde_json::Value = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?
            .json()?;

        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            return Err(VisionError::BadResponse(message.to_string()));
        }

        let text = response
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                VisionError::BadResponse("OpenAI response has no message content".to_string())
            })?;

        Ok(parse_tag_list(text))
    }
}
