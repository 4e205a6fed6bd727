use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;

use crate::config::InferenceSettings;

/// Instruction block sent with every image. Every field the normalizer reads
/// must be named here with its type.
pub const ANALYSIS_PROMPT: &str = r##"Analyze this artwork and respond with a single JSON object, wrapped in a ```json code block, using exactly this structure:

{
  "artistInfo": {
    "name": string,          // the most likely artist, or "Unknown" if uncertain
    "description": string,   // a brief description of the artwork and the artist's style
    "confidence": number     // between 0 and 1, confidence in the attribution
  },
  "analysis": {
    "style": string,         // e.g. Impressionism, Abstract, Renaissance
    "period": string,        // the likely time period or era
    "medium": string         // e.g. oil paint, watercolor, digital
  },
  "colorPalette": {
    "colors": string[],      // up to 8 hex colors like "#A1B2C3", most dominant first
    "dominantColor": string  // the first entry of colors
  },
  "replicationGuide": {
    "materials": string[],   // materials needed to replicate the artwork
    "techniques": string[],  // painting or artistic techniques used
    "steps": string[],       // step-by-step instructions, in order
    "difficulty": "Beginner" | "Intermediate" | "Advanced"
  }
}

Provide detailed, practical information that would help someone recreate this artwork. Focus on the visual characteristics, techniques and materials that would be most effective. Do not add any text outside the JSON block."##;

/// Uploaded image, base64-encoded once per request.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub mime_type: String,
    pub base64: String,
}

impl EncodedImage {
    pub fn encode(bytes: &[u8], mime_type: &str) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            base64: general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

pub fn build_analysis_request(image: &EncodedImage, settings: &InferenceSettings) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: settings.model.clone(),
        max_tokens: settings.max_tokens,
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content: vec![
                ContentPart::Text {
                    text: ANALYSIS_PROMPT.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.data_uri(),
                    },
                },
            ],
        }],
    }
}

impl ChatCompletionRequest {
    /// One-line description for debug logs, without the image payload.
    pub fn summary(&self) -> String {
        let image_parts = self
            .messages
            .iter()
            .flat_map(|m| m.content.iter())
            .filter(|part| matches!(part, ContentPart::ImageUrl { .. }))
            .count();
        format!(
            "model={}, max_tokens={}, messages={}, images={}",
            self.model,
            self.max_tokens,
            self.messages.len(),
            image_parts
        )
    }
}
