//! Gemini `generateContent` request and response types.

use serde::{Deserialize, Serialize};

use crate::types::{IdentifyRequest, Source};

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<RequestContent>,
    pub tools: Vec<Tool>,
    pub system_instruction: SystemInstruction,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestContent {
    pub role: String,
    pub parts: Vec<RequestPart>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

/// Tools the model may use. Only web search grounding is requested.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Tool {
    pub google_search: GoogleSearch,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GoogleSearch {}

#[derive(Debug, Clone, Serialize)]
pub struct SystemInstruction {
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextPart {
    pub text: String,
}

impl From<&IdentifyRequest> for GenerateContentRequest {
    fn from(request: &IdentifyRequest) -> Self {
        Self {
            contents: vec![RequestContent {
                role: "user".to_string(),
                parts: vec![
                    RequestPart::Text {
                        text: request.user_prompt().to_string(),
                    },
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: request.mime_type().as_str().to_string(),
                            data: request.image().to_base64(),
                        },
                    },
                ],
            }],
            tools: vec![Tool::default()],
            system_instruction: SystemInstruction {
                parts: vec![TextPart {
                    text: request.system_prompt().to_string(),
                }],
            },
        }
    }
}

/// Successful `generateContent` response. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_attributions: Vec<WebReference>,
    /// Newer API versions report sources here instead.
    #[serde(default)]
    pub grounding_chunks: Vec<WebReference>,
}

/// An attribution or chunk entry; both wrap an optional `web` object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebReference {
    #[serde(default)]
    pub web: Option<WebSource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebSource {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl GenerateContentResponse {
    /// Wrap plain text as a single-candidate response.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(CandidateContent {
                    parts: vec![ResponsePart {
                        text: Some(text.into()),
                    }],
                }),
                grounding_metadata: None,
            }],
        }
    }

    /// Text of the first candidate. Only `candidates[0]` is consulted.
    pub fn text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|part| part.text.as_deref())
    }

    /// Valid cited sources of the first candidate, in service order.
    ///
    /// Attributions are preferred; chunks are used only when attributions
    /// yield nothing.
    pub fn sources(&self) -> Vec<Source> {
        let Some(metadata) = self
            .candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
        else {
            return vec![];
        };

        let from_attributions = collect_sources(&metadata.grounding_attributions);
        if !from_attributions.is_empty() {
            return from_attributions;
        }
        collect_sources(&metadata.grounding_chunks)
    }
}

fn collect_sources(references: &[WebReference]) -> Vec<Source> {
    references
        .iter()
        .filter_map(|r| r.web.as_ref())
        .filter_map(|web| {
            Source::new(
                web.uri.clone().unwrap_or_default(),
                web.title.clone().unwrap_or_default(),
            )
        })
        .collect()
}
