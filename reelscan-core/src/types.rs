use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

/// Title reported when nothing could be extracted.
pub const UNKNOWN_TITLE: &str = "Unknown Movie";

/// Placeholder for year and actors when nothing could be extracted.
pub const NOT_AVAILABLE: &str = "N/A";

/// Synopsis used when there is no confident match. Doubles as the failure
/// message when the response text offers nothing better.
pub const NO_MATCH_SYNOPSIS: &str = "Could not confidently identify the movie from this image. \
Try a clearer frame that shows the actors or a recognizable setting.";

/// Image formats accepted by the identification service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageMime {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/webp")]
    WebP,
}

impl ImageMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Png => "image/png",
            ImageMime::WebP => "image/webp",
        }
    }

    pub fn from_mime(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageMime::Jpeg),
            "image/png" => Some(ImageMime::Png),
            "image/webp" => Some(ImageMime::WebP),
            _ => None,
        }
    }
}

impl fmt::Display for ImageMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An already-validated image chosen by the user.
///
/// Bytes are shared, so moving the image between session states is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
    data: Arc<[u8]>,
    mime: ImageMime,
    name: Option<String>,
}

impl SelectedImage {
    pub fn new(data: impl Into<Arc<[u8]>>, mime: ImageMime) -> Self {
        Self {
            data: data.into(),
            mime,
            name: None,
        }
    }

    /// Attach a display name (usually the file name).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn mime(&self) -> ImageMime {
        self.mime
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Transport-safe encoding of the image bytes.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }
}

/// Everything needed for one identify call. Built once per submit and never
/// changed afterwards.
#[derive(Debug, Clone)]
pub struct IdentifyRequest {
    image: SelectedImage,
    user_prompt: String,
    system_prompt: String,
}

impl IdentifyRequest {
    pub fn new(
        image: SelectedImage,
        user_prompt: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            image,
            user_prompt: user_prompt.into(),
            system_prompt: system_prompt.into(),
        }
    }

    pub fn image(&self) -> &SelectedImage {
        &self.image
    }

    pub fn mime_type(&self) -> ImageMime {
        self.image.mime()
    }

    pub fn user_prompt(&self) -> &str {
        &self.user_prompt
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

/// A web page the service cited for its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub uri: String,
    pub title: String,
}

impl Source {
    /// Build a source, returning `None` unless both fields are non-empty.
    pub fn new(uri: impl Into<String>, title: impl Into<String>) -> Option<Self> {
        let uri = uri.into();
        let title = title.into();
        if uri.trim().is_empty() || title.trim().is_empty() {
            return None;
        }
        Some(Self { uri, title })
    }
}

/// Fields recovered from the service's free-text answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub title: String,
    pub release_year: String,
    pub main_actors: String,
    pub synopsis: String,
    pub success: bool,
}

impl Default for ExtractionResult {
    fn default() -> Self {
        Self {
            title: UNKNOWN_TITLE.to_string(),
            release_year: NOT_AVAILABLE.to_string(),
            main_actors: NOT_AVAILABLE.to_string(),
            synopsis: NO_MATCH_SYNOPSIS.to_string(),
            success: false,
        }
    }
}

/// A successful identification: extracted fields plus cited sources in the
/// order the service returned them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationOutcome {
    #[serde(flatten)]
    pub result: ExtractionResult,
    pub sources: Vec<Source>,
}
