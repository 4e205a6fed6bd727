use derive_more::Display;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use strum_macros::{AsRefStr, EnumIter, EnumString};

/// Route served by the backend and called by the frontend.
pub const ANALYZE_ENDPOINT: &str = "/api/analyze-artwork";

/// Multipart field carrying the uploaded image.
pub const IMAGE_FIELD: &str = "image";

pub const ACCEPTED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Upper bound on the number of swatches in a palette.
pub const MAX_PALETTE_COLORS: usize = 8;

pub fn is_accepted_mime_type(mime_type: &str) -> bool {
    ACCEPTED_MIME_TYPES
        .iter()
        .any(|accepted| accepted.eq_ignore_ascii_case(mime_type.trim()))
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkAnalysisResult {
    pub image_url: String,
    pub artist_info: ArtistInfo,
    pub color_palette: ColorPalette,
    pub analysis: ArtworkDetails,
    pub replication_guide: ReplicationGuide,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ArtistInfo {
    pub name: String,
    pub description: String,
    pub confidence: f32,
}

impl ArtistInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>, confidence: f32) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            name: name.into(),
            description: description.into(),
            confidence,
        }
    }

    pub fn confidence_percent(&self) -> u32 {
        (self.confidence * 100.0).round() as u32
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ArtworkDetails {
    pub style: String,
    pub period: String,
    pub medium: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ReplicationGuide {
    pub materials: Vec<String>,
    pub techniques: Vec<String>,
    pub steps: Vec<String>,
    pub difficulty: Difficulty,
}

/// Skill level of a replication guide.
///
/// Upstream text is matched case-insensitively; anything else deserializes to
/// `Beginner`.
#[derive(
    Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, EnumIter, AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn parse_lenient(raw: &str) -> Self {
        Difficulty::from_str(raw.trim()).unwrap_or_default()
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Difficulty::parse_lenient(&raw))
    }
}

#[derive(Debug, Display, Clone, PartialEq)]
#[display(fmt = "a color palette needs at least one color")]
pub struct EmptyPalette;

/// Ordered swatches with the dominant color always first.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", try_from = "PaletteWire")]
pub struct ColorPalette {
    colors: Vec<String>,
    dominant_color: String,
}

#[derive(Deserialize)]
struct PaletteWire {
    colors: Vec<String>,
}

impl TryFrom<PaletteWire> for ColorPalette {
    type Error = EmptyPalette;

    fn try_from(wire: PaletteWire) -> Result<Self, Self::Error> {
        ColorPalette::new(wire.colors).ok_or(EmptyPalette)
    }
}

impl ColorPalette {
    /// Builds a palette from at most [`MAX_PALETTE_COLORS`] colors. Returns
    /// `None` for an empty list.
    pub fn new(mut colors: Vec<String>) -> Option<Self> {
        colors.truncate(MAX_PALETTE_COLORS);
        let dominant_color = colors.first()?.clone();
        Some(Self {
            colors,
            dominant_color,
        })
    }

    /// Infallible constructor: `dominant` leads, followed by `rest`.
    pub fn with_dominant(dominant: impl Into<String>, rest: impl IntoIterator<Item = String>) -> Self {
        let dominant_color = dominant.into();
        let mut colors = vec![dominant_color.clone()];
        colors.extend(rest.into_iter().take(MAX_PALETTE_COLORS - 1));
        Self {
            colors,
            dominant_color,
        }
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    pub fn dominant_color(&self) -> &str {
        &self.dominant_color
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Display)]
#[display(fmt = "{}", error)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
