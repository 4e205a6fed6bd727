//! Turns free-form model replies into a well-formed analysis.
//!
//! The model is treated as a best-effort oracle: whatever it returns, the
//! normalizer produces a complete result. Replies that carry no parseable JSON
//! object get placeholder values with the raw text as the description.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use shared::{ArtistInfo, ArtworkDetails, ColorPalette, Difficulty, ReplicationGuide};

use crate::palette::fallback_palette;

lazy_static! {
    static ref FENCED_JSON: Regex = Regex::new(r"(?is)```json[ \t]*\r?\n?(.*?)```").unwrap();
    static ref OBJECT_SPAN: Regex = Regex::new(r"(?s)\{.*\}").unwrap();
}

const UNKNOWN: &str = "Unknown";
const UNKNOWN_ARTIST: &str = "Unknown Artist";
const DEFAULT_CONFIDENCE: f32 = 0.5;
const PLACEHOLDER_MATERIALS: [&str; 3] = ["Canvas", "Paint", "Brushes"];
const PLACEHOLDER_TECHNIQUES: [&str; 1] = ["Basic painting techniques"];
const PLACEHOLDER_STEPS: [&str; 3] = [
    "1. Prepare your canvas",
    "2. Apply paint",
    "3. Add details",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    /// A JSON object was found and mapped.
    Parsed,
    /// Nothing parseable; placeholders were substituted.
    SoftFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteSource {
    Model,
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAnalysis {
    pub artist_info: ArtistInfo,
    pub analysis: ArtworkDetails,
    pub color_palette: ColorPalette,
    pub replication_guide: ReplicationGuide,
    pub source: ReplySource,
    pub palette_source: PaletteSource,
}

/// Picks the text most likely to hold the JSON payload: a ```json fenced
/// block, else the widest `{...}` span, else the whole reply.
pub fn extract_json_candidate(reply: &str) -> &str {
    if let Some(inner) = FENCED_JSON.captures(reply).and_then(|caps| caps.get(1)) {
        return inner.as_str().trim();
    }
    if let Some(span) = OBJECT_SPAN.find(reply) {
        return span.as_str();
    }
    reply
}

/// Never fails. `image_base64` seeds the fallback palette when the reply has no
/// usable colors.
pub fn normalize_reply(reply: &str, image_base64: &str) -> NormalizedAnalysis {
    let candidate = extract_json_candidate(reply);
    let parsed = match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(root)) => Some(root),
        Ok(other) => {
            log::warn!("Model reply JSON is not an object ({}), using fallback analysis", kind(&other));
            None
        }
        Err(e) => {
            log::warn!("Failed to parse model reply as JSON: {}, using fallback analysis", e);
            log::debug!("Unparseable reply: {}", truncate(reply, 500));
            None
        }
    };

    let (artist_info, analysis, replication_guide, colors, source) = match parsed {
        Some(root) => (
            map_artist(&root),
            map_details(&root),
            map_guide(&root),
            map_colors(&root),
            ReplySource::Parsed,
        ),
        None => (
            ArtistInfo::new(UNKNOWN_ARTIST, reply, DEFAULT_CONFIDENCE),
            unknown_details(),
            placeholder_guide(Difficulty::Beginner),
            Vec::new(),
            ReplySource::SoftFallback,
        ),
    };

    let (color_palette, palette_source) = match ColorPalette::new(colors) {
        Some(palette) => (palette, PaletteSource::Model),
        None => (fallback_palette(image_base64), PaletteSource::Fallback),
    };

    NormalizedAnalysis {
        artist_info,
        analysis,
        color_palette,
        replication_guide,
        source,
        palette_source,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let head: String = text.chars().take(limit).collect();
    format!("{}... (truncated)", head)
}

/// First entry among `keys` that holds an object.
fn section<'a>(root: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Map<String, Value>> {
    keys.iter().find_map(|key| root.get(*key).and_then(Value::as_object))
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_in(section: Option<&Map<String, Value>>, key: &str) -> Option<String> {
    text(section.and_then(|s| s.get(key)))
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(|item| text(Some(item))).collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

fn or_placeholder(list: Vec<String>, placeholder: &[&str]) -> Vec<String> {
    if list.is_empty() {
        placeholder.iter().map(|s| s.to_string()).collect()
    } else {
        list
    }
}

fn confidence(value: Option<&Value>) -> f32 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(v) if v.is_finite() && v > 1.0 && v <= 100.0 => (v / 100.0) as f32,
        Some(v) if v.is_finite() => v as f32,
        _ => DEFAULT_CONFIDENCE,
    }
}

fn map_artist(root: &Map<String, Value>) -> ArtistInfo {
    let artist = section(root, &["artistInfo", "artist_info", "artist"]);
    let artwork = section(root, &["artwork"]);

    let name = text_in(artist, "name")
        .or_else(|| text(root.get("artist")))
        .unwrap_or_else(|| UNKNOWN.to_string());
    let description = text_in(artist, "description")
        .or_else(|| text_in(artwork, "description"))
        .or_else(|| text(root.get("description")))
        .unwrap_or_else(|| UNKNOWN.to_string());
    let confidence = confidence(
        artist
            .and_then(|a| a.get("confidence"))
            .or_else(|| root.get("confidence")),
    );

    ArtistInfo::new(name, description, confidence)
}

fn map_details(root: &Map<String, Value>) -> ArtworkDetails {
    let details = section(root, &["analysis", "artwork"]);
    let field = |key: &str| {
        text_in(details, key)
            .or_else(|| text(root.get(key)))
            .unwrap_or_else(|| UNKNOWN.to_string())
    };
    ArtworkDetails {
        style: field("style"),
        period: field("period"),
        medium: field("medium"),
    }
}

fn map_guide(root: &Map<String, Value>) -> ReplicationGuide {
    let guide = section(root, &["replicationGuide", "replication_guide", "replication"]);
    let list = |key: &str| string_list(guide.and_then(|g| g.get(key)).or_else(|| root.get(key)));
    let difficulty = text_in(guide, "difficulty")
        .or_else(|| text(root.get("difficulty")))
        .map(|raw| Difficulty::parse_lenient(&raw))
        .unwrap_or_default();

    ReplicationGuide {
        materials: or_placeholder(list("materials"), &PLACEHOLDER_MATERIALS),
        techniques: or_placeholder(list("techniques"), &PLACEHOLDER_TECHNIQUES),
        steps: or_placeholder(list("steps"), &PLACEHOLDER_STEPS),
        difficulty,
    }
}

/// Valid hex colors from the reply, dominant first, deduplicated.
fn map_colors(root: &Map<String, Value>) -> Vec<String> {
    let palette = section(root, &["colorPalette", "color_palette", "palette"]);
    let raw = palette
        .and_then(|p| p.get("colors"))
        .or_else(|| root.get("colors"));

    let mut colors: Vec<String> = Vec::new();
    let dominant = palette
        .and_then(|p| p.get("dominantColor").or_else(|| p.get("dominant_color")))
        .and_then(color_value);
    if let Some(dominant) = dominant {
        colors.push(dominant);
    }
    if let Some(Value::Array(items)) = raw {
        for color in items.iter().filter_map(color_value) {
            if !colors.contains(&color) {
                colors.push(color);
            }
        }
    }
    colors
}

fn color_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => normalize_hex(s),
        Value::Object(obj) => obj.get("hex").and_then(Value::as_str).and_then(normalize_hex),
        _ => None,
    }
}

/// `#RGB` or `#RRGGBB` (leading `#` optional) to upper-case `#RRGGBB`.
pub fn normalize_hex(raw: &str) -> Option<String> {
    let digits = raw.trim().trim_start_matches('#');
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return None,
    };
    Some(format!("#{}", expanded.to_ascii_uppercase()))
}

fn unknown_details() -> ArtworkDetails {
    ArtworkDetails {
        style: UNKNOWN.to_string(),
        period: UNKNOWN.to_string(),
        medium: UNKNOWN.to_string(),
    }
}

fn placeholder_guide(difficulty: Difficulty) -> ReplicationGuide {
    ReplicationGuide {
        materials: or_placeholder(Vec::new(), &PLACEHOLDER_MATERIALS),
        techniques: or_placeholder(Vec::new(), &PLACEHOLDER_TECHNIQUES),
        steps: or_placeholder(Vec::new(), &PLACEHOLDER_STEPS),
        difficulty,
    }
}
