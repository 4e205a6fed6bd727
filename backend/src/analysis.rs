use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use sha2::{Digest, Sha256};
use shared::{is_accepted_mime_type, ArtworkAnalysisResult, ErrorResponse};
use uuid::Uuid;

use crate::config::InferenceSettings;
use crate::inference::client::{InferenceError, VisionClient};
use crate::inference::normalizer::{normalize_reply, PaletteSource, ReplySource};
use crate::inference::prompt::{build_analysis_request, EncodedImage};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No image file provided")]
    MissingImage,
    #[error("Unsupported image type")]
    UnsupportedMediaType(Option<String>),
    #[error("Image file too large")]
    PayloadTooLarge,
    #[error("Invalid upload: {0}")]
    Multipart(String),
    #[error("Failed to analyze artwork. Check the API key and model access.")]
    Upstream(#[from] InferenceError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingImage
            | ApiError::UnsupportedMediaType(_)
            | ApiError::PayloadTooLarge
            | ApiError::Multipart(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.to_string()))
    }
}

/// The `image` field of an analysis request.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub declared_mime: Option<String>,
}

/// Short SHA-256 digest used to correlate log lines for one image.
pub fn image_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hex::encode(hasher.finalize());
    digest[..12].to_string()
}

/// Accepted MIME type for the upload. A missing or unsupported declared type is
/// replaced by the format detected from the file signature.
pub fn resolve_mime_type(declared: Option<&str>, bytes: &[u8]) -> Option<String> {
    if let Some(declared) = declared.filter(|d| is_accepted_mime_type(d)) {
        return Some(declared.trim().to_ascii_lowercase());
    }
    let detected = image::guess_format(bytes).ok()?.to_mime_type();
    is_accepted_mime_type(detected).then(|| detected.to_string())
}

/// Runs one upload through encoding, inference and normalization.
pub async fn analyze_upload(
    client: &dyn VisionClient,
    settings: &InferenceSettings,
    upload: ImageUpload,
    request_id: Uuid,
) -> Result<ArtworkAnalysisResult, ApiError> {
    if upload.bytes.is_empty() {
        return Err(ApiError::MissingImage);
    }

    let mime_type = resolve_mime_type(upload.declared_mime.as_deref(), &upload.bytes)
        .ok_or_else(|| ApiError::UnsupportedMediaType(upload.declared_mime.clone()))?;

    log::info!(
        "[{}] Analyzing image {} ({} bytes, {})",
        request_id,
        image_digest(&upload.bytes),
        upload.bytes.len(),
        mime_type
    );

    let image = EncodedImage::encode(&upload.bytes, &mime_type);
    let request = build_analysis_request(&image, settings);

    let reply = client.complete(&request).await.map_err(|e| {
        log::error!("[{}] Inference failed: {} ({})", request_id, e, e.hint());
        ApiError::Upstream(e)
    })?;

    let normalized = normalize_reply(&reply, &image.base64);
    if normalized.source == ReplySource::SoftFallback {
        log::warn!("[{}] Model reply was not valid JSON, returned fallback analysis", request_id);
    }
    if normalized.palette_source == PaletteSource::Fallback {
        log::info!("[{}] Model gave no usable colors, using fallback palette", request_id);
    }

    Ok(ArtworkAnalysisResult {
        image_url: image.data_uri(),
        artist_info: normalized.artist_info,
        color_palette: normalized.color_palette,
        analysis: normalized.analysis,
        replication_guide: normalized.replication_guide,
    })
}
