use gloo_file::File as GlooFile;
use gloo_net::http::Request;
use shared::{ArtworkAnalysisResult, ErrorResponse, ANALYZE_ENDPOINT, IMAGE_FIELD};
use web_sys::FormData;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// Message taken from the server's `ErrorResponse` body.
    #[error("{0}")]
    Server(String),
    #[error("Failed to analyze artwork. Please try again. ({0})")]
    Request(String),
}

/// Posts one image as multipart `image` and decodes the analysis.
pub async fn submit_artwork(file: &GlooFile) -> Result<ArtworkAnalysisResult, SubmitError> {
    let form_data =
        FormData::new().map_err(|e| SubmitError::Request(format!("Failed to build form: {:?}", e)))?;
    let raw_file: &web_sys::File = file.as_ref();
    form_data
        .append_with_blob_and_filename(IMAGE_FIELD, raw_file, &file.name())
        .map_err(|e| SubmitError::Request(format!("Failed to attach image: {:?}", e)))?;

    let request = Request::post(ANALYZE_ENDPOINT)
        .body(form_data)
        .map_err(|e| SubmitError::Request(format!("Failed to build request: {}", e)))?;

    let response = request
        .send()
        .await
        .map_err(|e| SubmitError::Request(format!("Network error: {}", e)))?;

    if response.ok() {
        return response
            .json::<ArtworkAnalysisResult>()
            .await
            .map_err(|e| SubmitError::Request(format!("Failed to parse response: {}", e)));
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(server_error(status, &body))
}

fn server_error(status: u16, body: &str) -> SubmitError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(error) => SubmitError::Server(error.error),
        Err(_) if body.trim().is_empty() => SubmitError::Request(format!("Server error: {}", status)),
        Err(_) => SubmitError::Request(format!("Server error: {} - {}", status, body.trim())),
    }
}
