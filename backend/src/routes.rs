use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures::{StreamExt, TryStreamExt};
use serde_json::json;
use shared::{ANALYZE_ENDPOINT, IMAGE_FIELD};
use uuid::Uuid;

use crate::analysis::{analyze_upload, ApiError, ImageUpload};
use crate::config::AnalyzerSettings;
use crate::inference::client::VisionClient;

pub fn configure_routes(cfg: &mut web::ServiceConfig, frontend_dir: String) {
    configure_api(cfg);
    cfg.service(Files::new("/", frontend_dir).index_file("index.html"));
}

pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource(ANALYZE_ENDPOINT).route(web::post().to(analyze_artwork)))
        .service(web::resource("/api/health").route(web::get().to(health)));
}

async fn analyze_artwork(
    client: web::Data<dyn VisionClient>,
    settings: web::Data<AnalyzerSettings>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4();

    let upload = read_image_field(payload, settings.upload.max_bytes)
        .await?
        .ok_or_else(|| {
            log::info!("[{}] Rejected request without an image field", request_id);
            ApiError::MissingImage
        })?;

    let result = analyze_upload(client.get_ref(), &settings.inference, upload, request_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

async fn health(settings: web::Data<AnalyzerSettings>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "model": settings.inference.model,
    }))
}

/// Reads the first `image` field into memory. Other fields are skipped.
async fn read_image_field(
    mut payload: Multipart,
    max_bytes: usize,
) -> Result<Option<ImageUpload>, ApiError> {
    while let Ok(Some(mut field)) = payload.try_next().await {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let declared_mime = field.content_type().map(|mime| mime.essence_str().to_string());
        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| ApiError::Multipart(e.to_string()))?;
            if bytes.len() + data.len() > max_bytes {
                return Err(ApiError::PayloadTooLarge);
            }
            bytes.extend_from_slice(&data);
        }

        if bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some(ImageUpload {
            bytes,
            declared_mime,
        }));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::client::InferenceError;
    use crate::inference::prompt::ChatCompletionRequest;
    use crate::palette::fallback_palette;
    use actix_web::{http::header, test, App};
    use async_trait::async_trait;
    use base64::{engine::general_purpose, Engine as _};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const BOUNDARY: &str = "artwork-test-boundary";
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

    struct StubClient {
        reply: Result<String, u16>,
        calls: AtomicUsize,
    }

    impl StubClient {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(status),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VisionClient for StubClient {
        async fn complete(&self, request: &ChatCompletionRequest) -> Result<String, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(request.messages.len(), 1);
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(status) => Err(InferenceError::Status {
                    status: *status,
                    message: "Incorrect API key provided".to_string(),
                }),
            }
        }
    }

    fn multipart_body(field: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"artwork\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn post_upload(
        client: Arc<StubClient>,
        settings: AnalyzerSettings,
        body: Vec<u8>,
    ) -> (u16, Value) {
        let client: Arc<dyn VisionClient> = client;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::from(client))
                .app_data(web::Data::new(settings))
                .configure(configure_api),
        )
        .await;

        let req = test::TestRequest::post()
            .uri(ANALYZE_ENDPOINT)
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        let status = resp.status().as_u16();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }

    #[actix_web::test]
    async fn analyzes_an_uploaded_image() {
        let reply = "Here you go:\n```json\n{\"artistInfo\":{\"name\":\"Unknown\",\"description\":\"A sketch\",\"confidence\":0.4},\"replicationGuide\":{\"difficulty\":\"Expert\"},\"colors\":[]}\n```";
        let client = StubClient::replying(reply);
        let (status, body) = post_upload(
            client.clone(),
            AnalyzerSettings::default(),
            multipart_body("image", "image/png", PNG),
        )
        .await;

        assert_eq!(status, 200);
        assert_eq!(client.calls(), 1);
        assert!(body["imageUrl"].as_str().unwrap().starts_with("data:image/png;base64,"));
        assert_eq!(body["artistInfo"]["name"], "Unknown");

        let colors = body["colorPalette"]["colors"].as_array().unwrap();
        assert_eq!(colors.len(), 8);
        assert_eq!(body["colorPalette"]["dominantColor"], colors[0]);
        assert_eq!(body["replicationGuide"]["difficulty"], "Beginner");
    }

    #[actix_web::test]
    async fn prose_reply_still_returns_a_full_result() {
        let client = StubClient::replying("I think this is a Rothko-like color field painting.");
        let (status, body) = post_upload(
            client,
            AnalyzerSettings::default(),
            multipart_body("image", "image/png", PNG),
        )
        .await;

        assert_eq!(status, 200);
        assert_eq!(body["artistInfo"]["name"], "Unknown Artist");
        assert_eq!(
            body["artistInfo"]["description"],
            "I think this is a Rothko-like color field painting."
        );
        assert_eq!(body["analysis"]["style"], "Unknown");
        assert_eq!(body["replicationGuide"]["steps"].as_array().unwrap().len(), 3);

        // Seeded from the same base64 text that went into the data URI.
        let expected = fallback_palette(&general_purpose::STANDARD.encode(PNG));
        assert_eq!(body["colorPalette"], serde_json::to_value(&expected).unwrap());
    }

    #[actix_web::test]
    async fn missing_image_field_is_rejected_without_calling_the_model() {
        let client = StubClient::replying("{}");
        let (status, body) = post_upload(
            client.clone(),
            AnalyzerSettings::default(),
            multipart_body("note", "text/plain", b"no picture here"),
        )
        .await;

        assert_eq!(status, 400);
        assert_eq!(body, json!({ "error": "No image file provided" }));
        assert_eq!(client.calls(), 0);
    }

    #[actix_web::test]
    async fn empty_image_field_counts_as_missing() {
        let client = StubClient::replying("{}");
        let (status, body) = post_upload(
            client.clone(),
            AnalyzerSettings::default(),
            multipart_body("image", "image/png", b""),
        )
        .await;

        assert_eq!(status, 400);
        assert_eq!(body, json!({ "error": "No image file provided" }));
        assert_eq!(client.calls(), 0);
    }

    #[actix_web::test]
    async fn upstream_failure_is_a_single_500() {
        let client = StubClient::failing(401);
        let (status, body) = post_upload(
            client.clone(),
            AnalyzerSettings::default(),
            multipart_body("image", "image/png", PNG),
        )
        .await;

        assert_eq!(status, 500);
        assert_eq!(client.calls(), 1);
        assert_eq!(
            body["error"],
            "Failed to analyze artwork. Check the API key and model access."
        );
    }

    #[actix_web::test]
    async fn non_image_upload_is_rejected() {
        let client = StubClient::replying("{}");
        let (status, body) = post_upload(
            client.clone(),
            AnalyzerSettings::default(),
            multipart_body("image", "text/plain", b"just some text"),
        )
        .await;

        assert_eq!(status, 400);
        assert_eq!(body["error"], "Unsupported image type");
        assert_eq!(client.calls(), 0);
    }

    #[actix_web::test]
    async fn generic_content_type_is_sniffed() {
        let client = StubClient::replying("{}");
        let (status, body) = post_upload(
            client,
            AnalyzerSettings::default(),
            multipart_body("image", "application/octet-stream", PNG),
        )
        .await;

        assert_eq!(status, 200);
        assert!(body["imageUrl"].as_str().unwrap().starts_with("data:image/png;base64,"));
    }

    #[actix_web::test]
    async fn oversized_upload_is_rejected() {
        let mut settings = AnalyzerSettings::default();
        settings.upload.max_bytes = 16;
        let client = StubClient::replying("{}");
        let (status, body) = post_upload(
            client.clone(),
            settings,
            multipart_body("image", "image/png", &[0u8; 64]),
        )
        .await;

        assert_eq!(status, 400);
        assert_eq!(body["error"], "Image file too large");
        assert_eq!(client.calls(), 0);
    }

    #[actix_web::test]
    async fn health_reports_the_model() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AnalyzerSettings::default()))
                .configure(configure_api),
        )
        .await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "status": "ok", "model": "gpt-4o" }));
    }
}
