use gloo_file::File as GlooFile;
use js_sys::{Array, Function, Object, Promise, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Blob, CanvasRenderingContext2d, FilePropertyBag, HtmlCanvasElement, HtmlVideoElement,
    MediaStream, MediaStreamConstraints, MediaStreamTrack,
};

use crate::controller::MediaTracks;

pub const CAPTURE_WIDTH: u32 = 800;
pub const CAPTURE_HEIGHT: u32 = 600;
pub const CAPTURE_MIME_TYPE: &str = "image/jpeg";
pub const CAPTURE_QUALITY: f64 = 0.8;
pub const CAPTURE_FILE_NAME: &str = "captured-image.jpg";

const IDEAL_WIDTH: u32 = 1920;
const IDEAL_HEIGHT: u32 = 1080;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CameraError {
    #[error("Unable to access camera. Please check permissions.")]
    PermissionDenied,
    #[error("No camera is available on this device.")]
    Unavailable,
    #[error("Failed to capture photo: {0}")]
    Capture(String),
}

impl CameraError {
    fn from_request(err: JsValue) -> Self {
        let name = Reflect::get(&err, &JsValue::from_str("name"))
            .ok()
            .and_then(|name| name.as_string())
            .unwrap_or_default();
        log::warn!("getUserMedia failed: {:?}", err);
        match name.as_str() {
            "NotFoundError" | "OverconstrainedError" => CameraError::Unavailable,
            _ => CameraError::PermissionDenied,
        }
    }

    fn capture(err: JsValue) -> Self {
        CameraError::Capture(err.as_string().unwrap_or_else(|| format!("{:?}", err)))
    }
}

/// Browser media stream from `getUserMedia`.
pub struct CameraStream(MediaStream);

impl CameraStream {
    pub fn attach_to(&self, video: &HtmlVideoElement) {
        video.set_src_object(Some(&self.0));
        if let Err(err) = video.play() {
            log::warn!("Video playback did not start: {:?}", err);
        }
    }
}

impl MediaTracks for CameraStream {
    fn stop_all_tracks(&self) {
        for track in self.0.get_tracks().iter() {
            if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
                track.stop();
            }
        }
        log::debug!("Camera tracks stopped");
    }
}

/// Requests the rear-facing camera at an ideal 1920x1080.
pub async fn request_camera() -> Result<CameraStream, CameraError> {
    let window = web_sys::window().ok_or(CameraError::Unavailable)?;
    let devices = window
        .navigator()
        .media_devices()
        .map_err(|_| CameraError::Unavailable)?;

    let constraints = MediaStreamConstraints::new();
    constraints.set_video(&video_constraints().map_err(CameraError::from_request)?);
    constraints.set_audio(&JsValue::FALSE);

    let promise = devices
        .get_user_media_with_constraints(&constraints)
        .map_err(CameraError::from_request)?;
    let stream = JsFuture::from(promise)
        .await
        .map_err(CameraError::from_request)?;

    stream
        .dyn_into::<MediaStream>()
        .map(CameraStream)
        .map_err(|_| CameraError::Unavailable)
}

fn video_constraints() -> Result<JsValue, JsValue> {
    let ideal = |value: u32| -> Result<Object, JsValue> {
        let object = Object::new();
        Reflect::set(&object, &"ideal".into(), &value.into())?;
        Ok(object)
    };

    let width = ideal(IDEAL_WIDTH)?;
    let height = ideal(IDEAL_HEIGHT)?;

    let video = Object::new();
    Reflect::set(&video, &"facingMode".into(), &"environment".into())?;
    Reflect::set(&video, &"width".into(), &width)?;
    Reflect::set(&video, &"height".into(), &height)?;
    Ok(video.into())
}

/// Draws the current video frame onto an offscreen canvas and returns it as a
/// JPEG file.
pub async fn capture_frame(video: &HtmlVideoElement) -> Result<GlooFile, CameraError> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| CameraError::Capture("no document".into()))?;

    let canvas: HtmlCanvasElement = document
        .create_element("canvas")
        .map_err(CameraError::capture)?
        .dyn_into()
        .map_err(|_| CameraError::Capture("canvas element unavailable".into()))?;
    canvas.set_width(CAPTURE_WIDTH);
    canvas.set_height(CAPTURE_HEIGHT);

    let context: CanvasRenderingContext2d = canvas
        .get_context("2d")
        .map_err(CameraError::capture)?
        .ok_or_else(|| CameraError::Capture("2d context unavailable".into()))?
        .dyn_into()
        .map_err(|_| CameraError::Capture("2d context unavailable".into()))?;
    context
        .draw_image_with_html_video_element_and_dw_and_dh(
            video,
            0.0,
            0.0,
            CAPTURE_WIDTH as f64,
            CAPTURE_HEIGHT as f64,
        )
        .map_err(CameraError::capture)?;

    let blob = canvas_to_blob(&canvas).await?;

    let options = FilePropertyBag::new();
    options.set_type(CAPTURE_MIME_TYPE);
    let parts = Array::of1(&blob);
    let file = web_sys::File::new_with_blob_sequence_and_options(&parts, CAPTURE_FILE_NAME, &options)
        .map_err(CameraError::capture)?;
    Ok(GlooFile::from(file))
}

async fn canvas_to_blob(canvas: &HtmlCanvasElement) -> Result<Blob, CameraError> {
    let mut to_blob = |resolve: Function, reject: Function| {
        let on_reject = reject.clone();
        let callback = Closure::once_into_js(move |blob: JsValue| {
            let outcome = if blob.is_null() {
                reject.call1(&JsValue::NULL, &JsValue::from_str("canvas produced no image"))
            } else {
                resolve.call1(&JsValue::NULL, &blob)
            };
            if let Err(err) = outcome {
                log::error!("toBlob callback failed: {:?}", err);
            }
        });
        if let Err(err) = canvas.to_blob_with_type_and_encoder_options(
            callback.unchecked_ref(),
            CAPTURE_MIME_TYPE,
            &JsValue::from_f64(CAPTURE_QUALITY),
        ) {
            let _ = on_reject.call1(&JsValue::NULL, &err);
        }
    };

    let blob = JsFuture::from(Promise::new(&mut to_blob))
        .await
        .map_err(CameraError::capture)?;
    blob.dyn_into::<Blob>()
        .map_err(|_| CameraError::Capture("canvas produced no image".into()))
}
