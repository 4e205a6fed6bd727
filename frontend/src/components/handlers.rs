use super::super::{Model, Msg};
use crate::api::{submit_artwork, SubmitError};
use crate::camera::{self, CameraError, CameraStream};
use crate::controller::ControllerError;
use gloo_file::{File as GlooFile, ObjectUrl};
use shared::ArtworkAnalysisResult;
use wasm_bindgen_futures::spawn_local;
use web_sys::{ClipboardEvent, DragEvent, FileList, HtmlVideoElement};
use yew::prelude::*;

pub fn handle_file_selected(model: &mut Model, ctx: &Context<Model>, file: GlooFile) -> bool {
    let mime_type = file.raw_mime_type();
    let preview = ObjectUrl::from(file.clone());

    match model.controller.begin_upload(&mime_type, preview) {
        Ok(()) => {
            start_analysis(model, ctx, file);
            true
        }
        Err(e) => {
            log::warn!("Rejected {}: {}", file.name(), e);
            model.error = Some(e.to_string());
            true
        }
    }
}

pub fn handle_analysis_complete(model: &mut Model, result: ArtworkAnalysisResult) -> bool {
    model.controller.finish_upload();
    log::info!(
        "Analysis complete: {} ({}% confidence)",
        result.artist_info.name,
        result.artist_info.confidence_percent()
    );
    model.result = Some(result);
    true
}

pub fn handle_analysis_failed(model: &mut Model, error: SubmitError) -> bool {
    model.controller.finish_upload();
    log::error!("Analysis failed: {:?}", error);
    model.error = Some(error.to_string());
    true
}

pub fn handle_drop(model: &mut Model, ctx: &Context<Model>, event: DragEvent) -> bool {
    event.prevent_default();
    model.is_dragging = false;

    if let Some(file_list) = event.data_transfer().and_then(|dt| dt.files()) {
        process_file_list(ctx, file_list);
    }

    true
}

pub fn handle_paste(model: &mut Model, ctx: &Context<Model>, event: ClipboardEvent) -> bool {
    if model.controller.is_loading() || model.controller.is_camera_open() {
        return false;
    }
    if let Some(file_list) = event.clipboard_data().and_then(|dt| dt.files()) {
        if file_list.length() > 0 {
            event.prevent_default();
            process_file_list(ctx, file_list);
            return true;
        }
    }
    false
}

/// Only the first file is analyzed.
pub fn process_file_list(ctx: &Context<Model>, file_list: FileList) {
    let Some(file) = file_list.item(0) else {
        return;
    };

    if file.type_().starts_with("image/") {
        ctx.link().send_message(Msg::FileSelected(GlooFile::from(file)));
    } else {
        log::warn!("Skipping non-image file: {}", file.name());
        ctx.link().send_message(Msg::SetError(Some(format!(
            "Please choose an image file ({} is not an image).",
            file.name()
        ))));
    }
}

pub fn handle_start_camera(model: &mut Model, ctx: &Context<Model>) -> bool {
    if let Err(e) = model.controller.can_open_camera() {
        model.error = Some(e.to_string());
        return true;
    }

    let link = ctx.link().clone();
    spawn_local(async move {
        match camera::request_camera().await {
            Ok(stream) => link.send_message(Msg::CameraReady(stream)),
            Err(e) => link.send_message(Msg::CameraFailed(e)),
        }
    });
    false
}

pub fn handle_camera_ready(model: &mut Model, stream: CameraStream) -> bool {
    match model.controller.open_camera(stream) {
        Ok(()) => {
            model.error = None;
            model.attach_stream = true;
        }
        Err(e) => model.error = Some(e.to_string()),
    }
    true
}

pub fn handle_camera_failed(model: &mut Model, error: CameraError) -> bool {
    log::error!("Camera unavailable: {}", error);
    model.controller.camera_failed(error.to_string());
    true
}

pub fn handle_capture_photo(model: &mut Model, ctx: &Context<Model>) -> bool {
    if let Err(e) = model.controller.begin_capture() {
        log::warn!("Capture ignored: {}", e);
        return false;
    }

    let Some(video) = model.video_ref.cast::<HtmlVideoElement>() else {
        ctx.link()
            .send_message(Msg::CaptureFailed(CameraError::Capture("video preview is not ready".into())));
        return true;
    };

    let link = ctx.link().clone();
    spawn_local(async move {
        match camera::capture_frame(&video).await {
            Ok(file) => link.send_message(Msg::PhotoCaptured(file)),
            Err(e) => link.send_message(Msg::CaptureFailed(e)),
        }
    });
    true
}

pub fn handle_photo_captured(model: &mut Model, ctx: &Context<Model>, file: GlooFile) -> bool {
    let mime_type = file.raw_mime_type();
    let preview = ObjectUrl::from(file.clone());

    match model.controller.finish_capture(&mime_type, preview) {
        Ok(()) => start_analysis(model, ctx, file),
        Err(ControllerError::CameraClosed) => {
            log::debug!("Dropping frame captured after the camera was closed");
            return false;
        }
        Err(e) => model.error = Some(e.to_string()),
    }
    true
}

pub fn handle_capture_failed(model: &mut Model, error: CameraError) -> bool {
    log::error!("{}", error);
    model.controller.capture_failed();
    model.error = Some(error.to_string());
    true
}

pub fn handle_cancel_camera(model: &mut Model) -> bool {
    model.controller.cancel_camera();
    model.attach_stream = false;
    true
}

fn start_analysis(model: &mut Model, ctx: &Context<Model>, file: GlooFile) {
    model.error = None;
    model.result = None;
    log::info!("Uploading {} ({} bytes)", file.name(), file.size());

    let link = ctx.link().clone();
    spawn_local(async move {
        match submit_artwork(&file).await {
            Ok(result) => link.send_message(Msg::AnalysisComplete(result)),
            Err(e) => link.send_message(Msg::AnalysisFailed(e)),
        }
    });
}
