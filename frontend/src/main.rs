mod api;
mod camera;
mod components;
mod controller;

use api::SubmitError;
use camera::{CameraError, CameraStream};
use components::handlers;
use components::header::render_header;
use components::results::render_results;
use components::upload_section::render_upload_section;
use components::utils::render_error_message;
use controller::UploadController;
use gloo_events::EventListener;
use gloo_file::{File as GlooFile, ObjectUrl};
use shared::ArtworkAnalysisResult;
use wasm_bindgen::JsCast;
use web_sys::{ClipboardEvent, DragEvent, HtmlVideoElement};
use yew::prelude::*;

// Yew msg components
pub enum Msg {
    // Upload
    FileSelected(GlooFile),
    AnalysisComplete(ArtworkAnalysisResult),
    AnalysisFailed(SubmitError),

    // Camera
    StartCamera,
    CameraReady(CameraStream),
    CameraFailed(CameraError),
    CapturePhoto,
    PhotoCaptured(GlooFile),
    CaptureFailed(CameraError),
    CancelCamera,

    // UI states
    SetError(Option<String>),
    SetDragging(bool),

    // Input events
    HandleDrop(DragEvent),
    HandlePaste(ClipboardEvent),
}

// Main component
pub struct Model {
    controller: UploadController<CameraStream, ObjectUrl>,
    result: Option<ArtworkAnalysisResult>,
    error: Option<String>,
    is_dragging: bool,
    paste_listener: Option<EventListener>,
    video_ref: NodeRef,
    attach_stream: bool,
}

impl Component for Model {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let mut model = Self {
            controller: UploadController::new(),
            result: None,
            error: None,
            is_dragging: false,
            paste_listener: None,
            video_ref: NodeRef::default(),
            attach_stream: false,
        };

        if let Some(window) = web_sys::window() {
            let link = ctx.link().clone();
            let listener = EventListener::new(&window, "paste", move |event| {
                if let Some(clipboard_event) = event.dyn_ref::<ClipboardEvent>() {
                    link.send_message(Msg::HandlePaste(clipboard_event.clone()));
                }
            });
            model.paste_listener = Some(listener);
        }

        model
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::FileSelected(file) => handlers::handle_file_selected(self, ctx, file),
            Msg::AnalysisComplete(result) => handlers::handle_analysis_complete(self, result),
            Msg::AnalysisFailed(error) => handlers::handle_analysis_failed(self, error),

            Msg::StartCamera => handlers::handle_start_camera(self, ctx),
            Msg::CameraReady(stream) => handlers::handle_camera_ready(self, stream),
            Msg::CameraFailed(error) => handlers::handle_camera_failed(self, error),
            Msg::CapturePhoto => handlers::handle_capture_photo(self, ctx),
            Msg::PhotoCaptured(file) => handlers::handle_photo_captured(self, ctx, file),
            Msg::CaptureFailed(error) => handlers::handle_capture_failed(self, error),
            Msg::CancelCamera => handlers::handle_cancel_camera(self),

            Msg::SetError(error) => {
                self.error = error;
                true
            }
            Msg::SetDragging(is_dragging) => {
                self.is_dragging = is_dragging;
                true
            }

            Msg::HandleDrop(event) => handlers::handle_drop(self, ctx, event),
            Msg::HandlePaste(event) => handlers::handle_paste(self, ctx, event),
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="container">
                { render_header() }

                <main class="main-content">
                { render_upload_section(self, ctx) }
                { render_error_message(self) }
                { render_results(self) }
                </main>

                <footer class="app-footer">
                    <p>{"Artwork Analyzer | Fullstack Rust WASM"}</p>
                </footer>
            </div>
        }
    }

    fn rendered(&mut self, _ctx: &Context<Self>, _first_render: bool) {
        // The <video> element only exists once the camera view has rendered.
        if !self.attach_stream {
            return;
        }
        if let (Some(video), Some(stream)) = (
            self.video_ref.cast::<HtmlVideoElement>(),
            self.controller.camera_stream(),
        ) {
            stream.attach_to(&video);
            self.attach_stream = false;
        }
    }

    fn destroy(&mut self, _ctx: &Context<Self>) {
        self.controller.teardown();
        self.paste_listener = None;
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    yew::Renderer::<Model>::new().render();
}
