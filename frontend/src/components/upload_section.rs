use super::super::Model;
use super::super::Msg;
use super::camera_view::render_camera_view;
use super::utils::{debounce, first_image_file};
use crate::controller::UploadPhase;
use shared::ACCEPTED_MIME_TYPES;
use wasm_bindgen::JsCast;
use web_sys::{DragEvent, HtmlInputElement};
use yew::prelude::*;

pub fn render_upload_section(model: &Model, ctx: &Context<Model>) -> Html {
    html! {
        <div class="upload-section">
            {
                if model.controller.is_camera_open() {
                    render_camera_view(model, ctx)
                } else {
                    render_file_input_area(model, ctx)
                }
            }
            { render_camera_error(model) }
        </div>
    }
}

fn render_file_input_area(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();
    let loading = model.controller.is_loading();

    let handle_change = link.callback(|e: Event| {
        let input: HtmlInputElement = e.target_unchecked_into();
        let file = input.files().as_ref().and_then(first_image_file);

        input.set_value("");

        match file {
            Some(file) => Msg::FileSelected(file),
            None => Msg::SetError(Some("No valid image file selected.".into())),
        }
    });

    let handle_drag_over = link.callback(|e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(true)
    });

    let handle_drag_leave = link.callback(|e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(false)
    });

    let handle_drop = link.callback(Msg::HandleDrop);
    let trigger_file_input = Callback::from(move |_| {
        if loading {
            return;
        }
        let input = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id("file-input"));
        if let Some(html_input) = input.and_then(|el| el.dyn_into::<web_sys::HtmlElement>().ok()) {
            html_input.click();
        }
    });

    html! {
        <>
            <input
                type="file"
                id="file-input"
                accept={ACCEPTED_MIME_TYPES.join(",")}
                style="display: none;"
                onchange={handle_change}
            />

            <div
                id="drop-zone"
                class={classes!(
                    "upload-area",
                    model.is_dragging.then_some("drag-over"),
                    loading.then_some("disabled")
                )}
                ondragover={handle_drag_over}
                ondragleave={handle_drag_leave}
                ondrop={handle_drop}
                onclick={debounce(300, {
                    let trigger_file_input = trigger_file_input.clone();
                    move || trigger_file_input.emit(())
                })}
            >
                { render_drop_zone_content(model) }
            </div>

            <div class="upload-actions">
                <button
                    id="upload-button"
                    class="analyze-btn"
                    disabled={loading}
                    onclick={debounce(300, {
                        let trigger_file_input = trigger_file_input.clone();
                        move || trigger_file_input.emit(())
                    })}
                >
                    <i class="fa-solid fa-upload"></i> {" Select Image"}
                </button>
                <button
                    id="camera-button"
                    class="analyze-btn secondary"
                    disabled={loading}
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::StartCamera)
                    })}
                >
                    <i class="fa-solid fa-camera"></i> {" Take Photo"}
                </button>
            </div>
        </>
    }
}

fn render_drop_zone_content(model: &Model) -> Html {
    if model.controller.phase() == UploadPhase::Uploading {
        return html! {
            <div class="upload-placeholder">
                <i class="fa-solid fa-spinner fa-spin fa-2x"></i>
                <p>{"Analyzing artwork..."}</p>
            </div>
        };
    }

    match model.controller.preview() {
        Some(url) => html! {
            <img id="artwork-preview" class="preview-image" src={url.to_string()} alt="Artwork preview" />
        },
        None => html! {
            <div class="upload-placeholder">
                <i class="fa-solid fa-cloud-arrow-up"></i>
                <p>{"Drag & drop an artwork here, paste, or click"}</p>
                <p class="file-types">{"Supported formats: JPG, PNG, WEBP"}</p>
            </div>
        },
    }
}

fn render_camera_error(model: &Model) -> Html {
    match model.controller.camera_error() {
        Some(message) => html! {
            <p class="camera-error"><i class="fa-solid fa-video-slash"></i>{" "}{ message }</p>
        },
        None => html! {},
    }
}
