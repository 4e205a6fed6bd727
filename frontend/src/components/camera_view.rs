use super::super::Model;
use super::super::Msg;
use super::utils::debounce;
use yew::prelude::*;

pub fn render_camera_view(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();
    let capturing = model.controller.is_capturing();

    html! {
        <div class="camera-view">
            <video
                ref={model.video_ref.clone()}
                class="camera-preview"
                autoplay=true
                playsinline=true
                muted=true
            />
            <div class="camera-actions">
                <button
                    class="analyze-btn"
                    disabled={capturing}
                    onclick={debounce(200, {
                        let link = link.clone();
                        move || link.send_message(Msg::CapturePhoto)
                    })}
                >
                    {
                        if capturing {
                            html! { <><i class="fa-solid fa-spinner fa-spin"></i>{" Capturing..."}</> }
                        } else {
                            html! { <><i class="fa-solid fa-camera"></i>{" Capture"}</> }
                        }
                    }
                </button>
                <button
                    class="analyze-btn secondary"
                    onclick={link.callback(|_: MouseEvent| Msg::CancelCamera)}
                >
                    <i class="fa-solid fa-xmark"></i>{" Cancel"}
                </button>
            </div>
        </div>
    }
}
