use yew::prelude::*;

pub fn render_header() -> Html {
    html! {
        <header class="app-header">
            <h1><i class="fa-solid fa-palette"></i> {" Artwork Analyzer"}</h1>
            <p class="subtitle">{"Upload or photograph an artwork to learn its style, palette and how to recreate it"}</p>
        </header>
    }
}
