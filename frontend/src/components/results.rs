use super::super::Model;
use shared::{ArtworkAnalysisResult, ColorPalette, Difficulty};
use yew::prelude::*;

pub fn render_results(model: &Model) -> Html {
    match &model.result {
        Some(result) => render_analysis(result),
        None => html! {},
    }
}

fn render_analysis(result: &ArtworkAnalysisResult) -> Html {
    let artist = &result.artist_info;
    let confidence = artist.confidence_percent();

    html! {
        <div class="results-container">
            <section class="result-card artist-info">
                <h2><i class="fa-solid fa-user-pen"></i>{" "}{ &artist.name }</h2>
                <p>{ &artist.description }</p>
                <div class="confidence-meter">
                    <div class="meter-label">{"Confidence:"}</div>
                    <div class="meter">
                        <div class="meter-fill" style={format!("width: {}%", confidence)}></div>
                    </div>
                    <div class="meter-value">{ format!("{}%", confidence) }</div>
                </div>
            </section>

            { render_palette(&result.color_palette) }

            <section class="result-card artwork-details">
                <h3>{"Artwork Analysis"}</h3>
                <dl>
                    <dt>{"Style"}</dt><dd>{ &result.analysis.style }</dd>
                    <dt>{"Period"}</dt><dd>{ &result.analysis.period }</dd>
                    <dt>{"Medium"}</dt><dd>{ &result.analysis.medium }</dd>
                </dl>
            </section>

            <section class="result-card replication-guide">
                <div class="result-header">
                    <h3>{"Replication Guide"}</h3>
                    { render_difficulty(result.replication_guide.difficulty) }
                </div>
                <h4>{"Materials"}</h4>
                { render_list(&result.replication_guide.materials) }
                <h4>{"Techniques"}</h4>
                { render_list(&result.replication_guide.techniques) }
                <h4>{"Steps"}</h4>
                <ol class="steps">
                    { for result.replication_guide.steps.iter().map(|step| html! { <li>{ step }</li> }) }
                </ol>
            </section>
        </div>
    }
}

fn render_palette(palette: &ColorPalette) -> Html {
    let dominant = palette.dominant_color();
    html! {
        <section class="result-card color-palette">
            <h3>{"Color Palette"}</h3>
            <div class="dominant-color">
                <div class="swatch large" style={format!("background-color: {}", dominant)}></div>
                <span>{ format!("Dominant: {}", dominant) }</span>
            </div>
            <div class="swatches">
                { for palette.colors().iter().map(|color| html! {
                    <div class="swatch-item" title={color.clone()}>
                        <div class="swatch" style={format!("background-color: {}", color)}></div>
                        <code>{ color }</code>
                    </div>
                }) }
            </div>
        </section>
    }
}

fn render_difficulty(difficulty: Difficulty) -> Html {
    let class = format!("difficulty-badge {}", difficulty.as_ref().to_ascii_lowercase());
    html! { <span class={class}>{ difficulty.to_string() }</span> }
}

fn render_list(items: &[String]) -> Html {
    html! {
        <ul>
            { for items.iter().map(|item| html! { <li>{ item }</li> }) }
        </ul>
    }
}
