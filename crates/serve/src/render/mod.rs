// crates/serve/src/render/mod.rs

pub mod sanitize;
pub mod text;

pub use sanitize::sanitize_html;
pub use text::{render_content, render_excerpt, render_guid, render_title, TitleStyle};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("lol_html error: {0}")]
    LolHtml(String),
}
