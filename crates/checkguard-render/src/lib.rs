//! Rendering for human surfaces (terminal text, Markdown evidence).
//!
//! Renderers are pure functions over [`RenderableReport`]; they never touch IO.

#![forbid(unsafe_code)]

mod markdown;
mod model;
mod text;

pub use markdown::render_markdown;
pub use model::{RenderableCheck, RenderableError, RenderableReport, RenderableStatus};
pub use text::render_text;
