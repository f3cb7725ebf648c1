//! Text-markup conversion: Slack link syntax to Telegram Markdown or HTML.
//!
//! The scanner finds code regions and `<url|display>` tokens, renderers produce each dialect's
//! markup, and the converter stitches the two together over one text span.

mod convert;
mod render;
mod scanner;

pub use convert::{
    convert, convert_rich, plain_to_html, to_html, to_markdown, to_markdown_bold_inner, Escaping,
};
pub use render::{Dialect, HtmlRenderer, MarkdownRenderer, Renderer};
pub use scanner::{scan, Match, PatternSet, Token};
