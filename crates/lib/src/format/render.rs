//! Markup renderers for the two Telegram parse modes.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Output markup flavor; maps to Telegram's `parse_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Markdown,
    Html,
}

impl Dialect {
    /// Value for Telegram's `parse_mode` field.
    pub fn parse_mode(self) -> &'static str {
        match self {
            Dialect::Markdown => "Markdown",
            Dialect::Html => "HTML",
        }
    }

    /// Renderer for this dialect (stateless, shared).
    pub fn renderer(self) -> &'static dyn Renderer {
        match self {
            Dialect::Markdown => &MarkdownRenderer,
            Dialect::Html => &HtmlRenderer,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.parse_mode())
    }
}

/// Dialect-specific rendering of link, bold and plain-text fragments.
pub trait Renderer: Send + Sync {
    /// Native hyperlink. Empty `display` falls back to the URL.
    fn render_link(&self, display: &str, url: &str) -> String;

    /// Bold fragment around already-converted `inner` markup.
    fn bold(&self, inner: &str) -> String;

    /// Escape plain text so it cannot be read as markup.
    fn escape_text<'a>(&self, text: &'a str) -> Cow<'a, str>;
}

/// Telegram legacy Markdown: `[text](url)`, `*bold*`. Plain text is passed through.
pub struct MarkdownRenderer;

impl Renderer for MarkdownRenderer {
    fn render_link(&self, display: &str, url: &str) -> String {
        let display = if display.is_empty() { url } else { display };
        format!("[{}]({})", display, url)
    }

    fn bold(&self, inner: &str) -> String {
        format!("*{}*", inner)
    }

    fn escape_text<'a>(&self, text: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(text)
    }
}

/// Telegram HTML: `<a href="url">text</a>`, `<b>bold</b>`, entity-escaped text.
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn render_link(&self, display: &str, url: &str) -> String {
        let display = if display.is_empty() { url } else { display };
        format!(
            "<a href=\"{}\">{}</a>",
            htmlescape::encode_minimal(url),
            htmlescape::encode_minimal(display)
        )
    }

    fn bold(&self, inner: &str) -> String {
        format!("<b>{}</b>", inner)
    }

    fn escape_text<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if text.contains(['&', '<', '>', '"', '\'']) {
            Cow::Owned(htmlescape::encode_minimal(text))
        } else {
            Cow::Borrowed(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_link_and_bold() {
        let r = Dialect::Markdown.renderer();
        assert_eq!(r.render_link("Click", "https://x.test"), "[Click](https://x.test)");
        assert_eq!(r.render_link("", "https://x.test"), "[https://x.test](https://x.test)");
        assert_eq!(r.bold("Build"), "*Build*");
        assert_eq!(r.escape_text("a < b & c"), "a < b & c");
    }

    #[test]
    fn html_link_escapes_display() {
        let r = Dialect::Html.renderer();
        assert_eq!(
            r.render_link("Tom & Jerry", "https://x.test"),
            "<a href=\"https://x.test\">Tom &amp; Jerry</a>"
        );
        assert_eq!(
            r.render_link("", "https://x.test"),
            "<a href=\"https://x.test\">https://x.test</a>"
        );
    }

    #[test]
    fn html_escape_text() {
        let r = Dialect::Html.renderer();
        assert_eq!(r.escape_text("<@user> & co"), "&lt;@user&gt; &amp; co");
        assert!(matches!(r.escape_text("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn parse_modes() {
        assert_eq!(Dialect::Markdown.parse_mode(), "Markdown");
        assert_eq!(Dialect::Html.to_string(), "HTML");
    }
}
