//! Text conversion: rewrite link tokens into a dialect's markup, keep code regions intact.

use super::render::{Dialect, Renderer};
use super::scanner::{scan, PatternSet, Token};

/// How text outside link tokens is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escaping {
    /// Copied as-is (input is already markup in the target dialect).
    Verbatim,
    /// Passed through the renderer's `escape_text`.
    Entities,
    /// `*` and `_` dropped. For text inside a legacy Markdown entity, where they cannot be escaped.
    StripEmphasis,
}

/// Convert one text span. Plain runs and code regions go through `escaping`; link tokens are
/// rendered with `renderer`. Text without matches is returned escaped (or unchanged).
pub fn convert(
    text: &str,
    patterns: &PatternSet,
    escaping: Escaping,
    renderer: &dyn Renderer,
) -> String {
    let escape = |s: &str, out: &mut String| match escaping {
        Escaping::Verbatim => out.push_str(s),
        Escaping::Entities => out.push_str(&renderer.escape_text(s)),
        Escaping::StripEmphasis => out.extend(s.chars().filter(|c| !matches!(c, '*' | '_'))),
    };

    let matches = scan(text, patterns);
    let mut out = String::with_capacity(text.len());
    if matches.is_empty() {
        escape(text, &mut out);
        return out;
    }

    let mut pos = 0;
    for m in &matches {
        if m.start > pos {
            escape(&text[pos..m.start], &mut out);
        }
        match m.token {
            Token::Code(code) => escape(code, &mut out),
            Token::Link { url, .. } => {
                out.push_str(&renderer.render_link(m.display_text().unwrap_or(url), url))
            }
        }
        pos = m.end;
    }
    if pos < text.len() {
        escape(&text[pos..], &mut out);
    }
    out
}

/// Text meant for Telegram Markdown; no escaping of plain runs.
pub fn to_markdown(text: &str) -> String {
    convert(
        text,
        PatternSet::markdown(),
        Escaping::Verbatim,
        Dialect::Markdown.renderer(),
    )
}

/// Text that is already HTML-safe (trusted rich content); only link tokens are rewritten.
pub fn to_html(text: &str) -> String {
    convert(
        text,
        PatternSet::html(),
        Escaping::Verbatim,
        Dialect::Html.renderer(),
    )
}

/// Untrusted plain text to HTML: everything outside link tokens is entity-escaped.
pub fn plain_to_html(text: &str) -> String {
    convert(
        text,
        PatternSet::markdown(),
        Escaping::Entities,
        Dialect::Html.renderer(),
    )
}

/// Markdown for the inside of a bold fragment: link tokens converted, emphasis markers dropped
/// from the surrounding text.
pub fn to_markdown_bold_inner(text: &str) -> String {
    convert(
        text,
        PatternSet::markdown(),
        Escaping::StripEmphasis,
        Dialect::Markdown.renderer(),
    )
}

/// Trusted-content conversion for `dialect` (`to_markdown` or `to_html`).
pub fn convert_rich(text: &str, dialect: Dialect) -> String {
    match dialect {
        Dialect::Markdown => to_markdown(text),
        Dialect::Html => to_html(text),
    }
}
