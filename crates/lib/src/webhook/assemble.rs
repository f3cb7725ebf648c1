//! Builds one message body (and its dialect) from a webhook payload.

use super::payload::{Attachment, Payload};
use crate::format::{convert_rich, plain_to_html, to_markdown, to_markdown_bold_inner, Dialect};
use crate::preview::{PreviewLinks, PreviewRequest};

/// Display text of the preview anchor (U+200A hair space), so only Telegram's card shows.
pub const PREVIEW_ANCHOR: &str = "\u{200A}";

/// Assembled message body in its dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
    pub text: String,
    pub dialect: Dialect,
}

/// Attachments first; when none renders anything, the plain text. `None` when neither has content.
pub fn assemble(payload: &Payload, previews: &dyn PreviewLinks) -> Option<Assembled> {
    assemble_attachments(payload, previews).or_else(|| assemble_plain(payload))
}

fn assemble_attachments(payload: &Payload, previews: &dyn PreviewLinks) -> Option<Assembled> {
    let first = payload.attachments.first()?;
    let contributing: Vec<&Attachment> = payload
        .attachments
        .iter()
        .filter(|a| a.has_content())
        .collect();
    if contributing.is_empty() {
        return None;
    }

    let dialect = if contributing.iter().any(|a| a.is_markdown("pretext")) {
        Dialect::Markdown
    } else {
        Dialect::Html
    };
    let renderer = dialect.renderer();

    let mut text = String::new();
    if !first.title_link.is_empty() {
        let url = previews.preview_url(&preview_request(first));
        text.push_str(&renderer.render_link(PREVIEW_ANCHOR, &url));
        text.push(' ');
        if !payload.text.is_empty() {
            text.push_str(&convert_rich(&payload.text, dialect));
            text.push('\n');
        }
    }

    for (i, attachment) in contributing.iter().enumerate() {
        if i > 0 {
            text.push('\n');
        }
        let description = attachment.description();
        let title = if !attachment.title_link.is_empty() {
            Some(renderer.render_link(&attachment.title, &attachment.title_link))
        } else if !attachment.title.is_empty() {
            Some(renderer.bold(&convert_title(&attachment.title, dialect)))
        } else {
            None
        };
        if let Some(title) = title {
            text.push_str(&title);
            if !description.is_empty() {
                text.push(' ');
            }
        }
        text.push_str(&convert_rich(description, dialect));
    }

    log::debug!(
        "assembled {} of {} attachment(s) as {}",
        contributing.len(),
        payload.attachments.len(),
        dialect
    );
    Some(Assembled { text, dialect })
}

/// Bold titles keep their link tokens converted; titles are sender text, so HTML escapes them.
/// Markdown titles lose `*` and `_`, which would close or nest the bold entity.
fn convert_title(title: &str, dialect: Dialect) -> String {
    match dialect {
        Dialect::Markdown => to_markdown_bold_inner(title),
        Dialect::Html => plain_to_html(title),
    }
}

fn assemble_plain(payload: &Payload) -> Option<Assembled> {
    if payload.text.is_empty() {
        return None;
    }
    let mut text = payload.text.clone();
    if !payload.channel_hint.is_empty() {
        text.push(' ');
        text.push_str(&payload.channel_hint);
    }
    Some(if payload.use_markdown {
        Assembled {
            text: to_markdown(&text),
            dialect: Dialect::Markdown,
        }
    } else {
        Assembled {
            text: plain_to_html(&text),
            dialect: Dialect::Html,
        }
    })
}

fn preview_request(attachment: &Attachment) -> PreviewRequest {
    PreviewRequest {
        title: attachment.title.clone(),
        author: attachment.author_name.clone(),
        text: attachment.pretext.clone(),
        url: attachment.title_link.clone(),
        image: attachment.thumb_url.clone(),
        ts: attachment.ts,
    }
}
