//! Link previews for attachment messages.
//!
//! The first attachment's title link is announced through a hair-space anchor whose target is a
//! preview page. Telegram fetches that page and builds its card from the OpenGraph tags, so the
//! chat shows the attachment's title, author, text and thumbnail rather than whatever the
//! title link itself would unfurl to.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Attachment fields a preview is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PreviewRequest {
    pub title: String,
    pub author: String,
    pub text: String,
    pub url: String,
    pub image: String,
    /// Unix seconds of the attachment, shown as the article time.
    pub ts: Option<i64>,
}

/// Produces the target URL of the preview anchor.
pub trait PreviewLinks: Send + Sync {
    fn preview_url(&self, req: &PreviewRequest) -> String;
}

/// No preview pages: the anchor points at the title link itself.
pub struct DirectLinks;

impl PreviewLinks for DirectLinks {
    fn preview_url(&self, req: &PreviewRequest) -> String {
        req.url.clone()
    }
}

/// Preview pages served by the gateway at `{public_url}/preview?...`.
pub struct PreviewPages {
    base: reqwest::Url,
}

impl PreviewPages {
    /// `public_url` is the externally reachable gateway base (e.g. `https://hooks.example.com`).
    pub fn new(public_url: &str) -> Result<Self> {
        let mut base = reqwest::Url::parse(public_url.trim_end_matches('/'))
            .with_context(|| format!("parsing public url {}", public_url))?;
        base.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("public url {} cannot be a base", public_url))?
            .pop_if_empty()
            .push("preview");
        Ok(Self { base })
    }
}

impl PreviewLinks for PreviewPages {
    fn preview_url(&self, req: &PreviewRequest) -> String {
        let mut url = self.base.clone();
        {
            let mut q = url.query_pairs_mut();
            for (key, value) in [
                ("title", &req.title),
                ("author", &req.author),
                ("text", &req.text),
                ("url", &req.url),
                ("image", &req.image),
            ] {
                if !value.is_empty() {
                    q.append_pair(key, value);
                }
            }
            if let Some(ts) = req.ts {
                q.append_pair("ts", &ts.to_string());
            }
        }
        url.to_string()
    }
}

/// HTML page carrying OpenGraph tags for `req`, with a link (and refresh) to the target URL.
pub fn render_preview_page(req: &PreviewRequest) -> String {
    let esc = |s: &str| htmlescape::encode_minimal(s);
    let title = if req.title.is_empty() { &req.url } else { &req.title };
    let mut head = String::new();
    head.push_str(&format!("<meta property=\"og:title\" content=\"{}\">\n", esc(title)));
    if !req.text.is_empty() {
        head.push_str(&format!(
            "<meta property=\"og:description\" content=\"{}\">\n",
            esc(&req.text)
        ));
    }
    if !req.author.is_empty() {
        head.push_str(&format!(
            "<meta property=\"og:site_name\" content=\"{}\">\n",
            esc(&req.author)
        ));
    }
    if !req.image.is_empty() {
        head.push_str(&format!(
            "<meta property=\"og:image\" content=\"{}\">\n",
            esc(&req.image)
        ));
    }
    if let Some(time) = req.ts.and_then(|ts| chrono::DateTime::from_timestamp(ts, 0)) {
        head.push_str(&format!(
            "<meta property=\"article:published_time\" content=\"{}\">\n",
            time.to_rfc3339()
        ));
    }
    if !req.url.is_empty() {
        head.push_str(&format!(
            "<meta property=\"og:url\" content=\"{}\">\n<meta http-equiv=\"refresh\" content=\"0; url={}\">\n",
            esc(&req.url),
            esc(&req.url)
        ));
    }
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n{}</head>\n<body>\n<a href=\"{}\">{}</a>\n</body>\n</html>\n",
        esc(title),
        head,
        esc(&req.url),
        esc(title)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PreviewRequest {
        PreviewRequest {
            title: "Build #12".into(),
            author: "ci".into(),
            text: "passed & green".into(),
            url: "http://ci/12".into(),
            image: String::new(),
            ts: None,
        }
    }

    #[test]
    fn direct_links_return_title_link() {
        assert_eq!(DirectLinks.preview_url(&request()), "http://ci/12");
    }

    #[test]
    fn preview_pages_encode_query() {
        let pages = PreviewPages::new("https://hooks.example.com/").unwrap();
        assert_eq!(
            pages.preview_url(&request()),
            "https://hooks.example.com/preview?title=Build+%2312&author=ci&text=passed+%26+green&url=http%3A%2F%2Fci%2F12"
        );
    }

    #[test]
    fn preview_pages_keep_base_path() {
        let pages = PreviewPages::new("https://example.com/hookgram").unwrap();
        let url = pages.preview_url(&PreviewRequest {
            url: "http://x".into(),
            ..Default::default()
        });
        assert_eq!(url, "https://example.com/hookgram/preview?url=http%3A%2F%2Fx");
    }

    #[test]
    fn page_escapes_fields() {
        let page = render_preview_page(&request());
        assert!(page.contains("<meta property=\"og:title\" content=\"Build #12\">"));
        assert!(page.contains("content=\"passed &amp; green\""));
        assert!(page.contains("<a href=\"http://ci/12\">"));
        assert!(!page.contains("og:image"));
        assert!(!page.contains("published_time"));
    }

    #[test]
    fn timestamp_becomes_article_time() {
        let req = PreviewRequest {
            url: "http://x".into(),
            ts: Some(0),
            ..Default::default()
        };
        let pages = PreviewPages::new("https://example.com").unwrap();
        assert_eq!(pages.preview_url(&req), "https://example.com/preview?url=http%3A%2F%2Fx&ts=0");
        assert!(render_preview_page(&req)
            .contains("<meta property=\"article:published_time\" content=\"1970-01-01T00:00:00+00:00\">"));
    }
}
