//! Link-syntax scanner: finds code regions and `<url|display>` link tokens in a text span.
//!
//! Link tokens follow the Slack message format (`<URL>`, `<URL|DISPLAY>`, `<URL DISPLAY>`).
//! Tokens whose first character is `@`, `#`, `!` or whitespace are user/channel mentions or
//! variables and are not matched, so they stay in the surrounding plain text.

use regex::Regex;
use std::sync::LazyLock;

/// Shared link-token grammar. Group `url` stops at `|`, `>`, space or newline; the optional
/// display text follows a single `|` or space.
const LINK_TOKEN: &str = r"<(?P<url>[^@#! \n][^|> \n]*)(?:[| ](?P<display>[^>\n]*))?>";

static MARKDOWN: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&format!(
        r"(?P<code>(?s:```.+?```)|`[^`\n]+`)|{}",
        LINK_TOKEN
    ))
});

static HTML: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::new(&format!(
        r"(?P<code>(?s:<pre>.*?</pre>)|(?s:<code>.*?</code>))|{}",
        LINK_TOKEN
    ))
});

/// Compiled alternation of code-region delimiters and the link grammar for one input flavor.
pub struct PatternSet {
    regex: Regex,
}

impl PatternSet {
    fn new(pattern: &str) -> Self {
        Self {
            regex: Regex::new(pattern).expect("invalid link-syntax pattern"),
        }
    }

    /// Input that may contain Markdown code spans (fenced blocks and inline backticks).
    /// Also used for untrusted plain text, where backtick spans are kept out of link conversion.
    pub fn markdown() -> &'static PatternSet {
        &MARKDOWN
    }

    /// Input that already carries rendered HTML code tags (`<pre>`, `<code>`).
    pub fn html() -> &'static PatternSet {
        &HTML
    }
}

/// What a matched region is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Code region, copied without link conversion (delimiters included).
    Code(&'a str),
    /// Link token. `display` is `None` when absent or empty.
    Link { url: &'a str, display: Option<&'a str> },
}

/// One scanned region; `start..end` is the byte range of the whole region in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'a> {
    pub start: usize,
    pub end: usize,
    pub token: Token<'a>,
}

impl<'a> Match<'a> {
    /// Display text for a link token, defaulting to the URL.
    pub fn display_text(&self) -> Option<&'a str> {
        match self.token {
            Token::Code(_) => None,
            Token::Link { url, display } => Some(display.unwrap_or(url)),
        }
    }
}

/// Scan `text` once and return the ordered, non-overlapping matches (leftmost-first).
pub fn scan<'a>(text: &'a str, patterns: &PatternSet) -> Vec<Match<'a>> {
    patterns
        .regex
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let token = if let Some(code) = caps.name("code") {
                Token::Code(code.as_str())
            } else {
                let url = caps.name("url")?.as_str();
                let display = caps
                    .name("display")
                    .map(|d| d.as_str())
                    .filter(|d| !d.is_empty());
                Token::Link { url, display }
            };
            Some(Match {
                start: whole.start(),
                end: whole.end(),
                token,
            })
        })
        .collect()
}
