//! Fragment extraction from rendered markup
//!
//! A fragment is one top-level block of the rendered page, one per cell.
//! Extraction parses the page and walks it top-down, collecting every
//! element with the fragment tag without descending into it. The
//! preamble is the page text before the first fragment start tag.

use regex::Regex;
use scraper::{ElementRef, Html};

use super::errors::{RenderError, RenderResult};

/// Splits rendered pages into a preamble and fragments.
#[derive(Debug, Clone)]
pub struct FragmentExtractor {
    tag: String,
    boundary: Regex,
}

impl FragmentExtractor {
    /// Extractor for elements named `tag` (case-insensitive).
    pub fn new(tag: &str) -> RenderResult<Self> {
        let tag = tag.trim().to_ascii_lowercase();
        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(RenderError::InvalidTag(tag));
        }
        // comments and raw-text bodies are consumed whole so a tag-like
        // string inside them is never taken as the boundary
        let pattern = format!(
            r"(?is)<!--.*?-->|<script\b.*?</script\s*>|<style\b.*?</style\s*>|(?P<start><{}(?:[\s/>]|$))",
            regex::escape(&tag)
        );
        let boundary = Regex::new(&pattern).map_err(|_| RenderError::InvalidTag(tag.clone()))?;
        Ok(Self { tag, boundary })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Everything before the first fragment start tag, verbatim. The
    /// whole page when there is none.
    pub fn preamble<'a>(&self, markup: &'a str) -> &'a str {
        for caps in self.boundary.captures_iter(markup) {
            if let Some(start) = caps.name("start") {
                return &markup[..start.start()];
            }
        }
        markup
    }

    /// Top-level fragments in document order, serialized as markup.
    pub fn fragments(&self, markup: &str) -> Vec<String> {
        let document = Html::parse_document(markup);
        let mut fragments = Vec::new();
        let mut stack = vec![document.root_element()];

        while let Some(element) = stack.pop() {
            if element.value().name().eq_ignore_ascii_case(&self.tag) {
                fragments.push(element.html());
                continue;
            }
            let children: Vec<ElementRef<'_>> =
                element.children().filter_map(ElementRef::wrap).collect();
            stack.extend(children.into_iter().rev());
        }
        fragments
    }
}

/// Escape text for inclusion in markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Fragment carrying a readable failure message for the client.
pub fn error_fragment(message: &str) -> String {
    format!(
        "<div class=\"nbstream-error\"><pre>{}</pre></div>",
        escape_html(message)
    )
}
