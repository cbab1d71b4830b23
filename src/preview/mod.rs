//! Safe HTML preview rendering.
//!
//! Editor output is user-controlled even though it comes from a WYSIWYG
//! widget, so it is never shown as-is. [`PreviewRenderer`] tokenizes it,
//! keeps only allow-listed elements and attributes, and re-serializes every
//! token. The result is a [`SafeMarkup`], which nothing else can construct.

mod entities;
mod entity_table;
mod policy;
mod style;
mod tokenizer;
mod url;

use std::fmt;

use thiserror::Error;

pub use policy::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_INPUT_BYTES, SanitizePolicy};

use entities::{escape_attribute, escape_text};
use tokenizer::{Token, is_void_element, tokenize};

/// Why content could not be sanitized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    #[error("preview input is {len} bytes, limit is {limit}")]
    InputTooLarge { len: usize, limit: usize },
    #[error("preview markup nests deeper than {limit} elements")]
    NestingTooDeep { limit: usize },
}

/// Markup that went through the sanitizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeMarkup {
    html: String,
    fallback: bool,
}

impl SafeMarkup {
    pub fn as_str(&self) -> &str {
        &self.html
    }

    pub fn into_string(self) -> String {
        self.html
    }

    pub const fn is_empty(&self) -> bool {
        self.html.is_empty()
    }

    /// Whether this is the degraded output substituted after a failure.
    pub const fn is_fallback(&self) -> bool {
        self.fallback
    }
}

impl fmt::Display for SafeMarkup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.html)
    }
}

impl AsRef<str> for SafeMarkup {
    fn as_ref(&self) -> &str {
        &self.html
    }
}

/// What the sanitizer removed from one input.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeReport {
    /// Elements unwrapped or removed with their contents.
    pub removed_elements: usize,
    /// Attributes dropped from kept elements.
    pub removed_attributes: usize,
    /// Comments, doctypes and bogus comments dropped.
    pub removed_comments: usize,
    /// End tags with no matching open element.
    pub stray_end_tags: usize,
}

impl SanitizeReport {
    pub const fn is_clean(&self) -> bool {
        self.removed_elements == 0
            && self.removed_attributes == 0
            && self.removed_comments == 0
            && self.stray_end_tags == 0
    }
}

/// Renders document content into [`SafeMarkup`].
#[derive(Debug, Clone, Default)]
pub struct PreviewRenderer {
    policy: SanitizePolicy,
}

impl PreviewRenderer {
    pub const fn new(policy: SanitizePolicy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> &SanitizePolicy {
        &self.policy
    }

    /// Sanitize `content` for display. Never fails.
    ///
    /// Oversized input renders as empty; input nested too deeply renders as
    /// escaped plain text.
    pub fn render(&self, content: &str) -> SafeMarkup {
        match self.try_render(content) {
            Ok((markup, _)) => markup,
            Err(err @ SanitizeError::InputTooLarge { .. }) => {
                tracing::warn!(error = %err, "preview replaced with empty fallback");
                SafeMarkup {
                    html: String::new(),
                    fallback: true,
                }
            }
            Err(err @ SanitizeError::NestingTooDeep { .. }) => {
                tracing::warn!(error = %err, "preview replaced with escaped text");
                let mut html = String::with_capacity(content.len());
                escape_text(content, &mut html);
                SafeMarkup {
                    html,
                    fallback: true,
                }
            }
        }
    }

    /// Sanitize `content`, reporting failures instead of degrading.
    ///
    /// # Errors
    /// Returns [`SanitizeError`] when the input exceeds the policy limits.
    pub fn try_render(&self, content: &str) -> Result<(SafeMarkup, SanitizeReport), SanitizeError> {
        let limit = self.policy.max_input_bytes;
        if content.len() > limit {
            return Err(SanitizeError::InputTooLarge {
                len: content.len(),
                limit,
            });
        }
        let mut sanitizer = Sanitizer::new(&self.policy, content.len());
        for token in tokenize(content) {
            sanitizer.feed(token)?;
        }
        let (html, report) = sanitizer.finish();
        if !report.is_clean() {
            tracing::debug!(?report, "sanitizer removed content from preview");
        }
        Ok((
            SafeMarkup {
                html,
                fallback: false,
            },
            report,
        ))
    }
}

/// Renders `content` with the default policy.
pub fn render(content: &str) -> SafeMarkup {
    PreviewRenderer::default().render(content)
}

/// Element currently being dropped together with its contents.
struct Skipping {
    name: String,
    depth: usize,
}

struct Sanitizer<'a> {
    policy: &'a SanitizePolicy,
    out: String,
    open: Vec<String>,
    skipping: Option<Skipping>,
    report: SanitizeReport,
}

impl<'a> Sanitizer<'a> {
    fn new(policy: &'a SanitizePolicy, capacity: usize) -> Self {
        Self {
            policy,
            out: String::with_capacity(capacity),
            open: Vec::new(),
            skipping: None,
            report: SanitizeReport::default(),
        }
    }

    fn feed(&mut self, token: Token) -> Result<(), SanitizeError> {
        if let Some(skipping) = self.skipping.as_mut() {
            match &token {
                Token::StartTag { name, .. } if *name == skipping.name => skipping.depth += 1,
                Token::EndTag(name) if *name == skipping.name => {
                    skipping.depth -= 1;
                    if skipping.depth == 0 {
                        self.skipping = None;
                    }
                }
                _ => {}
            }
            return Ok(());
        }

        match token {
            Token::Text(text) => escape_text(&text, &mut self.out),
            Token::Comment(_) | Token::Doctype(_) => self.report.removed_comments += 1,
            Token::StartTag {
                name, attributes, ..
            } => self.start_tag(name, &attributes)?,
            Token::EndTag(name) => self.end_tag(&name),
        }
        Ok(())
    }

    /// Browsers ignore `/>` on non-void elements, so the self-closing flag
    /// plays no part here: `<p/>` opens a paragraph and `<iframe/>` still
    /// has contents.
    fn start_tag(
        &mut self,
        name: String,
        attributes: &[(String, Option<String>)],
    ) -> Result<(), SanitizeError> {
        if self.policy.strips_contents(&name) {
            self.report.removed_elements += 1;
            if !is_void_element(&name) {
                self.skipping = Some(Skipping { name, depth: 1 });
            }
            return Ok(());
        }
        if !self.policy.allows_element(&name) {
            self.report.removed_elements += 1;
            return Ok(());
        }

        let void = is_void_element(&name);
        if !void && self.open.len() >= self.policy.max_depth {
            return Err(SanitizeError::NestingTooDeep {
                limit: self.policy.max_depth,
            });
        }

        self.out.push('<');
        self.out.push_str(&name);
        let mut seen: Vec<&str> = Vec::with_capacity(attributes.len());
        for (attribute, value) in attributes {
            // First occurrence wins, as in browsers.
            if seen.contains(&attribute.as_str()) {
                self.report.removed_attributes += 1;
                continue;
            }
            seen.push(attribute);
            match self.filter_attribute(&name, attribute, value.as_deref()) {
                Some(kept) => self.write_attribute(attribute, kept.as_deref()),
                None => self.report.removed_attributes += 1,
            }
        }
        self.out.push('>');

        if !void {
            self.open.push(name);
        }
        Ok(())
    }

    /// `Some(value)` to keep the attribute (possibly rewritten), `None` to drop.
    fn filter_attribute(
        &self,
        element: &str,
        attribute: &str,
        value: Option<&str>,
    ) -> Option<Option<String>> {
        if !self.policy.allows_attribute(element, attribute) {
            return None;
        }
        let Some(value) = value else {
            return Some(None);
        };
        if SanitizePolicy::is_url_attribute(attribute) {
            let ok = url::is_allowed_url(value, &self.policy.url_schemes)
                || (element == "img"
                    && attribute == "src"
                    && url::is_allowed_image_data_uri(value, &self.policy.data_image_subtypes));
            return ok.then(|| Some(value.to_string()));
        }
        match attribute {
            "style" => style::filter_style(value, &self.policy.style_properties).map(Some),
            "target" => SanitizePolicy::is_allowed_target(value).then(|| Some(value.to_string())),
            _ => Some(Some(value.to_string())),
        }
    }

    fn write_attribute(&mut self, attribute: &str, value: Option<&str>) {
        self.out.push(' ');
        self.out.push_str(attribute);
        if let Some(value) = value {
            self.out.push_str("=\"");
            escape_attribute(value, &mut self.out);
            self.out.push('"');
        }
    }

    fn end_tag(&mut self, name: &str) {
        let Some(index) = self.open.iter().rposition(|open| open == name) else {
            // Closing halves of unwrapped elements are expected, not stray.
            if self.policy.allows_element(name) {
                self.report.stray_end_tags += 1;
            }
            return;
        };
        while self.open.len() > index {
            if let Some(open) = self.open.pop() {
                self.close(&open);
            }
        }
    }

    fn close(&mut self, name: &str) {
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
    }

    fn finish(mut self) -> (String, SanitizeReport) {
        while let Some(open) = self.open.pop() {
            self.close(&open);
        }
        (self.out, self.report)
    }
}
