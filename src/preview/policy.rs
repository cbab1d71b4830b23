use std::collections::{HashMap, HashSet};

use crate::editor::UploaderPolicy;

use super::url::image_subtype_for_extension;

/// Default cap on input size before the renderer gives up.
pub const DEFAULT_MAX_INPUT_BYTES: usize = 1024 * 1024;
/// Default cap on open element nesting.
pub const DEFAULT_MAX_DEPTH: usize = 256;

const ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "blockquote", "br", "caption", "cite", "code", "col", "colgroup", "dd",
    "del", "div", "dl", "dt", "em", "figcaption", "figure", "h1", "h2", "h3", "h4", "h5", "h6",
    "hr", "i", "img", "ins", "kbd", "li", "mark", "ol", "p", "pre", "q", "s", "small", "span",
    "strike", "strong", "sub", "sup", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "u",
    "ul",
];

/// Elements removed together with everything inside them.
const STRIPPED_WITH_CONTENTS: &[&str] = &[
    "applet", "embed", "frame", "frameset", "head", "iframe", "math", "noembed", "noframes",
    "noscript", "object", "plaintext", "script", "select", "style", "svg", "template",
    "textarea", "title", "xmp",
];

const GLOBAL_ATTRIBUTES: &[&str] = &["class", "dir", "lang", "style", "title"];

const ELEMENT_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("a", &["href", "name", "rel", "target"]),
    ("blockquote", &["cite"]),
    ("col", &["span", "width"]),
    ("colgroup", &["span", "width"]),
    ("del", &["cite", "datetime"]),
    ("img", &["alt", "height", "src", "width"]),
    ("ins", &["cite", "datetime"]),
    ("li", &["value"]),
    ("ol", &["reversed", "start", "type"]),
    ("q", &["cite"]),
    ("table", &["border", "cellpadding", "cellspacing", "width"]),
    ("td", &["colspan", "headers", "rowspan", "width"]),
    ("th", &["colspan", "headers", "rowspan", "scope", "width"]),
];

const URL_ATTRIBUTES: &[&str] = &["cite", "href", "src"];

const URL_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

const LINK_TARGETS: &[&str] = &["_blank", "_self", "_parent", "_top"];

const STYLE_PROPERTIES: &[&str] = &[
    "background-color",
    "border",
    "border-bottom",
    "border-collapse",
    "border-color",
    "border-left",
    "border-right",
    "border-style",
    "border-top",
    "border-width",
    "color",
    "float",
    "font-family",
    "font-size",
    "font-style",
    "font-weight",
    "height",
    "line-height",
    "list-style-type",
    "margin",
    "margin-bottom",
    "margin-left",
    "margin-right",
    "margin-top",
    "max-width",
    "padding",
    "padding-bottom",
    "padding-left",
    "padding-right",
    "padding-top",
    "text-align",
    "text-decoration",
    "text-indent",
    "vertical-align",
    "white-space",
    "width",
];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

fn set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

/// The allow-list the preview renderer enforces.
#[derive(Debug, Clone)]
pub struct SanitizePolicy {
    elements: HashSet<String>,
    stripped: HashSet<String>,
    global_attributes: HashSet<String>,
    element_attributes: HashMap<String, HashSet<String>>,
    pub(crate) url_schemes: Vec<String>,
    pub(crate) data_image_subtypes: Vec<String>,
    pub(crate) style_properties: Vec<String>,
    pub(crate) max_input_bytes: usize,
    pub(crate) max_depth: usize,
}

impl Default for SanitizePolicy {
    fn default() -> Self {
        Self {
            elements: set(ELEMENTS),
            stripped: set(STRIPPED_WITH_CONTENTS),
            global_attributes: set(GLOBAL_ATTRIBUTES),
            element_attributes: ELEMENT_ATTRIBUTES
                .iter()
                .map(|(element, attributes)| ((*element).to_string(), set(attributes)))
                .collect(),
            url_schemes: owned(URL_SCHEMES),
            data_image_subtypes: Vec::new(),
            style_properties: owned(STYLE_PROPERTIES),
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl SanitizePolicy {
    /// Default allow-list with inline images accepted per the uploader policy.
    pub fn for_uploader(uploader: &UploaderPolicy) -> Self {
        Self::default().with_uploader(uploader)
    }

    /// Accept `data:` image URIs for the uploader's formats, or none when
    /// the uploader does not inline images.
    pub fn with_uploader(mut self, uploader: &UploaderPolicy) -> Self {
        self.data_image_subtypes.clear();
        if uploader.insert_image_as_base64_uri {
            for ext in &uploader.images_extensions {
                let subtype = image_subtype_for_extension(ext);
                if !self.data_image_subtypes.contains(&subtype) {
                    self.data_image_subtypes.push(subtype);
                }
            }
        }
        self
    }

    /// Drop every `style` attribute instead of filtering it.
    pub fn without_styles(mut self) -> Self {
        self.global_attributes.remove("style");
        self.style_properties.clear();
        self
    }

    /// Cap the input size accepted by the renderer.
    pub const fn with_max_input_bytes(mut self, limit: usize) -> Self {
        self.max_input_bytes = limit;
        self
    }

    /// Cap the nesting depth accepted by the renderer.
    pub const fn with_max_depth(mut self, limit: usize) -> Self {
        self.max_depth = limit;
        self
    }

    /// Remove an element from the allow-list; it will be unwrapped.
    pub fn deny_element(mut self, name: &str) -> Self {
        self.elements.remove(&name.to_ascii_lowercase());
        self
    }

    pub(crate) fn allows_element(&self, name: &str) -> bool {
        self.elements.contains(name)
    }

    pub(crate) fn strips_contents(&self, name: &str) -> bool {
        self.stripped.contains(name)
    }

    pub(crate) fn allows_attribute(&self, element: &str, attribute: &str) -> bool {
        if attribute.starts_with("on") {
            return false;
        }
        self.global_attributes.contains(attribute)
            || self
                .element_attributes
                .get(element)
                .is_some_and(|attributes| attributes.contains(attribute))
    }

    pub(crate) fn is_url_attribute(attribute: &str) -> bool {
        URL_ATTRIBUTES.contains(&attribute)
    }

    pub(crate) fn is_allowed_target(value: &str) -> bool {
        LINK_TARGETS.iter().any(|t| t.eq_ignore_ascii_case(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_handlers_are_never_allowed() {
        let policy = SanitizePolicy::default();
        assert!(!policy.allows_attribute("img", "onerror"));
        assert!(!policy.allows_attribute("a", "onclick"));
    }

    #[test]
    fn test_element_specific_attributes() {
        let policy = SanitizePolicy::default();
        assert!(policy.allows_attribute("a", "href"));
        assert!(!policy.allows_attribute("p", "href"));
        assert!(policy.allows_attribute("p", "title"));
    }

    #[test]
    fn test_uploader_formats_become_data_subtypes() {
        let policy = SanitizePolicy::for_uploader(&UploaderPolicy::default());
        assert_eq!(
            policy.data_image_subtypes,
            vec!["jpeg", "png", "gif", "svg+xml", "webp"]
        );
    }

    #[test]
    fn test_uploader_without_inlining_accepts_no_data_uris() {
        let uploader = UploaderPolicy {
            insert_image_as_base64_uri: false,
            ..UploaderPolicy::default()
        };
        assert!(SanitizePolicy::for_uploader(&uploader)
            .data_image_subtypes
            .is_empty());
    }

    #[test]
    fn test_without_styles_drops_style_attribute() {
        let policy = SanitizePolicy::default().without_styles();
        assert!(!policy.allows_attribute("p", "style"));
    }

    #[test]
    fn test_deny_element() {
        let policy = SanitizePolicy::default().deny_element("IMG");
        assert!(!policy.allows_element("img"));
        assert!(policy.allows_element("p"));
    }
}
