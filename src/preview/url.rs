//! URL attribute checks.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Scheme of `value`, lowercased, ignoring control characters and
/// whitespace the way browsers do. `None` for relative URLs.
fn scheme_of(value: &str) -> Option<String> {
    let mut scheme = String::new();
    for ch in value.chars() {
        if ch.is_ascii_control() || ch.is_whitespace() {
            continue;
        }
        match ch {
            ':' => return (!scheme.is_empty()).then_some(scheme),
            '/' | '?' | '#' => return None,
            _ => scheme.push(ch.to_ascii_lowercase()),
        }
    }
    None
}

/// Whether a link-like URL may be kept.
pub(crate) fn is_allowed_url(value: &str, schemes: &[String]) -> bool {
    scheme_of(value).is_none_or(|scheme| schemes.iter().any(|allowed| *allowed == scheme))
}

/// Whether `value` is a `data:image/<subtype>;base64,<payload>` URI with an
/// accepted subtype and a payload that decodes.
pub(crate) fn is_allowed_image_data_uri(value: &str, subtypes: &[String]) -> bool {
    let trimmed = value.trim();
    let Some(rest) = strip_prefix_ignore_ascii_case(trimmed, "data:image/") else {
        return false;
    };
    let Some((header, payload)) = rest.split_once(',') else {
        return false;
    };
    let mut params = header.split(';');
    let subtype = params.next().unwrap_or_default();
    if !subtypes.iter().any(|s| s.eq_ignore_ascii_case(subtype)) {
        return false;
    }
    if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
        return false;
    }
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    !compact.is_empty() && STANDARD.decode(compact.as_bytes()).is_ok()
}

fn strip_prefix_ignore_ascii_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

/// MIME image subtype for an uploader file extension.
pub(crate) fn image_subtype_for_extension(ext: &str) -> String {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "jpeg".to_string(),
        "svg" => "svg+xml".to_string(),
        "tif" | "tiff" => "tiff".to_string(),
        "ico" => "x-icon".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schemes() -> Vec<String> {
        vec!["http".into(), "https".into(), "mailto".into()]
    }

    #[test]
    fn test_relative_urls_are_allowed() {
        assert!(is_allowed_url("/docs/page", &schemes()));
        assert!(is_allowed_url("page.html?x=a:b", &schemes()));
        assert!(is_allowed_url("#top", &schemes()));
        assert!(is_allowed_url("", &schemes()));
    }

    #[test]
    fn test_listed_schemes_are_allowed() {
        assert!(is_allowed_url("https://example.com", &schemes()));
        assert!(is_allowed_url("MAILTO:me@example.com", &schemes()));
    }

    #[test]
    fn test_script_schemes_are_rejected_even_when_obfuscated() {
        assert!(!is_allowed_url("javascript:alert(1)", &schemes()));
        assert!(!is_allowed_url(" JaVaScRiPt:alert(1)", &schemes()));
        assert!(!is_allowed_url("java\tscript:alert(1)", &schemes()));
        assert!(!is_allowed_url("\u{1}javascript:alert(1)", &schemes()));
        assert!(!is_allowed_url("vbscript:msgbox", &schemes()));
        assert!(!is_allowed_url("data:text/html,<script>", &schemes()));
    }

    #[test]
    fn test_image_data_uri_requires_accepted_subtype_and_base64() {
        let subtypes = vec!["png".to_string(), "jpeg".to_string()];
        assert!(is_allowed_image_data_uri(
            "data:image/png;base64,iVBORw0KGgo=",
            &subtypes
        ));
        assert!(is_allowed_image_data_uri(
            "DATA:image/JPEG;base64,/9j/4AAQ",
            &subtypes
        ));
        assert!(!is_allowed_image_data_uri(
            "data:image/gif;base64,R0lGODlh",
            &subtypes
        ));
        assert!(!is_allowed_image_data_uri("data:image/png,rawbytes", &subtypes));
        assert!(!is_allowed_image_data_uri(
            "data:image/png;base64,not base64!",
            &subtypes
        ));
        assert!(!is_allowed_image_data_uri("data:text/html;base64,PHA+", &subtypes));
    }

    #[test]
    fn test_subtype_mapping() {
        assert_eq!(image_subtype_for_extension("JPG"), "jpeg");
        assert_eq!(image_subtype_for_extension("svg"), "svg+xml");
        assert_eq!(image_subtype_for_extension("webp"), "webp");
    }
}
