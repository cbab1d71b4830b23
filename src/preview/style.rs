//! Inline `style` attribute filtering.

/// Substrings that make a declaration value unsafe regardless of property.
const FORBIDDEN_VALUE_PARTS: &[&str] = &[
    "url(",
    "expression",
    "javascript:",
    "vbscript:",
    "\\",
    "<",
    "@import",
    "behavior",
    "-moz-binding",
    "/*",
];

/// Filter a `style` value declaration by declaration.
///
/// Returns `None` when no declaration survives. When every declaration is
/// kept the original text is returned unchanged; otherwise survivors are
/// re-joined as `prop: value;`.
pub(crate) fn filter_style(value: &str, allowed_properties: &[String]) -> Option<String> {
    let mut kept = Vec::new();
    let mut dropped = false;

    for declaration in value.split(';') {
        if declaration.trim().is_empty() {
            continue;
        }
        let Some((property, property_value)) = declaration.split_once(':') else {
            dropped = true;
            continue;
        };
        let property = property.trim().to_ascii_lowercase();
        let property_value = property_value.trim();
        let lowered = property_value.to_ascii_lowercase();

        let property_ok = allowed_properties.iter().any(|p| *p == property);
        let value_ok = !property_value.is_empty()
            && !FORBIDDEN_VALUE_PARTS.iter().any(|part| lowered.contains(part));
        if property_ok && value_ok {
            kept.push((property, property_value));
        } else {
            dropped = true;
        }
    }

    if kept.is_empty() {
        return None;
    }
    if !dropped {
        return Some(value.to_string());
    }
    let rebuilt: Vec<String> = kept
        .iter()
        .map(|(property, property_value)| format!("{property}: {property_value};"))
        .collect();
    Some(rebuilt.join(" "))
}
