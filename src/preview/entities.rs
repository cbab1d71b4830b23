//! Character reference decoding and output escaping.

const MAX_HEX_DIGITS: usize = 6; // 0x10FFFF
const MAX_DEC_DIGITS: usize = 7; // 1114111

use super::entity_table::NAMED_REFERENCES;

/// Longest name in the table (`CounterClockwiseContourIntegral`).
const MAX_NAME_LEN: usize = 31;

/// Bounded scan to avoid quadratic behavior on adversarial input.
fn scan_numeric(bytes: &[u8], start: usize, max_digits: usize, is_hex: bool) -> Option<usize> {
    let mut j = start;
    let mut digits = 0usize;
    while j < bytes.len() {
        let b = bytes[j];
        if b == b';' {
            return (digits > 0).then_some(j);
        }
        if digits == max_digits {
            return None;
        }
        let ok = if is_hex {
            b.is_ascii_hexdigit()
        } else {
            b.is_ascii_digit()
        };
        if !ok {
            return None;
        }
        digits += 1;
        j += 1;
    }
    None
}

fn scan_named(s: &str, start: usize) -> Option<(usize, &'static str)> {
    let bytes = s.as_bytes();
    let mut j = start;
    while j < bytes.len() && j - start < MAX_NAME_LEN && bytes[j].is_ascii_alphanumeric() {
        j += 1;
    }
    if j == start || bytes.get(j) != Some(&b';') {
        return None;
    }
    let name = &s[start..j];
    NAMED_REFERENCES
        .binary_search_by(|(candidate, _)| (*candidate).cmp(name))
        .ok()
        .map(|index| (j, NAMED_REFERENCES[index].1))
}

/// A named reference can expand to two code points.
enum DecodedRef {
    Char(char),
    Named(&'static str),
}

/// Decode character references in `s`.
///
/// Numeric references decode only when semicolon-terminated and naming a
/// valid scalar value other than NUL. Named references decode when
/// semicolon-terminated and present in the HTML named reference table.
/// Anything else is left unchanged, so its `&` is escaped on output.
pub(crate) fn decode_entities(s: &str) -> String {
    let bytes = s.as_bytes();
    let Some(first) = memchr::memchr(b'&', bytes) else {
        return s.to_string();
    };
    let mut out = String::with_capacity(s.len());
    out.push_str(&s[..first]);
    let mut i = first;
    let mut copy_start = first;

    while i < bytes.len() {
        if bytes[i] != b'&' {
            i += 1;
            continue;
        }
        out.push_str(&s[copy_start..i]);

        let decoded = if bytes.get(i + 1) == Some(&b'#') {
            let is_hex = matches!(bytes.get(i + 2), Some(b'x' | b'X'));
            let digits_start = if is_hex { i + 3 } else { i + 2 };
            let max = if is_hex { MAX_HEX_DIGITS } else { MAX_DEC_DIGITS };
            scan_numeric(bytes, digits_start, max, is_hex).and_then(|end| {
                let digits = &s[digits_start..end];
                let radix = if is_hex { 16 } else { 10 };
                u32::from_str_radix(digits, radix)
                    .ok()
                    .filter(|&cp| cp != 0)
                    .and_then(char::from_u32)
                    .map(|ch| (end, DecodedRef::Char(ch)))
            })
        } else {
            scan_named(s, i + 1).map(|(end, text)| (end, DecodedRef::Named(text)))
        };

        if let Some((end, reference)) = decoded {
            match reference {
                DecodedRef::Char(ch) => out.push(ch),
                DecodedRef::Named(text) => out.push_str(text),
            }
            i = end + 1;
        } else {
            out.push('&');
            i += 1;
        }
        copy_start = i;
    }
    if copy_start < bytes.len() {
        out.push_str(&s[copy_start..]);
    }
    out
}

/// Escape text content for output between tags.
pub(crate) fn escape_text(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

/// Escape an attribute value for output inside double quotes.
pub(crate) fn escape_attribute(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escaped_text(s: &str) -> String {
        let mut out = String::new();
        escape_text(s, &mut out);
        out
    }

    #[test]
    fn decode_entities_preserves_utf8() {
        assert_eq!(decode_entities("120×32"), "120×32");
    }

    #[test]
    fn decode_entities_decodes_common_entities() {
        assert_eq!(decode_entities("a &amp; b"), "a & b");
        assert_eq!(decode_entities("&lt;tag&gt;"), "<tag>");
        assert_eq!(decode_entities("&copy; 2024"), "\u{00A9} 2024");
        assert_eq!(decode_entities("a&nbsp;b"), "a\u{00A0}b");
    }

    #[test]
    fn decode_entities_decodes_numeric_references() {
        assert_eq!(decode_entities("&#106;avascript"), "javascript");
        assert_eq!(decode_entities("&#x6A;&#X61;"), "ja");
        assert_eq!(decode_entities("&#58;"), ":");
    }

    #[test]
    fn decode_entities_knows_the_full_named_table() {
        assert_eq!(decode_entities("caf&eacute; &euro;5"), "caf\u{e9} \u{20AC}5");
        assert_eq!(decode_entities("&hearts;&Ocirc;&alpha;"), "\u{2665}\u{D4}\u{3B1}");
        assert_eq!(decode_entities("&NotEqualTilde;"), "\u{2242}\u{338}");
        assert_eq!(
            decode_entities("&CounterClockwiseContourIntegral;"),
            "\u{2233}"
        );
        assert_eq!(decode_entities("java&#115;cript&colon;x"), "javascript:x");
    }

    #[test]
    fn named_table_is_sorted_for_lookup() {
        assert!(
            NAMED_REFERENCES
                .windows(2)
                .all(|pair| pair[0].0 < pair[1].0)
        );
        assert!(NAMED_REFERENCES.iter().all(|(name, _)| name.len() <= MAX_NAME_LEN));
    }

    #[test]
    fn decode_entities_leaves_malformed_references() {
        assert_eq!(decode_entities("&;"), "&;");
        assert_eq!(decode_entities("&eacute"), "&eacute");
        assert_eq!(decode_entities("&unknown;"), "&unknown;");
        assert_eq!(decode_entities("&amp"), "&amp");
        assert_eq!(decode_entities("&#;"), "&#;");
        assert_eq!(decode_entities("&#x110000;"), "&#x110000;");
        assert_eq!(decode_entities("&#0;"), "&#0;");
        assert_eq!(decode_entities("&#12345678;"), "&#12345678;");
    }

    #[test]
    fn escape_text_round_trips_nbsp() {
        assert_eq!(escaped_text("a\u{00A0}<b>&"), "a&nbsp;&lt;b&gt;&amp;");
        assert_eq!(decode_entities(&escaped_text("x\u{00A0}y")), "x\u{00A0}y");
    }

    #[test]
    fn escape_attribute_quotes() {
        let mut out = String::new();
        escape_attribute(r#"a"b'c"#, &mut out);
        assert_eq!(out, "a&quot;b'c");
    }
}
