//! Forgiving HTML tokenizer for editor output.
//!
//! Tag and attribute names are restricted to ASCII `[A-Za-z0-9:_-]` and are
//! lowercased. Anything the tokenizer cannot classify becomes text or is
//! dropped as a bogus comment; the sanitizer re-serializes every token, so
//! no input byte reaches the output without being re-escaped.
//!
//! Raw text elements (`script`, `style`, `textarea`, ...) swallow everything
//! up to their matching close tag, the way a browser would.
use memchr::memchr;

use super::entities::decode_entities;

/// One lexical unit of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Text(String),
    StartTag {
        name: String,
        attributes: Vec<(String, Option<String>)>,
    },
    EndTag(String),
    Comment(String),
    Doctype(String),
}

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";

pub(crate) fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "frame"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_rawtext_element(name: &str) -> bool {
    matches!(
        name,
        "script"
            | "style"
            | "textarea"
            | "title"
            | "xmp"
            | "iframe"
            | "noembed"
            | "noframes"
            | "noscript"
            | "plaintext"
    )
}

const fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'-' || c == b'_' || c == b':'
}

fn starts_with_ignore_ascii_case_at(haystack: &[u8], start: usize, needle: &[u8]) -> bool {
    haystack.len() >= start + needle.len()
        && haystack[start..start + needle.len()].eq_ignore_ascii_case(needle)
}

/// Find `</name` followed by optional ASCII whitespace and `>`.
///
/// Returns `(start_of_close_tag, end_after_gt)` relative to `haystack`.
fn find_rawtext_close_tag(haystack: &str, name: &str) -> Option<(usize, usize)> {
    let bytes = haystack.as_bytes();
    let len = bytes.len();
    let n = name.len() + 2;
    let mut i = 0;
    while i + n <= len {
        let rel = memchr(b'<', &bytes[i..])?;
        i += rel;
        if i + n > len {
            return None;
        }
        if bytes[i + 1] == b'/' && starts_with_ignore_ascii_case_at(bytes, i + 2, name.as_bytes())
        {
            let mut k = i + n;
            while k < len && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < len && bytes[k] == b'>' {
                return Some((i, k + 1));
            }
        }
        i += 1;
    }
    None
}

/// Skip to just past the next `>` starting at `from`, or to the end.
fn skip_past_gt(bytes: &[u8], from: usize) -> usize {
    memchr(b'>', &bytes[from..]).map_or(bytes.len(), |rel| from + rel + 1)
}

struct TagScan {
    attributes: Vec<(String, Option<String>)>,
    end: usize,
}

/// Parse attributes from `k` up to and including the closing `>`.
fn scan_attributes(input: &str, mut k: usize) -> TagScan {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut attributes = Vec::new();

    let skip_whitespace = |k: &mut usize| {
        while *k < len && bytes[*k].is_ascii_whitespace() {
            *k += 1;
        }
    };

    loop {
        skip_whitespace(&mut k);
        if k >= len {
            break;
        }
        if bytes[k] == b'>' {
            k += 1;
            break;
        }
        if bytes[k] == b'/' {
            if k + 1 < len && bytes[k + 1] == b'>' {
                k += 2;
                break;
            }
            k += 1;
            continue;
        }
        let name_start = k;
        while k < len && is_name_char(bytes[k]) {
            k += 1;
        }
        if name_start == k {
            // Not a name character: skip it (a browser would fold it into the
            // name, which the allow-list rejects anyway).
            k += input[k..].chars().next().map_or(1, char::len_utf8);
            continue;
        }
        let attribute_name = input[name_start..k].to_ascii_lowercase();

        skip_whitespace(&mut k);
        let value = if k < len && bytes[k] == b'=' {
            k += 1;
            skip_whitespace(&mut k);
            if k < len && (bytes[k] == b'"' || bytes[k] == b'\'') {
                let quote = bytes[k];
                k += 1;
                let vstart = k;
                k = memchr(quote, &bytes[k..]).map_or(len, |rel| k + rel);
                let raw = &input[vstart..k];
                if k < len {
                    k += 1;
                }
                Some(decode_entities(raw))
            } else {
                let vstart = k;
                while k < len && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                    k += 1;
                }
                Some(decode_entities(&input[vstart..k]))
            }
        } else {
            None
        };
        attributes.push((attribute_name, value));
    }

    TagScan { attributes, end: k }
}

/// Split `input` into tokens.
pub(crate) fn tokenize(input: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut text_start = 0;
    let mut i = 0;

    // Slice endpoints are only ever placed at ASCII structural bytes or after
    // ASCII-only runs, so they stay on UTF-8 boundaries.
    let flush_text = |out: &mut Vec<Token>, from: usize, to: usize| {
        if from < to {
            let decoded = decode_entities(&input[from..to]);
            if !decoded.is_empty() {
                out.push(Token::Text(decoded));
            }
        }
    };

    while i < len {
        let Some(rel) = memchr(b'<', &bytes[i..]) else {
            break;
        };
        i += rel;
        let next = bytes.get(i + 1).copied();

        match next {
            Some(b'!') if input[i..].starts_with(COMMENT_START) => {
                flush_text(&mut out, text_start, i);
                let body_start = i + COMMENT_START.len();
                // `<!-->` and `<!--->` are complete empty comments.
                let abrupt_close = [">", "->"]
                    .into_iter()
                    .find(|close| input[body_start..].starts_with(close));
                if let Some(close) = abrupt_close {
                    out.push(Token::Comment(String::new()));
                    i = body_start + close.len();
                } else if let Some(end) = input[body_start..].find(COMMENT_END) {
                    out.push(Token::Comment(input[body_start..body_start + end].to_string()));
                    i = body_start + end + COMMENT_END.len();
                } else {
                    out.push(Token::Comment(input[body_start..].to_string()));
                    i = len;
                }
            }
            Some(b'!') if starts_with_ignore_ascii_case_at(bytes, i, b"<!doctype") => {
                flush_text(&mut out, text_start, i);
                let end = skip_past_gt(bytes, i);
                let inner = input[i + 2..end].trim_end_matches('>').trim();
                out.push(Token::Doctype(inner.to_string()));
                i = end;
            }
            Some(b'!' | b'?') => {
                // Bogus comment: `<!x ...>` or `<?php ...>`.
                flush_text(&mut out, text_start, i);
                let end = skip_past_gt(bytes, i);
                out.push(Token::Comment(
                    input[i + 2..end].trim_end_matches('>').to_string(),
                ));
                i = end;
            }
            Some(b'/') => {
                let name_start = i + 2;
                if bytes.get(name_start).is_some_and(u8::is_ascii_alphabetic) {
                    flush_text(&mut out, text_start, i);
                    let mut j = name_start;
                    while j < len && is_name_char(bytes[j]) {
                        j += 1;
                    }
                    let name = input[name_start..j].to_ascii_lowercase();
                    out.push(Token::EndTag(name));
                    i = skip_past_gt(bytes, j);
                } else {
                    // `</>` and `</ ...>` are dropped.
                    flush_text(&mut out, text_start, i);
                    i = skip_past_gt(bytes, i);
                }
            }
            Some(c) if c.is_ascii_alphabetic() => {
                flush_text(&mut out, text_start, i);
                let name_start = i + 1;
                let mut j = name_start;
                while j < len && is_name_char(bytes[j]) {
                    j += 1;
                }
                let name = input[name_start..j].to_ascii_lowercase();
                let scan = scan_attributes(input, j);
                i = scan.end;

                let rawtext = is_rawtext_element(&name);
                out.push(Token::StartTag {
                    name: name.clone(),
                    attributes: scan.attributes,
                });

                if rawtext {
                    // Browsers ignore `/>` on these, so the body is raw text
                    // either way.
                    let body = &input[i..];
                    let close = if name == "plaintext" {
                        None
                    } else {
                        find_rawtext_close_tag(body, &name)
                    };
                    if let Some((rel_start, rel_end)) = close {
                        if rel_start > 0 {
                            out.push(Token::Text(body[..rel_start].to_string()));
                        }
                        i += rel_end;
                    } else {
                        if !body.is_empty() {
                            out.push(Token::Text(body.to_string()));
                        }
                        i = len;
                    }
                    out.push(Token::EndTag(name));
                }
            }
            _ => {
                // A lone `<` is text.
                i += 1;
                continue;
            }
        }
        text_start = i;
    }
    flush_text(&mut out, text_start, len);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(name: &str, attributes: &[(&str, Option<&str>)]) -> Token {
        Token::StartTag {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(n, v)| ((*n).to_string(), v.map(str::to_string)))
                .collect(),
        }
    }

    fn text(s: &str) -> Token {
        Token::Text(s.to_string())
    }

    fn end(name: &str) -> Token {
        Token::EndTag(name.to_string())
    }

    #[test]
    fn tokenize_simple_element() {
        assert_eq!(
            tokenize("<b>bold</b>"),
            vec![start("b", &[]), text("bold"), end("b")]
        );
    }

    #[test]
    fn tokenize_lowercases_names_and_decodes_attributes() {
        assert_eq!(
            tokenize(r#"<A HREF="a&amp;b" data-x='1' checked>"#),
            vec![start(
                "a",
                &[("href", Some("a&b")), ("data-x", Some("1")), ("checked", None)],
            )]
        );
    }

    #[test]
    fn tokenize_unquoted_attribute_values() {
        assert_eq!(
            tokenize("<img src=x onerror=alert(1)>"),
            vec![start(
                "img",
                &[("src", Some("x")), ("onerror", Some("alert(1)"))],
            )]
        );
    }

    #[test]
    fn tokenize_slash_separated_attributes() {
        assert_eq!(
            tokenize("<img/src=x/onerror=y>"),
            vec![start("img", &[("src", Some("x/onerror=y"))])]
        );
    }

    #[test]
    fn tokenize_script_body_is_raw_text() {
        assert_eq!(
            tokenize("<script>if (a < b) { x('</p>') }</ScRiPt >after"),
            vec![
                start("script", &[]),
                text("if (a < b) { x('</p>') }"),
                end("script"),
                text("after"),
            ]
        );
    }

    #[test]
    fn tokenize_self_closing_script_still_swallows_body() {
        assert_eq!(
            tokenize("<script/>alert(1)</script>"),
            vec![start("script", &[]), text("alert(1)"), end("script")]
        );
    }

    #[test]
    fn tokenize_unterminated_rawtext_runs_to_end() {
        assert_eq!(
            tokenize("<style>body{}"),
            vec![start("style", &[]), text("body{}"), end("style")]
        );
    }

    #[test]
    fn tokenize_comments_and_doctype() {
        assert_eq!(
            tokenize("<!DOCTYPE html><!-- hi -->x<?php echo 1 ?>"),
            vec![
                Token::Doctype("DOCTYPE html".to_string()),
                Token::Comment(" hi ".to_string()),
                text("x"),
                Token::Comment("php echo 1 ?".to_string()),
            ]
        );
    }

    #[test]
    fn tokenize_unterminated_comment_swallows_rest() {
        assert_eq!(
            tokenize("a<!-- <script>"),
            vec![text("a"), Token::Comment(" <script>".to_string())]
        );
    }

    #[test]
    fn tokenize_abruptly_closed_empty_comments() {
        assert_eq!(
            tokenize("<!--><p>hello</p><!--->x<!---->y"),
            vec![
                Token::Comment(String::new()),
                start("p", &[]),
                text("hello"),
                end("p"),
                Token::Comment(String::new()),
                text("x"),
                Token::Comment(String::new()),
                text("y"),
            ]
        );
    }

    #[test]
    fn tokenize_lone_angle_brackets_are_text() {
        assert_eq!(
            tokenize("1 < 2 &amp;&amp; 3 > 2"),
            vec![text("1 < 2 && 3 > 2")]
        );
    }

    #[test]
    fn tokenize_preserves_utf8_text() {
        assert_eq!(
            tokenize("¡Hola <b>café</b> 😊"),
            vec![
                text("¡Hola "),
                start("b", &[]),
                text("café"),
                end("b"),
                text(" 😊"),
            ]
        );
    }

    #[test]
    fn tokenize_non_ascii_inside_tag_does_not_split_chars() {
        let tokens = tokenize("<p é title=\"ü\">x</p>");
        assert_eq!(tokens[0], start("p", &[("title", Some("ü"))]));
    }

    #[test]
    fn tokenize_empty_end_tag_is_dropped() {
        assert_eq!(tokenize("a</>b"), vec![text("a"), text("b")]);
    }
}
