use std::rc::Rc;

use jotpad::content::ContentState;
use jotpad::editor::{ConfigCache, EditorConfiguration};
use jotpad::preview::{PreviewRenderer, SanitizeError, SanitizePolicy, render};

#[test]
fn test_initialized_content_is_current() {
    let state = ContentState::initialize("Hello");
    assert_eq!(state.current(), "Hello");
}

#[test]
fn test_change_replaces_content() {
    let mut state = ContentState::initialize("Hello");
    state.on_change("<p>World</p>");
    assert_eq!(state.current(), "<p>World</p>");
}

#[test]
fn test_script_never_reaches_preview() {
    let markup = render("<script>alert(1)</script>");
    assert!(!markup.as_str().to_ascii_lowercase().contains("<script"));
    assert!(!markup.as_str().contains("alert(1)"));
}

#[test]
fn test_plain_formatting_renders_verbatim() {
    assert_eq!(render("<b>bold</b>").as_str(), "<b>bold</b>");
}

#[test]
fn test_configuration_identity_is_stable_without_dependency_change() {
    let mut cache = ConfigCache::new();
    let no_dependencies: &[&str] = &[];
    let first = cache.get_or_init(no_dependencies, EditorConfiguration::default);
    let second = cache.get_or_init(no_dependencies, EditorConfiguration::default);
    assert!(Rc::ptr_eq(&first, &second));
}

#[test]
fn test_typical_editor_output_survives() {
    let html = concat!(
        "<h2>Notes</h2>",
        "<p>Some <strong>bold</strong> and <em>italic</em> text, ",
        r#"a <a href="https://example.com" target="_blank">link</a>.</p>"#,
        "<ul><li>one</li><li>two</li></ul>",
        r#"<p style="text-align: center">centered</p>"#,
    );
    assert_eq!(render(html).as_str(), html);
}

#[test]
fn test_hostile_markup_is_neutralized() {
    let html = concat!(
        r#"<img src="x" onerror="alert(1)">"#,
        r#"<a href="jav&#x61;script:alert(1)">click</a>"#,
        r#"<iframe src="https://evil.example"></iframe>"#,
        r#"<p style="background: url(javascript:alert(1))">styled</p>"#,
        "<svg><script>alert(1)</script></svg>",
    );
    let out = render(html);
    let lower = out.as_str().to_ascii_lowercase();
    assert!(!lower.contains("onerror"));
    assert!(!lower.contains("javascript"));
    assert!(!lower.contains("<iframe"));
    assert!(!lower.contains("<script"));
    assert!(!lower.contains("<svg"));
    assert!(lower.contains("click"));
    assert!(lower.contains("styled"));
}

#[test]
fn test_strict_renderer_reports_limits() {
    let renderer = PreviewRenderer::new(SanitizePolicy::default().with_max_input_bytes(8));
    assert_eq!(
        renderer.try_render("<p>too long</p>").unwrap_err(),
        SanitizeError::InputTooLarge { len: 15, limit: 8 }
    );
    let fallback = renderer.render("<p>too long</p>");
    assert!(fallback.is_fallback());
    assert!(fallback.is_empty());
}
