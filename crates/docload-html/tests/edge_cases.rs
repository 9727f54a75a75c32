//! Edge case tests for HTML loading
//!
//! Boundary behavior: BOM consumption, declared-charset validation, the
//! sniff window, and size caps.

use std::io::Cursor;

use docload::{LoadError, SNIFF_BUFFER_SIZE};
use docload_html::{load_html, load_html_capped};

// ============================================================================
// BOM CONSUMPTION
// ============================================================================

#[test]
fn bom_bytes_never_leak_into_the_document() {
    let html = "<html><head><title>T</title></head><body></body></html>";
    let utf16be: Vec<u8> = html.encode_utf16().flat_map(|u| u.to_be_bytes()).collect();

    let mut with_utf8_bom = vec![0xEF, 0xBB, 0xBF];
    with_utf8_bom.extend_from_slice(html.as_bytes());
    let mut with_utf16_bom = vec![0xFE, 0xFF];
    with_utf16_bom.extend_from_slice(&utf16be);

    for bytes in [with_utf8_bom, with_utf16_bom] {
        let doc = load_html(Cursor::new(bytes), "https://example.com/", None).unwrap();
        let markup = doc.outer_html();
        assert!(!markup.contains('\u{FEFF}'), "{markup}");
        assert!(!markup.contains('\u{FFFD}'), "{markup}");
        assert_eq!(doc.element_text("title").as_deref(), Some("T"));
    }
}

#[test]
fn utf32_decodes_astral_characters() {
    let html = "<html><body>\u{1F600}</body></html>";
    let mut bytes = vec![0xFF, 0xFE, 0x00, 0x00];
    bytes.extend(html.chars().flat_map(|c| (c as u32).to_le_bytes()));
    let doc = load_html(Cursor::new(bytes), "https://example.com/", None).unwrap();
    assert_eq!(doc.element_text("body").as_deref(), Some("\u{1F600}"));
}

// ============================================================================
// DECLARED CHARSET VALIDATION
// ============================================================================

#[test]
fn blank_declared_charset_is_rejected() {
    let err = load_html(
        Cursor::new(b"<html></html>".to_vec()),
        "https://example.com/",
        Some("   "),
    )
    .err()
    .expect("blank charset must fail");
    assert!(matches!(err, LoadError::BlankCharset));
}

#[test]
fn unknown_declared_charset_is_rejected() {
    let err = load_html(
        Cursor::new(b"<html></html>".to_vec()),
        "https://example.com/",
        Some("not-a-charset"),
    )
    .err()
    .expect("unknown charset must fail");
    match err {
        LoadError::UnsupportedCharset(name) => assert_eq!(name, "not-a-charset"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn declared_charset_name_is_trimmed() {
    let doc = load_html(
        Cursor::new(b"<html><body>ok</body></html>".to_vec()),
        "https://example.com/",
        Some("  UTF-8  "),
    )
    .unwrap();
    assert_eq!(doc.element_text("body").as_deref(), Some("ok"));
}

// ============================================================================
// SNIFF WINDOW AND SIZE CAPS
// ============================================================================

#[test]
fn meta_beyond_the_sniff_window_is_not_seen() {
    // Push the meta element past the speculative-parse prefix; detection
    // cannot see it and keeps the default charset.
    let mut html = String::from("<html><head><!--");
    html.push_str(&"x".repeat(SNIFF_BUFFER_SIZE + 1000));
    html.push_str("--><meta charset=windows-1251></head><body>abc</body></html>");

    let doc = load_html(
        Cursor::new(html.into_bytes()),
        "https://example.com/",
        None,
    )
    .unwrap();
    assert_eq!(doc.output_charset().name(), "UTF-8");
    assert_eq!(doc.element_text("body").as_deref(), Some("abc"));
}

#[test]
fn size_cap_truncates_the_body() {
    let mut html = String::from("<html><body>");
    html.push_str(&"y".repeat(10_000));
    html.push_str("</body></html>");

    let doc = load_html_capped(
        Cursor::new(html.into_bytes()),
        "https://example.com/",
        Some("utf-8"),
        64,
    )
    .unwrap();
    let body = doc.element_text("body").unwrap_or_default();
    assert!(body.len() < 100, "cap must truncate, got {}", body.len());
}
