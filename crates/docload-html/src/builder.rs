//! html5ever document builder
//!
//! Parses decoded text into RcDom and exposes the charset metadata the
//! resolver needs. Uses html5ever's built-in RcDom rather than a custom
//! TreeSink; the loader only inspects and serializes the tree.

use std::io::Write;

use html5ever::parse_document;
use html5ever::serialize::{SerializeOpts, serialize};
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

use docload::{Charset, DocumentBuilder, DocumentMeta, MetaCharsetHint};

/// HTML parse capability for the docload pipeline.
pub struct HtmlBuilder;

impl HtmlBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HtmlBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBuilder for HtmlBuilder {
    type Document = HtmlDocument;

    fn parse(&mut self, text: &str, base_uri: &str) -> HtmlDocument {
        tracing::debug!(base_uri, bytes = text.len(), "parsing HTML document");
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut text.as_bytes())
            .expect("reading from an in-memory slice cannot fail");
        HtmlDocument {
            dom,
            base_uri: base_uri.to_string(),
            output_charset: Charset::default(),
        }
    }
}

/// A parsed HTML document with its output charset.
pub struct HtmlDocument {
    dom: RcDom,
    base_uri: String,
    output_charset: Charset,
}

impl HtmlDocument {
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn output_charset(&self) -> Charset {
        self.output_charset
    }

    /// Record the charset the document was decoded with. Charsets that can
    /// read but not encode switch the output side to UTF-8.
    pub fn set_output_charset(&mut self, charset: Charset) {
        self.output_charset = if charset.can_encode() {
            charset
        } else {
            Charset::default()
        };
    }

    /// Serialize the whole document to markup.
    pub fn outer_html(&self) -> String {
        let mut out = Vec::new();
        self.serialize_to(&mut out);
        String::from_utf8(out).expect("serializer emits UTF-8")
    }

    /// Serialize and encode with the output charset.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.output_charset.encode(&self.outer_html())
    }

    fn serialize_to(&self, out: &mut impl Write) {
        let handle: SerializableHandle = self.dom.document.clone().into();
        serialize(out, &handle, SerializeOpts::default())
            .expect("serializing to an in-memory buffer cannot fail");
    }

    /// Concatenated text of the first element with the given tag name.
    pub fn element_text(&self, tag: &str) -> Option<String> {
        let element = find_element(&self.dom.document, tag)?;
        let mut text = String::new();
        collect_text(&element, &mut text);
        Some(text)
    }
}

impl DocumentMeta for HtmlDocument {
    fn meta_charset_hints(&self) -> Vec<MetaCharsetHint> {
        let mut hints = Vec::new();
        collect_meta_hints(&self.dom.document, &mut hints);
        hints
    }

    fn leading_xml_encoding(&self) -> Option<String> {
        let children = self.dom.document.children.borrow();
        let first = children.iter().find(|node| match &node.data {
            NodeData::Text { contents } => !contents.borrow().trim().is_empty(),
            _ => true,
        })?;
        match &first.data {
            // In HTML parsing an XML prolog surfaces as a bogus comment:
            // <!--?xml version="1.0" encoding="..."?-->
            NodeData::Comment { contents } => xml_declaration_encoding(contents),
            NodeData::ProcessingInstruction { target, contents } => {
                if target.as_ref().eq_ignore_ascii_case("xml") {
                    pseudo_attribute(contents, "encoding")
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

/// Document-order walk collecting `meta[http-equiv=content-type]` and
/// `meta[charset]` elements.
fn collect_meta_hints(handle: &Handle, hints: &mut Vec<MetaCharsetHint>) {
    if let NodeData::Element { name, attrs, .. } = &handle.data {
        if name.local.as_ref().eq_ignore_ascii_case("meta") {
            let mut content = None;
            let mut charset_attr = None;
            let mut is_content_type = false;
            for attr in attrs.borrow().iter() {
                let local = attr.name.local.as_ref();
                if local.eq_ignore_ascii_case("http-equiv") {
                    is_content_type = attr.value.trim().eq_ignore_ascii_case("content-type");
                } else if local.eq_ignore_ascii_case("content") {
                    content = Some(attr.value.to_string());
                } else if local.eq_ignore_ascii_case("charset") {
                    charset_attr = Some(attr.value.to_string());
                }
            }
            let http_equiv_content = if is_content_type { content } else { None };
            if http_equiv_content.is_some() || charset_attr.is_some() {
                hints.push(MetaCharsetHint {
                    http_equiv_content,
                    charset_attr,
                });
            }
        }
    }
    for child in handle.children.borrow().iter() {
        collect_meta_hints(child, hints);
    }
}

fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
    if let NodeData::Element { name, .. } = &handle.data {
        if name.local.as_ref().eq_ignore_ascii_case(tag) {
            return Some(handle.clone());
        }
    }
    for child in handle.children.borrow().iter() {
        if let Some(found) = find_element(child, tag) {
            return Some(found);
        }
    }
    None
}

fn collect_text(handle: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &handle.data {
        out.push_str(&contents.borrow());
    }
    for child in handle.children.borrow().iter() {
        collect_text(child, out);
    }
}

/// Extract the `encoding` pseudo-attribute from comment text shaped like an
/// XML declaration (`?xml version="1.0" encoding="..."?`).
fn xml_declaration_encoding(comment: &str) -> Option<String> {
    let trimmed = comment.trim();
    let body = trimmed.strip_prefix('?')?;
    let name_len = body.find(|c: char| c.is_whitespace()).unwrap_or(body.len());
    if !body[..name_len].eq_ignore_ascii_case("xml") {
        return None;
    }
    pseudo_attribute(body, "encoding")
}

/// `name=value` scan with optional single or double quoting.
fn pseudo_attribute(decl: &str, name: &str) -> Option<String> {
    let lower = decl.to_ascii_lowercase();
    let needle = format!("{name}=");
    let mut search = 0;
    while let Some(found) = lower[search..].find(&needle) {
        let at = search + found;
        search = at + needle.len();
        let preceded_by_name_char = at > 0 && lower.as_bytes()[at - 1].is_ascii_alphanumeric();
        if preceded_by_name_char {
            continue;
        }
        let rest = decl[at + needle.len()..].trim_start();
        let value = match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let rest = &rest[1..];
                let end = rest.find(quote).unwrap_or(rest.len());
                &rest[..end]
            }
            _ => {
                let end = rest
                    .find(|c: char| c.is_whitespace() || c == '?')
                    .unwrap_or(rest.len());
                &rest[..end]
            }
        };
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> HtmlDocument {
        HtmlBuilder::new().parse(html, "https://example.com/")
    }

    #[test]
    fn collects_meta_hints_in_document_order() {
        let doc = parse(
            "<html><head>\
             <meta http-equiv=\"Content-Type\" content=\"text/html; charset=euc-kr\">\
             <meta charset=\"utf-8\">\
             </head><body></body></html>",
        );
        let hints = doc.meta_charset_hints();
        assert_eq!(hints.len(), 2);
        assert_eq!(
            hints[0].http_equiv_content.as_deref(),
            Some("text/html; charset=euc-kr")
        );
        assert_eq!(hints[1].charset_attr.as_deref(), Some("utf-8"));
    }

    #[test]
    fn ignores_unrelated_meta_elements() {
        let doc = parse("<html><head><meta name=viewport content=foo></head></html>");
        assert!(doc.meta_charset_hints().is_empty());
    }

    #[test]
    fn http_equiv_match_is_case_insensitive() {
        let doc = parse("<meta HTTP-EQUIV=\"content-TYPE\" content=\"text/html; charset=utf-8\">");
        let hints = doc.meta_charset_hints();
        assert_eq!(hints.len(), 1);
        assert!(hints[0].http_equiv_content.is_some());
    }

    #[test]
    fn recognizes_xml_prolog_comment() {
        let doc = parse("<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><html></html>");
        assert_eq!(doc.leading_xml_encoding().as_deref(), Some("ISO-8859-1"));
    }

    #[test]
    fn xml_prolog_without_encoding_yields_nothing() {
        let doc = parse("<?xml version=\"1.0\"?><html></html>");
        assert_eq!(doc.leading_xml_encoding(), None);
    }

    #[test]
    fn ordinary_leading_comment_is_not_a_declaration() {
        let doc = parse("<!-- xml encoding=\"utf-8\" --><html></html>");
        assert_eq!(doc.leading_xml_encoding(), None);
    }

    #[test]
    fn pseudo_attribute_quoting_variants() {
        assert_eq!(
            pseudo_attribute("?xml encoding=\"utf-8\"?", "encoding").as_deref(),
            Some("utf-8")
        );
        assert_eq!(
            pseudo_attribute("?xml encoding='utf-8'?", "encoding").as_deref(),
            Some("utf-8")
        );
        assert_eq!(
            pseudo_attribute("?xml encoding=utf-8?", "encoding").as_deref(),
            Some("utf-8")
        );
        // Suffix of another name must not match.
        assert_eq!(pseudo_attribute("?xml xencoding='x'?", "encoding"), None);
    }

    #[test]
    fn element_text_finds_nested_text() {
        let doc = parse("<html><head><title>One</title></head><body>Two</body></html>");
        assert_eq!(doc.element_text("title").as_deref(), Some("One"));
        assert_eq!(doc.element_text("body").as_deref(), Some("Two"));
        assert_eq!(doc.element_text("table"), None);
    }

    #[test]
    fn serialization_preserves_meta_markup() {
        let doc = parse("<html><head><meta charset=iso-8></head><body></body></html>");
        let html = doc.outer_html();
        assert!(html.contains("<meta charset=\"iso-8\">"), "{html}");
    }
}
