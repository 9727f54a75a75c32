//! Consumed parse capability.
//!
//! The markup grammar lives outside this crate; the loader only needs to
//! invoke a parse and interrogate the result for charset metadata.

/// Charset-bearing attributes of one `<meta>` element, in document order.
#[derive(Debug, Clone, Default)]
pub struct MetaCharsetHint {
    /// `content` attribute of a `meta[http-equiv=content-type]` element.
    pub http_equiv_content: Option<String>,
    /// Value of a bare `charset` attribute.
    pub charset_attr: Option<String>,
}

/// Read access to the charset metadata of a parsed document.
pub trait DocumentMeta {
    /// All charset-bearing `<meta>` elements, in document order.
    fn meta_charset_hints(&self) -> Vec<MetaCharsetHint>;

    /// `encoding` attribute of an XML declaration appearing as the
    /// document's first child node, if any.
    fn leading_xml_encoding(&self) -> Option<String>;
}

/// The external parse capability: decoded text in, document out.
///
/// Invoked at most twice per load (once speculatively, once
/// authoritatively). Markup parsers are error-tolerant, so parsing itself
/// is infallible at this boundary.
pub trait DocumentBuilder {
    type Document: DocumentMeta;

    fn parse(&mut self, text: &str, base_uri: &str) -> Self::Document;
}
