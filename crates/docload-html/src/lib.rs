//! docload HTML backend
//!
//! Implements the docload parse capability with html5ever, and provides
//! convenience entry points for loading HTML byte streams.

mod builder;

pub use builder::{HtmlBuilder, HtmlDocument};

use std::io::Read;

use docload::{LoadError, LoadStepper, load_capped, load_progressive};

/// Load an HTML document from `source`, detecting the charset from BOM or
/// metadata unless `charset_name` declares one.
pub fn load_html<R: Read>(
    source: R,
    base_uri: &str,
    charset_name: Option<&str>,
) -> Result<HtmlDocument, LoadError> {
    load_html_capped(source, base_uri, charset_name, 0)
}

/// As [`load_html`], reading at most `max_size` bytes (0 = unbounded).
pub fn load_html_capped<R: Read>(
    source: R,
    base_uri: &str,
    charset_name: Option<&str>,
    max_size: usize,
) -> Result<HtmlDocument, LoadError> {
    let mut builder = HtmlBuilder::new();
    let loaded = load_capped(source, base_uri, charset_name, max_size, &mut builder)?;
    let mut document = loaded.document;
    document.set_output_charset(loaded.charset);
    Ok(document)
}

/// Progressive variant: detection runs up front, decoding is caller-driven.
pub fn stream_html<R: Read>(
    source: R,
    base_uri: &str,
    charset_name: Option<&str>,
    max_size: usize,
) -> Result<LoadStepper<R, HtmlBuilder>, LoadError> {
    load_progressive(source, base_uri, charset_name, max_size, HtmlBuilder::new())
}
