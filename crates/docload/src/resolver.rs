//! Charset resolution
//!
//! BOM sniffing, the speculative UTF-8 parse, metadata scanning, and the
//! keep-or-redecode decision.

use std::io::Read;

use docload_io::{BoundedRewindableStream, read_fully};

use crate::charset::Charset;
use crate::document::{DocumentBuilder, DocumentMeta};
use crate::error::LoadError;

/// Ceiling granted to the speculative metadata-sniffing parse.
pub const SNIFF_BUFFER_SIZE: usize = 5 * 1024;

const DEFAULT_CHARSET_NAME: &str = "UTF-8";

/// Outcome of charset detection.
#[derive(Debug)]
pub enum DetectOutcome<D> {
    /// The speculative parse is trusted as final; no second pass needed.
    Resolved(D),
    /// The stream must be decoded (again) with the resolved charset.
    NeedsDecode,
}

/// Result of [`detect`]: the authoritative charset, whether a document was
/// kept, and the stream handle for any required second pass.
#[derive(Debug)]
pub struct CharsetDecision<R: Read, D> {
    pub charset: Charset,
    pub outcome: DetectOutcome<D>,
    pub stream: BoundedRewindableStream<R>,
}

/// Determine the authoritative encoding for `stream`.
///
/// Priority: a BOM always wins; otherwise a declared name is adopted as-is;
/// otherwise a bounded speculative UTF-8 parse inspects in-document
/// metadata. When the speculative parse read the entire source and found no
/// overriding charset, it is kept as the final document (unless
/// `keep_document` is false, as in a progressive session that always
/// redecodes).
pub fn detect<R: Read, B: DocumentBuilder>(
    mut stream: BoundedRewindableStream<R>,
    base_uri: &str,
    declared: Option<&str>,
    builder: &mut B,
    keep_document: bool,
) -> Result<CharsetDecision<R, B::Document>, LoadError> {
    let mut charset = sniff_bom(&mut stream)?;
    let mut document = None;

    if charset.is_none() {
        match declared {
            Some(name) => {
                if name.trim().is_empty() {
                    return Err(LoadError::BlankCharset);
                }
                let resolved = Charset::for_name(name)
                    .ok_or_else(|| LoadError::UnsupportedCharset(name.to_string()))?;
                charset = Some(resolved);
            }
            None => {
                let doc = speculative_parse(&mut stream, base_uri, builder)?;

                let found = scan_meta_hints(&doc).or_else(|| doc.leading_xml_encoding());
                match found.as_deref().and_then(validate_charset) {
                    Some(name) if !name.eq_ignore_ascii_case(DEFAULT_CHARSET_NAME) => {
                        tracing::debug!(charset = %name, "metadata overrides default; re-decoding");
                        charset = Charset::for_name(&name);
                    }
                    _ => {
                        if stream.source_fully_consumed() && keep_document {
                            tracing::debug!("speculative parse drained the source; keeping it");
                            document = Some(doc);
                            stream.close();
                        }
                        // Otherwise only a prefix was parsed: discard and
                        // decode the full stream with the default charset.
                    }
                }
            }
        }
    }

    // Never overridden: use the canonical default instance directly.
    let charset = charset.unwrap_or_default();
    let outcome = match document {
        Some(doc) => DetectOutcome::Resolved(doc),
        None => DetectOutcome::NeedsDecode,
    };
    Ok(CharsetDecision {
        charset,
        outcome,
        stream,
    })
}

/// Parse a bounded prefix as UTF-8 to expose charset metadata, then rewind.
///
/// The stream is protected from teardown for the duration: the parse may be
/// discarded and the same handle decoded again.
fn speculative_parse<R: Read, B: DocumentBuilder>(
    stream: &mut BoundedRewindableStream<R>,
    base_uri: &str,
    builder: &mut B,
) -> Result<B::Document, LoadError> {
    let orig_max = stream.max();
    stream.set_max(SNIFF_BUFFER_SIZE);
    stream.mark(SNIFF_BUFFER_SIZE)?;
    stream.allow_close(false);

    let result = (|| {
        let pool = stream.pool().clone();
        let prefix = read_fully(stream, SNIFF_BUFFER_SIZE, &pool)?;
        let text = String::from_utf8_lossy(&prefix);
        let doc = builder.parse(&text, base_uri);
        stream.reset()?;
        stream.set_max(orig_max);
        Ok(doc)
    })();

    stream.allow_close(true);
    result
}

/// First meta element yielding a charset candidate wins; an element with a
/// bare `charset` attribute stops the scan even if its value later fails
/// validation.
fn scan_meta_hints<D: DocumentMeta>(doc: &D) -> Option<String> {
    for hint in doc.meta_charset_hints() {
        let mut found = hint
            .http_equiv_content
            .as_deref()
            .and_then(charset_from_content_type);
        if found.is_none() {
            found = hint.charset_attr;
        }
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Pull a validated charset name out of a content-type value, e.g.
/// `text/html; charset=EUC-JP`.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    let token = extract_charset_token(content_type)?;
    validate_charset(&token)
}

/// Locate the `charset=` token: case-insensitive, tolerant of quoting and
/// of a duplicated `charset=charset=x`; a comma-separated list yields its
/// first entry.
fn extract_charset_token(content_type: &str) -> Option<String> {
    let lower = content_type.to_ascii_lowercase();
    let start = lower.find("charset=")? + "charset=".len();
    let rest = content_type[start..].trim_start();
    let rest = rest
        .strip_prefix('"')
        .or_else(|| rest.strip_prefix('\''))
        .unwrap_or(rest);
    let end = rest
        .find(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '"' | '\''))
        .unwrap_or(rest.len());
    let token = rest[..end].replace("charset=", "");
    if token.is_empty() { None } else { Some(token) }
}

/// Trim, strip quote characters, and accept only registry-recognized names.
/// Failures are swallowed: the caller falls back to the default.
fn validate_charset(name: &str) -> Option<String> {
    let cleaned: String = name
        .trim()
        .chars()
        .filter(|c| !matches!(c, '"' | '\''))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Charset::for_name(&cleaned).map(|_| cleaned)
}

/// Inspect up to four leading bytes for a BOM, consuming exactly the
/// matched length. 32-bit patterns are checked before their 16-bit
/// prefixes.
fn sniff_bom<R: Read>(
    stream: &mut BoundedRewindableStream<R>,
) -> Result<Option<Charset>, LoadError> {
    let mut bom = [0u8; 4];
    stream.mark(bom.len())?;
    let got = read_at_most(stream, &mut bom)?;
    stream.reset()?;

    let matched = if got >= 4 && bom == [0x00, 0x00, 0xFE, 0xFF] {
        Some((Charset::Utf32Be, 4))
    } else if got >= 4 && bom == [0xFF, 0xFE, 0x00, 0x00] {
        Some((Charset::Utf32Le, 4))
    } else if got >= 2 && bom[0] == 0xFE && bom[1] == 0xFF {
        Some((Charset::Whatwg(encoding_rs::UTF_16BE), 2))
    } else if got >= 2 && bom[0] == 0xFF && bom[1] == 0xFE {
        Some((Charset::Whatwg(encoding_rs::UTF_16LE), 2))
    } else if got >= 3 && bom[..3] == [0xEF, 0xBB, 0xBF] {
        Some((Charset::default(), 3))
    } else {
        None
    };

    match matched {
        Some((charset, len)) => {
            let mut skip = [0u8; 4];
            read_at_most(stream, &mut skip[..len])?;
            tracing::debug!(charset = charset.name(), bytes = len, "BOM detected");
            Ok(Some(charset))
        }
        None => Ok(None),
    }
}

/// Fill `dest` as far as the stream allows; short only at EOF/quota.
fn read_at_most<R: Read>(reader: &mut R, dest: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < dest.len() {
        let n = reader.read(&mut dest[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
