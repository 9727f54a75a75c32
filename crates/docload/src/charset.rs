//! Character encodings
//!
//! WHATWG registry lookup via encoding_rs, extended with UTF-32 decode
//! support (the registry omits UTF-32, but BOM sniffing can select it).

use encoding_rs::{CoderResult, Decoder, Encoding, UTF_8};

/// A resolved character encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// An encoding from the WHATWG registry.
    Whatwg(&'static Encoding),
    Utf32Be,
    Utf32Le,
}

impl Charset {
    /// Tolerant registry lookup. Unrecognized labels yield `None`.
    pub fn for_name(name: &str) -> Option<Charset> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        if name.eq_ignore_ascii_case("utf-32be") || name.eq_ignore_ascii_case("utf-32") {
            return Some(Charset::Utf32Be);
        }
        if name.eq_ignore_ascii_case("utf-32le") {
            return Some(Charset::Utf32Le);
        }
        Encoding::for_label(name.as_bytes()).map(Charset::Whatwg)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Charset::Whatwg(encoding) => encoding.name(),
            Charset::Utf32Be => "UTF-32BE",
            Charset::Utf32Le => "UTF-32LE",
        }
    }

    /// Decode a whole buffer, substituting the replacement character for
    /// malformed sequences. Any BOM has already been consumed upstream.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match *self {
            Charset::Whatwg(encoding) => {
                encoding.decode_without_bom_handling(bytes).0.into_owned()
            }
            Charset::Utf32Be => decode_utf32(bytes, true),
            Charset::Utf32Le => decode_utf32(bytes, false),
        }
    }

    /// Whether text can be re-encoded in this charset. Decode-only charsets
    /// (UTF-16, UTF-32) fall back to UTF-8 on the output side.
    pub fn can_encode(&self) -> bool {
        match *self {
            Charset::Whatwg(encoding) => std::ptr::eq(encoding.output_encoding(), encoding),
            Charset::Utf32Be | Charset::Utf32Le => false,
        }
    }

    /// Encode text, with unmappable characters replaced per WHATWG rules.
    /// Decode-only charsets emit UTF-8.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match *self {
            Charset::Whatwg(encoding) => encoding.encode(text).0.into_owned(),
            Charset::Utf32Be | Charset::Utf32Le => text.as_bytes().to_vec(),
        }
    }

    pub fn new_decoder(&self) -> StreamDecoder {
        let inner = match *self {
            Charset::Whatwg(encoding) => {
                DecoderImpl::Whatwg(encoding.new_decoder_without_bom_handling())
            }
            Charset::Utf32Be => DecoderImpl::Utf32 {
                big_endian: true,
                pending: [0; 4],
                pending_len: 0,
            },
            Charset::Utf32Le => DecoderImpl::Utf32 {
                big_endian: false,
                pending: [0; 4],
                pending_len: 0,
            },
        };
        StreamDecoder { inner }
    }
}

impl Default for Charset {
    /// The canonical default encoding.
    fn default() -> Self {
        Charset::Whatwg(UTF_8)
    }
}

impl std::fmt::Display for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn decode_utf32(bytes: &[u8], big_endian: bool) -> String {
    let mut out = String::with_capacity(bytes.len() / 4);
    let mut chunks = bytes.chunks_exact(4);
    for unit in chunks.by_ref() {
        let raw = [unit[0], unit[1], unit[2], unit[3]];
        let value = if big_endian {
            u32::from_be_bytes(raw)
        } else {
            u32::from_le_bytes(raw)
        };
        out.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
    }
    if !chunks.remainder().is_empty() {
        out.push(char::REPLACEMENT_CHARACTER);
    }
    out
}

/// Incremental decoder for the progressive load path.
#[derive(Debug)]
pub struct StreamDecoder {
    inner: DecoderImpl,
}

enum DecoderImpl {
    Whatwg(Decoder),
    Utf32 {
        big_endian: bool,
        pending: [u8; 4],
        pending_len: usize,
    },
}

impl std::fmt::Debug for DecoderImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecoderImpl::Whatwg(decoder) => f
                .debug_tuple("Whatwg")
                .field(&decoder.encoding().name())
                .finish(),
            DecoderImpl::Utf32 { big_endian, .. } => {
                f.debug_struct("Utf32").field("big_endian", big_endian).finish()
            }
        }
    }
}

impl StreamDecoder {
    /// Decode a chunk, appending to `out` with replacement on error. Pass
    /// `last = true` exactly once, with the final (possibly empty) chunk.
    pub fn decode_to_string(&mut self, bytes: &[u8], out: &mut String, last: bool) {
        match &mut self.inner {
            DecoderImpl::Whatwg(decoder) => {
                let mut total_read = 0;
                loop {
                    let src = &bytes[total_read..];
                    let needed = decoder
                        .max_utf8_buffer_length(src.len())
                        .unwrap_or(src.len() + 16);
                    out.reserve(needed.max(16));
                    let (result, read, _) = decoder.decode_to_string(src, out, last);
                    total_read += read;
                    match result {
                        CoderResult::InputEmpty => break,
                        CoderResult::OutputFull => continue,
                    }
                }
            }
            DecoderImpl::Utf32 {
                big_endian,
                pending,
                pending_len,
            } => {
                for &byte in bytes {
                    pending[*pending_len] = byte;
                    *pending_len += 1;
                    if *pending_len == 4 {
                        let value = if *big_endian {
                            u32::from_be_bytes(*pending)
                        } else {
                            u32::from_le_bytes(*pending)
                        };
                        out.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
                        *pending_len = 0;
                    }
                }
                if last && *pending_len > 0 {
                    out.push(char::REPLACEMENT_CHARACTER);
                    *pending_len = 0;
                }
            }
        }
    }
}
