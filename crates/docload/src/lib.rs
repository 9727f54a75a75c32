//! docload
//!
//! Loads markup from an arbitrary byte source and produces a correctly
//! decoded document, resolving the character encoding from BOM bytes,
//! in-document metadata, or a declared name.
//!
//! # Example
//! ```rust,ignore
//! use docload::load;
//!
//! let loaded = load(file, "https://example.com/", None, &mut builder)?;
//! println!("decoded as {}", loaded.charset.name());
//! ```

mod charset;
mod document;
mod error;
mod load;
mod resolver;

pub use charset::{Charset, StreamDecoder};
pub use document::{DocumentBuilder, DocumentMeta, MetaCharsetHint};
pub use error::LoadError;
pub use load::{LoadStepper, Loaded, load, load_capped, load_progressive};
pub use resolver::{CharsetDecision, DetectOutcome, SNIFF_BUFFER_SIZE, detect};

pub use docload_io::{BoundedRewindableStream, BufferPool, BufferedByteReader, StreamError};
