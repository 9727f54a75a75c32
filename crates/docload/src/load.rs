//! Load entry points
//!
//! One-shot loading (detect, then decode authoritatively if needed) and a
//! progressive mode that defers the authoritative decode to caller-driven
//! steps.

use std::io::Read;

use docload_io::{BoundedRewindableStream, PooledBuf, read_fully};

use crate::charset::{Charset, StreamDecoder};
use crate::document::DocumentBuilder;
use crate::error::LoadError;
use crate::resolver::{CharsetDecision, DetectOutcome, detect};

/// A loaded document together with the charset it was decoded with.
#[derive(Debug)]
pub struct Loaded<D> {
    pub document: D,
    pub charset: Charset,
}

/// Load a document from `source`, autodetecting the charset unless
/// `declared` names one. The source is fully consumed and released.
pub fn load<R: Read, B: DocumentBuilder>(
    source: R,
    base_uri: &str,
    declared: Option<&str>,
    builder: &mut B,
) -> Result<Loaded<B::Document>, LoadError> {
    load_capped(source, base_uri, declared, 0, builder)
}

/// As [`load`], reading at most `max_size` bytes (0 = unbounded).
pub fn load_capped<R: Read, B: DocumentBuilder>(
    source: R,
    base_uri: &str,
    declared: Option<&str>,
    max_size: usize,
    builder: &mut B,
) -> Result<Loaded<B::Document>, LoadError> {
    let stream = BoundedRewindableStream::new(source, max_size);
    let CharsetDecision {
        charset,
        outcome,
        mut stream,
    } = detect(stream, base_uri, declared, builder, true)?;

    let document = match outcome {
        DetectOutcome::Resolved(document) => document,
        DetectOutcome::NeedsDecode => {
            let pool = stream.pool().clone();
            let result = read_fully(&mut stream, 0, &pool);
            stream.close();
            let bytes = result?;
            let text = charset.decode(&bytes);
            builder.parse(&text, base_uri)
        }
    };
    Ok(Loaded { document, charset })
}

/// Detect the charset, then hand decoding to the caller one chunk at a
/// time. Unlike [`load`], this never trusts the speculative parse; the
/// session always performs its own decode.
pub fn load_progressive<R: Read, B: DocumentBuilder>(
    source: R,
    base_uri: &str,
    declared: Option<&str>,
    max_size: usize,
    mut builder: B,
) -> Result<LoadStepper<R, B>, LoadError> {
    let stream = BoundedRewindableStream::new(source, max_size);
    let CharsetDecision {
        charset, stream, ..
    } = detect(stream, base_uri, declared, &mut builder, false)?;

    let decoder = charset.new_decoder();
    let chunk = stream.pool().clone().check_out();
    Ok(LoadStepper {
        stream,
        decoder,
        chunk,
        text: String::new(),
        builder,
        base_uri: base_uri.to_string(),
        charset,
        finished: false,
    })
}

/// Caller-driven decode session produced by [`load_progressive`].
///
/// Drive it with [`step`](Self::step) under an external scheduler, or call
/// [`complete`](Self::complete) to drain the remainder in one go.
pub struct LoadStepper<R: Read, B: DocumentBuilder> {
    stream: BoundedRewindableStream<R>,
    decoder: StreamDecoder,
    chunk: PooledBuf,
    text: String,
    builder: B,
    base_uri: String,
    charset: Charset,
    finished: bool,
}

impl<R: Read, B: DocumentBuilder> LoadStepper<R, B> {
    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Cooperatively cancel the session: subsequent steps see EOF.
    pub fn interrupt(&mut self) {
        self.stream.interrupt();
    }

    /// Read and decode one chunk. Returns `false` once the input is
    /// exhausted (or the quota is spent).
    pub fn step(&mut self) -> Result<bool, LoadError> {
        if self.finished {
            return Ok(false);
        }
        let read = self.stream.read(&mut self.chunk)?;
        if read == 0 {
            self.decoder.decode_to_string(&[], &mut self.text, true);
            self.finished = true;
            return Ok(false);
        }
        self.decoder
            .decode_to_string(&self.chunk[..read], &mut self.text, false);
        Ok(true)
    }

    /// Drain remaining input, parse, and release the stream.
    pub fn complete(mut self) -> Result<Loaded<B::Document>, LoadError> {
        while self.step()? {}
        let document = self.builder.parse(&self.text, &self.base_uri);
        self.stream.close();
        Ok(Loaded {
            document,
            charset: self.charset,
        })
    }
}
