//! Forward-only reader with a replayable prefix.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Cursor, Read};

use encoding_rs::{Encoding, UTF_8};

use super::encoding::{decode_field, strip_utf8_bom};

/// An incremental source: the first bytes are held back for sniffing and
/// replayed in front of the rest of the stream.
pub struct IncrementalSource {
    prefix: Vec<u8>,
    rest: Box<dyn Read>,
    encoding: &'static Encoding,
}

impl IncrementalSource {
    /// Reads up to `prefix_len` bytes from `reader` without losing them.
    pub fn new<R>(mut reader: R, prefix_len: usize, encoding: &'static Encoding) -> io::Result<Self>
    where
        R: Read + 'static,
    {
        let mut prefix = Vec::with_capacity(prefix_len);
        reader
            .by_ref()
            .take(prefix_len as u64)
            .read_to_end(&mut prefix)?;
        if encoding == UTF_8 {
            let bom_len = prefix.len() - strip_utf8_bom(&prefix).len();
            prefix.drain(..bom_len);
        }
        Ok(Self {
            prefix,
            rest: Box::new(reader),
            encoding,
        })
    }

    /// The sniffing sample, decoded lossily.
    pub fn sample(&self) -> Cow<'_, str> {
        decode_field(&self.prefix, self.encoding)
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// The full byte stream, prefix included.
    pub fn into_reader(self) -> Box<dyn Read> {
        Box::new(Cursor::new(self.prefix).chain(self.rest))
    }
}

impl fmt::Debug for IncrementalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncrementalSource")
            .field("prefix_len", &self.prefix.len())
            .field("encoding", &self.encoding.name())
            .finish()
    }
}
