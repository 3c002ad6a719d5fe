//! Text encoding helpers built on `encoding_rs`.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};

use crate::error::{ImportError, Result};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Resolves a WHATWG encoding label (`utf8`, `latin1`, `utf-16le`, ...).
/// `None` means UTF-8.
pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label.map(str::trim) {
        None | Some("") => Ok(UTF_8),
        Some(label) => Encoding::for_label(label.as_bytes())
            .ok_or_else(|| ImportError::UnsupportedEncoding(label.to_string())),
    }
}

/// Whether records can be split on raw bytes before decoding.
///
/// True for UTF-8 and for single-byte ASCII-compatible encodings. In
/// multi-byte legacy encodings (Shift_JIS, Big5, GBK, ...) a trailing byte
/// may equal a delimiter byte, and UTF-16 does not store ASCII as single
/// bytes at all, so those must be decoded up front.
pub fn supports_incremental(encoding: &'static Encoding) -> bool {
    encoding == UTF_8 || (encoding.is_single_byte() && encoding.is_ascii_compatible())
}

/// Decodes a complete buffer, honouring and removing a byte order mark.
pub fn decode_to_string(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Decodes one field; malformed sequences become U+FFFD.
pub fn decode_field<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> Cow<'a, str> {
    encoding.decode_without_bom_handling(bytes).0
}

/// Drops a leading UTF-8 byte order mark.
pub fn strip_utf8_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}
