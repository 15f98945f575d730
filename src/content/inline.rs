use std::io::{self, Write};

use base64::Engine;
use serde::Serialize;
use serde_json::ser::Formatter;

use crate::types::entry::{Content, Encoding};
use crate::types::errors::{Error, Result};

/// Decode base64 text, ignoring whitespace and line breaks anywhere in it.
///
/// # Errors
///
/// Returns a configuration error for malformed input.
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| Error::config(format!("malformed base64 content: {e}")))
}

/// JSON layout of structured content: `", "` and `": "` separators, and every
/// non-ASCII character escaped as `\uXXXX`. Object keys keep document order.
struct SpacedAscii;

impl Formatter for SpacedAscii {
    fn begin_array_value<W: ?Sized + Write>(&mut self, w: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            w.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, w: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            w.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, w: &mut W) -> io::Result<()> {
        w.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + Write>(&mut self, w: &mut W, fragment: &str) -> io::Result<()> {
        if fragment.is_ascii() {
            return w.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for c in fragment.chars() {
            if c.is_ascii() {
                w.write_all(&[c as u8])?;
            } else {
                for u in c.encode_utf16(&mut units) {
                    write!(w, "\\u{u:04x}")?;
                }
            }
        }
        Ok(())
    }
}

/// Write inline content to `dest`.
///
/// # Errors
///
/// Configuration errors for undecodable base64 or unserializable values, IO
/// errors from `dest`.
pub fn write_inline(dest: &mut dyn Write, content: &Content, encoding: Encoding) -> Result<()> {
    let io_err = |e: std::io::Error| Error::io("could not write content", &e);
    match content {
        Content::Text(text) if encoding == Encoding::Base64 => {
            log::debug!("decoding base64 content");
            dest.write_all(&decode_base64(text)?).map_err(io_err)
        }
        Content::Text(text) => dest.write_all(text.as_bytes()).map_err(io_err),
        Content::Bytes(bytes) => dest.write_all(bytes).map_err(io_err),
        Content::Structured(value) => {
            log::debug!("content will be serialized as a JSON structure");
            let mut ser = serde_json::Serializer::with_formatter(dest, SpacedAscii);
            value
                .serialize(&mut ser)
                .map_err(|e| Error::config(format!("could not serialize content: {e}")))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(content: Content, encoding: Encoding) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        write_inline(&mut out, &content, encoding)?;
        Ok(out)
    }

    #[test]
    fn plain_text_is_written_verbatim() {
        assert_eq!(render(Content::Text("a=1\n".into()), Encoding::Plain).unwrap(), b"a=1\n");
    }

    #[test]
    fn base64_ignores_whitespace_anywhere() {
        let out = render(Content::Text("  aG Vs\n\tbG8=\r\n".into()), Encoding::Base64).unwrap();
        assert_eq!(out, b"hello");
    }

    #[test]
    fn malformed_base64_is_a_configuration_error() {
        let err = render(Content::Text("not*base64".into()), Encoding::Base64).unwrap_err();
        assert_eq!(err.kind, crate::types::errors::ErrorKind::Config);
        assert!(err.msg.contains("malformed base64"));
    }

    #[test]
    fn structured_value_becomes_spaced_json_in_document_order() {
        let value: serde_json::Value =
            serde_json::from_str(r#"{"b": [1, 2.5], "a": null, "c": {"d": true}}"#).unwrap();
        let out = render(Content::Structured(value), Encoding::Base64).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"{"b": [1, 2.5], "a": null, "c": {"d": true}}"#
        );
    }

    #[test]
    fn non_ascii_text_in_structures_is_escaped() {
        let out = render(Content::Structured(json!(["caf\u{e9}", "\u{1f600}", "a\"b"])), Encoding::Plain).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"["caf\u00e9", "\ud83d\ude00", "a\"b"]"#
        );
    }

    #[test]
    fn raw_bytes_ignore_encoding() {
        let out = render(Content::Bytes(vec![0, 159, 255]), Encoding::Base64).unwrap();
        assert_eq!(out, [0u8, 159, 255]);
    }
}
