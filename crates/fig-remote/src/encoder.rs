//! Diagram source encoding for GET-style requests.
//!
//! The remote service accepts the diagram source embedded in the URL
//! path as a deflated, URL-safe base64 token. Encoding is deterministic:
//! identical input always yields the identical token.

use std::io::Write;

use base64::Engine;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use flate2::Compression;
use flate2::write::ZlibEncoder;

/// Source could not be compressed or encoded. Always fatal; the caller
/// must not attempt a network call with a partial token.
#[derive(Debug, thiserror::Error)]
#[error("failed to encode diagram source: {0}")]
pub struct EncodeError(#[from] std::io::Error);

/// Encode diagram source into a URL-path-safe token.
///
/// Steps, in order: trim surrounding whitespace, normalize HTML entities
/// that leak from rich-text paste (`&nbsp;`/non-breaking space, `&gt;`,
/// `&lt;`), deflate at maximum compression, then base64 without `+`,
/// `/` or `=` padding.
pub fn encode(source: &str) -> Result<String, EncodeError> {
    let normalized = normalize(source);

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(normalized.as_bytes())?;
    let compressed = encoder.finish()?;

    Ok(BASE64_URL_SAFE_NO_PAD.encode(compressed))
}

/// Trim and undo the HTML entities commonly introduced by rich-text
/// paste operations. No other line-ending or whitespace normalization
/// happens here; the token must reproduce the source byte for byte.
fn normalize(source: &str) -> String {
    source
        .trim()
        .replace('\u{a0}', " ")
        .replace("&nbsp;", " ")
        .replace("&gt;", ">")
        .replace("&lt;", "<")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_encode_deterministic() {
        let source = "@startuml\nA -> B\n@enduml";
        assert_eq!(encode(source).unwrap(), encode(source).unwrap());
    }

    #[test]
    fn test_encode_distinct_inputs_differ() {
        let a = encode("A->B").unwrap();
        let b = encode("B->A").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_encode_url_safe() {
        // Exercise a spread of inputs, including ones whose compressed
        // form is dense enough to hit every base64 code point
        let inputs = [
            "A->B",
            "@startuml\nAlice -> Bob: hello\n@enduml",
            "digraph { a -> b -> c -> a }",
            &"x".repeat(10_000),
            "unicode: \u{2192} \u{2713} \u{1f600}",
        ];
        for input in inputs {
            let token = encode(input).unwrap();
            assert!(!token.is_empty());
            assert!(!token.contains('+'), "token contains '+' for {input:?}");
            assert!(!token.contains('/'), "token contains '/' for {input:?}");
            assert!(!token.ends_with('='), "token has padding for {input:?}");
        }
    }

    #[test]
    fn test_encode_trims_surrounding_whitespace() {
        assert_eq!(encode("  A->B\n\n").unwrap(), encode("A->B").unwrap());
    }

    #[test]
    fn test_encode_normalizes_pasted_entities() {
        assert_eq!(encode("A &gt; B").unwrap(), encode("A > B").unwrap());
        assert_eq!(encode("A &lt; B").unwrap(), encode("A < B").unwrap());
        assert_eq!(encode("A\u{a0}B").unwrap(), encode("A B").unwrap());
        assert_eq!(encode("A&nbsp;B").unwrap(), encode("A B").unwrap());
    }

    #[test]
    fn test_encode_preserves_interior_line_endings() {
        // CRLF vs LF bodies are different sources and different tokens
        assert_ne!(encode("A\r\nB").unwrap(), encode("A\nB").unwrap());
    }

    #[test]
    fn test_encode_roundtrip() {
        use std::io::Read;

        let source = "@startuml\nAlice -> Bob\n@enduml";
        let token = encode(source).unwrap();

        let compressed = BASE64_URL_SAFE_NO_PAD.decode(token).unwrap();
        let mut decoder = flate2::read::ZlibDecoder::new(compressed.as_slice());
        let mut out = String::new();
        decoder.read_to_string(&mut out).unwrap();
        assert_eq!(out, source);
    }

    #[test]
    fn test_encode_empty_source() {
        // Degenerate but legal: an empty body still encodes
        let token = encode("").unwrap();
        assert!(!token.is_empty());
    }
}
