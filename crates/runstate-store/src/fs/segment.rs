//! Reversible mapping between store names and single path segments
//!
//! `%`, `/`, `\` and NUL are written as `%XX`, as is a leading `.`, so any
//! non-empty name becomes one file name that never starts with `.` (the
//! prefix reserved for temp files and the alias directory).

const ESCAPE: u8 = b'%';

fn needs_escape(byte: u8, first: bool) -> bool {
    matches!(byte, b'%' | b'/' | b'\\' | 0) || (first && byte == b'.')
}

/// Encode `name` into a single path segment
pub fn encode_segment(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, ch) in name.char_indices() {
        if ch.is_ascii() && needs_escape(ch as u8, i == 0) {
            out.push_str(&format!("%{:02X}", ch as u8));
        } else {
            out.push(ch);
        }
    }
    out
}

/// Decode a segment produced by [`encode_segment`]
///
/// Returns `None` for a malformed escape or a result that is not UTF-8.
pub fn decode_segment(segment: &str) -> Option<String> {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == ESCAPE {
            let hex = segment.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_unchanged() {
        assert_eq!(
            encode_segment("urn.li.dataset.A-job_001.dstate"),
            "urn.li.dataset.A-job_001.dstate"
        );
        assert_eq!(encode_segment("ingest1"), "ingest1");
    }

    #[test]
    fn test_separators_and_leading_dot_escaped() {
        assert_eq!(
            encode_segment("/data/x-current.dstate"),
            "%2Fdata%2Fx-current.dstate"
        );
        assert_eq!(encode_segment("a\\b"), "a%5Cb");
        assert_eq!(encode_segment(".aliases"), "%2Ealiases");
        assert_eq!(encode_segment(".."), "%2E.");
        assert_eq!(encode_segment("50%"), "50%25");
    }

    #[test]
    fn test_decode_inverts_encode() {
        for name in [
            "/data/tracking/PageViewEvent-job_001.dstate",
            "urn.li.dataset.(urn.li.dataPlatform.hdfs,/data/x,PROD)-current.dstate",
            "..",
            ".hidden",
            "%2F literal",
            "caf\u{e9}/\u{1F600}",
        ] {
            assert_eq!(decode_segment(&encode_segment(name)).as_deref(), Some(name));
        }
    }

    #[test]
    fn test_malformed_escape_rejected() {
        assert_eq!(decode_segment("bad%2"), None);
        assert_eq!(decode_segment("bad%zz"), None);
    }
}
