//! Request path normalization
//!
//! Turns a raw request-target into the path that is compared against the
//! route table: the query component is dropped, the path is percent-decoded
//! on a best-effort basis, and the deployment prefix is removed.

use percent_encoding::percent_decode_str;
use std::borrow::Cow;

/// Path ready for route lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPath {
    pub path: String,
    /// Set when some escape could not be decoded and was kept as literal text
    pub malformed_encoding: bool,
}

/// Normalize a raw request-target against a deployment prefix
pub fn normalize(raw_uri: &str, deployment_prefix: &str) -> NormalizedPath {
    let (decoded, malformed_encoding) = decode_path(strip_query(raw_uri));

    NormalizedPath {
        path: strip_prefix(&decoded, deployment_prefix).to_string(),
        malformed_encoding,
    }
}

/// Drop the first `?` and everything after it
pub fn strip_query(raw_uri: &str) -> &str {
    raw_uri.split_once('?').map_or(raw_uri, |(path, _)| path)
}

/// Remove one leading occurrence of `prefix`, if present
pub fn strip_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return path;
    }
    path.strip_prefix(prefix).unwrap_or(path)
}

/// Best-effort percent-decoding
///
/// Runs of `%XX` escapes are decoded together so multi-byte UTF-8 sequences
/// survive. A `%` that is not followed by two hex digits, or decoded bytes that
/// do not form valid UTF-8, are copied through as their original escape text.
/// The returned flag reports whether any such fallback happened.
pub fn decode_path(input: &str) -> (Cow<'_, str>, bool) {
    if !input.contains('%') {
        return (Cow::Borrowed(input), false);
    }

    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut malformed = false;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'%' {
            let end = input[i..].find('%').map_or(bytes.len(), |n| i + n);
            out.push_str(&input[i..end]);
            i = end;
            continue;
        }

        let end = escape_run_end(bytes, i);
        if end == i {
            // lone '%'
            malformed = true;
            out.push('%');
            i += 1;
            continue;
        }

        let run = &input[i..end];
        if decode_run(run, &mut out) {
            malformed = true;
        }
        i = end;
    }

    (Cow::Owned(out), malformed)
}

/// End offset of the run of well-formed `%XX` escapes starting at `start`
fn escape_run_end(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end + 3 <= bytes.len()
        && bytes[end] == b'%'
        && bytes[end + 1].is_ascii_hexdigit()
        && bytes[end + 2].is_ascii_hexdigit()
    {
        end += 3;
    }
    end
}

/// Decode one run of escapes into `out`, returns true if any byte was invalid
fn decode_run(run: &str, out: &mut String) -> bool {
    let decoded: Vec<u8> = percent_decode_str(run).collect();
    let mut invalid_seen = false;
    // every decoded byte maps to exactly three characters of `run`
    let mut offset = 0;

    for chunk in decoded.utf8_chunks() {
        out.push_str(chunk.valid());
        offset += chunk.valid().len();

        let invalid = chunk.invalid().len();
        if invalid > 0 {
            invalid_seen = true;
            out.push_str(&run[offset * 3..(offset + invalid) * 3]);
            offset += invalid;
        }
    }

    invalid_seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_query() {
        assert_eq!(strip_query("/a/b?x=1"), "/a/b");
        assert_eq!(strip_query("/a/b?x=1?y=2"), "/a/b");
        assert_eq!(strip_query("/a/b"), "/a/b");
        assert_eq!(strip_query("?only"), "");
    }

    #[test]
    fn test_strip_prefix_exact_only() {
        assert_eq!(strip_prefix("/wmap/app/index.php", "/wmap/app"), "/index.php");
        assert_eq!(
            strip_prefix("/other/wmap/app/index.php", "/wmap/app"),
            "/other/wmap/app/index.php"
        );
        assert_eq!(strip_prefix("/wmap/app/index.php", ""), "/wmap/app/index.php");
    }

    #[test]
    fn test_strip_prefix_single_occurrence() {
        assert_eq!(strip_prefix("/p/p/x", "/p"), "/p/x");
    }

    #[test]
    fn test_decode_plain_path_borrows() {
        let (decoded, malformed) = decode_path("/index.php/hello/index");
        assert!(matches!(decoded, Cow::Borrowed(_)));
        assert!(!malformed);
    }

    #[test]
    fn test_decode_escapes() {
        let (decoded, malformed) = decode_path("/index.php%2Fhello%2findex");
        assert_eq!(decoded, "/index.php/hello/index");
        assert!(!malformed);

        let (decoded, _) = decode_path("/caf%C3%A9");
        assert_eq!(decoded, "/café");
    }

    #[test]
    fn test_decode_malformed_escape_kept_literal() {
        let (decoded, malformed) = decode_path("/a%zzb");
        assert_eq!(decoded, "/a%zzb");
        assert!(malformed);

        let (decoded, malformed) = decode_path("/a%4");
        assert_eq!(decoded, "/a%4");
        assert!(malformed);

        let (decoded, malformed) = decode_path("/a%");
        assert_eq!(decoded, "/a%");
        assert!(malformed);
    }

    #[test]
    fn test_decode_invalid_utf8_kept_literal() {
        let (decoded, malformed) = decode_path("/x%41%ff%42");
        assert_eq!(decoded, "/xA%ffB");
        assert!(malformed);
    }

    #[test]
    fn test_normalize_decodes_before_prefix() {
        let n = normalize("/wmap%2Fapp/index.php/hello/index?x=%zz", "/wmap/app");
        assert_eq!(n.path, "/index.php/hello/index");
        assert!(!n.malformed_encoding);
    }

    #[test]
    fn test_normalize_reports_malformed() {
        let n = normalize("/wmap/app/%E0%A4", "/wmap/app");
        assert_eq!(n.path, "/%E0%A4");
        assert!(n.malformed_encoding);
    }
}
