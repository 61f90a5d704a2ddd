//! ASCII, case-insensitive matching helpers for tags and attributes.
//!
//! Patterns are given in upper case; source bytes are upper-cased on the fly.
//! Only tab, LF, CR and space count as whitespace.

use std::ops::Range;

use crate::quote::QuoteState;

#[inline]
pub fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n')
}

/// First offset at or after `pos` that is not whitespace.
pub fn skip_space(src: &[u8], mut pos: usize) -> usize {
    while src.get(pos).is_some_and(|&c| is_space(c)) {
        pos += 1;
    }
    pos
}

/// `src[pos..]` starts with `upper`, ignoring ASCII case.
pub fn matches_at(src: &[u8], pos: usize, upper: &[u8]) -> bool {
    debug_assert!(!upper.is_empty());
    src.get(pos..pos + upper.len())
        .is_some_and(|s| s.iter().zip(upper).all(|(a, b)| a.to_ascii_uppercase() == *b))
}

/// Like [`matches_at`], and the match is followed by whitespace or the end.
pub fn matches_word(src: &[u8], pos: usize, upper: &[u8]) -> bool {
    matches_at(src, pos, upper) && src.get(pos + upper.len()).map_or(true, |&c| is_space(c))
}

/// Like [`matches_at`], followed by optional whitespace and then `delim`.
/// Returns the offset of `delim`.
pub fn matches_with_delim(src: &[u8], pos: usize, upper: &[u8], delim: u8) -> Option<usize> {
    if !matches_at(src, pos, upper) {
        return None;
    }
    let at = skip_space(src, pos + upper.len());
    (src.get(at) == Some(&delim)).then_some(at)
}

/// Outcome of [`find_attribute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeScan {
    /// Byte range of the attribute value (quotes excluded).
    pub value: Option<Range<usize>>,
    /// Offset of the unquoted tag end byte, or the buffer length.
    pub tag_end: usize,
}

/// Find `attr = value` inside a tag that starts at `start`.
///
/// The value may be single-quoted, double-quoted or bare. Scanning stops at
/// the first unquoted `tag_end` byte (`>` for HTML tags, `%` for directives).
/// The attribute name must follow whitespace or sit at `start`.
pub fn find_attribute(src: &[u8], start: usize, attr: &[u8], tag_end: u8) -> AttributeScan {
    let mut pos = start;
    let mut after_space = true;
    let mut quote = QuoteState::None;

    let equals = loop {
        if src.get(pos).is_some_and(|&c| is_space(c)) {
            after_space = true;
            pos = skip_space(src, pos);
        }

        let Some(&c) = src.get(pos) else {
            return AttributeScan {
                value: None,
                tag_end: pos,
            };
        };
        if c == tag_end && quote.is_none() {
            return AttributeScan {
                value: None,
                tag_end: pos,
            };
        }

        match c {
            b'\'' => quote = quote.on_single(),
            b'"' => quote = quote.on_double(),
            _ if after_space && c.to_ascii_uppercase() == attr[0] => {
                if let Some(eq) = matches_with_delim(src, pos, attr, b'=') {
                    break eq;
                }
            }
            _ => {}
        }
        after_space = false;
        pos += 1;
    };

    let value_start = skip_space(src, equals + 1);
    let (value, mut pos) = match src.get(value_start) {
        Some(&delim @ (b'\'' | b'"')) => {
            let inner = value_start + 1;
            let close = src[inner.min(src.len())..]
                .iter()
                .position(|&c| c == delim)
                .map_or(src.len(), |i| inner + i);
            let next = if close < src.len() { close + 1 } else { close };
            (inner..close, next)
        }
        _ => {
            let end = src[value_start.min(src.len())..]
                .iter()
                .position(|&c| is_space(c) || c == tag_end)
                .map_or(src.len(), |i| value_start + i);
            (value_start..end, end)
        }
    };

    let mut quote = QuoteState::None;
    while let Some(&c) = src.get(pos) {
        if c == tag_end && quote.is_none() {
            break;
        }
        quote = quote.feed(c);
        pos += 1;
    }

    AttributeScan {
        value: Some(value),
        tag_end: pos,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value<'a>(src: &'a [u8], scan: &AttributeScan) -> Option<&'a [u8]> {
        scan.value.clone().map(|r| &src[r])
    }

    #[test]
    fn test_matches_at_ignores_case() {
        assert!(matches_at(b"Response.Write x", 0, b"RESPONSE.WRITE"));
        assert!(matches_at(b"xresponse.write", 1, b"RESPONSE.WRITE"));
        assert!(!matches_at(b"Response.Wri", 0, b"RESPONSE.WRITE"));
        assert!(!matches_at(b"abc", 5, b"A"));
    }

    #[test]
    fn test_matches_word_requires_boundary() {
        assert!(matches_word(b"script runat", 0, b"SCRIPT"));
        assert!(matches_word(b"SCRIPT", 0, b"SCRIPT"));
        assert!(!matches_word(b"scripts", 0, b"SCRIPT"));
        assert!(!matches_word(b"script>", 0, b"SCRIPT"));
    }

    #[test]
    fn test_matches_with_delim() {
        assert_eq!(matches_with_delim(b"SCRIPT  >", 0, b"SCRIPT", b'>'), Some(8));
        assert_eq!(matches_with_delim(b"script>", 0, b"SCRIPT", b'>'), Some(6));
        assert_eq!(matches_with_delim(b"scriptx>", 0, b"SCRIPT", b'>'), None);
    }

    #[test]
    fn test_find_bare_value() {
        let src = b"SCRIPT RUNAT=server LANGUAGE=vbscript>body";
        let scan = find_attribute(src, 0, b"RUNAT", b'>');
        assert_eq!(value(src, &scan), Some(&b"server"[..]));
        assert_eq!(src[scan.tag_end], b'>');
    }

    #[test]
    fn test_find_quoted_value_with_spaces() {
        let src = b"OBJECT id=x runat = \"Server\" progid='a>b'>rest";
        let scan = find_attribute(src, 0, b"RUNAT", b'>');
        assert_eq!(value(src, &scan), Some(&b"Server"[..]));
        // the '>' inside the quoted progid is not the tag end
        assert_eq!(&src[scan.tag_end..], b">rest");
    }

    #[test]
    fn test_attribute_must_follow_space() {
        let src = b"SCRIPT xRUNAT=server>";
        let scan = find_attribute(src, 0, b"RUNAT", b'>');
        assert_eq!(scan.value, None);
        assert_eq!(scan.tag_end, src.len() - 1);
    }

    #[test]
    fn test_tag_end_inside_quotes_is_skipped() {
        let src = b"A title='1 > 0' RUNAT=server>";
        let scan = find_attribute(src, 0, b"RUNAT", b'>');
        assert_eq!(value(src, &scan), Some(&b"server"[..]));
    }

    #[test]
    fn test_missing_attribute_reports_tag_end() {
        let src = b"LANGUAGE %> text";
        let scan = find_attribute(src, 0, b"LANGUAGE", b'%');
        assert_eq!(scan.value, None);
        assert_eq!(scan.tag_end, 9);
    }

    #[test]
    fn test_unterminated_quoted_value() {
        let src = b"LANGUAGE=\"JScript";
        let scan = find_attribute(src, 0, b"LANGUAGE", b'%');
        assert_eq!(value(src, &scan), Some(&b"JScript"[..]));
        assert_eq!(scan.tag_end, src.len());
    }
}
