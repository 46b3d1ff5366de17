//! JSON string-literal escaping with offset bookkeeping.
//!
//! Cell sources are stored in the document as JSON string-literal bodies, so
//! a cell's logical text and its in-document literal can differ in length
//! wherever an escape sequence appears (`\n` is two literal bytes for one
//! logical byte). Unescaping records those differences as an adjustment
//! table, which the span tracker uses to map offsets between the two spaces.

use std::fmt::Write as _;

use crate::editing::NotebookError;

/// A decoded string-literal body plus its offset adjustment table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Unescaped {
    /// The logical text, with all escapes resolved.
    pub text: String,
    /// `(logical_offset, cumulative_extra_bytes)` pairs, one per escape, in
    /// ascending order. For logical offsets at or past `logical_offset`, the
    /// literal lies `cumulative_extra_bytes` further right than the logical
    /// offset alone would suggest.
    pub adjustments: Vec<(usize, usize)>,
}

impl Unescaped {
    /// Map a logical (unescaped) offset to an offset within the literal body.
    pub fn to_literal(&self, logical: usize) -> usize {
        to_literal(&self.adjustments, logical)
    }
}

/// Escape `text` so it can be embedded as the body of a JSON string literal.
///
/// Quotes, backslashes, and the short-form control characters get two-byte
/// escapes; remaining control characters fall back to `\u00xx`.
pub fn escape_fragment(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Decode a JSON string-literal body, recording an adjustment per escape.
///
/// `raw` is the text between the quote characters, exactly as it appears in
/// the document. Fails with `MalformedDocument` on truncated or invalid
/// escapes, including lone UTF-16 surrogates.
pub fn unescape_fragment(raw: &str) -> Result<Unescaped, NotebookError> {
    let mut text = String::with_capacity(raw.len());
    let mut adjustments = Vec::new();
    let mut extra = 0usize;

    let mut rest = raw;
    while let Some(pos) = rest.find('\\') {
        text.push_str(&rest[..pos]);
        let (decoded, raw_len) = decode_escape(&rest[pos..])?;
        text.push(decoded);
        extra += raw_len - decoded.len_utf8();
        adjustments.push((text.len(), extra));
        rest = &rest[pos + raw_len..];
    }
    text.push_str(rest);

    Ok(Unescaped { text, adjustments })
}

/// Map a logical offset to a literal offset using an adjustment table.
pub fn to_literal(adjustments: &[(usize, usize)], logical: usize) -> usize {
    let mut adjustment = 0;
    for (threshold, extra) in adjustments {
        if logical >= *threshold {
            adjustment = *extra;
        } else {
            break;
        }
    }
    logical + adjustment
}

/// Map a literal offset back to a logical offset.
///
/// An offset at the leading backslash of an escape sequence resolves to the
/// escaped character's logical position; an offset further inside the
/// sequence resolves to the logical position just past it.
pub fn to_logical(adjustments: &[(usize, usize)], literal: usize) -> usize {
    let mut adjustment = 0;
    for (threshold, extra) in adjustments {
        if threshold + extra <= literal {
            adjustment = *extra;
        } else {
            break;
        }
    }
    literal.saturating_sub(adjustment)
}

/// Decode one escape sequence at the start of `s` (which begins with `\`).
/// Returns the decoded character and the number of literal bytes consumed.
fn decode_escape(s: &str) -> Result<(char, usize), NotebookError> {
    let esc = s.as_bytes().get(1).copied().ok_or_else(|| {
        NotebookError::MalformedDocument("unterminated escape sequence".to_string())
    })?;

    match esc {
        b'"' => Ok(('"', 2)),
        b'\\' => Ok(('\\', 2)),
        b'/' => Ok(('/', 2)),
        b'b' => Ok(('\u{0008}', 2)),
        b'f' => Ok(('\u{000C}', 2)),
        b'n' => Ok(('\n', 2)),
        b'r' => Ok(('\r', 2)),
        b't' => Ok(('\t', 2)),
        b'u' => decode_unicode_escape(s),
        other => Err(NotebookError::MalformedDocument(format!(
            "invalid escape character `{}`",
            other as char
        ))),
    }
}

fn decode_unicode_escape(s: &str) -> Result<(char, usize), NotebookError> {
    let hi = parse_hex4(&s[2..])?;

    if (0xDC00..=0xDFFF).contains(&hi) {
        return Err(NotebookError::MalformedDocument(
            "lone low surrogate in \\u escape".to_string(),
        ));
    }

    if (0xD800..=0xDBFF).contains(&hi) {
        // High surrogate: a paired \uXXXX low surrogate must follow.
        if s.get(6..8) != Some("\\u") {
            return Err(NotebookError::MalformedDocument(
                "lone high surrogate in \\u escape".to_string(),
            ));
        }
        let lo = parse_hex4(&s[8..])?;
        if !(0xDC00..=0xDFFF).contains(&lo) {
            return Err(NotebookError::MalformedDocument(
                "high surrogate not followed by low surrogate".to_string(),
            ));
        }
        let code_point = 0x10000 + ((hi - 0xD800) << 10) + (lo - 0xDC00);
        let c = char::from_u32(code_point).ok_or_else(|| {
            NotebookError::MalformedDocument("invalid surrogate pair".to_string())
        })?;
        return Ok((c, 12));
    }

    let c = char::from_u32(hi).ok_or_else(|| {
        NotebookError::MalformedDocument(format!("invalid \\u escape value {hi:#06x}"))
    })?;
    Ok((c, 6))
}

fn parse_hex4(s: &str) -> Result<u32, NotebookError> {
    let digits = s
        .get(..4)
        .filter(|d| d.bytes().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(|| {
            NotebookError::MalformedDocument("truncated \\u escape sequence".to_string())
        })?;
    u32::from_str_radix(digits, 16)
        .map_err(|_| NotebookError::MalformedDocument("invalid \\u escape sequence".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("plain text", "plain text")]
    #[case("line1\nline2", "line1\\nline2")]
    #[case("tab\there", "tab\\there")]
    #[case("quote \"inner\"", "quote \\\"inner\\\"")]
    #[case("back\\slash", "back\\\\slash")]
    #[case("bell\u{0007}", "bell\\u0007")]
    #[case("unicode é 世", "unicode é 世")]
    fn escape_fragment_cases(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_fragment(input), expected);
    }

    #[rstest]
    #[case("plain text")]
    #[case("line1\nline2\r\n")]
    #[case("quote \" and \\ slash")]
    #[case("control \u{0001}\u{001f}")]
    #[case("emoji 😀 and é")]
    fn escape_unescape_round_trip(#[case] input: &str) {
        let escaped = escape_fragment(input);
        let unescaped = unescape_fragment(&escaped).unwrap();
        assert_eq!(unescaped.text, input);
    }

    #[test]
    fn unescape_simple_has_no_adjustments() {
        let result = unescape_fragment("print(1)").unwrap();
        assert_eq!(result.text, "print(1)");
        assert!(result.adjustments.is_empty());
    }

    #[test]
    fn unescape_records_cumulative_adjustments() {
        // "a\nb\tc" as a literal: each escape costs one extra literal byte.
        let result = unescape_fragment("a\\nb\\tc").unwrap();
        assert_eq!(result.text, "a\nb\tc");
        assert_eq!(result.adjustments, vec![(2, 1), (4, 2)]);
    }

    #[test]
    fn unescape_unicode_escape() {
        let result = unescape_fragment("caf\\u00e9").unwrap();
        assert_eq!(result.text, "café");
        // é is 6 literal bytes decoding to a 2-byte char.
        assert_eq!(result.adjustments, vec![(5, 4)]);
    }

    #[test]
    fn unescape_surrogate_pair() {
        let result = unescape_fragment("\\ud83d\\ude00!").unwrap();
        assert_eq!(result.text, "😀!");
        assert_eq!(result.adjustments, vec![(4, 8)]);
    }

    #[rstest]
    #[case("trailing\\")]
    #[case("bad \\x escape")]
    #[case("short \\u00")]
    #[case("lone \\ud83d surrogate")]
    #[case("\\udc00 low first")]
    fn unescape_rejects_invalid_escapes(#[case] input: &str) {
        assert!(matches!(
            unescape_fragment(input),
            Err(NotebookError::MalformedDocument(_))
        ));
    }

    #[test]
    fn offset_mapping_with_adjustments() {
        // Logical "a\nb\tc", literal "a\nb\tc" with escapes at logical 1 and 3.
        let adjustments = vec![(2, 1), (4, 2)];

        // Before the first escape.
        assert_eq!(to_literal(&adjustments, 0), 0);
        assert_eq!(to_literal(&adjustments, 1), 1);
        // At and after the first escape.
        assert_eq!(to_literal(&adjustments, 2), 3);
        assert_eq!(to_literal(&adjustments, 3), 4);
        // At and after the second escape.
        assert_eq!(to_literal(&adjustments, 4), 6);
        assert_eq!(to_literal(&adjustments, 5), 7);
    }

    #[test]
    fn offset_mapping_inverse() {
        let adjustments = vec![(2, 1), (4, 2)];
        for logical in 0..=5 {
            let literal = to_literal(&adjustments, logical);
            assert_eq!(to_logical(&adjustments, literal), logical);
        }
    }

    #[test]
    fn offsets_inside_an_escape_sequence_resolve_nearby() {
        // Logical "a\nb": the escape occupies literal bytes 1..3.
        let adjustments = vec![(2, 1)];

        // The leading backslash maps to the escaped character's position.
        assert_eq!(to_logical(&adjustments, 1), 1);
        // Past the backslash maps just beyond the escaped character.
        assert_eq!(to_logical(&adjustments, 2), 2);
    }

    #[test]
    fn offset_mapping_without_adjustments_is_identity() {
        assert_eq!(to_literal(&[], 7), 7);
        assert_eq!(to_logical(&[], 7), 7);
    }
}
