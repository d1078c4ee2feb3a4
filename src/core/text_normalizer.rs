//! Selection Text Normalization
//!
//! Filtering, normalization and quoting of selection text, plus the splice
//! algorithm that puts quotes around a selection inside an editable field.

/// The maximum length (in characters) of selection text to be processed.
pub const SELECTION_TEXT_MAX_LENGTH: usize = 1024;

/// Stored instead of the original text when the selection exceeds
/// [`SELECTION_TEXT_MAX_LENGTH`], to avoid wasting memory and making logs
/// noisy. The random suffix keeps real selections from colliding with it.
pub const SELECTION_TEXT_TOO_LONG_MARKER: &str =
    "### Too Long! ### yoBjv^F7%sg#NMxCrqvYKMgD85sRXRiG";

/// Double-quote variants recognized by search engines as exact-match quotes.
///
/// Text containing these cannot itself be enclosed in double quotes, so they
/// are stripped during normalization.
pub const QUOTATION_MARKS: &str =
    "\u{0022}\u{201c}\u{201d}\u{201e}\u{201f}\u{2033}\u{301d}\u{301e}\u{301f}\u{ff02}";

fn is_quotation_mark(c: char) -> bool {
    QUOTATION_MARKS.contains(c)
}

/// Filters selection text obtained from external sources.
///
/// Always pass externally obtained selection text through this filter before
/// using it. An absent selection becomes the empty string; an oversized one
/// becomes [`SELECTION_TEXT_TOO_LONG_MARKER`]. Idempotent.
pub fn filter_selection_text(selection_text: Option<&str>) -> String {
    let text = selection_text.unwrap_or("");
    if text.chars().count() > SELECTION_TEXT_MAX_LENGTH {
        SELECTION_TEXT_TOO_LONG_MARKER.to_string()
    } else {
        text.to_string()
    }
}

/// Normalizes selection text.
///
/// Every maximal run of whitespace and quotation-mark characters collapses
/// into a single space, and leading/trailing spaces are removed. The
/// too-long marker passes through unchanged.
pub fn normalize_selection_text(selection_text: &str) -> String {
    if selection_text == SELECTION_TEXT_TOO_LONG_MARKER {
        return selection_text.to_string();
    }

    let mut normalized = String::with_capacity(selection_text.len());
    let mut pending_space = false;
    for c in selection_text.chars() {
        if c.is_whitespace() || is_quotation_mark(c) {
            pending_space = true;
        } else {
            if pending_space && !normalized.is_empty() {
                normalized.push(' ');
            }
            pending_space = false;
            normalized.push(c);
        }
    }
    normalized
}

/// Checks whether normalized selection text is valid for processing.
pub fn is_normalized_text_valid(normalized_text: &str) -> bool {
    let len = normalized_text.chars().count();
    normalized_text != SELECTION_TEXT_TOO_LONG_MARKER && len > 0 && len <= SELECTION_TEXT_MAX_LENGTH
}

/// Puts straight double quotes around the string.
pub fn quote_text(text: &str) -> String {
    format!("\"{}\"", text)
}

/// Result of [`apply_quotes`]: the new field text and the selection range
/// (character indices) covering exactly the quoted phrase, excluding the
/// quotes and any inserted spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteSplice {
    pub text: String,
    pub sel_start: usize,
    pub sel_end: usize,
    /// The normalized phrase that ended up between the quotes.
    pub normalized: String,
}

/// Replaces the selected range of an editable field's text with its quoted
/// normalization.
///
/// Quotation marks immediately adjacent to the selection are absorbed into
/// the replaced range so that quoting next to an existing quote does not
/// double it, and a space is inserted on either side where the replacement
/// would otherwise touch non-whitespace text. Indices are character offsets.
///
/// Returns `None` when the normalized selection is not valid (empty,
/// quotes-only, or too long).
pub fn apply_quotes(full_text: &str, sel_start: usize, sel_end: usize) -> Option<QuoteSplice> {
    let chars: Vec<char> = full_text.chars().collect();
    let mut start = sel_start.min(chars.len());
    let mut end = sel_end.min(chars.len()).max(start);

    // Absorb a quotation mark just before the selection unless it is
    // followed by whitespace (then it belongs to the preceding phrase).
    if start > 0
        && is_quotation_mark(chars[start - 1])
        && chars.get(start).map_or(true, |c| !c.is_whitespace())
    {
        start -= 1;
    }
    if end < chars.len()
        && is_quotation_mark(chars[end])
        && (end == 0 || !chars[end - 1].is_whitespace())
    {
        end += 1;
    }

    let selected: String = chars[start..end].iter().collect();
    let normalized = normalize_selection_text(&filter_selection_text(Some(&selected)));
    if !is_normalized_text_valid(&normalized) {
        return None;
    }

    let mut replacement = quote_text(&normalized);
    let mut start_delta = 1usize;
    let mut end_delta = 1usize;
    if start > 0 && !chars[start - 1].is_whitespace() {
        replacement.insert(0, ' ');
        start_delta += 1;
    }
    if end < chars.len() && !chars[end].is_whitespace() {
        replacement.push(' ');
        end_delta += 1;
    }

    let replacement_len = replacement.chars().count();
    let text: String = chars[..start]
        .iter()
        .collect::<String>()
        + &replacement
        + &chars[end..].iter().collect::<String>();

    Some(QuoteSplice {
        text,
        sel_start: start + start_delta,
        sel_end: start + replacement_len - end_delta,
        normalized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_absent_and_oversize() {
        assert_eq!(filter_selection_text(None), "");
        assert_eq!(filter_selection_text(Some("foo")), "foo");
        let huge = "a".repeat(SELECTION_TEXT_MAX_LENGTH + 1);
        assert_eq!(filter_selection_text(Some(&huge)), SELECTION_TEXT_TOO_LONG_MARKER);
        // Idempotent: the marker itself is short enough to pass through.
        assert_eq!(
            filter_selection_text(Some(SELECTION_TEXT_TOO_LONG_MARKER)),
            SELECTION_TEXT_TOO_LONG_MARKER
        );
    }

    #[test]
    fn test_normalize_collapses_quotes_and_whitespace() {
        let raw = filter_selection_text(Some(" \u{201c} \"foo\" \u{201d}\u{201d}   "));
        assert_eq!(normalize_selection_text(&raw), "foo");
        assert_eq!(normalize_selection_text("foo \t \u{2033} bar"), "foo bar");
    }

    #[test]
    fn test_normalize_quotes_only_yields_empty() {
        assert_eq!(normalize_selection_text(" \" \"\" \u{ff02}\u{301d}   "), "");
        assert!(!is_normalized_text_valid(""));
    }

    #[test]
    fn test_normalize_marker_passthrough() {
        assert_eq!(
            normalize_selection_text(SELECTION_TEXT_TOO_LONG_MARKER),
            SELECTION_TEXT_TOO_LONG_MARKER
        );
        assert!(!is_normalized_text_valid(SELECTION_TEXT_TOO_LONG_MARKER));
    }

    #[test]
    fn test_quote_text() {
        assert_eq!(quote_text("foo bar"), "\"foo bar\"");
    }

    #[test]
    fn test_apply_quotes_plain() {
        let splice = apply_quotes("foo bar", 4, 7).unwrap();
        assert_eq!(splice.text, "foo \"bar\"");
        assert_eq!((splice.sel_start, splice.sel_end), (5, 8));
        assert_eq!(splice.normalized, "bar");
    }

    #[test]
    fn test_apply_quotes_absorbs_adjacent_quote() {
        // A bare quote immediately before the selection is absorbed rather
        // than doubled.
        let splice = apply_quotes("foo \"bar", 5, 8).unwrap();
        assert_eq!(splice.text, "foo \"bar\"");
        assert_eq!((splice.sel_start, splice.sel_end), (5, 8));
    }

    #[test]
    fn test_apply_quotes_absorbs_trailing_quote() {
        let splice = apply_quotes("foo bar\" baz", 4, 7).unwrap();
        assert_eq!(splice.text, "foo \"bar\" baz");
        assert_eq!((splice.sel_start, splice.sel_end), (5, 8));
    }

    #[test]
    fn test_apply_quotes_inserts_separating_spaces() {
        // Quoting the middle of a word must not smash the replacement into
        // the surrounding characters.
        let splice = apply_quotes("foobarbaz", 3, 6).unwrap();
        assert_eq!(splice.text, "foo \"bar\" baz");
        assert_eq!((splice.sel_start, splice.sel_end), (5, 8));
    }

    #[test]
    fn test_apply_quotes_whole_text() {
        let splice = apply_quotes("bar", 0, 3).unwrap();
        assert_eq!(splice.text, "\"bar\"");
        assert_eq!((splice.sel_start, splice.sel_end), (1, 4));
    }

    #[test]
    fn test_apply_quotes_invalid_selection() {
        assert!(apply_quotes("foo bar", 3, 4).is_none()); // whitespace only
        assert!(apply_quotes("\"\"", 0, 2).is_none()); // quotes only
        assert!(apply_quotes("foo", 1, 1).is_none()); // empty range
    }

    #[test]
    fn test_apply_quotes_repeated_adjacent_fragments() {
        // Quote "foo", then quote "bar" in the updated text; the second pass
        // must leave the first pair of quotes intact.
        let first = apply_quotes("foo bar", 0, 3).unwrap();
        assert_eq!(first.text, "\"foo\" bar");
        let second = apply_quotes(&first.text, 6, 9).unwrap();
        assert_eq!(second.text, "\"foo\" \"bar\"");
    }
}
