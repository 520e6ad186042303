//! Whitespace normalisation and offset translation between normalised and source text.
//!
//! Rendering collapses whitespace, so a fragment copied from the rendered view rarely
//! matches the source byte-for-byte. Normalising both sides makes them comparable; the
//! helpers here map positions in the normalised form back onto the original text.

/// Collapse every maximal run of whitespace into a single ASCII space.
///
/// Non-whitespace characters are preserved in order. Leading and trailing runs are
/// collapsed as well, not removed.
pub fn normalize(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    let mut in_run = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_run {
                normalized.push(' ');
                in_run = true;
            }
        } else {
            normalized.push(ch);
            in_run = false;
        }
    }
    normalized
}

/// Translate a byte offset in `normalize(source)` back into a byte offset in `source`.
///
/// Walks both strings in lockstep: each non-whitespace character advances the normalised
/// cursor by its encoded length and each whitespace run advances it by one. Returns the
/// smallest source offset whose normalised position reaches `target`, or `source.len()`
/// when `target` lies past the end of the normalised text.
pub fn source_index_for_normalized(source: &str, target: usize) -> usize {
    let mut normalized = 0;
    let mut chars = source.char_indices().peekable();

    while let Some(&(index, ch)) = chars.peek() {
        if normalized >= target {
            return index;
        }
        chars.next();
        if ch.is_whitespace() {
            while chars.next_if(|(_, next)| next.is_whitespace()).is_some() {}
            normalized += 1;
        } else {
            normalized += ch.len_utf8();
        }
    }

    source.len()
}

/// Move `count` characters backwards from byte offset `from`, stopping at the start.
pub fn retreat_chars(text: &str, from: usize, count: usize) -> usize {
    if count == 0 {
        return from;
    }
    text[..from]
        .char_indices()
        .rev()
        .take(count)
        .last()
        .map_or(from, |(index, _)| index)
}

/// Move `count` characters forwards from byte offset `from`, stopping at the end.
pub fn advance_chars(text: &str, from: usize, count: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(count)
        .map_or(text.len(), |(index, _)| from + index)
}
