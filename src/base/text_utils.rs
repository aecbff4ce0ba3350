//! Text helpers for working with editor buffers.

/// Check if a character is part of an identifier.
#[inline]
pub fn is_identifier_char(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_continue(c)
}

/// Check if a character can start an identifier.
#[inline]
pub fn is_identifier_start(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_start(c)
}

/// Character at a byte offset, if the offset lies on a char boundary.
pub fn char_at(text: &str, offset: usize) -> Option<char> {
    text.get(offset..)?.chars().next()
}

/// Character immediately before a byte offset.
pub fn char_before(text: &str, offset: usize) -> Option<char> {
    text.get(..offset)?.chars().next_back()
}

/// Find the identifier that contains or touches `offset`.
///
/// Returns the byte range of the word. A cursor right after the last
/// character of a word still selects that word.
pub fn word_at(text: &str, offset: usize) -> Option<(usize, usize)> {
    let offset = offset.min(text.len());
    let mut start = offset;
    while let Some(c) = char_before(text, start) {
        if !is_identifier_char(c) {
            break;
        }
        start -= c.len_utf8();
    }
    let mut end = offset;
    while let Some(c) = char_at(text, end) {
        if !is_identifier_char(c) {
            break;
        }
        end += c.len_utf8();
    }
    (start < end).then_some((start, end))
}

/// Skip forward over identifier characters starting at `offset`.
pub fn end_of_identifier(text: &str, mut offset: usize) -> usize {
    while let Some(c) = char_at(text, offset) {
        if !is_identifier_char(c) {
            break;
        }
        offset += c.len_utf8();
    }
    offset
}
