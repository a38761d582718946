//! String helpers shared by the tracker crates.
//!
//! Two concerns live here: trimming news text to a byte budget without
//! splitting a UTF-8 character (prompt sizing), and squeezing arbitrary text
//! into Latin-1 for the PDF writer, which only speaks WinAnsi.

/// Truncate a `&str` to a byte budget at a character boundary (prefix).
///
/// Returns the longest prefix of `s` that fits within `max_bytes` bytes
/// while ending at a valid UTF-8 character boundary.
///
/// # Examples
///
/// ```
/// use tracker_utils_string::take_bytes_at_char_boundary;
///
/// assert_eq!(take_bytes_at_char_boundary("hello world", 5), "hello");
/// assert_eq!(take_bytes_at_char_boundary("héllo", 2), "h"); // é is 2 bytes
/// assert_eq!(take_bytes_at_char_boundary("héllo", 3), "hé");
/// ```
#[inline]
pub fn take_bytes_at_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut last_ok = 0;
    for (i, ch) in s.char_indices() {
        let next_byte = i + ch.len_utf8();
        if next_byte > max_bytes {
            break;
        }
        last_ok = next_byte;
    }
    &s[..last_ok]
}

/// Byte used in place of characters that have no Latin-1 encoding.
pub const LATIN1_REPLACEMENT: u8 = b'?';

/// Encode `s` as Latin-1 (ISO-8859-1), replacing anything above U+00FF with `?`.
///
/// Never fails. Control characters other than tab are also replaced so the
/// output can be dropped straight into a PDF string literal.
///
/// ```
/// use tracker_utils_string::to_latin1_lossy;
///
/// assert_eq!(to_latin1_lossy("café"), b"caf\xe9".to_vec());
/// assert_eq!(to_latin1_lossy("Kyiv — Київ"), b"Kyiv ? ????".to_vec());
/// ```
pub fn to_latin1_lossy(s: &str) -> Vec<u8> {
    s.chars()
        .map(|ch| match u32::from(ch) {
            0x09 => b' ',
            c if c < 0x20 || c == 0x7f => LATIN1_REPLACEMENT,
            c => u8::try_from(c).unwrap_or(LATIN1_REPLACEMENT),
        })
        .collect()
}

/// Collapse runs of whitespace (including newlines) into single spaces.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
