//! Keeps user-supplied strings (player ids, option ids, surface names) on a
//! single log line.

/// Characters kept before a value is cut.
const PREVIEW_CHARS: usize = 120;

/// Debug-escape `s` (control characters, quotes, backslashes) and cap it at
/// `PREVIEW_CHARS` characters, marking a cut with `…`.
pub fn escape_log(s: &str) -> String {
    let mut chars = s.chars();
    let mut out: String = chars.by_ref().take(PREVIEW_CHARS).flat_map(char::escape_debug).collect();
    if chars.next().is_some() {
        out.push('…');
    }
    out
}
