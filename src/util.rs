//! Small string helpers shared by logging and error paths.

/// Shorten `s` to `max_chars` characters for logs and error messages,
/// appending `...` when anything was cut.
///
/// Counts characters, not bytes, so Japanese mention text and emoji in
/// upstream error bodies are never split mid-character.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    let Some((cut, _)) = s.char_indices().nth(max_chars) else {
        return s.to_string();
    };
    format!("{}...", s[..cut].trim_end())
}
