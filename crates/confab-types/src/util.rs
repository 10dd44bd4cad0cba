//! String helpers for log lines and previews.

/// Find the largest byte index <= `i` that is on a UTF-8 char boundary.
fn floor_char_boundary(s: &str, i: usize) -> usize {
    if i >= s.len() {
        return s.len();
    }
    let mut pos = i;
    while pos > 0 && !s.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

/// Truncate `&str` to at most `max_bytes`, never splitting a UTF-8 codepoint.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        s
    } else {
        &s[..floor_char_boundary(s, max_bytes)]
    }
}

/// Collapse a message to a single trimmed line of at most `max_bytes`,
/// appending `...` when anything was cut. Used for session previews
/// and log output, never for content that reaches the model.
pub fn preview_line(s: &str, max_bytes: usize) -> String {
    let first_line = s.trim().lines().next().unwrap_or("");
    let multiline = s.trim().lines().count() > 1;
    if first_line.len() <= max_bytes && !multiline {
        first_line.to_string()
    } else {
        format!("{}...", truncate_str(first_line, max_bytes))
    }
}
