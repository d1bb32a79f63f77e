//! Character classes shared by the grammar and the writer.
use unicode_xid::UnicodeXID;

/// Horizontal whitespace, insignificant between tokens.
pub fn is_space(c: char) -> bool {
    c == ' ' || c == '\t'
}

pub fn is_newline(c: char) -> bool {
    c == '\n' || c == '\r'
}

pub fn is_whitespace(c: char) -> bool {
    is_space(c) || is_newline(c)
}

pub fn is_ident_start_char(c: char) -> bool {
    c == '_' || c.is_xid_start()
}

pub fn is_ident_char(c: char) -> bool {
    c == '-' || c.is_xid_continue()
}

/// Identifiers that parse to something other than text.
pub fn is_reserved_ident(s: &str) -> bool {
    matches!(s, "true" | "false" | "NaN" | "Infinity")
}

/// Returns true if `s` can be written without quotes and read back as the same text.
pub fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_ident_start_char(c) => {}
        _ => return false,
    }
    chars.all(is_ident_char) && !is_reserved_ident(s)
}

/// Characters that terminate a block item.
pub fn is_item_terminator(c: char) -> bool {
    matches!(c, ',' | ';' | '}' | ')' | ']' | '#') || is_newline(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers() {
        assert!(is_ident("node_uri"));
        assert!(is_ident("a-b"));
        assert!(is_ident("_x1"));
        assert!(is_ident("ünïcode"));
        assert!(!is_ident(""));
        assert!(!is_ident("1abc"));
        assert!(!is_ident("-a"));
        assert!(!is_ident("a b"));
        assert!(!is_ident("true"));
        assert!(!is_ident("NaN"));
    }
}
