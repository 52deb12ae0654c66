//! SQL quoting for statements passed to `psql -c`.
//!
//! Statements travel as a single argv element, never through a shell,
//! but names and passwords still have to be quoted for the server.

/// Quote an identifier: wrap in double quotes, doubling embedded ones.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a string literal.
///
/// Embedded single quotes are doubled. Literals containing a backslash
/// use the `E'...'` form with backslashes doubled, so the result does not
/// depend on `standard_conforming_strings`.
pub fn quote_literal(value: &str) -> String {
    let escaped = value.replace('\'', "''");
    if escaped.contains('\\') {
        format!("E'{}'", escaped.replace('\\', "\\\\"))
    } else {
        format!("'{escaped}'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("bob"), "\"bob\"");
        assert_eq!(quote_ident("Mixed Case"), "\"Mixed Case\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("app"), "'app'");
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_literal("x'; DROP ROLE bob; --"), "'x''; DROP ROLE bob; --'");
        assert_eq!(quote_literal("back\\slash"), "E'back\\\\slash'");
    }
}
