//! Two-pass query expansion.
//!
//! A raw query line is shorthand: digits name wildcard-table entries,
//! lowercase letters name definition-table entries, and `X` means "any
//! residue". Expansion turns the shorthand into a pattern the engine can
//! compile, in two fixed passes over the whole string:
//!
//! 1. digits become bracketed wildcard classes (`1` -> `[ND]`), `X`
//!    becomes `.`, and `\` protects the following digit from expansion;
//! 2. lowercase letters become definition classes (`w` -> `[YWF]`); a
//!    letter already inside a bracket class splices in without the
//!    replacement's own brackets, so no nested class syntax is produced.
//!
//! ```text
//! YW1*wAQ  ->  YW[RA]*wAQ  ->  YW[RA]*[YWF]AQ
//! ```
//!
//! The passes are independent: digits are resolved only in pass 1, so a
//! replacement line may itself contain lowercase letters but never digits.

use thiserror::Error;

use crate::tables::MacroTables;

/// Errors that abort expansion of the current query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpandError {
    #[error("wildcard entry {0} not defined")]
    UndefinedWildcard(char),

    #[error("'{0}' not defined in the definition file")]
    UndefinedLetter(char),

    #[error("pattern too short for safety")]
    TooShort,
}

/// Result type for expansion.
pub type ExpandResult<T> = Result<T, ExpandError>;

/// A fully expanded query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Output of the digit pass; its length is the one the too-short
    /// check is defined over.
    pub pass1: String,
    /// Final engine-ready pattern.
    pub pattern: String,
}

/// Expands a raw query line against the given tables.
///
/// A pass-1 result of one character or less is rejected as too short to
/// search safely; like every other expansion failure this aborts only the
/// current query.
pub fn expand(raw: &str, tables: &MacroTables) -> ExpandResult<Expansion> {
    let pass1 = expand_wildcards(raw, tables)?;
    let pattern = expand_definitions(&pass1, tables)?;
    if pass1.len() <= 1 {
        return Err(ExpandError::TooShort);
    }
    Ok(Expansion { pass1, pattern })
}

/// Pass 1: digits to wildcard classes.
fn expand_wildcards(raw: &str, tables: &MacroTables) -> ExpandResult<String> {
    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        // 'X' (unknown residue) matches anything
        if c == 'X' {
            out.push('.');
            i += 1;
            continue;
        }
        // a backslash protects the following digit from expansion
        if c == '\\' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
            out.push(bytes[i + 1] as char);
            i += 2;
            continue;
        }
        if c.is_ascii_digit() {
            let entry = tables
                .wildcard(c)
                .ok_or(ExpandError::UndefinedWildcard(c))?;
            out.push('[');
            out.push_str(entry);
            out.push(']');
            i += 1;
            continue;
        }
        out.push(c);
        i += 1;
    }
    Ok(out)
}

/// Pass 2: lowercase letters to definition classes.
fn expand_definitions(pass1: &str, tables: &MacroTables) -> ExpandResult<String> {
    let bytes = pass1.as_bytes();
    let mut out = String::with_capacity(pass1.len());
    // bracket nesting, only consulted to detect "already inside a class"
    let mut depth: i32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if c == '[' {
            depth += 1;
        } else if c == ']' {
            depth -= 1;
        }
        // digits were resolved in pass 1; this guard protects literal
        // backslash-digit pairs that survived it
        if c == '\\' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
            out.push(bytes[i + 1] as char);
            i += 2;
            continue;
        }
        if c.is_ascii_lowercase() {
            let replacement = tables
                .definition(c)
                .ok_or(ExpandError::UndefinedLetter(c))?;
            if depth > 0 {
                // the replacement carries its own brackets; strip them so
                // the enclosing class stays legal
                let inner = replacement
                    .get(1..replacement.len().saturating_sub(1))
                    .unwrap_or("");
                out.push_str(inner);
            } else {
                out.push_str(replacement);
            }
            i += 1;
            continue;
        }
        out.push(c);
        i += 1;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::ReloadPolicy;

    fn tables(wildcards: &[&str], definitions: &[(char, &str)]) -> MacroTables {
        let mut t = MacroTables::new("/nonexistent", "/nonexistent", ReloadPolicy::Once);
        t.reload_if_needed();
        t.wildcards = wildcards.iter().map(|s| s.to_string()).collect();
        t.definitions = definitions
            .iter()
            .map(|(k, v)| (*k, v.to_string()))
            .collect();
        t
    }

    #[test]
    fn test_digit_expansion() {
        let t = tables(&["ND"], &[]);
        let e = expand("A1C", &t).unwrap();
        assert_eq!(e.pass1, "A[ND]C");
        assert_eq!(e.pattern, "A[ND]C");
    }

    #[test]
    fn test_escape_protects_digit() {
        let t = tables(&["ND"], &[]);
        let e = expand("A\\1C", &t).unwrap();
        assert_eq!(e.pattern, "A1C");
    }

    #[test]
    fn test_x_becomes_dot() {
        let t = tables(&[], &[]);
        assert_eq!(expand("AXC", &t).unwrap().pattern, "A.C");
    }

    #[test]
    fn test_idempotence_without_shorthand() {
        // no digits, no lowercase letters, no X: both passes are identity
        let t = tables(&["ND"], &[('a', "[AGS]")]);
        let raw = "^YW[RT]*.Q$";
        let e = expand(raw, &t).unwrap();
        assert_eq!(e.pattern, raw);
    }

    #[test]
    fn test_letter_expansion() {
        let t = tables(&[], &[('w', "[YWF]")]);
        assert_eq!(expand("AwQ", &t).unwrap().pattern, "A[YWF]Q");
    }

    #[test]
    fn test_letter_inside_class_loses_brackets() {
        let t = tables(&[], &[('w', "[YWF]")]);
        assert_eq!(expand("[RwT]Q", &t).unwrap().pattern, "[RYWFT]Q");
    }

    #[test]
    fn test_combined_example() {
        // the worked example from the original usage notes
        let t = tables(&["ND", "RA"], &[('a', "[AGS]"), ('w', "[YWF]")]);
        assert_eq!(expand("YW1*wAQ", &t).unwrap().pattern, "YW[RA]*[YWF]AQ");
    }

    #[test]
    fn test_undefined_wildcard_digit() {
        let t = tables(&["ND"], &[]);
        assert_eq!(
            expand("A2C", &t).unwrap_err(),
            ExpandError::UndefinedWildcard('2')
        );
        assert_eq!(
            expand("A0C", &t).unwrap_err(),
            ExpandError::UndefinedWildcard('0')
        );
    }

    #[test]
    fn test_undefined_letter() {
        let t = tables(&[], &[('a', "[AGS]")]);
        assert_eq!(
            expand("AbC", &t).unwrap_err(),
            ExpandError::UndefinedLetter('b')
        );
    }

    #[test]
    fn test_too_short_after_pass_one() {
        let t = tables(&[], &[]);
        assert_eq!(expand("A", &t).unwrap_err(), ExpandError::TooShort);
        assert_eq!(expand("  ", &t).unwrap_err(), ExpandError::TooShort);
    }

    #[test]
    fn test_whitespace_dropped() {
        let t = tables(&[], &[]);
        assert_eq!(expand("A C D", &t).unwrap().pattern, "ACD");
    }

    #[test]
    fn test_escaped_bound_digits_survive_both_passes() {
        // the user writes .\{\2,\4\}; pass 1 strips the digit escapes and
        // the engine sees plain bounds
        let t = tables(&[], &[]);
        assert_eq!(expand(".\\{\\2,\\4\\}", &t).unwrap().pattern, ".\\{2,4\\}");
    }
}
