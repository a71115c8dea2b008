//! Shorthand expansion tables.
//!
//! Two optional files drive query expansion:
//!
//! ## Wildcard File
//!
//! Up to 12 significant lines; the first whitespace-delimited token of each
//! non-blank, non-`#` line becomes one entry. Pattern digit `1` addresses
//! the first entry, `2` the second, and so on (digit `0` never resolves):
//!
//! ```text
//! # wilddef.dat
//! ND
//! RA
//! ```
//!
//! ## Definition File
//!
//! Up to 40 lines of the form `<letter> <replacement>`, matched
//! case-insensitively on the letter; blank and `#` lines are skipped:
//!
//! ```text
//! a [AGS]
//! w [YWF]
//! ```
//!
//! A line beginning with the literal text `# Matrix` is not a definition:
//! it is a header the host echoes verbatim to its output stream.
//!
//! ## Reloading
//!
//! Interactive sessions re-read both files before every query so edits take
//! effect immediately; batch sessions read them once. A missing file simply
//! leaves that table empty - the host warns about it at startup.

use std::io;
use std::path::{Path, PathBuf};

/// Maximum number of wildcard entries honored.
pub const MAX_WILDCARDS: usize = 12;
/// Maximum number of letter definitions honored.
pub const MAX_DEFINITIONS: usize = 40;

/// When table files are re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadPolicy {
    /// Re-read before every query (interactive sessions).
    EveryQuery,
    /// Read once for the lifetime of the process (batch sessions).
    Once,
}

/// The wildcard and letter-definition tables, owned by the query session.
#[derive(Debug)]
pub struct MacroTables {
    wildcard_path: PathBuf,
    definition_path: PathBuf,
    policy: ReloadPolicy,
    loaded: bool,
    /// Wildcard entries; index 0 is addressed by pattern digit `1`.
    pub wildcards: Vec<String>,
    /// `(key letter, replacement)` pairs in file order.
    pub definitions: Vec<(char, String)>,
    /// Captured `# Matrix` header line, if the definition file has one.
    pub matrix_header: Option<String>,
}

impl MacroTables {
    /// Creates empty tables bound to the two file paths. Nothing is read
    /// until [`reload_if_needed`](Self::reload_if_needed) runs.
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(
        wildcard_path: P,
        definition_path: Q,
        policy: ReloadPolicy,
    ) -> Self {
        Self {
            wildcard_path: wildcard_path.into(),
            definition_path: definition_path.into(),
            policy,
            loaded: false,
            wildcards: Vec::new(),
            definitions: Vec::new(),
            matrix_header: None,
        }
    }

    /// Applies the reload policy: always on the first call, and on every
    /// call under [`ReloadPolicy::EveryQuery`].
    pub fn reload_if_needed(&mut self) {
        if !self.loaded || self.policy == ReloadPolicy::EveryQuery {
            self.reload();
        }
    }

    /// Re-reads both files unconditionally. A file that cannot be opened
    /// empties its table.
    pub fn reload(&mut self) {
        match load_wildcards(&self.wildcard_path) {
            Ok(wildcards) => self.wildcards = wildcards,
            Err(err) => {
                log::debug!(
                    "wildcard file {}: {err}",
                    self.wildcard_path.display()
                );
                self.wildcards.clear();
            }
        }
        match load_definitions(&self.definition_path) {
            Ok((definitions, matrix_header)) => {
                self.definitions = definitions;
                self.matrix_header = matrix_header;
            }
            Err(err) => {
                log::debug!(
                    "definition file {}: {err}",
                    self.definition_path.display()
                );
                self.definitions.clear();
                self.matrix_header = None;
            }
        }
        self.loaded = true;
    }

    /// Looks up the wildcard entry addressed by a pattern digit.
    /// Digit `1` maps to entry 0; `0` and digits past the loaded count
    /// resolve to nothing.
    pub fn wildcard(&self, digit: char) -> Option<&str> {
        let index = (digit as usize).checked_sub('1' as usize)?;
        self.wildcards.get(index).map(String::as_str)
    }

    /// Looks up a letter definition, case-insensitively.
    pub fn definition(&self, letter: char) -> Option<&str> {
        self.definitions
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(&letter))
            .map(|(_, replacement)| replacement.as_str())
    }
}

/// Parses a wildcard file: first token of each significant line, capped at
/// [`MAX_WILDCARDS`].
pub fn load_wildcards<P: AsRef<Path>>(path: P) -> io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    let mut entries = Vec::new();
    for line in content.lines() {
        if entries.len() == MAX_WILDCARDS {
            break;
        }
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(token) = line.split_whitespace().next() {
            entries.push(token.to_string());
        }
    }
    Ok(entries)
}

/// Parses a definition file into `(key, replacement)` pairs plus the
/// optional `# Matrix` header, capped at [`MAX_DEFINITIONS`].
///
/// Malformed lines are warned about and ignored, as the original tables
/// were forgiving of hand-edited files.
pub fn load_definitions<P: AsRef<Path>>(
    path: P,
) -> io::Result<(Vec<(char, String)>, Option<String>)> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let mut definitions = Vec::new();
    let mut matrix_header = None;
    for (number, line) in content.lines().enumerate() {
        if definitions.len() == MAX_DEFINITIONS {
            break;
        }
        if matrix_header.is_none() && line.starts_with("# Matrix") {
            matrix_header = Some(line.to_string());
            continue;
        }
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let key = fields.next().unwrap_or_default();
        let replacement = fields.next();
        match (key.chars().next(), key.chars().count(), replacement) {
            (Some(letter), 1, Some(replacement)) => {
                definitions.push((letter, replacement.to_string()));
            }
            _ => {
                log::warn!(
                    "format problem in file {}, line {}: {line} - line ignored",
                    path.display(),
                    number + 1
                );
            }
        }
    }
    Ok((definitions, matrix_header))
}
