//! Data model for the sequence database.
//!
//! This module contains the structures produced by the database loader:
//! - `SequenceRecord`: one sequence with its identity and numbering info
//! - `SequenceDatabase`: the ordered, read-only collection of records
//!
//! Residue-number resolution lives here as well. Most records label their
//! residues by position alone (`index + origin`), so no per-residue strings
//! are stored for them; records whose numbering goes irregular carry a
//! sparse override table filled in by the loader.

use thiserror::Error;

/// Errors from residue-number resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LabelError {
    /// The record has no usable label for this index: the slot has no
    /// explicit override and the declared origin is not numeric, so the
    /// positional formula cannot apply.
    #[error("no residue number for '{name}' index {index}: origin '{origin}' is not numeric")]
    Unresolvable {
        name: String,
        index: usize,
        origin: String,
    },
}

/// Result type for label resolution.
pub type LabelResult<T> = Result<T, LabelError>;

/// A single sequence record from the database file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    /// Record name (PDB-style identifier, case-folded to lowercase on load)
    pub name: String,
    /// One-character chain id; `_` denotes a blank/absent chain
    pub chain: char,
    /// Declared starting label for residue index 0, as written in the file
    pub origin: String,
    /// Integer value of `origin` when it is purely numeric
    pub origin_n: Option<i32>,
    /// Residue characters, exactly as stored in the file
    pub residues: Vec<u8>,
    /// Sparse residue-number overrides; `None` for records whose labels
    /// follow the positional formula throughout
    pub overrides: Option<Vec<Option<String>>>,
}

impl SequenceRecord {
    /// Returns the number of residues.
    pub fn len(&self) -> usize {
        self.residues.len()
    }

    /// Returns true if the record holds no residues.
    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// Returns the residue characters.
    pub fn residues(&self) -> &[u8] {
        &self.residues
    }

    /// True if every label follows the `index + origin` formula.
    pub fn is_standard(&self) -> bool {
        self.overrides.is_none()
    }

    /// Resolves the display label for the residue at `index`.
    ///
    /// Rules, in order:
    /// 1. an explicit override entry wins;
    /// 2. otherwise a numeric origin yields `index + origin`;
    /// 3. otherwise the label is unresolvable and reported as such, never
    ///    silently rendered as empty or garbage text.
    ///
    /// `index` must be within the record's residue range.
    pub fn residue_label(&self, index: usize) -> LabelResult<String> {
        if let Some(table) = &self.overrides {
            if let Some(Some(label)) = table.get(index) {
                return Ok(label.clone());
            }
        }
        match self.origin_n {
            Some(n) => Ok((index as i32 + n).to_string()),
            None => Err(LabelError::Unresolvable {
                name: self.name.clone(),
                index,
                origin: self.origin.clone(),
            }),
        }
    }
}

/// The loaded database: an ordered collection of records, built once and
/// treated as read-only afterward.
#[derive(Debug, Clone, Default)]
pub struct SequenceDatabase {
    /// All records, in file order
    pub records: Vec<SequenceRecord>,
}

impl SequenceDatabase {
    /// Returns the number of loaded records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing was loaded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up a record by `(name, chain)`.
    ///
    /// Names are stored lowercase, so the lookup folds its argument too.
    /// A linear scan returning the first hit; duplicate keys are permitted
    /// by convention and later duplicates are simply shadowed.
    pub fn find(&self, name: &str, chain: char) -> Option<&SequenceRecord> {
        let name = name.to_lowercase();
        self.records
            .iter()
            .find(|r| r.name == name && r.chain == chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard_record(origin: &str, residues: &[u8]) -> SequenceRecord {
        SequenceRecord {
            name: "1abc".to_string(),
            chain: 'A',
            origin: origin.to_string(),
            origin_n: origin.parse().ok().filter(|_| origin.bytes().all(|b| b.is_ascii_digit())),
            residues: residues.to_vec(),
            overrides: None,
        }
    }

    #[test]
    fn test_positional_labels() {
        let rec = standard_record("17", b"ACDEF");
        for i in 0..rec.len() {
            assert_eq!(rec.residue_label(i).unwrap(), (i as i32 + 17).to_string());
        }
    }

    #[test]
    fn test_override_wins_over_formula() {
        let mut rec = standard_record("1", b"ACDE");
        let mut table = vec![None; 4];
        table[2] = Some("106B".to_string());
        rec.overrides = Some(table);

        assert_eq!(rec.residue_label(2).unwrap(), "106B");
        // empty slots still use the formula when the origin is numeric
        assert_eq!(rec.residue_label(1).unwrap(), "2");
    }

    #[test]
    fn test_unresolvable_label() {
        let rec = standard_record("10A", b"ACDE");
        assert!(rec.origin_n.is_none());
        let err = rec.residue_label(0).unwrap_err();
        assert!(matches!(err, LabelError::Unresolvable { index: 0, .. }));
    }

    #[test]
    fn test_unresolvable_empty_slot_non_numeric_origin() {
        let mut rec = standard_record("10A", b"ACDE");
        let mut table = vec![None; 4];
        table[0] = Some("10A".to_string());
        rec.overrides = Some(table);

        assert_eq!(rec.residue_label(0).unwrap(), "10A");
        assert!(rec.residue_label(1).is_err());
    }

    #[test]
    fn test_find_by_name_and_chain() {
        let db = SequenceDatabase {
            records: vec![
                standard_record("1", b"ACDE"),
                SequenceRecord {
                    chain: 'B',
                    ..standard_record("1", b"GHIK")
                },
            ],
        };
        assert_eq!(db.find("1ABC", 'B').unwrap().residues(), b"GHIK");
        assert_eq!(db.find("1abc", 'A').unwrap().residues(), b"ACDE");
        assert!(db.find("2xyz", 'A').is_none());
    }
}
