//! # sequery - Sequence Database Pattern Search
//!
//! Searches an in-memory database of biological sequences for occurrences
//! of shorthand patterns, reporting each match with flanking context and
//! the record's own residue numbering.
//!
//! ## Architecture
//!
//! The pipeline has clear separation between its stages:
//! - `model`: Sequence records, the loaded database, residue-number resolution
//! - `seqdb`: Parser for the origin-count sequence database format
//! - `tables`: Wildcard and letter-definition shorthand tables
//! - `expand`: Two-pass expansion of shorthand queries into engine patterns
//! - `pattern`: Restricted "ed"-style pattern compiler and overlap-aware scanner
//! - `report`: Match record assembly, context flanks, and sort-key ordering
//!
//! A query line flows through `expand` (consulting `tables`), is compiled by
//! `pattern`, scanned over every record of the database, and each located
//! span is rendered by `report` using the numbering rules in `model`.

pub mod expand;
pub mod model;
pub mod pattern;
pub mod report;
pub mod seqdb;
pub mod tables;
