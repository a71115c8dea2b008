//! Match reporting.
//!
//! Every located span becomes one output record carrying two things: the
//! sort key the downstream ordering contract is defined over, and the
//! human-readable display line. The key is `(matched text, rotated name)`;
//! rotating the record name left by one character puts the structure part
//! of a PDB-style identifier before its leading digit, which is what makes
//! the secondary ordering useful.
//!
//! The display line shows the match in stored case, flanked by
//! `context_pre`/`context_post` residues folded to lowercase (positions
//! outside the sequence render as blanks), with begin/end residue numbers
//! resolved through the record's own numbering:
//!
//! ```text
//! 1abc A    3 to    5 ->   acWYVdehi matching WYV
//! ```
//!
//! Ordering is an in-process stable sort over the documented key; the
//! external sort-utility pass of the original pipeline is retired.

use crate::model::{LabelResult, SequenceRecord};
use crate::pattern::{CompiledPattern, MatchSpan};

/// One reportable match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    /// Matched residues, stored case (primary sort key).
    pub matched: String,
    /// Record name rotated left by one character (secondary sort key).
    pub sort_name: String,
    /// Formatted display line.
    pub line: String,
}

/// Per-query counters for the end-of-query summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub sequences_examined: usize,
    pub sequences_matched: usize,
    pub matches_found: usize,
}

impl QueryStats {
    /// Summary line, e.g. `3 matches in 2 out of 40 sequences.`
    pub fn summary(&self) -> String {
        format!(
            "{} match{} in {} out of {} sequences.",
            self.matches_found,
            if self.matches_found == 1 { "" } else { "es" },
            self.sequences_matched,
            self.sequences_examined
        )
    }
}

/// Collects match records for one query and orders them for emission.
#[derive(Debug)]
pub struct MatchReporter {
    context_pre: usize,
    context_post: usize,
    records: Vec<MatchRecord>,
}

impl MatchReporter {
    /// Creates a reporter showing `context_pre`/`context_post` residues
    /// around each match.
    pub fn new(context_pre: usize, context_post: usize) -> Self {
        Self {
            context_pre,
            context_post,
            records: Vec::new(),
        }
    }

    /// Returns the number of collected records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no match has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Builds and stores the record for one located span.
    ///
    /// Fails when a boundary residue number cannot be resolved; the caller
    /// reports that and abandons the query rather than printing garbage.
    pub fn record(
        &mut self,
        record: &SequenceRecord,
        span: MatchSpan,
        raw_query: &str,
    ) -> LabelResult<()> {
        let residues = record.residues();
        let begin_label = record.residue_label(span.begin)?;
        let end_label = record.residue_label(span.begin + span.len - 1)?;

        let matched: String = residues[span.begin..span.begin + span.len]
            .iter()
            .map(|&b| b as char)
            .collect();

        let mut context = String::with_capacity(span.len + self.context_pre + self.context_post);
        for i in (span.begin as i64 - self.context_pre as i64)..span.begin as i64 {
            if i < 0 {
                context.push(' ');
            } else {
                context.push(residues[i as usize].to_ascii_lowercase() as char);
            }
        }
        context.push_str(&matched);
        for i in span.begin + span.len..span.begin + span.len + self.context_post {
            if i >= residues.len() {
                context.push(' ');
            } else {
                context.push(residues[i].to_ascii_lowercase() as char);
            }
        }

        let sort_name = rotate_name(&record.name);
        let line = format!(
            "{} {} {:>4} to {:>4} -> {} matching {}",
            record.name, record.chain, begin_label, end_label, context, raw_query
        );

        self.records.push(MatchRecord {
            matched,
            sort_name,
            line,
        });
        Ok(())
    }

    /// Drains the collected records, stably sorted on
    /// `(matched, sort_name)`.
    pub fn take_sorted(&mut self) -> Vec<MatchRecord> {
        let mut records = std::mem::take(&mut self.records);
        records.sort_by(|a, b| {
            (a.matched.as_str(), a.sort_name.as_str())
                .cmp(&(b.matched.as_str(), b.sort_name.as_str()))
        });
        records
    }
}

/// Scans one record with a compiled pattern, feeding every span to the
/// reporter and updating the counters.
pub fn scan_record(
    record: &SequenceRecord,
    compiled: &CompiledPattern,
    raw_query: &str,
    reporter: &mut MatchReporter,
    stats: &mut QueryStats,
) -> LabelResult<()> {
    stats.sequences_examined += 1;
    let mut any = false;
    for span in compiled.scan(record.residues()) {
        stats.matches_found += 1;
        any = true;
        reporter.record(record, span, raw_query)?;
    }
    if any {
        stats.sequences_matched += 1;
    }
    Ok(())
}

/// `name[1..] + name[0]`: the secondary sort key of the output contract.
fn rotate_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => {
            let mut rotated: String = chars.collect();
            rotated.push(first);
            rotated
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::expand;
    use crate::seqdb;
    use crate::tables::{MacroTables, ReloadPolicy};
    use std::io::Cursor;

    fn record(name: &str, origin: &str, residues: &[u8]) -> SequenceRecord {
        SequenceRecord {
            name: name.to_string(),
            chain: 'A',
            origin: origin.to_string(),
            origin_n: origin.parse().ok(),
            residues: residues.to_vec(),
            overrides: None,
        }
    }

    #[test]
    fn test_rotate_name() {
        assert_eq!(rotate_name("1abc"), "abc1");
        assert_eq!(rotate_name("x"), "x");
        assert_eq!(rotate_name(""), "");
    }

    #[test]
    fn test_context_with_blank_flanks() {
        let rec = record("1abc", "1", b"WYVDE");
        let mut reporter = MatchReporter::new(4, 4);
        reporter
            .record(&rec, MatchSpan { begin: 0, len: 3 }, "WYV")
            .unwrap();
        let rec = reporter.take_sorted().pop().unwrap();
        // four blanks before, two lowercase residues and two blanks after
        assert_eq!(rec.line, "1abc A    1 to    3 ->     WYVde   matching WYV");
    }

    #[test]
    fn test_context_folds_case_but_match_keeps_case() {
        let rec = record("1abc", "1", b"ACDEFGHIK");
        let mut reporter = MatchReporter::new(2, 2);
        reporter
            .record(&rec, MatchSpan { begin: 3, len: 2 }, "EF")
            .unwrap();
        let out = reporter.take_sorted().pop().unwrap();
        assert_eq!(out.matched, "EF");
        assert_eq!(out.line, "1abc A    4 to    5 -> cdEFgh matching EF");
    }

    #[test]
    fn test_sort_key_ordering() {
        let rec_a = record("2xyz", "1", b"AAAA");
        let rec_b = record("1abc", "1", b"AAGG");
        let mut reporter = MatchReporter::new(0, 0);
        reporter
            .record(&rec_a, MatchSpan { begin: 0, len: 2 }, "q")
            .unwrap();
        reporter
            .record(&rec_b, MatchSpan { begin: 2, len: 2 }, "q")
            .unwrap();
        reporter
            .record(&rec_b, MatchSpan { begin: 0, len: 2 }, "q")
            .unwrap();
        let sorted = reporter.take_sorted();
        // "AA" lines first; within them "abc1" sorts before "xyz2"
        assert_eq!(sorted[0].matched, "AA");
        assert_eq!(sorted[0].sort_name, "abc1");
        assert_eq!(sorted[1].sort_name, "xyz2");
        assert_eq!(sorted[2].matched, "GG");
    }

    #[test]
    fn test_unresolvable_label_propagates() {
        let mut rec = record("1abc", "n/a", b"ACDE");
        rec.origin_n = None;
        let mut reporter = MatchReporter::new(4, 4);
        assert!(reporter
            .record(&rec, MatchSpan { begin: 0, len: 2 }, "AC")
            .is_err());
    }

    #[test]
    fn test_end_to_end_single_match() {
        // database record 1abc/A, origin 1, residues ACDE; query "AC"
        let db = seqdb::load(Cursor::new("1abc A 1 4\nACDE\n"), usize::MAX).unwrap();
        let mut tables = MacroTables::new("/nonexistent", "/nonexistent", ReloadPolicy::Once);
        tables.reload_if_needed();

        let expansion = expand("AC", &tables).unwrap();
        assert_eq!(expansion.pattern, "AC");
        let compiled = CompiledPattern::compile(&expansion.pattern).unwrap();

        let mut reporter = MatchReporter::new(4, 4);
        let mut stats = QueryStats::default();
        for rec in &db.records {
            scan_record(rec, &compiled, "AC", &mut reporter, &mut stats).unwrap();
        }

        assert_eq!(stats.matches_found, 1);
        assert_eq!(stats.sequences_matched, 1);
        assert_eq!(stats.sequences_examined, 1);

        let records = reporter.take_sorted();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].matched, "AC");
        assert!(records[0].line.contains("   1 to    2"));
        assert_eq!(stats.summary(), "1 match in 1 out of 1 sequences.");
    }
}
