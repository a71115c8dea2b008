//! Sequence database format parser.
//!
//! ## Database Format
//!
//! The file is token oriented. Each record starts with a header line of four
//! whitespace-separated fields, followed by exactly `LENGTH` residue
//! characters read as a stream that ignores whitespace and `#...` comment
//! runs:
//!
//! ```text
//! 1abc A 1 8
//! ACDEFGHI
//! 2xyz _ 102 4
//! # residues may be split across lines and commented freely
//! WY
//! VR
//! ```
//!
//! A residue may be prefixed by a parenthesized override label:
//!
//! ```text
//! 3pqr A 95 4
//! AC(106B)DE
//! ```
//!
//! From the first override on, the record's numbering is irregular: every
//! later residue receives an explicit label, counting up from the last
//! parsed override value. The one exception is an override at index 0 that
//! merely restates a numeric origin; such a record collapses back to the
//! positional formula and stores no override table at all.
//!
//! ## End Conditions
//!
//! A header that cannot be parsed (fewer than four tokens, a non-numeric
//! length, or end of input) ends loading and keeps the records read so far;
//! this is the format's natural terminator, not an error. End of input in
//! the middle of a residue body discards that partial record and likewise
//! stops loading.

use std::io::{self, BufRead};

use crate::model::{SequenceDatabase, SequenceRecord};

/// Reads records one at a time from a buffered source.
///
/// This is the loader's engine and also the memory-bounded path: a host can
/// re-open the database file per query and scan records as they stream by,
/// dropping each one (residues and override table together) before the next
/// is read.
pub struct RecordReader<R: BufRead> {
    reader: R,
}

impl<R: BufRead> RecordReader<R> {
    /// Wraps a buffered reader positioned at the start of a record.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads the next complete record.
    ///
    /// Returns `Ok(None)` at end of input, on an unparsable header, or when
    /// input ends inside a residue body (the partial record is discarded).
    /// Only genuine I/O failures surface as errors.
    pub fn next_record(&mut self) -> io::Result<Option<SequenceRecord>> {
        let name = match self.next_token()? {
            Some(tok) => tok.to_lowercase(),
            None => return Ok(None),
        };
        let chain = match self.next_token()? {
            Some(tok) => tok.chars().next().unwrap_or('_'),
            None => return Ok(None),
        };
        let origin = match self.next_token()? {
            Some(tok) => tok,
            None => return Ok(None),
        };
        let len: usize = match self.next_token()?.and_then(|tok| tok.parse().ok()) {
            Some(n) => n,
            None => return Ok(None),
        };

        let origin_n = if !origin.is_empty() && origin.bytes().all(|b| b.is_ascii_digit()) {
            origin.parse::<i32>().ok()
        } else {
            None
        };

        let mut residues: Vec<u8> = Vec::with_capacity(len);
        let mut overrides: Option<Vec<Option<String>>> = None;
        // running residue number, reseeded by each parsed override label
        let mut counter: i32 = 0;

        while residues.len() < len {
            let c = match self.next_significant()? {
                Some(c) => c,
                None => return Ok(None), // truncated body
            };
            if c == b'(' {
                let mut label = String::new();
                loop {
                    match self.next_byte()? {
                        Some(b')') => break,
                        Some(b) => label.push(b as char),
                        None => return Ok(None),
                    }
                }
                let index = residues.len();
                let parsed = leading_int(&label);
                if let Some(v) = parsed {
                    counter = v;
                }
                if index == 0 && origin_n.is_some() && parsed == origin_n {
                    // The label restates the declared origin: the positional
                    // formula still holds, so no override table is kept.
                    overrides = None;
                } else {
                    let table = overrides.get_or_insert_with(|| vec![None; len]);
                    table[index] = Some(label);
                }
                let residue = match self.next_nonspace()? {
                    Some(b) => b,
                    None => return Ok(None),
                };
                residues.push(residue);
            } else if let Some(table) = overrides.as_mut() {
                // irregular numbering: every residue from here on gets an
                // explicit, sequentially incremented label
                counter += 1;
                table[residues.len()] = Some(counter.to_string());
                residues.push(c);
            } else {
                residues.push(c);
            }
        }

        Ok(Some(SequenceRecord {
            name,
            chain,
            origin,
            origin_n,
            residues,
            overrides,
        }))
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let buf = self.reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(None);
        }
        let b = buf[0];
        self.reader.consume(1);
        Ok(Some(b))
    }

    /// Next byte that is neither whitespace nor part of a `#...` comment run.
    fn next_significant(&mut self) -> io::Result<Option<u8>> {
        loop {
            match self.next_byte()? {
                None => return Ok(None),
                Some(b'#') => loop {
                    match self.next_byte()? {
                        None => return Ok(None),
                        Some(b'\n') => break,
                        Some(_) => {}
                    }
                },
                Some(b) if b.is_ascii_whitespace() => {}
                Some(b) => return Ok(Some(b)),
            }
        }
    }

    /// Next byte that is not whitespace. Comments are not special here;
    /// this is only used for the residue following an override label.
    fn next_nonspace(&mut self) -> io::Result<Option<u8>> {
        loop {
            match self.next_byte()? {
                None => return Ok(None),
                Some(b) if b.is_ascii_whitespace() => {}
                Some(b) => return Ok(Some(b)),
            }
        }
    }

    /// Next whitespace-delimited token, skipping comment runs.
    fn next_token(&mut self) -> io::Result<Option<String>> {
        let first = match self.next_significant()? {
            Some(b) => b,
            None => return Ok(None),
        };
        let mut token = String::new();
        token.push(first as char);
        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                break;
            }
            let b = buf[0];
            if b.is_ascii_whitespace() {
                break;
            }
            token.push(b as char);
            self.reader.consume(1);
        }
        Ok(Some(token))
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = io::Result<SequenceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Loads up to `max_records` records from `reader`.
///
/// Loading stops at end of input, at the first record that cannot be
/// completed, or at the cap, whichever comes first. The count of loaded
/// records is the database's length.
pub fn load<R: BufRead>(reader: R, max_records: usize) -> io::Result<SequenceDatabase> {
    let mut records = Vec::new();
    let mut source = RecordReader::new(reader);
    while records.len() < max_records {
        match source.next_record()? {
            Some(record) => records.push(record),
            None => break,
        }
    }
    Ok(SequenceDatabase { records })
}

/// Leading integer of a label, the way `sscanf("%d")` would read it:
/// optional sign after leading whitespace, then digits. `None` when the
/// label does not start with a number.
fn leading_int(s: &str) -> Option<i32> {
    let t = s.trim_start();
    let (negative, rest) = match t.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, t.strip_prefix('+').unwrap_or(t)),
    };
    let digits: &str = &rest[..rest.bytes().take_while(|b| b.is_ascii_digit()).count()];
    if digits.is_empty() {
        return None;
    }
    let value: i64 = digits.parse().ok()?;
    i32::try_from(if negative { -value } else { value }).ok()
}
