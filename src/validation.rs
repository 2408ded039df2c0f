//! Input validation for the wizard.
//!
//! Everything here is a pure function of its arguments. A rejected input is
//! reported as a [`Diagnostic`] value that the front-end shows next to the
//! field; nothing in this module panics or logs.

use crate::modes::{describe, FileKind, Mode};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    // 4-digit IMGT notation, e.g. HLA-A*02:01
    static ref ALLELE_PATTERN: Regex = Regex::new(r"^HLA-[ABC]\*[0-9]{1,3}:[0-9]{1,3}$").unwrap();
}

/// Why an input was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Input is empty or contains only blank lines.
    NoData,
    /// The first line is not the mode's header row.
    HeaderMismatch { expected: String },
    /// A data line has the wrong number of comma-separated fields.
    FieldCount { line: usize, expected: usize },
    /// The first non-blank line of a FASTA input is not a `>` header.
    FastaHeader,
    /// A FASTA record has no sequence lines.
    EmptyRecord { line: usize },
    /// An allele list line is not in 4-digit IMGT format.
    AlleleFormat,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NoData => write!(f, "No data found"),
            Diagnostic::HeaderMismatch { expected } => {
                write!(f, "The first line must be '{}'", expected)
            }
            Diagnostic::FieldCount { line, expected } => {
                write!(f, "Line {} must have {} columns", line, expected)
            }
            Diagnostic::FastaHeader => {
                write!(f, "A FASTA file must start with a '>' header line")
            }
            Diagnostic::EmptyRecord { line } => {
                write!(f, "The FASTA record starting at line {} has no sequence", line)
            }
            Diagnostic::AlleleFormat => write!(
                f,
                "Each line must be an HLA-I allele in 4-digit IMGT format, e.g. HLA-A*02:01"
            ),
        }
    }
}

impl std::error::Error for Diagnostic {}

/// Check that `raw_input` is well-formed for `mode`.
///
/// Delimited modes require the exact header on the first line and the same
/// number of fields on every following non-blank line. Only the first
/// violation is reported.
pub fn validate(mode: Mode, raw_input: &str) -> Result<(), Diagnostic> {
    if is_blank(raw_input) {
        return Err(Diagnostic::NoData);
    }

    let descriptor = describe(mode);
    match (descriptor.file_kind, descriptor.header_line()) {
        (FileKind::Delimited, Some(header)) => validate_delimited(raw_input, &header),
        (FileKind::Delimited, None) => Ok(()),
        (FileKind::Sequence, _) => validate_fasta(raw_input),
    }
}

fn validate_delimited(raw_input: &str, header: &str) -> Result<(), Diagnostic> {
    let mut lines = raw_input.split('\n');
    let expected = header.split(',').count();

    if lines.next() != Some(header) {
        return Err(Diagnostic::HeaderMismatch {
            expected: header.to_string(),
        });
    }

    for (idx, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        if line.split(',').count() != expected {
            // idx 0 is the second line of the input
            return Err(Diagnostic::FieldCount {
                line: idx + 2,
                expected,
            });
        }
    }

    Ok(())
}

fn validate_fasta(raw_input: &str) -> Result<(), Diagnostic> {
    let mut open_record: Option<(usize, bool)> = None;

    for (idx, line) in raw_input.split('\n').enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('>') {
            if let Some((start, false)) = open_record {
                return Err(Diagnostic::EmptyRecord { line: start });
            }
            open_record = Some((idx + 1, false));
        } else {
            match open_record.as_mut() {
                Some((_, has_sequence)) => *has_sequence = true,
                None => return Err(Diagnostic::FastaHeader),
            }
        }
    }

    match open_record {
        Some((start, false)) => Err(Diagnostic::EmptyRecord { line: start }),
        _ => Ok(()),
    }
}

/// Check an allele list: every non-blank line must be a single allele such
/// as `HLA-A*02:01`.
///
/// Lines are matched exactly as written; a line with leading or trailing
/// spaces is rejected.
pub fn validate_alleles(alleles: &str) -> Result<(), Diagnostic> {
    if is_blank(alleles) {
        return Err(Diagnostic::NoData);
    }
    let all_match = alleles
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .all(is_allele);
    if all_match {
        Ok(())
    } else {
        Err(Diagnostic::AlleleFormat)
    }
}

/// Whether a single line is an allele in 4-digit IMGT format.
pub fn is_allele(line: &str) -> bool {
    ALLELE_PATTERN.is_match(line)
}

/// Non-blank lines of an allele list, trimmed for display.
pub fn allele_lines(alleles: &str) -> Vec<&str> {
    alleles
        .split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

fn is_blank(text: &str) -> bool {
    text.split('\n').all(|l| l.trim().is_empty())
}

/// Number of non-blank data rows below the header (or FASTA records).
pub fn count_records(mode: Mode, raw_input: &str) -> usize {
    let non_blank = raw_input.split('\n').filter(|l| !l.trim().is_empty());
    match describe(mode).file_kind {
        FileKind::Delimited => non_blank.count().saturating_sub(1),
        FileKind::Sequence => non_blank.filter(|l| l.trim_start().starts_with('>')).count(),
    }
}

// ============================================================================
// Numeric text gates
// ============================================================================

/// Rejected numeric field text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// Text is not an integer value.
    NotInteger { field: &'static str, text: String },
    /// Text is not a number in the range 0 to 1.
    NotFraction { field: &'static str, text: String },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::NotInteger { field, text } => {
                write!(f, "{} must be an integer (got '{}')", field, text)
            }
            FieldError::NotFraction { field, text } => {
                write!(f, "{} must be a number between 0 and 1 (got '{}')", field, text)
            }
        }
    }
}

impl std::error::Error for FieldError {}

/// How the alpha weight field is gated.
///
/// The weight is documented as a 0 to 1 fraction, but the form has always
/// accepted integers only. `IntegerOnly` keeps that behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaPolicy {
    #[default]
    IntegerOnly,
    Fractional,
}

/// Parse text whose numeric value is an integer.
///
/// Surrounding whitespace and an integral float notation (`9.0`, `1e1`) are
/// accepted. Empty text is rejected.
pub fn parse_integer(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v);
    }
    let value: f64 = trimmed.parse().ok()?;
    // beyond 2^53 integers are no longer exact
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= 9_007_199_254_740_991.0 {
        Some(value as i64)
    } else {
        None
    }
}

/// Gate the alpha weight text according to `policy`.
pub fn parse_alpha(text: &str, policy: AlphaPolicy) -> Result<f64, FieldError> {
    match policy {
        AlphaPolicy::IntegerOnly => parse_integer(text)
            .map(|v| v as f64)
            .ok_or_else(|| FieldError::NotInteger {
                field: "Alpha",
                text: text.to_string(),
            }),
        AlphaPolicy::Fractional => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && (0.0..=1.0).contains(v))
            .ok_or_else(|| FieldError::NotFraction {
                field: "Alpha",
                text: text.to_string(),
            }),
    }
}
