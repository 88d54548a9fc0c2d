//! FASTA/FASTQ ingestion and validation
//!
//! Only the first record of a file is ever read; multi-record files are
//! silently truncated to record 1.

use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Allowed sequence characters after normalization.
pub const NUCLEOTIDE_ALPHABET: [char; 5] = ['A', 'T', 'G', 'C', 'N'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceFormat {
    Fasta,
    Fastq,
}

impl SequenceFormat {
    /// Detect the format from the first non-blank character.
    pub fn sniff(text: &str) -> Option<SequenceFormat> {
        match text.chars().find(|c| !c.is_whitespace()) {
            Some('>') => Some(SequenceFormat::Fasta),
            Some('@') => Some(SequenceFormat::Fastq),
            _ => None,
        }
    }

    /// FASTA rejects out-of-alphabet characters, FASTQ coerces them to `N`.
    pub fn default_policy(self) -> AlphabetPolicy {
        match self {
            SequenceFormat::Fasta => AlphabetPolicy::Reject,
            SequenceFormat::Fastq => AlphabetPolicy::CoerceToN,
        }
    }
}

/// What to do with characters outside {A, T, G, C, N}.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphabetPolicy {
    /// Fail with `InvalidAlphabet` on the first disallowed character.
    Reject,
    /// Replace disallowed characters with `N`.
    CoerceToN,
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Declared format; sniffed from the input when `None`.
    pub format: Option<SequenceFormat>,
    /// Alphabet handling; the format default applies when `None`.
    pub alphabet: Option<AlphabetPolicy>,
    /// Byte ceiling supplied by the caller. Call sites own this limit.
    pub max_bytes: Option<u64>,
    /// Minimum number of bases for a sequence to count as non-empty.
    pub min_length: usize,
    /// Keep only the first N bases of the record.
    pub max_bases: Option<usize>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            format: None,
            alphabet: None,
            max_bytes: None,
            min_length: 1,
            max_bases: None,
        }
    }
}

impl ParseOptions {
    /// The stricter first-sequence pathway: at least 10 bases.
    pub fn strict_first_sequence() -> Self {
        ParseOptions {
            min_length: 10,
            ..ParseOptions::default()
        }
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("unrecognized file format: first character {found:?}, expected '>' (FASTA) or '@' (FASTQ)")]
    InvalidFormat { found: char },

    #[error("sequence has {got} bases, need at least {min}")]
    EmptySequence { got: usize, min: usize },

    #[error("invalid character {found:?} at base {position}, allowed characters are A, T, G, C, N")]
    InvalidAlphabet { found: char, position: usize },

    #[error("file is {size} bytes, over the {limit} byte limit for this operation")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("failed to read sequence file: {0}")]
    ReadFailure(#[from] std::io::Error),
}

/// A validated, uppercase nucleotide sequence over {A, T, G, C, N}.
///
/// Immutable once parsed; construction goes through [`parse_sequence`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NucleotideSequence(String);

impl NucleotideSequence {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for NucleotideSequence {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NucleotideSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse the first sequence record out of raw file text.
pub fn parse_sequence(text: &str, options: &ParseOptions) -> Result<NucleotideSequence, ParseError> {
    if let Some(limit) = options.max_bytes {
        let size = text.len() as u64;
        if size > limit {
            return Err(ParseError::FileTooLarge { size, limit });
        }
    }

    let format = match options.format {
        Some(format) => format,
        None => match SequenceFormat::sniff(text) {
            Some(format) => format,
            // A fully blank input has no leading character to reject.
            None => match text.chars().find(|c| !c.is_whitespace()) {
                Some(found) => return Err(ParseError::InvalidFormat { found }),
                None => {
                    return Err(ParseError::EmptySequence {
                        got: 0,
                        min: options.min_length.max(1),
                    })
                }
            },
        },
    };
    let policy = options.alphabet.unwrap_or_else(|| format.default_policy());

    let raw = match format {
        SequenceFormat::Fasta => first_fasta_record(text),
        SequenceFormat::Fastq => first_fastq_record(text),
    };

    let mut sequence = apply_alphabet_policy(&raw, policy)?;
    if let Some(cap) = options.max_bases {
        sequence.truncate(cap);
    }

    let min = options.min_length.max(1);
    if sequence.len() < min {
        return Err(ParseError::EmptySequence {
            got: sequence.len(),
            min,
        });
    }

    Ok(NucleotideSequence(sequence))
}

/// Parse the first sequence record from a file on disk.
///
/// The byte ceiling is checked against the file size before the content is
/// read, so oversized files are rejected without loading them.
pub fn parse_sequence_file(
    path: &Path,
    options: &ParseOptions,
) -> Result<NucleotideSequence, ParseError> {
    if let Some(limit) = options.max_bytes {
        let size = fs::metadata(path)?.len();
        if size > limit {
            return Err(ParseError::FileTooLarge { size, limit });
        }
    }

    let text = fs::read_to_string(path)?;
    parse_sequence(&text, options)
}

fn first_fasta_record(text: &str) -> String {
    let mut sequence = String::new();
    let mut in_record = false;

    for line in text.lines() {
        let line = line.trim();
        if line.starts_with('>') {
            if in_record {
                break;
            }
            in_record = true;
            continue;
        }
        if in_record && !line.is_empty() {
            sequence.push_str(&line.to_uppercase());
        }
    }

    sequence
}

fn first_fastq_record(text: &str) -> String {
    // Record layout is header, sequence, separator, quality; line 2 is the
    // sequence and everything after the first record is ignored.
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let _header = lines.next();
    lines
        .next()
        .map(|line| line.trim().to_uppercase())
        .unwrap_or_default()
}

fn apply_alphabet_policy(raw: &str, policy: AlphabetPolicy) -> Result<String, ParseError> {
    match policy {
        AlphabetPolicy::Reject => {
            if let Some((position, found)) = raw
                .chars()
                .enumerate()
                .find(|(_, c)| !NUCLEOTIDE_ALPHABET.contains(c))
            {
                return Err(ParseError::InvalidAlphabet { found, position });
            }
            Ok(raw.to_string())
        }
        AlphabetPolicy::CoerceToN => Ok(raw
            .chars()
            .map(|c| if NUCLEOTIDE_ALPHABET.contains(&c) { c } else { 'N' })
            .collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_formats() {
        assert_eq!(SequenceFormat::sniff(">seq1\nATGC\n"), Some(SequenceFormat::Fasta));
        assert_eq!(SequenceFormat::sniff("\n  @read1\nATGC\n"), Some(SequenceFormat::Fastq));
        assert_eq!(SequenceFormat::sniff("ATGC\n"), None);
        assert_eq!(SequenceFormat::sniff(""), None);
    }

    #[test]
    fn test_fasta_first_record_only() {
        let parsed = parse_sequence(">seq1\nATGC\n>seq2\nGGGG\n", &ParseOptions::default()).unwrap();
        assert_eq!(parsed.as_str(), "ATGC");
    }

    #[test]
    fn test_fasta_multiline_and_crlf() {
        let parsed = parse_sequence(">seq1\r\natgc\r\nTTAA\r\n", &ParseOptions::default()).unwrap();
        assert_eq!(parsed.as_str(), "ATGCTTAA");
    }

    #[test]
    fn test_fastq_takes_second_line() {
        let text = "@read1\nATGCN\n+\nIIIII\n@read2\nGGGG\n+\nIIII\n";
        let parsed = parse_sequence(text, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.as_str(), "ATGCN");
    }

    #[test]
    fn test_fasta_rejects_bad_alphabet() {
        let err = parse_sequence(">seq1\nATXC\n", &ParseOptions::default()).unwrap_err();
        match err {
            ParseError::InvalidAlphabet { found, position } => {
                assert_eq!(found, 'X');
                assert_eq!(position, 2);
            }
            other => panic!("expected InvalidAlphabet, got {other:?}"),
        }
    }

    #[test]
    fn test_fastq_coerces_bad_alphabet() {
        let parsed = parse_sequence("@read1\nATXC\n+\nIIII\n", &ParseOptions::default()).unwrap();
        assert_eq!(parsed.as_str(), "ATNC");
    }

    #[test]
    fn test_policy_override() {
        let options = ParseOptions {
            alphabet: Some(AlphabetPolicy::CoerceToN),
            ..ParseOptions::default()
        };
        let parsed = parse_sequence(">seq1\nATXC\n", &options).unwrap();
        assert_eq!(parsed.as_str(), "ATNC");
    }

    #[test]
    fn test_unrecognized_leading_character() {
        let err = parse_sequence("ATGC\n", &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidFormat { found: 'A' }));
    }

    #[test]
    fn test_blank_input_has_no_bases() {
        let err = parse_sequence("  \n\n", &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::EmptySequence { got: 0, min: 1 }));
    }

    #[test]
    fn test_empty_sequence() {
        let err = parse_sequence(">seq1\n\n", &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::EmptySequence { got: 0, min: 1 }));
    }

    #[test]
    fn test_minimum_length_pathway() {
        let options = ParseOptions::strict_first_sequence();
        let err = parse_sequence(">seq1\nATGCATGC\n", &options).unwrap_err();
        assert!(matches!(err, ParseError::EmptySequence { got: 8, min: 10 }));

        let ok = parse_sequence(">seq1\nATGCATGCAT\n", &options).unwrap();
        assert_eq!(ok.len(), 10);
    }

    #[test]
    fn test_byte_ceiling() {
        let options = ParseOptions {
            max_bytes: Some(8),
            ..ParseOptions::default()
        };
        let err = parse_sequence(">seq1\nATGCATGC\n", &options).unwrap_err();
        assert!(matches!(err, ParseError::FileTooLarge { size: 15, limit: 8 }));
    }

    #[test]
    fn test_max_bases_truncation() {
        let options = ParseOptions {
            max_bases: Some(4),
            ..ParseOptions::default()
        };
        let parsed = parse_sequence(">seq1\nATGCATGC\n", &options).unwrap();
        assert_eq!(parsed.as_str(), "ATGC");
    }
}
