//! Mutation table ingestion
//!
//! Tabular mutation lists arrive as CSV with a required `Type of Mutation`
//! column. Alternate spellings of that column are resolved explicitly, and
//! rows are validated into a fixed record shape at parse time.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recognized spellings of the mutation-type column, checked in order.
pub const MUTATION_TYPE_SYNONYMS: [&str; 5] = [
    "Type of Mutation",
    "Mutation Type",
    "mutation_type",
    "Variant Type",
    "Type",
];

#[derive(Error, Debug)]
pub enum TableError {
    #[error("missing required column \"Type of Mutation\" (or a recognized synonym); found columns: {}",
            .found.join(", "))]
    MissingMutationColumn { found: Vec<String> },

    #[error("row {row}: {message}")]
    InvalidRow { row: usize, message: String },

    #[error("failed to read mutation table: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to open mutation table: {0}")]
    Io(#[from] std::io::Error),
}

/// Kind of a called or imported mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationKind {
    Substitution,
    Insertion,
    Deletion,
    Other(String),
}

impl MutationKind {
    pub fn parse(value: &str) -> MutationKind {
        match value.trim().to_lowercase().as_str() {
            "snv" | "snp" | "substitution" | "point mutation" => MutationKind::Substitution,
            "insertion" | "ins" => MutationKind::Insertion,
            "deletion" | "del" => MutationKind::Deletion,
            _ => MutationKind::Other(value.trim().to_string()),
        }
    }
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationKind::Substitution => write!(f, "Substitution"),
            MutationKind::Insertion => write!(f, "Insertion"),
            MutationKind::Deletion => write!(f, "Deletion"),
            MutationKind::Other(name) => write!(f, "{name}"),
        }
    }
}

/// One mutation with its location and bases, as produced by the caller and
/// written to CSV exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRecord {
    pub position: u64,
    pub reference: String,
    pub alternate: String,
    pub kind: MutationKind,
}

/// Find the mutation-type column among the headers.
pub fn resolve_mutation_type_column(headers: &StringRecord) -> Option<usize> {
    for synonym in MUTATION_TYPE_SYNONYMS {
        let found = headers
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(synonym));
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Read the mutation-type column of a CSV table.
///
/// Only the type column is consumed; other columns are ignored. Rows with an
/// empty type cell are rejected rather than skipped.
pub fn read_mutation_kinds<R: Read>(reader: R) -> Result<Vec<MutationKind>, TableError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let type_column = resolve_mutation_type_column(&headers).ok_or_else(|| {
        TableError::MissingMutationColumn {
            found: headers.iter().map(str::to_string).collect(),
        }
    })?;

    let mut kinds = Vec::new();
    for (index, row) in csv_reader.records().enumerate() {
        let row = row?;
        let cell = row.get(type_column).unwrap_or("");
        if cell.is_empty() {
            // Header is line 1, first data row is line 2.
            return Err(TableError::InvalidRow {
                row: index + 2,
                message: "empty mutation type".to_string(),
            });
        }
        kinds.push(MutationKind::parse(cell));
    }

    Ok(kinds)
}

pub fn read_mutation_kinds_file(path: &Path) -> Result<Vec<MutationKind>, TableError> {
    let file = File::open(path)?;
    read_mutation_kinds(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_kinds() {
        assert_eq!(MutationKind::parse("SNV"), MutationKind::Substitution);
        assert_eq!(MutationKind::parse("point mutation"), MutationKind::Substitution);
        assert_eq!(MutationKind::parse("Insertion"), MutationKind::Insertion);
        assert_eq!(MutationKind::parse("del"), MutationKind::Deletion);
        assert_eq!(
            MutationKind::parse("Frameshift"),
            MutationKind::Other("Frameshift".to_string())
        );
    }

    #[test]
    fn test_read_with_canonical_header() {
        let csv = "Position,Reference,Alternate,Type of Mutation\n12,A,G,SNV\n40,C,-,Deletion\n";
        let kinds = read_mutation_kinds(csv.as_bytes()).unwrap();
        assert_eq!(kinds, vec![MutationKind::Substitution, MutationKind::Deletion]);
    }

    #[test]
    fn test_read_with_synonym_header() {
        let csv = "pos,Mutation Type\n3,Insertion\n";
        let kinds = read_mutation_kinds(csv.as_bytes()).unwrap();
        assert_eq!(kinds, vec![MutationKind::Insertion]);
    }

    #[test]
    fn test_missing_column_lists_found_columns() {
        let csv = "Position,Gene,Effect\n12,rpoB,missense\n";
        let err = read_mutation_kinds(csv.as_bytes()).unwrap_err();
        match err {
            TableError::MissingMutationColumn { found } => {
                assert_eq!(found, vec!["Position", "Gene", "Effect"]);
            }
            other => panic!("expected MissingMutationColumn, got {other:?}"),
        }
        let message = read_mutation_kinds(csv.as_bytes()).unwrap_err().to_string();
        assert!(message.contains("Type of Mutation"));
        assert!(message.contains("Position, Gene, Effect"));
    }

    #[test]
    fn test_empty_type_cell_is_rejected() {
        let csv = "Type of Mutation\nSNV\n\nDeletion\n";
        // csv skips fully blank lines, so use an explicitly empty cell.
        let csv_with_empty = "Position,Type of Mutation\n1,SNV\n2,\n";
        assert!(read_mutation_kinds(csv.as_bytes()).is_ok());
        let err = read_mutation_kinds(csv_with_empty.as_bytes()).unwrap_err();
        assert!(matches!(err, TableError::InvalidRow { row: 3, .. }));
    }
}
