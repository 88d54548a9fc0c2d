//! Downloadable analysis outputs
//!
//! Two artifacts are produced for download: a JSON sequence-analysis summary
//! and a CSV export of called mutations. A JSON comparison summary covers
//! the checker flow.

use std::error::Error;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::mutation::table::{MutationRecord, TableError};
use crate::sequence::analysis::{calculate_gc_content, count_bases, BaseCounts};
use crate::sequence::parse::NucleotideSequence;
use crate::sequence::similarity::{Classification, SimilarityBreakdown, SimilarityReport};

pub const MUTATION_CSV_HEADER: [&str; 4] =
    ["Position", "Reference", "Alternate", "Type of Mutation"];

/// JSON sequence-analysis summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceSummary {
    pub filename: String,
    pub sequence: String,
    pub length: usize,
    pub base_counts: BaseCounts,
    /// Percentage, rounded to one decimal.
    pub gc_content: f64,
}

impl SequenceSummary {
    pub fn new(filename: &str, sequence: &NucleotideSequence) -> SequenceSummary {
        SequenceSummary {
            filename: filename.to_string(),
            sequence: sequence.as_str().to_string(),
            length: sequence.len(),
            base_counts: count_bases(sequence.as_str()),
            gc_content: round_to(calculate_gc_content(sequence.as_str()), 1),
        }
    }
}

/// Per-side info in a comparison summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceInfo {
    pub filename: String,
    pub length: usize,
    pub gc_content: f64,
}

/// JSON summary of a checker run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub similarity_score: f64,
    pub classification: Classification,
    pub confidence: String,
    pub recommendation: String,
    pub sample: SequenceInfo,
    pub reference: SequenceInfo,
    pub breakdown: SimilarityBreakdown,
}

impl ComparisonSummary {
    pub fn new(
        sample_name: &str,
        sample: &NucleotideSequence,
        reference_name: &str,
        reference: &NucleotideSequence,
        report: &SimilarityReport,
        breakdown: &SimilarityBreakdown,
    ) -> ComparisonSummary {
        ComparisonSummary {
            similarity_score: round_to(report.percent, 2),
            classification: report.classification,
            confidence: report.classification.confidence().to_string(),
            recommendation: report.classification.recommendation().to_string(),
            sample: SequenceInfo {
                filename: sample_name.to_string(),
                length: sample.len(),
                gc_content: round_to(calculate_gc_content(sample.as_str()), 2),
            },
            reference: SequenceInfo {
                filename: reference_name.to_string(),
                length: reference.len(),
                gc_content: round_to(calculate_gc_content(reference.as_str()), 2),
            },
            breakdown: breakdown.clone(),
        }
    }
}

pub fn write_summary_json<W: Write>(
    writer: W,
    summary: &SequenceSummary,
) -> Result<(), Box<dyn Error>> {
    serde_json::to_writer_pretty(writer, summary)?;
    Ok(())
}

pub fn write_summary_json_file(
    path: &Path,
    summary: &SequenceSummary,
) -> Result<(), Box<dyn Error>> {
    write_summary_json(File::create(path)?, summary)
}

pub fn write_comparison_json<W: Write>(
    writer: W,
    summary: &ComparisonSummary,
) -> Result<(), Box<dyn Error>> {
    serde_json::to_writer_pretty(writer, summary)?;
    Ok(())
}

pub fn write_mutations_csv<W: Write>(
    writer: W,
    mutations: &[MutationRecord],
) -> Result<(), TableError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(MUTATION_CSV_HEADER)?;

    for mutation in mutations {
        csv_writer.write_record([
            mutation.position.to_string(),
            mutation.reference.clone(),
            mutation.alternate.clone(),
            mutation.kind.to_string(),
        ])?;
    }

    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_mutations_csv_file(
    path: &Path,
    mutations: &[MutationRecord],
) -> Result<(), TableError> {
    write_mutations_csv(File::create(path)?, mutations)
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::table::MutationKind;
    use crate::sequence::parse::{parse_sequence, ParseOptions};

    fn seq(bases: &str) -> NucleotideSequence {
        parse_sequence(&format!(">t\n{bases}\n"), &ParseOptions::default()).unwrap()
    }

    #[test]
    fn test_summary_rounds_gc_to_one_decimal() {
        // 2 GC over 6 bases = 33.333...%
        let summary = SequenceSummary::new("sample.fasta", &seq("ATGCAT"));
        assert_eq!(summary.gc_content, 33.3);
        assert_eq!(summary.length, 6);
        assert_eq!(summary.base_counts.a, 2);
        assert_eq!(summary.sequence, "ATGCAT");
    }

    #[test]
    fn test_summary_json_fields() {
        let summary = SequenceSummary::new("sample.fasta", &seq("ATGC"));
        let mut out = Vec::new();
        write_summary_json(&mut out, &summary).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["filename"], "sample.fasta");
        assert_eq!(value["length"], 4);
        assert_eq!(value["gc_content"], 50.0);
        assert_eq!(value["base_counts"]["g"], 1);
    }

    #[test]
    fn test_mutations_csv_layout() {
        let mutations = vec![
            MutationRecord {
                position: 12,
                reference: "A".to_string(),
                alternate: "G".to_string(),
                kind: MutationKind::Substitution,
            },
            MutationRecord {
                position: 40,
                reference: "C".to_string(),
                alternate: "-".to_string(),
                kind: MutationKind::Deletion,
            },
        ];

        let mut out = Vec::new();
        write_mutations_csv(&mut out, &mutations).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "Position,Reference,Alternate,Type of Mutation\n12,A,G,Substitution\n40,C,-,Deletion\n"
        );
    }

    #[test]
    fn test_comparison_summary() {
        let sample = seq("ATGC");
        let reference = seq("ATGG");
        let report = SimilarityReport::positional(&sample, &reference);
        let breakdown = SimilarityBreakdown::calculate(&sample, &reference);
        let summary = ComparisonSummary::new(
            "sample.fa", &sample, "reference.fa", &reference, &report, &breakdown,
        );

        assert_eq!(summary.similarity_score, 75.0);
        assert_eq!(summary.classification, Classification::PossibleMatch);
        assert_eq!(summary.confidence, "Moderate");
        assert_eq!(summary.sample.length, 4);
        assert_eq!(summary.reference.filename, "reference.fa");
    }
}
