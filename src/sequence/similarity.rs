//! Positional similarity scoring and TB evidence classification
//!
//! The positional score is a prefix alignment only: positions are compared
//! pairwise over the shorter length, with no shifting and no gaps. Two
//! sequences that are identical but offset by one base score near 0%.

use serde::{Deserialize, Serialize};

use crate::sequence::analysis::{calculate_gc_content, kmer_counts};
use crate::sequence::parse::NucleotideSequence;

/// K-mer size used by the composite score.
pub const SIMILARITY_KMER_SIZE: usize = 3;

/// Percentage of matching bases over the shared prefix of two sequences.
pub fn calculate_similarity(seq1: &str, seq2: &str) -> f64 {
    let seq1 = seq1.to_uppercase();
    let seq2 = seq2.to_uppercase();

    let min_len = seq1.len().min(seq2.len());
    if min_len == 0 {
        return 0.0;
    }

    let mut matches = 0;
    for (c1, c2) in seq1.chars().zip(seq2.chars()) {
        if c1 == c2 {
            matches += 1;
        }
    }

    (matches as f64 / min_len as f64) * 100.0
}

/// Per-position match mask over the shared prefix, for highlighting.
pub fn identify_matching_positions(seq1: &str, seq2: &str) -> Vec<bool> {
    let seq1 = seq1.to_uppercase();
    let seq2 = seq2.to_uppercase();

    let mut matches = Vec::new();
    for (c1, c2) in seq1.chars().zip(seq2.chars()) {
        matches.push(c1 == c2);
    }

    matches
}

/// Cosine similarity between the k-mer count vectors of two sequences,
/// scaled to a percentage. Zero when either sequence has no k-mers.
pub fn kmer_cosine_similarity(seq1: &str, seq2: &str, k: usize) -> f64 {
    let counts1 = kmer_counts(seq1, k);
    let counts2 = kmer_counts(seq2, k);
    if counts1.is_empty() || counts2.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0;
    for (kmer, &count) in &counts1 {
        if let Some(&other) = counts2.get(kmer) {
            dot += count as f64 * other as f64;
        }
    }

    let norm1: f64 = counts1.values().map(|&c| (c * c) as f64).sum::<f64>().sqrt();
    let norm2: f64 = counts2.values().map(|&c| (c * c) as f64).sum::<f64>().sqrt();
    if norm1 == 0.0 || norm2 == 0.0 {
        return 0.0;
    }

    (dot / (norm1 * norm2)) * 100.0
}

/// GC-composition similarity: 100 minus twice the GC-content gap, floored
/// at zero.
pub fn gc_similarity(seq1: &str, seq2: &str) -> f64 {
    let gap = (calculate_gc_content(seq1) - calculate_gc_content(seq2)).abs();
    (100.0 - gap * 2.0).max(0.0)
}

/// Three-bucket evidence classification with inclusive lower bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    StrongEvidence,
    PossibleMatch,
    NoMatch,
}

impl Classification {
    pub fn from_percent(percent: f64) -> Classification {
        if percent >= 80.0 {
            Classification::StrongEvidence
        } else if percent >= 50.0 {
            Classification::PossibleMatch
        } else {
            Classification::NoMatch
        }
    }

    pub fn confidence(&self) -> &'static str {
        match self {
            Classification::StrongEvidence => "High",
            Classification::PossibleMatch => "Moderate",
            Classification::NoMatch => "Low",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Classification::StrongEvidence => {
                "Strong evidence of TB. Consider immediate treatment protocols and infection control measures."
            }
            Classification::PossibleMatch => {
                "Possible TB-related strain. Additional confirmatory testing recommended before treatment decisions."
            }
            Classification::NoMatch => {
                "Low confidence for TB. Consider alternative diagnoses and standard clinical evaluation."
            }
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::StrongEvidence => write!(f, "Strong evidence of TB"),
            Classification::PossibleMatch => write!(f, "Possible TB-related strain"),
            Classification::NoMatch => write!(f, "Not TB"),
        }
    }
}

/// Result of comparing a sample against a reference sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityReport {
    /// Matching bases over the shared prefix, in [0, 100].
    pub percent: f64,
    pub sample_length: usize,
    pub reference_length: usize,
    /// Shared prefix length the score was computed over.
    pub compared: usize,
    pub matches: usize,
    pub classification: Classification,
}

impl SimilarityReport {
    pub fn positional(sample: &NucleotideSequence, reference: &NucleotideSequence) -> Self {
        let compared = sample.len().min(reference.len());
        let matches = identify_matching_positions(sample.as_str(), reference.as_str())
            .iter()
            .filter(|&&matched| matched)
            .count();
        let percent = calculate_similarity(sample.as_str(), reference.as_str());

        SimilarityReport {
            percent,
            sample_length: sample.len(),
            reference_length: reference.len(),
            compared,
            matches,
            classification: Classification::from_percent(percent),
        }
    }
}

/// Weighted multi-method similarity used by the analysis view. The checker
/// verdict itself is always classified from the positional score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityBreakdown {
    pub positional: f64,
    pub kmer: f64,
    pub gc: f64,
    pub composite: f64,
}

impl SimilarityBreakdown {
    pub fn calculate(sample: &NucleotideSequence, reference: &NucleotideSequence) -> Self {
        let positional = calculate_similarity(sample.as_str(), reference.as_str());
        let kmer = kmer_cosine_similarity(sample.as_str(), reference.as_str(), SIMILARITY_KMER_SIZE);
        let gc = gc_similarity(sample.as_str(), reference.as_str());

        SimilarityBreakdown {
            positional,
            kmer,
            gc,
            composite: positional * 0.5 + kmer * 0.3 + gc * 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::parse::{parse_sequence, ParseOptions};

    fn seq(bases: &str) -> NucleotideSequence {
        parse_sequence(&format!(">t\n{bases}\n"), &ParseOptions::default()).unwrap()
    }

    #[test]
    fn test_identical_sequences_score_100() {
        assert_eq!(calculate_similarity("ATGC", "ATGC"), 100.0);
        assert_eq!(calculate_similarity("atgc", "ATGC"), 100.0);
    }

    #[test]
    fn test_fully_mismatched_prefix_scores_0() {
        assert_eq!(calculate_similarity("AAAA", "TTTTTT"), 0.0);
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let a = "ATGCATGC";
        let b = "ATGGATCC";
        assert_eq!(calculate_similarity(a, b), calculate_similarity(b, a));
    }

    #[test]
    fn test_zero_length_is_defined() {
        assert_eq!(calculate_similarity("", "ATGC"), 0.0);
        assert_eq!(calculate_similarity("", ""), 0.0);
    }

    #[test]
    fn test_prefix_only_no_shifting() {
        // Same sequence offset by one base collapses the score.
        assert_eq!(calculate_similarity("AGAGAGAG", "GAGAGAGA"), 0.0);
    }

    #[test]
    fn test_matching_positions_mask() {
        assert_eq!(identify_matching_positions("ATGC", "ATGG"), vec![true, true, true, false]);
    }

    #[test]
    fn test_classification_boundaries() {
        assert_eq!(Classification::from_percent(80.0), Classification::StrongEvidence);
        assert_eq!(Classification::from_percent(79.999), Classification::PossibleMatch);
        assert_eq!(Classification::from_percent(50.0), Classification::PossibleMatch);
        assert_eq!(Classification::from_percent(49.999), Classification::NoMatch);
        assert_eq!(Classification::from_percent(100.0), Classification::StrongEvidence);
        assert_eq!(Classification::from_percent(0.0), Classification::NoMatch);
    }

    #[test]
    fn test_report_three_of_four() {
        let report = SimilarityReport::positional(&seq("ATGC"), &seq("ATGG"));
        assert_eq!(report.percent, 75.0);
        assert_eq!(report.compared, 4);
        assert_eq!(report.matches, 3);
        assert_eq!(report.classification, Classification::PossibleMatch);
    }

    #[test]
    fn test_report_unequal_lengths() {
        let report = SimilarityReport::positional(&seq("AAAA"), &seq("TTTTTT"));
        assert_eq!(report.percent, 0.0);
        assert_eq!(report.compared, 4);
        assert_eq!(report.sample_length, 4);
        assert_eq!(report.reference_length, 6);
        assert_eq!(report.classification, Classification::NoMatch);
    }

    #[test]
    fn test_kmer_cosine_identical() {
        let score = kmer_cosine_similarity("ATGCATGC", "ATGCATGC", 3);
        assert!((score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_kmer_cosine_short_input() {
        assert_eq!(kmer_cosine_similarity("AT", "ATGC", 3), 0.0);
    }

    #[test]
    fn test_gc_similarity() {
        assert_eq!(gc_similarity("GGGG", "GGGG"), 100.0);
        // 100% vs 0% GC: gap of 100, doubled and floored at zero.
        assert_eq!(gc_similarity("GGGG", "AAAA"), 0.0);
    }

    #[test]
    fn test_composite_weighting() {
        let sample = seq("ATGCATGC");
        let breakdown = SimilarityBreakdown::calculate(&sample, &sample);
        assert!((breakdown.composite - 100.0).abs() < 1e-9);
        assert!((breakdown.positional - 100.0).abs() < 1e-9);
    }
}
