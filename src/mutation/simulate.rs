//! Simulated analyses
//!
//! The mutation caller, organ-impact predictor, and resistance predictor are
//! demo stand-ins, not real inference. Each lives behind a trait so a real
//! model can replace the `Simulated*` implementation without touching
//! callers. Randomness is injectable for deterministic tests.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::dataset::ResistanceMarker;
use crate::mutation::table::{MutationKind, MutationRecord};
use crate::sequence::parse::NucleotideSequence;

/// Upper bound on mutations emitted per simulated calling run.
pub const DEFAULT_MAX_CALLS: usize = 25;

/// Probability that the resistance predictor flips its own verdict.
pub const VERDICT_FLIP_PROBABILITY: f64 = 0.3;

pub trait MutationCaller {
    fn call_mutations(&mut self, sequence: &NucleotideSequence) -> Vec<MutationRecord>;
}

pub trait OrganImpactModel {
    fn predict_impact(&mut self, kinds: &[MutationKind]) -> Vec<OrganImpact>;
}

pub trait ResistancePredictor {
    fn predict_resistance(
        &mut self,
        mutations: &[MutationRecord],
        markers: &[ResistanceMarker],
    ) -> ResistanceCall;
}

/// Random mutation caller: picks positions in the loaded sequence and emits
/// plausible-looking calls anchored to the actual reference bases.
pub struct SimulatedMutationCaller {
    rng: StdRng,
    max_calls: usize,
}

impl SimulatedMutationCaller {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng(), DEFAULT_MAX_CALLS)
    }

    pub fn with_rng(rng: StdRng, max_calls: usize) -> Self {
        SimulatedMutationCaller { rng, max_calls }
    }

    fn random_base_except(&mut self, reference: char) -> char {
        loop {
            let base = ['A', 'T', 'G', 'C'][self.rng.random_range(0..4)];
            if base != reference {
                return base;
            }
        }
    }
}

impl Default for SimulatedMutationCaller {
    fn default() -> Self {
        Self::new()
    }
}

impl MutationCaller for SimulatedMutationCaller {
    fn call_mutations(&mut self, sequence: &NucleotideSequence) -> Vec<MutationRecord> {
        let bases = sequence.as_str().as_bytes();
        if bases.is_empty() {
            return Vec::new();
        }

        let count = self.max_calls.min(bases.len());
        let mut positions = HashSet::new();
        while positions.len() < count {
            positions.insert(self.rng.random_range(0..bases.len()));
        }
        let mut positions: Vec<usize> = positions.into_iter().collect();
        positions.sort_unstable();

        positions
            .into_iter()
            .map(|index| {
                let reference = bases[index] as char;
                let roll: f64 = self.rng.random();
                let (kind, alternate) = if roll < 0.8 {
                    let alternate = self.random_base_except(reference);
                    (MutationKind::Substitution, alternate.to_string())
                } else if roll < 0.9 {
                    let inserted = ['A', 'T', 'G', 'C'][self.rng.random_range(0..4)];
                    (MutationKind::Insertion, format!("{reference}{inserted}"))
                } else {
                    (MutationKind::Deletion, "-".to_string())
                };

                MutationRecord {
                    // 1-based positions, matching the exported table.
                    position: index as u64 + 1,
                    reference: reference.to_string(),
                    alternate,
                    kind,
                }
            })
            .collect()
    }
}

/// Risk bucket for a predicted organ impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

/// Predicted impact of the mutation load on one organ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganImpact {
    pub organ: String,
    /// Impact score in [0, 100].
    pub score: f64,
    pub risk: RiskLevel,
    pub recommendation: String,
}

/// Per-organ weights over [substitution, insertion, deletion, other]
/// mutation shares. Sites of extrapulmonary TB rank below the lungs.
const ORGAN_WEIGHTS: [(&str, [f64; 4]); 5] = [
    ("Lungs", [0.9, 0.7, 0.8, 0.6]),
    ("Lymph nodes", [0.6, 0.5, 0.6, 0.4]),
    ("Kidneys", [0.5, 0.4, 0.5, 0.3]),
    ("Spine", [0.4, 0.3, 0.5, 0.3]),
    ("Brain", [0.3, 0.2, 0.4, 0.2]),
];

const IMPACT_NOISE_RANGE: f64 = 10.0;

/// Weighted heuristic over the mutation-kind histogram, plus bounded noise.
pub struct SimulatedOrganImpactModel {
    rng: StdRng,
}

impl SimulatedOrganImpactModel {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        SimulatedOrganImpactModel { rng }
    }
}

impl Default for SimulatedOrganImpactModel {
    fn default() -> Self {
        Self::new()
    }
}

impl OrganImpactModel for SimulatedOrganImpactModel {
    fn predict_impact(&mut self, kinds: &[MutationKind]) -> Vec<OrganImpact> {
        if kinds.is_empty() {
            return Vec::new();
        }

        let total = kinds.len() as f64;
        let mut shares = [0.0f64; 4];
        for kind in kinds {
            let slot = match kind {
                MutationKind::Substitution => 0,
                MutationKind::Insertion => 1,
                MutationKind::Deletion => 2,
                MutationKind::Other(_) => 3,
            };
            shares[slot] += 1.0 / total;
        }

        ORGAN_WEIGHTS
            .iter()
            .map(|(organ, weights)| {
                let weighted: f64 = weights
                    .iter()
                    .zip(shares.iter())
                    .map(|(weight, share)| weight * share)
                    .sum();
                let noise = self.rng.random_range(-IMPACT_NOISE_RANGE..=IMPACT_NOISE_RANGE);
                let score = (weighted * 100.0 + noise).clamp(0.0, 100.0);

                let risk = if score >= 70.0 {
                    RiskLevel::High
                } else if score >= 40.0 {
                    RiskLevel::Medium
                } else {
                    RiskLevel::Low
                };

                let recommendation = match risk {
                    RiskLevel::High => format!(
                        "HIGH: {organ} impact score {score:.1}. Prioritize clinical follow-up."
                    ),
                    RiskLevel::Medium => format!(
                        "REVIEW: {organ} impact score {score:.1}. Monitor at next evaluation."
                    ),
                    RiskLevel::Low => {
                        format!("OK: {organ} impact score {score:.1}. No action indicated.")
                    }
                };

                OrganImpact {
                    organ: organ.to_string(),
                    score,
                    risk,
                    recommendation,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResistanceVerdict {
    Resistant,
    Susceptible,
}

impl ResistanceVerdict {
    fn flipped(self) -> ResistanceVerdict {
        match self {
            ResistanceVerdict::Resistant => ResistanceVerdict::Susceptible,
            ResistanceVerdict::Susceptible => ResistanceVerdict::Resistant,
        }
    }
}

impl std::fmt::Display for ResistanceVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResistanceVerdict::Resistant => write!(f, "RESISTANT"),
            ResistanceVerdict::Susceptible => write!(f, "SUSCEPTIBLE"),
        }
    }
}

/// Outcome of a resistance prediction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResistanceCall {
    pub verdict: ResistanceVerdict,
    /// Drugs whose catalog markers matched a called mutation.
    pub matched_drugs: Vec<String>,
    pub markers_checked: usize,
    /// Whether the simulated flip inverted the marker-derived verdict.
    pub flipped: bool,
}

/// Marker lookup plus a 30% chance of flipping the verdict.
pub struct SimulatedResistancePredictor {
    rng: StdRng,
}

impl SimulatedResistancePredictor {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        SimulatedResistancePredictor { rng }
    }
}

impl Default for SimulatedResistancePredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResistancePredictor for SimulatedResistancePredictor {
    fn predict_resistance(
        &mut self,
        mutations: &[MutationRecord],
        markers: &[ResistanceMarker],
    ) -> ResistanceCall {
        let mut matched_drugs: Vec<String> = Vec::new();
        for marker in markers {
            let hit = mutations.iter().any(|mutation| {
                mutation.position == marker.position && mutation.alternate == marker.alternate
            });
            if hit && !matched_drugs.contains(&marker.drug) {
                matched_drugs.push(marker.drug.clone());
            }
        }

        let derived = if matched_drugs.is_empty() {
            ResistanceVerdict::Susceptible
        } else {
            ResistanceVerdict::Resistant
        };

        let flipped = self.rng.random_bool(VERDICT_FLIP_PROBABILITY);
        let verdict = if flipped { derived.flipped() } else { derived };

        ResistanceCall {
            verdict,
            matched_drugs,
            markers_checked: markers.len(),
            flipped,
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

    fn marker(position: u64, alternate: &str, drug: &str) -> ResistanceMarker {
        ResistanceMarker {
            gene: "rpoB".to_string(),
            position,
            reference: "A".to_string(),
            alternate: alternate.to_string(),
            drug: drug.to_string(),
            confidence: "high".to_string(),
        }
    }

    #[test]
    fn test_calls_are_anchored_to_the_sequence() {
        let sequence = seq("ATGCATGCATGCATGCATGC");
        let mut caller = SimulatedMutationCaller::with_rng(StdRng::seed_from_u64(7), 8);
        let calls = caller.call_mutations(&sequence);

        assert_eq!(calls.len(), 8);
        for call in &calls {
            let index = (call.position - 1) as usize;
            assert!(index < sequence.len());
            let expected = &sequence.as_str()[index..index + 1];
            assert_eq!(call.reference, expected);
            if call.kind == MutationKind::Substitution {
                assert_ne!(call.alternate, call.reference);
            }
        }

        // Positions are emitted sorted and without duplicates.
        let positions: Vec<u64> = calls.iter().map(|c| c.position).collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_caller_is_deterministic_under_a_seed() {
        let sequence = seq("ATGCATGCATGC");
        let mut first = SimulatedMutationCaller::with_rng(StdRng::seed_from_u64(42), 5);
        let mut second = SimulatedMutationCaller::with_rng(StdRng::seed_from_u64(42), 5);
        assert_eq!(first.call_mutations(&sequence), second.call_mutations(&sequence));
    }

    #[test]
    fn test_call_count_is_capped_by_sequence_length() {
        let mut caller = SimulatedMutationCaller::with_rng(StdRng::seed_from_u64(1), 5);
        let sequence = seq("AT");
        assert_eq!(caller.call_mutations(&sequence).len(), 2);
    }

    #[test]
    fn test_impact_scores_are_bounded() {
        let kinds = vec![
            MutationKind::Substitution,
            MutationKind::Substitution,
            MutationKind::Deletion,
            MutationKind::Other("Frameshift".to_string()),
        ];
        let mut model = SimulatedOrganImpactModel::with_rng(StdRng::seed_from_u64(3));
        let impacts = model.predict_impact(&kinds);

        assert_eq!(impacts.len(), 5);
        assert_eq!(impacts[0].organ, "Lungs");
        for impact in &impacts {
            assert!((0.0..=100.0).contains(&impact.score));
            assert!(impact.recommendation.contains(&impact.organ));
        }
    }

    #[test]
    fn test_impact_empty_input() {
        let mut model = SimulatedOrganImpactModel::with_rng(StdRng::seed_from_u64(3));
        assert!(model.predict_impact(&[]).is_empty());
    }

    #[test]
    fn test_resistance_verdict_flip_is_recorded() {
        let mutations = vec![MutationRecord {
            position: 761155,
            reference: "C".to_string(),
            alternate: "T".to_string(),
            kind: MutationKind::Substitution,
        }];
        let markers = vec![marker(761155, "T", "rifampicin"), marker(10, "G", "isoniazid")];

        // Whatever the flip outcome, the recorded flag must explain the
        // verdict relative to the marker-derived one.
        for seed in 0..20 {
            let mut predictor =
                SimulatedResistancePredictor::with_rng(StdRng::seed_from_u64(seed));
            let call = predictor.predict_resistance(&mutations, &markers);
            assert_eq!(call.matched_drugs, vec!["rifampicin".to_string()]);
            assert_eq!(call.markers_checked, 2);
            let derived = ResistanceVerdict::Resistant;
            let expected = if call.flipped { derived.flipped() } else { derived };
            assert_eq!(call.verdict, expected);
        }
    }

    #[test]
    fn test_resistance_no_markers_matched() {
        let mut predictor = SimulatedResistancePredictor::with_rng(StdRng::seed_from_u64(11));
        let call = predictor.predict_resistance(&[], &[marker(5, "T", "rifampicin")]);
        assert!(call.matched_drugs.is_empty());
        let derived = ResistanceVerdict::Susceptible;
        let expected = if call.flipped { derived.flipped() } else { derived };
        assert_eq!(call.verdict, expected);
    }
}
