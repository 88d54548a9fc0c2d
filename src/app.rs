use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use log::{debug, error, info, trace, warn};

use crate::dataset::{self, DatasetProgress, ResistanceMarker};
use crate::mutation::simulate::{
    MutationCaller, OrganImpact, OrganImpactModel, ResistanceCall, ResistancePredictor,
    SimulatedMutationCaller, SimulatedOrganImpactModel, SimulatedResistancePredictor,
};
use crate::mutation::table::{read_mutation_kinds_file, MutationKind, MutationRecord};
use crate::report::{
    write_comparison_json, write_mutations_csv_file, write_summary_json_file, ComparisonSummary,
    SequenceSummary,
};
use crate::sequence::analysis::SequenceFeatures;
use crate::sequence::parse::{parse_sequence, parse_sequence_file, ParseOptions};
use crate::sequence::similarity::{identify_matching_positions, SimilarityBreakdown, SimilarityReport};
use crate::session::{PrimaryFile, SessionState};

/// Byte ceiling for files entering the mutation-finder flow.
pub const MUTATION_FLOW_MAX_BYTES: u64 = 1 << 30;

/// Byte ceiling for files entering the TB-checker flow.
pub const CHECKER_FLOW_MAX_BYTES: u64 = 3 << 30;

/// Cap on bases analyzed from very large first records.
pub const ANALYSIS_MAX_BASES: usize = 100_000;

const SUMMARY_EXPORT_FILE: &str = "tbscope_summary.json";
const COMPARISON_EXPORT_FILE: &str = "tbscope_comparison.json";
const MUTATION_EXPORT_FILE: &str = "tbscope_mutations.csv";

/// Options for the mutation-finder flow: its own ceiling, the stricter
/// 10-base minimum, and the large-record cap.
pub fn mutation_flow_options() -> ParseOptions {
    ParseOptions {
        max_bytes: Some(MUTATION_FLOW_MAX_BYTES),
        max_bases: Some(ANALYSIS_MAX_BASES),
        ..ParseOptions::strict_first_sequence()
    }
}

/// Options for the TB-checker flow.
pub fn checker_flow_options() -> ParseOptions {
    ParseOptions {
        max_bytes: Some(CHECKER_FLOW_MAX_BYTES),
        ..ParseOptions::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Overview,
    Checker,
    Mutations,
    OrganImpact,
    Resistance,
}

impl View {
    pub const ALL: [View; 5] = [
        View::Overview,
        View::Checker,
        View::Mutations,
        View::OrganImpact,
        View::Resistance,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            View::Overview => "Overview",
            View::Checker => "TB Checker",
            View::Mutations => "Mutation Finder",
            View::OrganImpact => "Organ Impact",
            View::Resistance => "Drug Resistance",
        }
    }

    pub fn next(self) -> View {
        let index = View::ALL.iter().position(|view| *view == self).unwrap_or(0);
        View::ALL[(index + 1) % View::ALL.len()]
    }

    pub fn prev(self) -> View {
        let index = View::ALL.iter().position(|view| *view == self).unwrap_or(0);
        View::ALL[(index + View::ALL.len() - 1) % View::ALL.len()]
    }
}

/// Which path the input line is currently collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTarget {
    None,
    PrimaryPath,
    ReferencePath,
    TablePath,
}

/// A parsed sequence with the name it arrived under and its composition.
#[derive(Debug, Clone)]
pub struct LoadedSequence {
    pub name: String,
    pub sequence: crate::sequence::parse::NucleotideSequence,
    pub features: SequenceFeatures,
}

pub struct App {
    pub session: SessionState,
    pub view: View,
    pub input: String,
    pub input_target: InputTarget,
    /// Outcome of the last user action, shown inline in the active view.
    pub status: Option<String>,

    pub primary_features: Option<SequenceFeatures>,
    pub reference: Option<LoadedSequence>,
    pub similarity: Option<SimilarityReport>,
    pub breakdown: Option<SimilarityBreakdown>,
    pub matching_positions: Vec<bool>,

    pub mutations: Vec<MutationRecord>,
    pub imported_kinds: Vec<MutationKind>,
    pub organ_impacts: Vec<OrganImpact>,
    pub resistance: Option<ResistanceCall>,

    pub markers: Vec<ResistanceMarker>,
    pub loaded_markers_count: usize,
    pub is_loading_markers: bool,
    pub loading_error: Option<String>,
    pub dataset_progress: Option<DatasetProgress>,
    pub progress_receiver: Option<Receiver<DatasetProgress>>,
    pub marker_receiver: Option<Receiver<Result<Vec<ResistanceMarker>, String>>>,

    pub caller: SimulatedMutationCaller,
    pub impact_model: SimulatedOrganImpactModel,
    pub resistance_model: SimulatedResistancePredictor,
}

impl App {
    pub fn new(session: SessionState) -> App {
        debug!("Creating new App instance");
        let mut app = App {
            session,
            view: View::Overview,
            input: String::new(),
            input_target: InputTarget::None,
            status: None,
            primary_features: None,
            reference: None,
            similarity: None,
            breakdown: None,
            matching_positions: Vec::new(),
            mutations: Vec::new(),
            imported_kinds: Vec::new(),
            organ_impacts: Vec::new(),
            resistance: None,
            markers: Vec::new(),
            loaded_markers_count: 0,
            is_loading_markers: true,
            loading_error: None,
            dataset_progress: Some(DatasetProgress::CheckingCache),
            progress_receiver: None,
            marker_receiver: None,
            caller: SimulatedMutationCaller::new(),
            impact_model: SimulatedOrganImpactModel::new(),
            resistance_model: SimulatedResistancePredictor::new(),
        };
        app.refresh_primary_analysis();
        app
    }

    /// Recompute the overview composition from the restored primary file.
    fn refresh_primary_analysis(&mut self) {
        self.primary_features = None;
        if let Some(primary) = self.session.primary() {
            match parse_sequence(&primary.content, &checker_flow_options()) {
                Ok(sequence) => {
                    self.primary_features = Some(SequenceFeatures::from_sequence(&sequence));
                }
                Err(e) => {
                    warn!("Stored primary file does not parse: {e}");
                }
            }
        }
    }

    pub fn begin_input(&mut self, target: InputTarget) {
        self.input_target = target;
        self.input.clear();
    }

    pub fn cancel_input(&mut self) {
        self.input_target = InputTarget::None;
        self.input.clear();
    }

    pub fn on_key(&mut self, c: char) {
        if self.input_target != InputTarget::None {
            self.input.push(c);
        }
    }

    pub fn on_backspace(&mut self) {
        if self.input_target != InputTarget::None {
            self.input.pop();
        }
    }

    /// Dispatch the collected path to whichever loader asked for it.
    pub fn submit_input(&mut self) {
        let path = PathBuf::from(self.input.trim());
        let target = self.input_target;
        self.cancel_input();

        match target {
            InputTarget::PrimaryPath => self.load_primary_file(&path),
            InputTarget::ReferencePath => self.load_reference_file(&path),
            InputTarget::TablePath => self.load_mutation_table(&path),
            InputTarget::None => {}
        }
    }

    pub fn next_view(&mut self) {
        self.view = self.view.next();
        trace!("Switched to view {:?}", self.view);
    }

    pub fn prev_view(&mut self) {
        self.view = self.view.prev();
    }

    pub fn load_primary_file(&mut self, path: &Path) {
        info!("Loading primary file from {path:?}");
        match PrimaryFile::from_path(path) {
            Ok(primary) => {
                let name = primary.name.clone();
                if let Err(e) = self.session.set_primary(primary) {
                    error!("Failed to persist primary file: {e}");
                    self.status = Some(format!("Could not save primary file: {e}"));
                    return;
                }
                self.refresh_primary_analysis();
                self.status = Some(format!("Loaded primary file {name}"));
            }
            Err(e) => {
                error!("Failed to read primary file {path:?}: {e}");
                self.status = Some(format!("Could not read {}: {e}", path.display()));
            }
        }
    }

    pub fn clear_primary_file(&mut self) {
        match self.session.clear() {
            Ok(()) => {
                info!("Primary file removed");
                self.primary_features = None;
                self.similarity = None;
                self.breakdown = None;
                self.matching_positions.clear();
                self.mutations.clear();
                self.organ_impacts.clear();
                self.resistance = None;
                self.status = Some("Primary file removed".to_string());
            }
            Err(e) => {
                error!("Failed to clear session: {e}");
                self.status = Some(format!("Could not remove primary file: {e}"));
            }
        }
    }

    pub fn load_reference_file(&mut self, path: &Path) {
        info!("Loading reference genome from {path:?}");
        match parse_sequence_file(path, &checker_flow_options()) {
            Ok(sequence) => {
                let features = SequenceFeatures::from_sequence(&sequence);
                let name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                self.status = Some(format!("Loaded reference {name} ({} bases)", sequence.len()));
                self.reference = Some(LoadedSequence { name, sequence, features });
            }
            Err(e) => {
                error!("Failed to parse reference {path:?}: {e}");
                self.status = Some(format!("Reference rejected: {e}"));
            }
        }
    }

    pub fn load_mutation_table(&mut self, path: &Path) {
        info!("Importing mutation table from {path:?}");
        match read_mutation_kinds_file(path) {
            Ok(kinds) => {
                self.status = Some(format!("Imported {} mutation rows", kinds.len()));
                self.imported_kinds = kinds;
            }
            Err(e) => {
                error!("Mutation table rejected: {e}");
                self.status = Some(format!("Mutation table rejected: {e}"));
            }
        }
    }

    /// Compare the primary file against the loaded reference genome.
    pub fn run_checker(&mut self) {
        let Some(primary) = self.session.primary() else {
            self.status = Some("Load a primary file first".to_string());
            return;
        };
        let Some(reference) = &self.reference else {
            self.status = Some("Load a reference genome first".to_string());
            return;
        };

        let sample = match parse_sequence(&primary.content, &checker_flow_options()) {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Checker run rejected sample: {e}");
                self.status = Some(format!("Sample rejected: {e}"));
                return;
            }
        };

        let report = SimilarityReport::positional(&sample, &reference.sequence);
        info!(
            "Checker verdict: {:.2}% over {} bases -> {}",
            report.percent, report.compared, report.classification
        );

        self.matching_positions =
            identify_matching_positions(sample.as_str(), reference.sequence.as_str());
        self.breakdown = Some(SimilarityBreakdown::calculate(&sample, &reference.sequence));
        self.status = Some(format!(
            "{:.2}% match over {} bases",
            report.percent, report.compared
        ));
        self.similarity = Some(report);
    }

    /// Run the simulated mutation caller over the primary file.
    pub fn run_mutation_finder(&mut self) {
        let Some(primary) = self.session.primary() else {
            self.status = Some("Load a primary file first".to_string());
            return;
        };

        let sequence = match parse_sequence(&primary.content, &mutation_flow_options()) {
            Ok(sequence) => sequence,
            Err(e) => {
                warn!("Mutation finder rejected input: {e}");
                self.status = Some(format!("Sequence rejected: {e}"));
                return;
            }
        };

        self.mutations = self.caller.call_mutations(&sequence);
        info!("Simulated caller produced {} mutations", self.mutations.len());
        self.status = Some(format!("Called {} mutations (simulated)", self.mutations.len()));
    }

    /// Predict organ impact from imported rows, or from the last calling run.
    pub fn run_organ_impact(&mut self) {
        let kinds: Vec<MutationKind> = if !self.imported_kinds.is_empty() {
            self.imported_kinds.clone()
        } else {
            self.mutations.iter().map(|mutation| mutation.kind.clone()).collect()
        };

        if kinds.is_empty() {
            self.status = Some("No mutations available: import a table or run the finder".to_string());
            return;
        }

        self.organ_impacts = self.impact_model.predict_impact(&kinds);
        info!("Predicted impact for {} organs", self.organ_impacts.len());
        self.status = Some(format!(
            "Predicted impact over {} mutations (simulated)",
            kinds.len()
        ));
    }

    /// Predict drug resistance from called mutations and the marker catalog.
    pub fn run_resistance(&mut self) {
        if self.markers.is_empty() {
            self.status = Some("Marker catalog not loaded yet".to_string());
            return;
        }
        if self.mutations.is_empty() {
            self.status = Some("Run the mutation finder first".to_string());
            return;
        }

        let call = self
            .resistance_model
            .predict_resistance(&self.mutations, &self.markers);
        info!(
            "Resistance verdict: {} (matched {} drugs, flipped: {})",
            call.verdict,
            call.matched_drugs.len(),
            call.flipped
        );
        self.status = Some(format!("Verdict: {} (simulated)", call.verdict));
        self.resistance = Some(call);
    }

    /// Export whatever the active view produced.
    pub fn export_current_view(&mut self) {
        match self.view {
            View::Overview => self.export_summary(),
            View::Checker => self.export_comparison(),
            View::Mutations => self.export_mutations(),
            _ => {
                self.status = Some("Nothing to export in this view".to_string());
            }
        }
    }

    fn export_summary(&mut self) {
        let Some(primary) = self.session.primary() else {
            self.status = Some("Load a primary file first".to_string());
            return;
        };

        let sequence = match parse_sequence(&primary.content, &checker_flow_options()) {
            Ok(sequence) => sequence,
            Err(e) => {
                self.status = Some(format!("Sequence rejected: {e}"));
                return;
            }
        };

        let summary = SequenceSummary::new(&primary.name, &sequence);
        match write_summary_json_file(Path::new(SUMMARY_EXPORT_FILE), &summary) {
            Ok(()) => {
                info!("Wrote sequence summary to {SUMMARY_EXPORT_FILE}");
                self.status = Some(format!("Wrote {SUMMARY_EXPORT_FILE}"));
            }
            Err(e) => {
                error!("Summary export failed: {e}");
                self.status = Some(format!("Export failed: {e}"));
            }
        }
    }

    fn export_comparison(&mut self) {
        let (Some(report), Some(breakdown), Some(reference), Some(primary)) = (
            &self.similarity,
            &self.breakdown,
            &self.reference,
            self.session.primary(),
        ) else {
            self.status = Some("Run the checker first".to_string());
            return;
        };

        let sample = match parse_sequence(&primary.content, &checker_flow_options()) {
            Ok(sample) => sample,
            Err(e) => {
                self.status = Some(format!("Sample rejected: {e}"));
                return;
            }
        };

        let summary = ComparisonSummary::new(
            &primary.name,
            &sample,
            &reference.name,
            &reference.sequence,
            report,
            breakdown,
        );

        let result = std::fs::File::create(COMPARISON_EXPORT_FILE)
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
            .and_then(|file| write_comparison_json(file, &summary));
        match result {
            Ok(()) => {
                info!("Wrote comparison report to {COMPARISON_EXPORT_FILE}");
                self.status = Some(format!("Wrote {COMPARISON_EXPORT_FILE}"));
            }
            Err(e) => {
                error!("Comparison export failed: {e}");
                self.status = Some(format!("Export failed: {e}"));
            }
        }
    }

    fn export_mutations(&mut self) {
        if self.mutations.is_empty() {
            self.status = Some("Run the mutation finder first".to_string());
            return;
        }

        match write_mutations_csv_file(Path::new(MUTATION_EXPORT_FILE), &self.mutations) {
            Ok(()) => {
                info!("Wrote mutation export to {MUTATION_EXPORT_FILE}");
                self.status = Some(format!("Wrote {MUTATION_EXPORT_FILE}"));
            }
            Err(e) => {
                error!("Mutation export failed: {e}");
                self.status = Some(format!("Export failed: {e}"));
            }
        }
    }

    /// Load the marker catalog from cache without hitting the network.
    pub fn start_loading_if_cached(&mut self) -> bool {
        if dataset::cached_catalog_file().is_some() {
            self.dataset_progress = Some(DatasetProgress::Parsing { lines_parsed: 0 });
            match dataset::download_and_parse_marker_catalog() {
                Ok(markers) => {
                    self.loaded_markers_count = markers.len();
                    self.markers = markers;
                    self.is_loading_markers = false;
                    self.dataset_progress = Some(DatasetProgress::Complete);
                    info!("Loaded {} markers from cache", self.loaded_markers_count);
                }
                Err(e) => {
                    error!("Failed to load cached marker catalog: {e}");
                    self.loading_error = Some(format!("Error loading markers: {e}"));
                    self.is_loading_markers = false;
                    self.dataset_progress = Some(DatasetProgress::Error(e.to_string()));
                }
            }
            return true;
        }
        false
    }

    pub fn start_threaded_loading(&mut self) {
        if self.progress_receiver.is_some() || self.marker_receiver.is_some() {
            warn!("Attempted to start loading while already in progress");
            return;
        }

        info!("Starting threaded marker catalog loading");

        let (progress_tx, progress_rx) = mpsc::channel();
        let (result_tx, result_rx) = mpsc::channel();

        self.progress_receiver = Some(progress_rx);
        self.marker_receiver = Some(result_rx);

        thread::spawn(move || {
            debug!("Background thread started for catalog loading");

            let progress_callback = Box::new(move |progress: DatasetProgress| {
                let _ = progress_tx.send(progress);
            });

            let result = dataset::download_and_parse_marker_catalog_with_progress(Some(
                progress_callback,
            ));

            let final_result = match result {
                Ok(markers) => {
                    info!("Background loading completed with {} markers", markers.len());
                    Ok(markers)
                }
                Err(e) => {
                    error!("Background loading failed: {e}");
                    Err(e.to_string())
                }
            };

            let _ = result_tx.send(final_result);
            debug!("Background thread completed");
        });
    }

    pub fn check_loading_progress(&mut self) {
        if let Some(ref progress_rx) = self.progress_receiver {
            while let Ok(progress) = progress_rx.try_recv() {
                trace!("Loading progress update: {progress:?}");
                self.dataset_progress = Some(progress);
            }
        }

        if let Some(ref result_rx) = self.marker_receiver {
            if let Ok(result) = result_rx.try_recv() {
                match result {
                    Ok(markers) => {
                        self.loaded_markers_count = markers.len();
                        self.markers = markers;
                        self.is_loading_markers = false;
                        self.dataset_progress = Some(DatasetProgress::Complete);
                        info!("Loading completed. {} markers loaded", self.loaded_markers_count);
                    }
                    Err(e) => {
                        error!("Loading failed with error: {e}");
                        self.loading_error = Some(format!("Error loading markers: {e}"));
                        self.is_loading_markers = false;
                        self.dataset_progress = Some(DatasetProgress::Error(e));
                    }
                }

                self.progress_receiver = None;
                self.marker_receiver = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs;
    use tempfile::tempdir;

    fn app_with_session(dir: &Path) -> App {
        App::new(SessionState::load(dir.join("session.json")))
    }

    fn write_fasta(dir: &Path, name: &str, bases: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!(">seq1\n{bases}\n")).unwrap();
        path
    }

    #[test]
    fn test_checker_flow_end_to_end() {
        let dir = tempdir().unwrap();
        let mut app = app_with_session(dir.path());

        let sample = write_fasta(dir.path(), "sample.fasta", "ATGCATGCATGC");
        let reference = write_fasta(dir.path(), "reference.fasta", "ATGCATGCATGC");

        app.load_primary_file(&sample);
        assert!(app.session.primary().is_some());
        assert!(app.primary_features.is_some());

        app.load_reference_file(&reference);
        app.run_checker();

        let report = app.similarity.as_ref().unwrap();
        assert_eq!(report.percent, 100.0);
        assert_eq!(app.matching_positions.len(), 12);
        assert!(app.breakdown.is_some());
    }

    #[test]
    fn test_checker_requires_inputs() {
        let dir = tempdir().unwrap();
        let mut app = app_with_session(dir.path());

        app.run_checker();
        assert!(app.similarity.is_none());
        assert_eq!(app.status.as_deref(), Some("Load a primary file first"));
    }

    #[test]
    fn test_mutation_finder_respects_minimum_length() {
        let dir = tempdir().unwrap();
        let mut app = app_with_session(dir.path());

        // 8 bases: below the 10-base floor of the mutation flow.
        let short = write_fasta(dir.path(), "short.fasta", "ATGCATGC");
        app.load_primary_file(&short);
        app.run_mutation_finder();

        assert!(app.mutations.is_empty());
        assert!(app.status.as_deref().unwrap().contains("rejected"));
    }

    #[test]
    fn test_mutation_finder_and_impact() {
        let dir = tempdir().unwrap();
        let mut app = app_with_session(dir.path());
        app.caller = SimulatedMutationCaller::with_rng(StdRng::seed_from_u64(1), 6);
        app.impact_model = SimulatedOrganImpactModel::with_rng(StdRng::seed_from_u64(2));

        let sample = write_fasta(dir.path(), "sample.fasta", "ATGCATGCATGCATGCATGC");
        app.load_primary_file(&sample);
        app.run_mutation_finder();
        assert_eq!(app.mutations.len(), 6);

        app.run_organ_impact();
        assert_eq!(app.organ_impacts.len(), 5);
    }

    #[test]
    fn test_imported_table_takes_precedence_for_impact() {
        let dir = tempdir().unwrap();
        let mut app = app_with_session(dir.path());
        app.impact_model = SimulatedOrganImpactModel::with_rng(StdRng::seed_from_u64(2));

        let table = dir.path().join("mutations.csv");
        fs::write(&table, "Type of Mutation\nSNV\nDeletion\n").unwrap();
        app.load_mutation_table(&table);
        assert_eq!(app.imported_kinds.len(), 2);

        app.run_organ_impact();
        assert_eq!(app.organ_impacts.len(), 5);
    }

    #[test]
    fn test_rejected_table_reports_columns() {
        let dir = tempdir().unwrap();
        let mut app = app_with_session(dir.path());

        let table = dir.path().join("bad.csv");
        fs::write(&table, "Position,Gene\n1,rpoB\n").unwrap();
        app.load_mutation_table(&table);

        let status = app.status.as_deref().unwrap();
        assert!(status.contains("Type of Mutation"));
        assert!(status.contains("Position, Gene"));
        assert!(app.imported_kinds.is_empty());
    }

    #[test]
    fn test_view_cycle() {
        assert_eq!(View::Overview.next(), View::Checker);
        assert_eq!(View::Overview.prev(), View::Resistance);
        let mut view = View::Overview;
        for _ in 0..View::ALL.len() {
            view = view.next();
        }
        assert_eq!(view, View::Overview);
    }

    #[test]
    fn test_input_dispatch() {
        let dir = tempdir().unwrap();
        let mut app = app_with_session(dir.path());
        let sample = write_fasta(dir.path(), "sample.fasta", "ATGCATGCATGC");

        app.begin_input(InputTarget::PrimaryPath);
        for c in sample.display().to_string().chars() {
            app.on_key(c);
        }
        app.submit_input();

        assert_eq!(app.input_target, InputTarget::None);
        assert!(app.session.primary().is_some());
    }
}
