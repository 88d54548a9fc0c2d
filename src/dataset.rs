//! Remote TB resistance-marker catalog
//!
//! The catalog is a static tab-separated table of known resistance-conferring
//! mutations, downloaded once, cached in the platform data directory, and
//! consumed read-only for display, filtering, and resistance prediction.

use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use log::info;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

pub const MARKER_CATALOG_URL: &str =
    "https://raw.githubusercontent.com/jodyphelan/tbdb/master/tbdb.variants.tsv.gz";

const CATALOG_ARCHIVE: &str = "tb_marker_catalog.tsv.gz";
const CATALOG_FILE: &str = "tb_marker_catalog.tsv";

/// One known resistance-conferring mutation from the reference catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResistanceMarker {
    pub gene: String,
    pub position: u64,
    pub reference: String,
    pub alternate: String,
    pub drug: String,
    pub confidence: String,
}

#[derive(Debug, Clone)]
pub enum DatasetProgress {
    CheckingCache,
    Downloading {
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },
    Extracting,
    Parsing {
        lines_parsed: usize,
    },
    Complete,
    Error(String),
}

pub type ProgressCallback = Box<dyn FnMut(DatasetProgress) + Send>;

pub fn get_data_dir() -> Result<PathBuf, Box<dyn Error>> {
    let dir = dirs::data_dir()
        .ok_or("could not determine platform data directory")?
        .join("tbscope");
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Path of the extracted catalog cache, if it exists.
pub fn cached_catalog_file() -> Option<PathBuf> {
    let path = get_data_dir().ok()?.join(CATALOG_FILE);
    path.exists().then_some(path)
}

pub fn download_and_parse_marker_catalog() -> Result<Vec<ResistanceMarker>, Box<dyn Error>> {
    download_and_parse_marker_catalog_with_progress(None)
}

pub fn download_and_parse_marker_catalog_with_progress(
    mut progress: Option<ProgressCallback>,
) -> Result<Vec<ResistanceMarker>, Box<dyn Error>> {
    report(&mut progress, DatasetProgress::CheckingCache);

    let data_dir = get_data_dir()?;
    let archive_file = data_dir.join(CATALOG_ARCHIVE);
    let extracted_file = data_dir.join(CATALOG_FILE);

    if !extracted_file.exists() {
        if !archive_file.exists() {
            info!("Downloading TB marker catalog from {MARKER_CATALOG_URL}");
            let client = Client::new();
            let mut response = client.get(MARKER_CATALOG_URL).send()?;
            let total_bytes = response.content_length();
            report(
                &mut progress,
                DatasetProgress::Downloading {
                    bytes_downloaded: 0,
                    total_bytes,
                },
            );

            let mut file = File::create(&archive_file)?;
            io::copy(&mut response, &mut file)?;
            report(
                &mut progress,
                DatasetProgress::Downloading {
                    bytes_downloaded: fs::metadata(&archive_file)?.len(),
                    total_bytes,
                },
            );
        }

        info!("Extracting TB marker catalog");
        report(&mut progress, DatasetProgress::Extracting);
        let compressed_file = File::open(&archive_file)?;
        let decoder = GzDecoder::new(compressed_file);
        let mut reader = BufReader::new(decoder);
        let mut extracted_content = String::new();
        reader.read_to_string(&mut extracted_content)?;

        fs::write(&extracted_file, extracted_content)?;
    }

    let markers = parse_marker_catalog(&extracted_file, &mut progress)?;
    info!("Loaded {} resistance markers", markers.len());
    report(&mut progress, DatasetProgress::Complete);
    Ok(markers)
}

/// Parse the extracted catalog. Columns: gene, position, reference,
/// alternate, drug, confidence; short rows are skipped.
pub fn parse_marker_catalog(
    path: &Path,
    progress: &mut Option<ProgressCallback>,
) -> Result<Vec<ResistanceMarker>, Box<dyn Error>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut markers = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if index == 0 {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 6 {
            continue;
        }

        markers.push(ResistanceMarker {
            gene: fields[0].to_string(),
            position: fields[1].parse().unwrap_or(0),
            reference: fields[2].to_string(),
            alternate: fields[3].to_string(),
            drug: fields[4].to_string(),
            confidence: fields[5].to_string(),
        });

        if markers.len() % 1000 == 0 {
            report(
                progress,
                DatasetProgress::Parsing {
                    lines_parsed: markers.len(),
                },
            );
        }
    }

    Ok(markers)
}

fn report(progress: &mut Option<ProgressCallback>, state: DatasetProgress) {
    if let Some(callback) = progress {
        callback(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_marker_catalog() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "gene\tposition\treference\talternate\tdrug\tconfidence").unwrap();
        writeln!(file, "rpoB\t761155\tC\tT\trifampicin\thigh").unwrap();
        writeln!(file, "katG\t2155168\tG\tC\tisoniazid\thigh").unwrap();
        writeln!(file, "short\trow").unwrap();

        let markers = parse_marker_catalog(file.path(), &mut None).unwrap();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].gene, "rpoB");
        assert_eq!(markers[0].position, 761155);
        assert_eq!(markers[1].drug, "isoniazid");
    }

    #[test]
    fn test_parse_skips_header_only_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "gene\tposition\treference\talternate\tdrug\tconfidence").unwrap();
        let markers = parse_marker_catalog(file.path(), &mut None).unwrap();
        assert!(markers.is_empty());
    }
}
