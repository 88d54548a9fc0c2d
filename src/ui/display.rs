//! Display formatting functions for the UI

use crate::dataset::DatasetProgress;

/// Format a byte count with a binary unit suffix
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

pub fn format_percent(value: f64) -> String {
    format!("{value:.2}%")
}

/// Truncate a sequence for display, marking the cut with an ellipsis
pub fn sequence_preview(sequence: &str, max_bases: usize) -> String {
    if sequence.len() <= max_bases {
        sequence.to_string()
    } else {
        format!("{}...", &sequence[..max_bases])
    }
}

/// One-line description of the marker catalog loading state
pub fn format_progress(progress: &DatasetProgress) -> String {
    match progress {
        DatasetProgress::CheckingCache => "Checking catalog cache...".to_string(),
        DatasetProgress::Downloading { bytes_downloaded, total_bytes } => match total_bytes {
            Some(total) if *total > 0 => format!(
                "Downloading catalog: {} / {} ({:.0}%)",
                format_bytes(*bytes_downloaded),
                format_bytes(*total),
                (*bytes_downloaded as f64 / *total as f64) * 100.0
            ),
            _ => format!("Downloading catalog: {}", format_bytes(*bytes_downloaded)),
        },
        DatasetProgress::Extracting => "Extracting catalog...".to_string(),
        DatasetProgress::Parsing { lines_parsed } => {
            format!("Parsing catalog: {lines_parsed} markers")
        }
        DatasetProgress::Complete => "Catalog ready".to_string(),
        DatasetProgress::Error(e) => format!("Catalog error: {e}"),
    }
}
