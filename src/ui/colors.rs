//! Color definitions for verdicts and UI elements

use ratatui::style::Color;

use crate::mutation::simulate::{ResistanceVerdict, RiskLevel};
use crate::sequence::similarity::Classification;

/// Get the display color for a checker classification
pub fn classification_color(classification: Classification) -> Color {
    match classification {
        Classification::StrongEvidence => Color::Red,
        Classification::PossibleMatch => Color::Yellow,
        Classification::NoMatch => Color::Green,
    }
}

pub fn risk_color(risk: RiskLevel) -> Color {
    match risk {
        RiskLevel::Low => Color::Green,
        RiskLevel::Medium => Color::Yellow,
        RiskLevel::High => Color::Red,
    }
}

pub fn verdict_color(verdict: ResistanceVerdict) -> Color {
    match verdict {
        ResistanceVerdict::Resistant => Color::Red,
        ResistanceVerdict::Susceptible => Color::Green,
    }
}

/// Get the display color for a nucleotide base
pub fn base_color(base: char) -> Color {
    match base.to_ascii_uppercase() {
        'A' => Color::Green,
        'T' => Color::Yellow,
        'G' => Color::Magenta,
        'C' => Color::Cyan,
        'N' => Color::DarkGray,
        _ => Color::White,
    }
}
