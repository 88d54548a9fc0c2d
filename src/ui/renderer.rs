use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::{
    app::{App, InputTarget, View},
    ui::colors::{base_color, classification_color, risk_color, verdict_color},
    ui::display::{format_bytes, format_percent, format_progress, sequence_preview},
};

pub fn render_ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_title(f, app, chunks[0]);

    match app.view {
        View::Overview => render_overview(f, app, chunks[1]),
        View::Checker => render_checker(f, app, chunks[1]),
        View::Mutations => render_mutations(f, app, chunks[1]),
        View::OrganImpact => render_organ_impact(f, app, chunks[1]),
        View::Resistance => render_resistance(f, app, chunks[1]),
    }

    render_status_bar(f, app, chunks[2]);
}

fn render_title(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled("TBscope", Style::default().fg(Color::Cyan)),
        Span::raw("   "),
    ];

    if app.is_loading_markers {
        if let Some(progress) = &app.dataset_progress {
            spans.push(Span::styled(
                format_progress(progress),
                Style::default().fg(Color::Yellow),
            ));
        }
    } else if let Some(error) = &app.loading_error {
        spans.push(Span::styled(error.clone(), Style::default().fg(Color::Red)));
    } else {
        spans.push(Span::styled(
            format!("Loaded {} resistance markers", app.loaded_markers_count),
            Style::default().fg(Color::Green),
        ));
    }

    spans.push(Span::raw("   "));
    for view in View::ALL {
        let style = if view == app.view {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!(" {} ", view.title()), style));
        spans.push(Span::raw(" "));
    }

    let title_widget = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title_widget, area);
}

fn render_overview(f: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let mut file_lines = Vec::new();
    match app.session.primary() {
        Some(primary) => {
            file_lines.push(Line::from(vec![
                Span::raw("Name:     "),
                Span::styled(primary.name.clone(), Style::default().fg(Color::Green)),
            ]));
            file_lines.push(Line::from(format!("Size:     {}", format_bytes(primary.size))));
            file_lines.push(Line::from(format!(
                "Uploaded: {}",
                primary.uploaded_at.format("%Y-%m-%d %H:%M:%S UTC")
            )));
            file_lines.push(Line::from(""));
            file_lines.push(Line::from(sequence_preview(primary.content.trim(), 200)));
        }
        None => {
            file_lines.push(Line::from("No primary file loaded."));
            file_lines.push(Line::from(""));
            file_lines.push(Line::from("Press 'p' and enter a FASTA/FASTQ path."));
        }
    }

    let file_widget = Paragraph::new(file_lines)
        .block(Block::default().borders(Borders::ALL).title("Primary File"))
        .wrap(Wrap { trim: true });
    f.render_widget(file_widget, columns[0]);

    let mut composition_lines = Vec::new();
    match &app.primary_features {
        Some(features) => {
            let counts = features.base_counts;
            composition_lines.push(Line::from(format!("Length: {} bases", features.length)));
            composition_lines.push(Line::from(vec![
                Span::styled(format!("A: {}  ", counts.a), Style::default().fg(base_color('A'))),
                Span::styled(format!("T: {}  ", counts.t), Style::default().fg(base_color('T'))),
                Span::styled(format!("G: {}  ", counts.g), Style::default().fg(base_color('G'))),
                Span::styled(format!("C: {}  ", counts.c), Style::default().fg(base_color('C'))),
                Span::styled(format!("N: {}", counts.n), Style::default().fg(base_color('N'))),
            ]));
            composition_lines.push(Line::from(format!(
                "GC content: {}",
                format_percent(features.gc_content)
            )));
            composition_lines.push(Line::from(format!(
                "AT content: {}",
                format_percent(features.at_content)
            )));
        }
        None => {
            composition_lines.push(Line::from("No composition available."));
        }
    }

    let composition_widget = Paragraph::new(composition_lines)
        .block(Block::default().borders(Borders::ALL).title("Composition"));
    f.render_widget(composition_widget, columns[1]);
}

fn render_checker(f: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(6)])
        .split(area);

    let reference_line = match &app.reference {
        Some(reference) => Line::from(vec![
            Span::raw("Reference: "),
            Span::styled(reference.name.clone(), Style::default().fg(Color::Green)),
            Span::raw(format!(
                "  ({} bases, GC {})",
                reference.sequence.len(),
                format_percent(reference.features.gc_content)
            )),
        ]),
        None => Line::from("No reference loaded. Press 'f' and enter a reference genome path."),
    };

    let inputs_widget = Paragraph::new(vec![
        reference_line,
        Line::from("Press 'r' to compare the primary file against the reference."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Inputs"));
    f.render_widget(inputs_widget, rows[0]);

    let mut verdict_lines = Vec::new();
    match (&app.similarity, &app.breakdown) {
        (Some(report), Some(breakdown)) => {
            let color = classification_color(report.classification);
            verdict_lines.push(Line::from(vec![
                Span::raw("Similarity: "),
                Span::styled(
                    format_percent(report.percent),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(
                    "  ({} of {} compared bases, sample {} / reference {})",
                    report.matches, report.compared, report.sample_length, report.reference_length
                )),
            ]));
            verdict_lines.push(Line::from(vec![
                Span::raw("Verdict:    "),
                Span::styled(report.classification.to_string(), Style::default().fg(color)),
                Span::raw(format!("  (confidence: {})", report.classification.confidence())),
            ]));
            verdict_lines.push(Line::from(report.classification.recommendation()));
            verdict_lines.push(Line::from(""));
            verdict_lines.push(Line::from(format!(
                "Breakdown: positional {} | k-mer {} | GC {} | composite {}",
                format_percent(breakdown.positional),
                format_percent(breakdown.kmer),
                format_percent(breakdown.gc),
                format_percent(breakdown.composite),
            )));

            if !app.matching_positions.is_empty() {
                let mut mask = Vec::new();
                mask.push(Span::raw("Prefix:    "));
                for matched in app.matching_positions.iter().take(60) {
                    if *matched {
                        mask.push(Span::styled("|", Style::default().fg(Color::Green)));
                    } else {
                        mask.push(Span::styled(".", Style::default().fg(Color::Red)));
                    }
                }
                if app.matching_positions.len() > 60 {
                    mask.push(Span::raw(" ..."));
                }
                verdict_lines.push(Line::from(mask));
            }
        }
        _ => {
            verdict_lines.push(Line::from("No comparison yet."));
        }
    }

    let verdict_widget = Paragraph::new(verdict_lines)
        .block(Block::default().borders(Borders::ALL).title("Result"))
        .wrap(Wrap { trim: true });
    f.render_widget(verdict_widget, rows[1]);
}

fn render_mutations(f: &mut Frame, app: &App, area: Rect) {
    let mut lines = Vec::new();

    if app.mutations.is_empty() {
        lines.push(Line::from("No mutations called. Press 'r' to run the simulated caller."));
        lines.push(Line::from("Press 't' to import a mutation CSV instead."));
    } else {
        lines.push(Line::from(Span::styled(
            format!("{:>10}  {:>4}  {:>6}  Type", "Position", "Ref", "Alt"),
            Style::default().fg(Color::DarkGray),
        )));
        let visible = area.height.saturating_sub(3) as usize;
        for mutation in app.mutations.iter().take(visible) {
            lines.push(Line::from(format!(
                "{:>10}  {:>4}  {:>6}  {}",
                mutation.position, mutation.reference, mutation.alternate, mutation.kind
            )));
        }
        if app.mutations.len() > visible {
            lines.push(Line::from(format!("... {} more", app.mutations.len() - visible)));
        }
    }

    let title = format!("Mutations (simulated) - {} called", app.mutations.len());
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(widget, area);
}

fn render_organ_impact(f: &mut Frame, app: &App, area: Rect) {
    let mut lines = Vec::new();

    if app.organ_impacts.is_empty() {
        lines.push(Line::from("No prediction yet. Press 'r' after calling or importing mutations."));
    } else {
        for impact in &app.organ_impacts {
            let color = risk_color(impact.risk);
            lines.push(Line::from(vec![
                Span::raw(format!("{:<12}", impact.organ)),
                Span::styled(format!("{:>6.1}  ", impact.score), Style::default().fg(color)),
                Span::styled(format!("{:<6}", impact.risk.to_string()), Style::default().fg(color)),
                Span::raw("  "),
                Span::raw(impact.recommendation.clone()),
            ]));
        }
    }

    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Organ Impact (simulated)"))
        .wrap(Wrap { trim: true });
    f.render_widget(widget, area);
}

fn render_resistance(f: &mut Frame, app: &App, area: Rect) {
    let mut lines = Vec::new();

    match &app.resistance {
        Some(call) => {
            let color = verdict_color(call.verdict);
            lines.push(Line::from(vec![
                Span::raw("Verdict: "),
                Span::styled(
                    call.verdict.to_string(),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
            ]));
            if call.matched_drugs.is_empty() {
                lines.push(Line::from(format!(
                    "No catalog markers matched ({} checked).",
                    call.markers_checked
                )));
            } else {
                lines.push(Line::from(format!(
                    "Matched drugs: {} ({} markers checked)",
                    call.matched_drugs.join(", "),
                    call.markers_checked
                )));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Simulated prediction: the verdict is randomized and not diagnostic.",
                Style::default().fg(Color::DarkGray),
            )));
        }
        None => {
            lines.push(Line::from("No prediction yet. Call mutations, then press 'r'."));
            if app.is_loading_markers {
                lines.push(Line::from("Waiting for the marker catalog to finish loading."));
            }
        }
    }

    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Drug Resistance (simulated)"));
    f.render_widget(widget, area);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let line = if app.input_target != InputTarget::None {
        let prompt = match app.input_target {
            InputTarget::PrimaryPath => "Primary file path",
            InputTarget::ReferencePath => "Reference genome path",
            InputTarget::TablePath => "Mutation CSV path",
            InputTarget::None => "",
        };
        Line::from(vec![
            Span::styled(format!("{prompt}: "), Style::default().fg(Color::Cyan)),
            Span::raw(app.input.clone()),
            Span::styled("_", Style::default().fg(Color::DarkGray)),
        ])
    } else if let Some(status) = &app.status {
        Line::from(vec![
            Span::styled(status.clone(), Style::default().fg(Color::Yellow)),
            Span::raw("   "),
            Span::styled(
                "q quit | Tab views | p primary | f reference | t table | r run | e export | d remove",
                Style::default().fg(Color::DarkGray),
            ),
        ])
    } else {
        Line::from(Span::styled(
            "q quit | Tab views | p primary | f reference | t table | r run | e export | d remove",
            Style::default().fg(Color::DarkGray),
        ))
    };

    let widget = Paragraph::new(vec![line]).block(Block::default().borders(Borders::ALL));
    f.render_widget(widget, area);
}
