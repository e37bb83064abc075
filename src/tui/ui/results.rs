//! Prediction results view.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

use super::patient::format_value;
use crate::domain::{Assessment, FieldKind, PatientRecord, Prediction, RiskTarget, FIELD_SPECS};
use crate::tui::styles::ClinicalTheme;

/// Results state
#[derive(Debug, Clone, Default)]
pub enum ResultsState {
    /// Nothing submitted yet
    #[default]
    Idle,
    /// Both models answered
    Complete { assessment: Assessment },
    /// A classifier failed for this submission
    Error { message: String },
}

/// Render the results view
pub fn render_results(f: &mut Frame, area: Rect, state: &ResultsState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_results_header(f, chunks[0]);
    match state {
        ResultsState::Idle => render_idle(f, chunks[1]),
        ResultsState::Complete { assessment } => render_assessment(f, chunks[1], assessment),
        ResultsState::Error { message } => render_error(f, chunks[1], message),
    }
    render_results_footer(f, chunks[2], state);
}

fn render_results_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", ClinicalTheme::text()),
        Span::styled("Prediction Results", ClinicalTheme::title()),
        Span::styled(" │ Random Forest Models", ClinicalTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_idle(f: &mut Frame, area: Rect) {
    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "No prediction yet",
            ClinicalTheme::text_secondary(),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Enter patient data to begin",
            ClinicalTheme::text_muted(),
        )),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(content, area);
}

fn render_assessment(f: &mut Frame, area: Rect, assessment: &Assessment) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9), // CKD
            Constraint::Length(9), // Dialysis
            Constraint::Min(3),    // Inputs used
        ])
        .margin(1)
        .split(area);

    for (i, (target, prediction)) in assessment.predictions().into_iter().enumerate() {
        render_prediction(f, chunks[i], target, &prediction);
    }
    render_inputs(f, chunks[2], &assessment.record);
}

fn render_prediction(f: &mut Frame, area: Rect, target: RiskTarget, prediction: &Prediction) {
    let badge = target.badge(prediction.label);
    let block = Block::default()
        .title(Span::styled(format!(" {} ", target.title()), ClinicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(ClinicalTheme::badge(badge));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Badge + message
            Constraint::Length(3), // Gauge
            Constraint::Min(0),
        ])
        .split(inner);

    let verdict = Paragraph::new(Line::from(vec![
        Span::styled(format!(" {badge} "), ClinicalTheme::badge_chip(badge)),
        Span::raw(" "),
        Span::styled(
            format!("{} {}", badge.icon(), target.message(prediction.label)),
            ClinicalTheme::badge(badge).add_modifier(Modifier::BOLD),
        ),
    ]))
    .alignment(Alignment::Center);
    f.render_widget(verdict, chunks[0]);

    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(Span::styled(
                    format!(" {} ", target.probability_label()),
                    ClinicalTheme::text_secondary(),
                ))
                .borders(Borders::ALL)
                .border_style(ClinicalTheme::border()),
        )
        .gauge_style(ClinicalTheme::badge(badge))
        .ratio(prediction.probability.clamp(0.0, 1.0))
        .label(format!(
            "{}: {}",
            target.probability_label(),
            prediction.formatted_probability()
        ));
    f.render_widget(gauge, chunks[1]);
}

fn render_inputs(f: &mut Frame, area: Rect, record: &PatientRecord) {
    // Same text the form shows for each value.
    let mut spans = Vec::new();
    for (spec, value) in FIELD_SPECS.iter().zip(record.to_features()) {
        let text = match spec.kind {
            FieldKind::Flag if value != 0.0 => "Yes".to_string(),
            FieldKind::Flag => "No".to_string(),
            _ => format_value(spec, value),
        };
        spans.push(Span::styled(format!("{} ", spec.label), ClinicalTheme::text_muted()));
        spans.push(Span::styled(format!("{text}  "), ClinicalTheme::text()));
    }
    let line = Line::from(spans);

    let inputs = Paragraph::new(line).alignment(Alignment::Center).block(
        Block::default()
            .title(Span::styled(" Inputs Used ", ClinicalTheme::text_secondary()))
            .borders(Borders::ALL)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(inputs, area);
}

fn render_error(f: &mut Frame, area: Rect, message: &str) {
    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled("! Prediction failed", ClinicalTheme::danger())),
        Line::from(""),
        Line::from(Span::styled(message, ClinicalTheme::text())),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(ClinicalTheme::danger()),
    );

    f.render_widget(content, area);
}

fn render_results_footer(f: &mut Frame, area: Rect, state: &ResultsState) {
    let content = match state {
        ResultsState::Error { .. } => Line::from(vec![
            Span::styled("[Enter] ", ClinicalTheme::key_hint()),
            Span::styled("Back to Form ", ClinicalTheme::key_desc()),
            Span::styled("[Esc] ", ClinicalTheme::key_hint()),
            Span::styled("Dashboard", ClinicalTheme::key_desc()),
        ]),
        _ => Line::from(vec![
            Span::styled("[Enter] ", ClinicalTheme::key_hint()),
            Span::styled("Edit Values ", ClinicalTheme::key_desc()),
            Span::styled("[N] ", ClinicalTheme::key_hint()),
            Span::styled("New Patient ", ClinicalTheme::key_desc()),
            Span::styled("[Esc] ", ClinicalTheme::key_hint()),
            Span::styled("Dashboard", ClinicalTheme::key_desc()),
        ]),
    };

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_renders_badges_and_percentages() {
        let assessment = Assessment::new(
            PatientRecord::default(),
            Prediction::from_probability(0.4567),
            Prediction::from_probability(0.9),
        );
        let state = ResultsState::Complete { assessment };

        let mut terminal = Terminal::new(TestBackend::new(120, 36)).unwrap();
        terminal
            .draw(|f| render_results(f, f.area(), &state))
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("CKD Probability: 45.67%"));
        assert!(text.contains("Dialysis Probability: 90.00%"));
        assert!(text.contains("POSITIVE"));
        assert!(text.contains("WARNING"));
    }

    #[test]
    fn test_inputs_use_form_formatting() {
        let record = PatientRecord {
            bun: 20.25,
            gfr: 42.57,
            diabetes: 1,
            ..PatientRecord::default()
        };
        let state = ResultsState::Complete {
            assessment: Assessment::new(
                record,
                Prediction::from_probability(0.1),
                Prediction::from_probability(0.1),
            ),
        };

        let mut terminal = Terminal::new(TestBackend::new(200, 36)).unwrap();
        terminal
            .draw(|f| render_results(f, f.area(), &state))
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("20.25"));
        assert!(text.contains("42.57"));
        assert!(text.contains("1.20"));
        assert!(text.contains("Yes"));
    }

    #[test]
    fn test_renders_error() {
        let state = ResultsState::Error {
            message: "model failed".into(),
        };
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal
            .draw(|f| render_results(f, f.area(), &state))
            .unwrap();

        assert!(buffer_text(&terminal).contains("Prediction failed"));
    }
}
