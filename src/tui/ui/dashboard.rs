//! Dashboard view: Main overview screen.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::adapters::forest::IntegrityStatus;
use crate::application::ModelSummary;
use crate::domain::{Assessment, Badge, RiskTarget};
use crate::tui::styles::ClinicalTheme;

/// Counts for the current session only; nothing is persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub total: usize,
    pub ckd_flagged: usize,
    pub dialysis_flagged: usize,
}

impl SessionSummary {
    pub fn record(&mut self, assessment: &Assessment) {
        self.total += 1;
        self.ckd_flagged += usize::from(assessment.ckd.label == 1);
        self.dialysis_flagged += usize::from(assessment.dialysis.label == 1);
    }
}

/// Dashboard state for rendering.
pub struct DashboardState {
    pub models: [ModelSummary; 2],
    pub integrity: IntegrityStatus,
    pub show_fingerprints: bool,
    pub session: SessionSummary,
}

impl DashboardState {
    #[must_use]
    pub fn new(models: [ModelSummary; 2], integrity: IntegrityStatus) -> Self {
        Self {
            models,
            integrity,
            show_fingerprints: false,
            session: SessionSummary::default(),
        }
    }
}

/// Render the main dashboard view.
pub fn render_dashboard(f: &mut Frame, area: Rect, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
        ])
        .split(area);

    render_header(f, chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(45), // Status panels
            Constraint::Percentage(55), // About + session
        ])
        .split(chunks[1]);

    render_status_panels(f, columns[0], state);
    render_overview(f, columns[1], state.session);
}

fn render_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", ClinicalTheme::text()),
        Span::styled("Nephrocheck", ClinicalTheme::title()),
        Span::styled(" │ ", ClinicalTheme::text_muted()),
        Span::styled(
            "Kidney Health Risk Prediction",
            ClinicalTheme::text_secondary(),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_status_panels(f: &mut Frame, area: Rect, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Model status
            Constraint::Min(0),    // Quick actions
        ])
        .margin(1)
        .split(area);

    let mut status_items: Vec<Line> = state
        .models
        .iter()
        .map(|model| model_line(model, state.show_fingerprints))
        .collect();

    let integrity_style = match state.integrity {
        IntegrityStatus::Signed => ClinicalTheme::success(),
        IntegrityStatus::HashesVerified => ClinicalTheme::info(),
        IntegrityStatus::Unverified => ClinicalTheme::warning(),
    };
    status_items.push(Line::from(vec![
        Span::styled("  Integrity: ", ClinicalTheme::text_secondary()),
        Span::styled(state.integrity.to_string(), integrity_style),
    ]));
    if !state.show_fingerprints {
        status_items.push(Line::from(vec![
            Span::styled("  Fingerprints hidden", ClinicalTheme::text_muted()),
            Span::styled(" (press [F])", ClinicalTheme::text_secondary()),
        ]));
    }

    let status_block = Block::default()
        .title(Span::styled(" Model Status ", ClinicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(ClinicalTheme::border());

    f.render_widget(Paragraph::new(status_items).block(status_block), chunks[0]);

    let actions = vec![
        Line::from(vec![
            Span::styled("[N] ", ClinicalTheme::key_hint()),
            Span::styled("New Assessment", ClinicalTheme::key_desc()),
        ]),
        Line::from(vec![
            Span::styled("[F] ", ClinicalTheme::key_hint()),
            Span::styled("Toggle Fingerprints", ClinicalTheme::key_desc()),
        ]),
        Line::from(vec![
            Span::styled("[Q] ", ClinicalTheme::key_hint()),
            Span::styled("Quit", ClinicalTheme::key_desc()),
        ]),
    ];

    let actions_block = Block::default()
        .title(Span::styled(" Quick Actions ", ClinicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(ClinicalTheme::border());

    f.render_widget(Paragraph::new(actions).block(actions_block), chunks[1]);
}

fn model_line(model: &ModelSummary, show_fingerprint: bool) -> Line<'static> {
    let mut spans = vec![
        Span::styled("  OK ", ClinicalTheme::success()),
        Span::styled(model.target.title(), ClinicalTheme::text()),
        Span::styled(format!(" ({})", model.name), ClinicalTheme::text_muted()),
    ];
    if show_fingerprint {
        let fp = model.fingerprint.as_deref().unwrap_or("<unavailable>");
        spans.push(Span::styled(format!(" {fp}"), ClinicalTheme::text_muted()));
    }
    Line::from(spans)
}

fn render_overview(f: &mut Frame, area: Rect, session: SessionSummary) {
    let block = Block::default()
        .title(Span::styled(" About ", ClinicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(ClinicalTheme::border());

    let mut lines = vec![
        Line::from(Span::styled(
            "Enter seven clinical values to estimate the risk of chronic kidney",
            ClinicalTheme::text_secondary(),
        )),
        Line::from(Span::styled(
            "disease and the likelihood of needing dialysis.",
            ClinicalTheme::text_secondary(),
        )),
        Line::from(""),
    ];

    if session.total == 0 {
        lines.push(Line::from(Span::styled(
            "No assessments this session. Press [N] to start.",
            ClinicalTheme::text_muted(),
        )));
    } else {
        lines.push(Line::from(vec![
            Span::styled("This session: ", ClinicalTheme::text_secondary()),
            Span::styled(session.total.to_string(), ClinicalTheme::text()),
            Span::styled(" assessments", ClinicalTheme::text_muted()),
        ]));
        lines.push(Line::from(vec![
            Span::styled("CKD flagged: ", ClinicalTheme::text_secondary()),
            Span::styled(
                session.ckd_flagged.to_string(),
                ClinicalTheme::badge(RiskTarget::Ckd.badge(1)),
            ),
            Span::styled("  Dialysis flagged: ", ClinicalTheme::text_secondary()),
            Span::styled(
                session.dialysis_flagged.to_string(),
                ClinicalTheme::badge(Badge::Warning),
            ),
        ]));
    }

    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}
