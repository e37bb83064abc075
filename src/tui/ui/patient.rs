//! Patient data input form.
//!
//! Numeric fields take typed digits or `+`/`-` steps; flag fields are yes/no
//! toggles. Nothing here rejects input: empty or unparseable text falls back
//! to the field default and everything is clamped on submission.
//!
//! The first digit typed into a freshly focused field replaces its value;
//! later digits append. Backspace edits the value in place.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use zeroize::Zeroize;

use crate::domain::{FieldKind, FieldSpec, PatientRecord, FIELD_SPECS, N_FEATURES};
use crate::tui::styles::ClinicalTheme;

/// Longest text accepted in a numeric field.
const MAX_INPUT_LEN: usize = 12;

/// Decimal places kept by decimal fields, both typed and displayed.
const DECIMAL_PLACES: usize = 2;

fn round_decimal(value: f64) -> f64 {
    let scale = 10f64.powi(DECIMAL_PLACES as i32);
    (value * scale).round() / scale
}

/// One form field: its metadata and the text currently typed.
#[derive(Debug, Clone)]
pub struct FormField {
    pub spec: FieldSpec,
    pub text: String,
}

impl FormField {
    fn new(spec: FieldSpec) -> Self {
        Self {
            spec,
            text: format_value(&spec, spec.default),
        }
    }

    /// Current value, falling back to the default when the text is not a number.
    ///
    /// Decimal fields are rounded to [`DECIMAL_PLACES`] so the value scored is
    /// always the value the form displays.
    #[must_use]
    pub fn value(&self) -> f64 {
        let value = self
            .text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(self.spec.default);
        match self.spec.kind {
            FieldKind::Decimal => round_decimal(value),
            _ => value,
        }
    }

    fn set(&mut self, value: f64) {
        self.text.zeroize();
        self.text = format_value(&self.spec, self.spec.normalize(value));
    }

    fn is_flag(&self) -> bool {
        self.spec.kind == FieldKind::Flag
    }
}

/// Display text for a value.
#[must_use]
pub fn format_value(spec: &FieldSpec, value: f64) -> String {
    match spec.kind {
        FieldKind::Flag => {
            if value == 0.0 {
                "0".to_string()
            } else {
                "1".to_string()
            }
        }
        FieldKind::Integer => format!("{value:.0}"),
        FieldKind::Decimal => format!("{:.*}", DECIMAL_PLACES, value),
    }
}

/// Patient form state
pub struct PatientFormState {
    pub fields: Vec<FormField>,
    pub selected_field: usize,
    /// Set when submission clamped at least one value
    pub notice: Option<String>,
    /// The selected field still shows a value nobody typed
    pristine: bool,
}

impl Default for PatientFormState {
    fn default() -> Self {
        Self {
            fields: FIELD_SPECS.iter().copied().map(FormField::new).collect(),
            selected_field: 0,
            notice: None,
            pristine: true,
        }
    }
}

impl PatientFormState {
    pub fn next_field(&mut self) {
        self.selected_field = (self.selected_field + 1) % self.fields.len();
        self.pristine = true;
    }

    pub fn prev_field(&mut self) {
        self.selected_field = self
            .selected_field
            .checked_sub(1)
            .unwrap_or(self.fields.len() - 1);
        self.pristine = true;
    }

    fn current(&mut self) -> &mut FormField {
        &mut self.fields[self.selected_field]
    }

    /// Handle a typed character on the selected field.
    pub fn input_char(&mut self, c: char) {
        self.notice = None;
        match c {
            '+' => return self.step(1.0),
            '-' => return self.step(-1.0),
            _ => {}
        }

        let replace = self.pristine;
        let field = self.current();
        if field.is_flag() {
            match c {
                '0' | 'n' | 'N' => field.set(0.0),
                '1' | 'y' | 'Y' => field.set(1.0),
                ' ' => {
                    let toggled = 1.0 - field.value();
                    field.set(toggled);
                }
                _ => {}
            }
            return;
        }

        let is_decimal = field.spec.kind == FieldKind::Decimal;
        if replace && (c.is_ascii_digit() || (c == '.' && is_decimal)) {
            field.text.zeroize();
        }

        let fraction_full = field
            .text
            .split_once('.')
            .is_some_and(|(_, fraction)| fraction.len() >= DECIMAL_PLACES);
        match c {
            '0'..='9' if field.text.len() < MAX_INPUT_LEN && !fraction_full => {
                field.text.push(c);
            }
            '.' if is_decimal && !field.text.contains('.') => {
                if field.text.is_empty() {
                    field.text.push('0');
                }
                field.text.push(c);
            }
            _ => return,
        }
        self.pristine = false;
    }

    /// Move the selected field by `direction` steps; toggles flags.
    pub fn step(&mut self, direction: f64) {
        self.notice = None;
        let field = self.current();
        let next = if field.is_flag() {
            1.0 - field.value()
        } else {
            field.value() + direction * field.spec.step
        };
        field.set(next);
        self.pristine = true;
    }

    pub fn delete_char(&mut self) {
        let field = self.current();
        if !field.is_flag() {
            field.text.pop();
            self.pristine = false;
        }
    }

    /// Reset the selected field to its default.
    pub fn reset_field(&mut self) {
        let field = self.current();
        let default = field.spec.default;
        field.set(default);
        self.pristine = true;
    }

    /// Record built from the current text, clamped into every field's domain.
    #[must_use]
    pub fn to_record(&self) -> PatientRecord {
        let values: [f64; N_FEATURES] = std::array::from_fn(|i| self.fields[i].value());
        PatientRecord::from_values(&values)
    }

    /// Show a record's values in the form.
    pub fn apply_record(&mut self, record: &PatientRecord) {
        for (field, value) in self.fields.iter_mut().zip(record.to_features()) {
            field.set(value);
        }
        self.pristine = true;
    }

    /// Build the record for submission and reflect any clamping in the form.
    pub fn submit(&mut self) -> PatientRecord {
        let record = self.to_record();
        let adjusted: Vec<&'static str> = self
            .fields
            .iter()
            .zip(record.to_features())
            .filter(|(field, value)| (field.value() - value).abs() > f64::EPSILON)
            .map(|(field, _)| field.spec.label)
            .collect();

        self.notice = if adjusted.is_empty() {
            None
        } else {
            Some(format!("Adjusted to valid range: {}", adjusted.join(", ")))
        };
        self.apply_record(&record);
        record
    }

    /// Wipe typed values and restore defaults.
    pub fn clear_sensitive(&mut self) {
        for field in self.fields.iter_mut() {
            field.text.zeroize();
            field.text = format_value(&field.spec, field.spec.default);
        }
        self.notice = None;
        self.selected_field = 0;
        self.pristine = true;
    }

    /// Load a sample record of an end-stage renal disease patient.
    pub fn load_sample_data(&mut self) {
        self.apply_record(&PatientRecord {
            age: 68,
            creatinine: 7.5,
            bun: 110.0,
            diabetes: 1,
            hypertension: 1,
            gfr: 12.0,
            urine_output: 400.0,
        });
        self.notice = None;
    }
}

/// Render the patient data input form
pub fn render_patient_form(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Form
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_form_header(f, chunks[0]);
    render_form_fields(f, chunks[1], state);
    render_form_footer(f, chunks[2], state);
}

fn render_form_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", ClinicalTheme::text()),
        Span::styled("Enter Patient Information", ClinicalTheme::title()),
        Span::styled(" │ Kidney Function Panel", ClinicalTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_form_fields(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .margin(1)
        .split(area);

    let mid = (state.fields.len() + 1) / 2;
    render_field_column(f, columns[0], &state.fields[..mid], 0, state.selected_field);
    render_field_column(f, columns[1], &state.fields[mid..], mid, state.selected_field);
}

fn render_field_column(
    f: &mut Frame,
    area: Rect,
    fields: &[FormField],
    offset: usize,
    selected: usize,
) {
    let constraints: Vec<Constraint> = fields
        .iter()
        .map(|_| Constraint::Length(3))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (i, field) in fields.iter().enumerate() {
        let is_selected = offset + i == selected;
        let (border_style, title_style) = if is_selected {
            (ClinicalTheme::border_focused(), ClinicalTheme::focused())
        } else {
            (ClinicalTheme::border(), ClinicalTheme::text_secondary())
        };

        let title = format!(" {} ({}) ", field.spec.label, field.spec.unit);
        let block = Block::default()
            .title(Span::styled(title, title_style))
            .borders(Borders::ALL)
            .border_style(border_style);

        let mut spans = vec![Span::raw(" ")];
        if field.is_flag() {
            let yes = field.value() != 0.0;
            let choice = |on: bool, label: &'static str| {
                if on {
                    Span::styled(format!("(•) {label}  "), ClinicalTheme::focused())
                } else {
                    Span::styled(format!("( ) {label}  "), ClinicalTheme::text_muted())
                }
            };
            spans.push(choice(!yes, "No"));
            spans.push(choice(yes, "Yes"));
        } else if field.text.is_empty() {
            spans.push(Span::styled(
                format!(
                    "{} - {} (default {})",
                    field.spec.min,
                    field.spec.max,
                    format_value(&field.spec, field.spec.default)
                ),
                ClinicalTheme::text_muted(),
            ));
        } else {
            spans.push(Span::styled(field.text.as_str(), ClinicalTheme::text()));
        }
        if is_selected && !field.is_flag() {
            spans.push(Span::styled("▌", ClinicalTheme::cursor()));
        }

        f.render_widget(Paragraph::new(Line::from(spans)).block(block), chunks[i]);
    }
}

fn render_form_footer(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let content = if let Some(notice) = &state.notice {
        Line::from(vec![
            Span::styled("i ", ClinicalTheme::info()),
            Span::styled(notice.as_str(), ClinicalTheme::info()),
        ])
    } else {
        Line::from(vec![
            Span::styled("[↑↓] ", ClinicalTheme::key_hint()),
            Span::styled("Navigate ", ClinicalTheme::key_desc()),
            Span::styled("[←→/+-] ", ClinicalTheme::key_hint()),
            Span::styled("Step/Toggle ", ClinicalTheme::key_desc()),
            Span::styled("[Enter] ", ClinicalTheme::key_hint()),
            Span::styled("Predict ", ClinicalTheme::key_desc()),
            Span::styled("[S] ", ClinicalTheme::key_hint()),
            Span::styled("Sample ", ClinicalTheme::key_desc()),
            Span::styled("[Esc] ", ClinicalTheme::key_hint()),
            Span::styled("Back", ClinicalTheme::key_desc()),
        ])
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

    fn select(state: &mut PatientFormState, column: &str) {
        state.selected_field = state
            .fields
            .iter()
            .position(|f| f.spec.column == column)
            .expect("Field exists");
    }

    #[test]
    fn test_defaults_submit_default_record() {
        let mut state = PatientFormState::default();
        assert_eq!(state.fields.len(), 7);
        assert_eq!(state.fields[0].text, "50");
        assert_eq!(state.fields[1].text, "1.20");

        let record = state.submit();
        assert_eq!(record, PatientRecord::default());
        assert!(state.notice.is_none());
    }

    #[test]
    fn test_first_keystroke_replaces_value() {
        let mut state = PatientFormState::default();
        state.input_char('6');
        assert_eq!(state.fields[0].text, "6");
        state.input_char('5');
        assert_eq!(state.fields[0].text, "65");

        // Moving away and back replaces again.
        state.next_field();
        state.prev_field();
        state.input_char('7');
        assert_eq!(state.fields[0].text, "7");
    }

    #[test]
    fn test_backspace_edits_in_place() {
        let mut state = PatientFormState::default();
        state.delete_char();
        state.input_char('6');
        assert_eq!(state.fields[0].text, "56");
    }

    #[test]
    fn test_typed_decimal_value() {
        let mut state = PatientFormState::default();
        select(&mut state, "GFR");
        for c in "42.5".chars() {
            state.input_char(c);
        }
        // Second decimal point and letters are ignored.
        state.input_char('.');
        state.input_char('x');

        let record = state.to_record();
        assert!((record.gfr - 42.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_integer_field_ignores_decimal_point() {
        let mut state = PatientFormState::default();
        for c in "6.5".chars() {
            state.input_char(c);
        }
        assert_eq!(state.fields[0].text, "65");
    }

    #[test]
    fn test_typing_stops_at_two_decimals() {
        let mut state = PatientFormState::default();
        select(&mut state, "Creatinine_Level");
        for c in "1.239".chars() {
            state.input_char(c);
        }
        assert_eq!(state.current().text, "1.23");

        select(&mut state, "BUN");
        state.input_char('.');
        state.input_char('5');
        assert_eq!(state.current().text, "0.5");
    }

    #[test]
    fn test_resubmit_scores_same_record() {
        let mut state = PatientFormState::default();
        select(&mut state, "Creatinine_Level");
        state.current().text = "1.234".into();

        let first = state.submit();
        assert_eq!(state.current().text, "1.23");
        assert!((first.creatinine - 1.23).abs() < 1e-12);
        assert!(state.notice.is_none());

        let second = state.submit();
        assert_eq!(first, second);
        assert!(state.notice.is_none());
    }

    #[test]
    fn test_out_of_range_is_clamped_on_submit() {
        let mut state = PatientFormState::default();
        select(&mut state, "Urine_Output");
        state.current().text = "99999".into();

        let record = state.submit();
        assert!((record.urine_output - 10000.0).abs() < f64::EPSILON);
        assert_eq!(state.current().text, "10000.00");
        assert!(state
            .notice
            .as_deref()
            .is_some_and(|n| n.contains("Urine Output")));
    }

    #[test]
    fn test_empty_field_falls_back_to_default() {
        let mut state = PatientFormState::default();
        select(&mut state, "BUN");
        while !state.current().text.is_empty() {
            state.delete_char();
        }
        assert!((state.to_record().bun - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_step_respects_bounds() {
        let mut state = PatientFormState::default();
        select(&mut state, "Creatinine_Level");
        state.step(1.0);
        assert!((state.to_record().creatinine - 1.3).abs() < 1e-9);

        state.current().text = "0.1".into();
        state.step(-1.0);
        assert!((state.to_record().creatinine - 0.1).abs() < 1e-9);

        state.reset_field();
        assert_eq!(state.current().text, "1.20");
    }

    #[test]
    fn test_flag_toggles() {
        let mut state = PatientFormState::default();
        select(&mut state, "Diabetes");

        state.input_char(' ');
        assert_eq!(state.to_record().diabetes, 1);
        state.step(1.0);
        assert_eq!(state.to_record().diabetes, 0);
        state.input_char('y');
        assert_eq!(state.to_record().diabetes, 1);
        state.input_char('n');
        assert_eq!(state.to_record().diabetes, 0);
        // Flags never take free text.
        state.input_char('7');
        state.delete_char();
        assert_eq!(state.current().text, "0");
    }

    #[test]
    fn test_navigation_wraps() {
        let mut state = PatientFormState::default();
        state.prev_field();
        assert_eq!(state.selected_field, 6);
        state.next_field();
        assert_eq!(state.selected_field, 0);
    }

    #[test]
    fn test_clear_sensitive_restores_defaults() {
        let mut state = PatientFormState::default();
        state.load_sample_data();
        assert_eq!(state.to_record().age, 68);

        state.selected_field = 3;
        state.clear_sensitive();
        assert_eq!(state.selected_field, 0);
        assert_eq!(state.to_record(), PatientRecord::default());
    }
}
