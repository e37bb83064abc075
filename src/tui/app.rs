//! Main TUI application state machine.
//!
//! Handles:
//! - Screen navigation
//! - Input event handling
//! - Synchronous assessment on submit

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};

use crate::adapters::forest::{load_models, IntegrityStatus, RandomForestModel};
use crate::application::AssessmentService;
use crate::config::AppConfig;
use crate::ports::BinaryClassifier;

use super::ui::{
    dashboard::{render_dashboard, DashboardState},
    patient::{render_patient_form, PatientFormState},
    render_disclaimer,
    results::{render_results, ResultsState},
};

/// Current screen/view in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    PatientForm,
    Results,
}

/// Main application state
pub struct App {
    /// Current screen
    screen: Screen,

    /// Whether the app should quit
    should_quit: bool,

    /// Assessment service over the two loaded forests
    service: AssessmentService<RandomForestModel>,

    /// Dashboard state
    dashboard_state: DashboardState,

    /// Patient form state
    patient_form_state: PatientFormState,

    /// Results state
    results_state: ResultsState,
}

impl App {
    /// Load both models and build the application.
    ///
    /// # Errors
    /// Returns error if either model cannot be loaded or verified. The
    /// terminal has not been touched at this point.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let bundle = load_models(config).with_context(|| {
            format!(
                "Failed to load models from {:?}. Set NEPHROCHECK_MODEL_DIR to a directory containing {} and {}.",
                config.model_dir, config.ckd_model, config.dialysis_model
            )
        })?;

        tracing::info!(
            "Models ready (integrity: {}): {} [{}], {} [{}]",
            bundle.integrity,
            bundle.ckd.name(),
            bundle.ckd.short_fingerprint(),
            bundle.dialysis.name(),
            bundle.dialysis.short_fingerprint()
        );

        let service = AssessmentService::new(Arc::new(bundle.ckd), Arc::new(bundle.dialysis));
        Ok(Self::with_service(service, bundle.integrity))
    }

    /// Create application with an injected service (Composition Root pattern).
    #[must_use]
    pub fn with_service(
        service: AssessmentService<RandomForestModel>,
        integrity: IntegrityStatus,
    ) -> Self {
        let dashboard_state = DashboardState::new(service.model_summaries(), integrity);
        Self {
            screen: Screen::Dashboard,
            should_quit: false,
            service,
            dashboard_state,
            patient_form_state: PatientFormState::default(),
            results_state: ResultsState::default(),
        }
    }

    /// Current screen.
    #[must_use]
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Main loop
        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;

            // Handle input (short poll to stay responsive)
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn draw(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(f.area());

        match self.screen {
            Screen::Dashboard => render_dashboard(f, chunks[0], &self.dashboard_state),
            Screen::PatientForm => render_patient_form(f, chunks[0], &self.patient_form_state),
            Screen::Results => render_results(f, chunks[0], &self.results_state),
        }

        render_disclaimer(f, chunks[1]);
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        // Global quit handling
        if key == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Dashboard => self.handle_dashboard_key(key),
            Screen::PatientForm => self.handle_patient_form_key(key),
            Screen::Results => self.handle_results_key(key),
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('n') | KeyCode::Char('N') => self.start_new_patient(),
            KeyCode::Char('f') | KeyCode::Char('F') => {
                self.dashboard_state.show_fingerprints = !self.dashboard_state.show_fingerprints;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            _ => {}
        }
    }

    fn handle_patient_form_key(&mut self, key: KeyCode) {
        let form = &mut self.patient_form_state;
        match key {
            KeyCode::Esc => self.return_to_dashboard(),
            KeyCode::Up | KeyCode::BackTab => form.prev_field(),
            KeyCode::Down | KeyCode::Tab => form.next_field(),
            KeyCode::Left => form.step(-1.0),
            KeyCode::Right => form.step(1.0),
            KeyCode::Char('s') | KeyCode::Char('S') => form.load_sample_data(),
            KeyCode::Char(c) => form.input_char(c),
            KeyCode::Backspace => form.delete_char(),
            KeyCode::Delete => form.reset_field(),
            KeyCode::Enter => self.submit_patient_form(),
            _ => {}
        }
    }

    fn handle_results_key(&mut self, key: KeyCode) {
        let complete = matches!(self.results_state, ResultsState::Complete { .. });
        match key {
            KeyCode::Esc => self.return_to_dashboard(),
            KeyCode::Enter => self.screen = Screen::PatientForm,
            KeyCode::Char('n') | KeyCode::Char('N') if complete => self.start_new_patient(),
            _ => {}
        }
    }

    fn start_new_patient(&mut self) {
        self.patient_form_state.clear_sensitive();
        self.results_state = ResultsState::Idle;
        self.screen = Screen::PatientForm;
    }

    fn return_to_dashboard(&mut self) {
        self.patient_form_state.clear_sensitive();
        self.results_state = ResultsState::Idle;
        self.screen = Screen::Dashboard;
    }

    fn submit_patient_form(&mut self) {
        let record = self.patient_form_state.submit();

        self.results_state = match self.service.assess(record) {
            Ok(assessment) => {
                self.dashboard_state.session.record(&assessment);
                ResultsState::Complete { assessment }
            }
            Err(e) => {
                tracing::error!("Assessment failed: {}", e);
                ResultsState::Error {
                    message: e.to_string(),
                }
            }
        };
        self.screen = Screen::Results;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn app() -> App {
        App::new(&AppConfig::default()).expect("Shipped models should load")
    }

    fn press(app: &mut App, key: KeyCode) {
        app.handle_key(key, KeyModifiers::NONE);
    }

    #[test]
    fn test_missing_models_fail_before_terminal_setup() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            model_dir: dir.path().to_path_buf(),
            ..AppConfig::default()
        };
        assert!(App::new(&config).is_err());
    }

    #[test]
    fn test_submit_default_form() {
        let mut app = app();
        assert_eq!(app.screen(), Screen::Dashboard);

        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.screen(), Screen::PatientForm);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screen(), Screen::Results);

        let ResultsState::Complete { assessment } = &app.results_state else {
            panic!("Expected a completed assessment");
        };
        assert_eq!(assessment.ckd.formatted_probability(), "14.33%");
        assert_eq!(assessment.dialysis.formatted_probability(), "3.33%");
        assert_eq!(app.dashboard_state.session.total, 1);
    }

    #[test]
    fn test_sample_patient_is_flagged() {
        let mut app = app();
        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Char('s'));
        press(&mut app, KeyCode::Enter);

        let ResultsState::Complete { assessment } = &app.results_state else {
            panic!("Expected a completed assessment");
        };
        assert_eq!(assessment.ckd.label, 1);
        assert_eq!(assessment.dialysis.label, 1);
        assert_eq!(assessment.record.age, 68);
    }

    #[test]
    fn test_edit_keeps_values_and_new_patient_clears() {
        let mut app = app();
        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Char('s'));
        press(&mut app, KeyCode::Enter);

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screen(), Screen::PatientForm);
        assert_eq!(app.patient_form_state.to_record().age, 68);

        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.screen(), Screen::PatientForm);
        assert_eq!(
            app.patient_form_state.to_record(),
            crate::domain::PatientRecord::default()
        );
    }

    #[test]
    fn test_arrow_keys_step_and_escape_returns() {
        let mut app = app();
        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Right);
        assert_eq!(app.patient_form_state.to_record().age, 51);
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.patient_form_state.to_record().age, 49);

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.screen(), Screen::Dashboard);
        assert_eq!(app.patient_form_state.to_record().age, 50);
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.should_quit);

        app.handle_key(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert!(app.should_quit);
    }

    #[test]
    fn test_draws_every_screen() {
        let mut app = app();
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();

        for key in [KeyCode::Char('f'), KeyCode::Char('n'), KeyCode::Enter] {
            terminal.draw(|f| app.draw(f)).unwrap();
            press(&mut app, key);
        }
        terminal.draw(|f| app.draw(f)).unwrap();
        assert_eq!(app.screen(), Screen::Results);
    }
}
