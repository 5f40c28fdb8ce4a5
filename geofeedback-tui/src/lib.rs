pub mod map_view;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use geofeedback_core::{AppConfig, MapController};
use geofeedback_core::map::{LayerId, Point, Viewport};
use geofeedback_loader::{LoadError, LoadOutcome};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::mpsc;

pub const ALERT_CONNECTION: &str = "Error al cargar los datos. Por favor verifica la conexión.";
pub const ALERT_FILES: &str =
    "Error al cargar los datos. Por favor verifica que los archivos GeoJSON existan.";

/// Messages from the loading task to the UI loop
#[derive(Debug)]
pub enum LoadMessage {
    Progress(String),
    Loaded(LoadOutcome),
    Failed(LoadError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Map,
    Search,
}

/// TUI state: the map controller plus what only the terminal host needs.
pub struct App {
    controller: MapController,
    mode: InputMode,
    selected_result: usize,
    loading: bool,
    loading_message: String,
    alert: Option<String>,
    viewport: Viewport,
    should_quit: bool,
    rx: mpsc::UnboundedReceiver<LoadMessage>,
}

impl App {
    pub fn new(config: &AppConfig, rx: mpsc::UnboundedReceiver<LoadMessage>) -> Self {
        Self {
            controller: MapController::new(config),
            mode: InputMode::Map,
            selected_result: 0,
            loading: true,
            loading_message: "Cargando datos...".to_string(),
            alert: None,
            viewport: Viewport::new(800.0, 600.0),
            should_quit: false,
            rx,
        }
    }

    /// Drain pending loader messages without blocking
    pub fn process_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                LoadMessage::Progress(message) => {
                    self.loading_message = message;
                }
                LoadMessage::Loaded(outcome) => {
                    self.controller.set_dataset(outcome.dataset, outcome.origin);
                    self.loading = false;
                }
                LoadMessage::Failed(error) => {
                    // the loading overlay stays up behind the alert
                    self.alert = Some(alert_text(&error));
                    self.loading_message = error.to_string();
                }
            }
        }
    }

    pub fn controller(&self) -> &MapController {
        &self.controller
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn selected_result(&self) -> usize {
        self.selected_result
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn loading_message(&self) -> &str {
        &self.loading_message
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if self.loading || self.alert.is_some() {
            if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                self.should_quit = true;
            }
            return;
        }

        match self.mode {
            InputMode::Search => self.handle_search_key(key),
            InputMode::Map => self.handle_map_key(key),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.controller.dismiss_search();
                self.mode = InputMode::Map;
            }
            KeyCode::Enter => {
                if self.controller.select_search_result(self.selected_result) {
                    self.selected_result = 0;
                    self.mode = InputMode::Map;
                }
            }
            KeyCode::Up => {
                self.selected_result = self.selected_result.saturating_sub(1);
            }
            KeyCode::Down => {
                let last = self.controller.search_state().rows.len().saturating_sub(1);
                self.selected_result = (self.selected_result + 1).min(last);
            }
            KeyCode::Backspace => {
                let mut query = self.controller.search_state().query.clone();
                query.pop();
                self.update_query(&query);
            }
            KeyCode::Char(c) => {
                let mut query = self.controller.search_state().query.clone();
                query.push(c);
                self.update_query(&query);
            }
            _ => {}
        }
    }

    fn update_query(&mut self, query: &str) {
        self.controller.search_input(query);
        self.selected_result = 0;
    }

    fn handle_map_key(&mut self, key: KeyEvent) {
        let step_x = self.viewport.width / 4.0;
        let step_y = self.viewport.height / 4.0;

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => {
                if self.controller.popup().is_some() {
                    self.controller.close_popup();
                } else if self.controller.search_state().visible {
                    self.controller.dismiss_search();
                } else {
                    self.should_quit = true;
                }
            }
            KeyCode::Char('/') => {
                self.mode = InputMode::Search;
                let query = self.controller.search_state().query.clone();
                self.update_query(&query);
            }
            KeyCode::Char('r') => self.controller.toggle_layer(LayerId::Risk),
            KeyCode::Char('i') => self.controller.toggle_layer(LayerId::Infrastructure),
            KeyCode::Char('f') => {
                let next = self.controller.filters().risk.next();
                self.controller.set_risk_filter(next);
            }
            KeyCode::Char('c') => {
                let next = self.controller.filters().category.next();
                self.controller.set_category_filter(next);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.controller.map_mut().zoom_in(),
            KeyCode::Char('-') => self.controller.map_mut().zoom_out(),
            KeyCode::Left => self.controller.map_mut().pan_by(-step_x, 0.0),
            KeyCode::Right => self.controller.map_mut().pan_by(step_x, 0.0),
            KeyCode::Up => self.controller.map_mut().pan_by(0.0, -step_y),
            KeyCode::Down => self.controller.map_mut().pan_by(0.0, step_y),
            KeyCode::Enter => {
                let center = Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0);
                // markers sit above the zone circles
                if self.controller.layer_visible(LayerId::Infrastructure)
                    && let Some(cluster) = self.controller.cluster_at(center, self.viewport)
                {
                    self.controller.click_cluster(&cluster, self.viewport);
                } else {
                    self.controller.click_zone_at(center, self.viewport);
                }
            }
            _ => {}
        }
    }
}

/// Blocking alert text for a fatal load error.
pub fn alert_text(error: &LoadError) -> String {
    match error {
        LoadError::FallbackFailed { .. } => ALERT_CONNECTION.to_string(),
        _ => ALERT_FILES.to_string(),
    }
}

/// Run the map TUI (blocking function, should be run in separate thread)
pub fn run(config: AppConfig, rx: mpsc::UnboundedReceiver<LoadMessage>, should_exit: Arc<AtomicBool>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(&config, rx);
    let result = run_app(&mut terminal, &mut app, &should_exit);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    should_exit: &AtomicBool,
) -> Result<()> {
    loop {
        app.process_messages();

        terminal.draw(|f| map_view::ui(f, app))?;

        if should_exit.load(Ordering::Relaxed) {
            break;
        }

        if event::poll(std::time::Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.handle_key(key);
        }

        if app.should_quit() {
            break;
        }
    }

    Ok(())
}

/// Create a channel pair for delivering the load result to the UI
pub fn create_load_channel() -> (mpsc::UnboundedSender<LoadMessage>, mpsc::UnboundedReceiver<LoadMessage>) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geofeedback_loader::{Category, Coordinates, DataOrigin, Dataset, Facility, RiskLevel};
    use std::path::PathBuf;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn outcome() -> LoadOutcome {
        LoadOutcome {
            dataset: Dataset::new(vec![
                Facility::new("Escuela Papudo", Category::Educacion, RiskLevel::High, Coordinates::new(-71.4469, -32.5127)),
                Facility::new("Posta Rural", Category::Salud, RiskLevel::Low, Coordinates::new(-71.4480, -32.5060)),
            ]),
            origin: DataOrigin::Remote,
        }
    }

    fn loaded_app() -> App {
        let (tx, rx) = create_load_channel();
        let mut app = App::new(&AppConfig::default(), rx);
        tx.send(LoadMessage::Loaded(outcome())).unwrap();
        app.process_messages();
        app
    }

    #[test]
    fn test_loaded_message_hides_overlay() {
        let app = loaded_app();
        assert!(!app.is_loading());
        assert!(app.alert().is_none());
        assert_eq!(app.controller().panel().total, 2);
    }

    #[test]
    fn test_failed_load_keeps_overlay_and_alerts() {
        let (tx, rx) = create_load_channel();
        let mut app = App::new(&AppConfig::default(), rx);
        tx.send(LoadMessage::Progress("Loading".to_string())).unwrap();
        tx.send(LoadMessage::Failed(LoadError::FallbackFailed {
            primary: Box::new(LoadError::HttpStatus {
                url: "http://api/infrastructure".to_string(),
                status: 500,
            }),
            fallback: Box::new(LoadError::Io {
                path: PathBuf::from("missing.geojson"),
                source: io::Error::new(io::ErrorKind::NotFound, "not found"),
            }),
        }))
        .unwrap();
        app.process_messages();

        assert!(app.is_loading());
        assert_eq!(app.alert(), Some(ALERT_CONNECTION));

        // map keys are ignored while the alert is up
        app.handle_key(key(KeyCode::Char('r')));
        assert!(!app.should_quit());
        app.handle_key(key(KeyCode::Esc));
        assert!(app.should_quit());
    }

    #[test]
    fn test_local_failure_alert_text() {
        let err = LoadError::Format("expected a FeatureCollection".to_string());
        assert_eq!(alert_text(&err), ALERT_FILES);
    }

    #[test]
    fn test_layer_and_filter_keys() {
        let mut app = loaded_app();
        app.handle_key(key(KeyCode::Char('r')));
        assert!(!app.controller().layer_visible(LayerId::Risk));

        app.handle_key(key(KeyCode::Char('f')));
        assert_eq!(app.controller().panel().total, 1);
        assert_eq!(app.controller().panel().high, 1);

        app.handle_key(key(KeyCode::Char('c')));
        assert_eq!(app.controller().panel().total, 1);
        app.handle_key(key(KeyCode::Char('c')));
        assert_eq!(app.controller().panel().total, 0);
    }

    #[test]
    fn test_search_flow() {
        let mut app = loaded_app();
        app.handle_key(key(KeyCode::Char('/')));
        assert_eq!(app.mode(), InputMode::Search);

        for c in "posta".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        assert!(app.controller().search_state().visible);
        assert_eq!(app.controller().search_state().hits().count(), 1);

        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.mode(), InputMode::Map);
        assert_eq!(app.controller().map().zoom(), 16);
        assert!(app.controller().search_state().query.is_empty());
    }

    #[test]
    fn test_search_escape_dismisses() {
        let mut app = loaded_app();
        app.handle_key(key(KeyCode::Char('/')));
        app.handle_key(key(KeyCode::Char('z')));
        app.handle_key(key(KeyCode::Char('z')));
        assert!(app.controller().search_state().visible);

        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.mode(), InputMode::Map);
        assert!(!app.controller().search_state().visible);
        assert!(!app.should_quit());
    }

    #[test]
    fn test_zoom_keys_clamped() {
        let mut app = loaded_app();
        for _ in 0..30 {
            app.handle_key(key(KeyCode::Char('+')));
        }
        assert_eq!(app.controller().map().zoom(), 19);
        app.handle_key(key(KeyCode::Char('-')));
        assert_eq!(app.controller().map().zoom(), 18);
    }

    #[test]
    fn test_enter_away_from_markers_opens_zone_popup() {
        let mut app = loaded_app();
        app.controller.map_mut().set_view(Coordinates::new(-71.46, -32.52), 15);

        app.handle_key(key(KeyCode::Enter));
        let popup = app.controller().popup().unwrap();
        assert_eq!(popup.title, "Zona de Riesgo Alto");
    }
}
