//! TUI application state and event loop.
//!
//! The render scheduler drives the loop: every tick draws the current
//! snapshot, then drains pending key presses without blocking. Ingestion runs
//! on its own thread, so a stalled device never freezes the screen.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;

use potscope_core::{CancelToken, LineSource, Monitor, MonitorOutcome, RefreshSnapshot};

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    Export,
    Ignore,
}

pub fn handle_key(key: KeyEvent) -> KeyAction {
    if key.kind != KeyEventKind::Press {
        return KeyAction::Ignore;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
        // Raw mode swallows SIGINT, so Ctrl+C arrives as a key.
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Quit,
        KeyCode::Char('s') => KeyAction::Export,
        _ => KeyAction::Ignore,
    }
}

/// UI-side state that outlives a single tick.
#[derive(Debug, Default)]
pub struct ViewState {
    pub source_label: String,
    pub last_export: Option<PathBuf>,
    pub export_error: Option<String>,
}

impl ViewState {
    pub fn new(source_label: String) -> Self {
        Self {
            source_label,
            ..Self::default()
        }
    }

    fn export(&mut self, snap: &RefreshSnapshot) {
        match export_snapshot(snap, &self.source_label, Path::new(".")) {
            Ok(path) => {
                log::info!("snapshot exported to {}", path.display());
                self.last_export = Some(path);
                self.export_error = None;
            }
            Err(e) => {
                log::warn!("snapshot export failed: {e}");
                self.export_error = Some(e.to_string());
            }
        }
    }
}

pub struct App {
    monitor: Monitor,
    view: ViewState,
}

impl App {
    pub fn new(monitor: Monitor, source_label: String) -> Self {
        Self {
            monitor,
            view: ViewState::new(source_label),
        }
    }

    pub fn run(&mut self, source: Box<dyn LineSource>) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Install panic hook that restores terminal before printing the panic.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
            original_hook(info);
        }));

        let result = self.run_loop(&mut terminal, source);

        // Always restore terminal, even if the loop returned an error.
        let _ = std::panic::take_hook();
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;

        let outcome = result?;
        let c = outcome.counters;
        println!(
            "{} ({}): {} records from {} lines, {} unparseable, {} read timeouts",
            outcome.status,
            self.view.source_label,
            c.records_accepted,
            c.lines_read,
            c.parse_failures,
            c.read_timeouts
        );
        if let Some(path) = &self.view.last_export {
            println!("Snapshot saved to {}", path.display());
        }
        Ok(())
    }

    fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        source: Box<dyn LineSource>,
    ) -> io::Result<MonitorOutcome> {
        let Self { monitor, view } = self;
        let cancel = monitor.cancel_token();
        let mut ui_error = None;

        let outcome = monitor.run(source, |snap| {
            if let Err(e) = tick(terminal, snap, view, &cancel) {
                ui_error = Some(e);
                cancel.cancel();
            }
        })?;

        match ui_error {
            Some(e) => Err(e),
            None => Ok(outcome),
        }
    }
}

fn tick(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    snap: &RefreshSnapshot,
    view: &mut ViewState,
    cancel: &CancelToken,
) -> io::Result<()> {
    terminal.draw(|f| super::ui::draw(f, snap, view))?;

    while event::poll(Duration::ZERO)? {
        if let Event::Key(key) = event::read()? {
            match handle_key(key) {
                KeyAction::Quit => {
                    cancel.cancel();
                    break;
                }
                KeyAction::Export => view.export(snap),
                KeyAction::Ignore => {}
            }
        }
    }
    Ok(())
}

/// JSON document describing one snapshot.
pub fn snapshot_json(snap: &RefreshSnapshot, source_label: &str) -> serde_json::Value {
    serde_json::json!({
        "source": source_label,
        "tick": snap.tick,
        "status": snap.status.as_ref().map(|s| s.label()),
        "status_detail": snap.status.as_ref().map(|s| s.to_string()),
        "window_capacity": snap.window_capacity,
        "counters": snap.counters,
        "latest": snap.latest,
        "noise": snap.noise,
        "stats": snap.stats,
        "last_rejected": snap.last_rejected.as_ref().map(|r| serde_json::json!({
            "text": r.text,
            "reason": r.reason.to_string(),
        })),
        "records": snap.records,
    })
}

/// Write `snap` to `potscope-snapshot-<epoch>.json` under `dir`.
pub fn export_snapshot(
    snap: &RefreshSnapshot,
    source_label: &str,
    dir: &Path,
) -> io::Result<PathBuf> {
    let epoch = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let path = dir.join(format!("potscope-snapshot-{epoch}.json"));
    let contents =
        serde_json::to_string_pretty(&snapshot_json(snap, source_label)).map_err(io::Error::other)?;
    fs::write(&path, contents)?;
    Ok(path)
}
