//! Fleet dashboard.
//!
//! ```text
//! ┌ RideDesk ─────────────────────── ● Live  refreshed 12:00:03 ┐
//! │ map (canvas)                     │ fleet table               │
//! │                                  │                           │
//! ├──────────────────────────────────┴───────────────────────────┤
//! │ stats │ last notice │ keys                                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The terminal is put into raw mode on the alternate screen and restored
//! when the [`Dashboard`] is dropped.

mod render_loading;
mod utils;

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Terminal;

use ridedesk::crud::NoticeLevel;
use ridedesk::map::MapSnapshot;
use ridedesk::tracking::TrackingSnapshot;

use super::widgets::{ConnectionWidget, FleetTableWidget, MapWidget};
use render_loading::render_loading_ui;
pub use utils::{format_duration, print_session_summary, print_simple_status};

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

/// User input the event loop acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardEvent {
    Quit,
    CycleFilter,
    Refresh,
    RebuildMap,
}

/// Map a key press to a dashboard event.
pub fn event_for_key(code: KeyCode, modifiers: KeyModifiers) -> Option<DashboardEvent> {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Some(DashboardEvent::Quit),
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            Some(DashboardEvent::Quit)
        }
        KeyCode::Char('f') => Some(DashboardEvent::CycleFilter),
        KeyCode::Char('r') => Some(DashboardEvent::Refresh),
        KeyCode::Char('m') => Some(DashboardEvent::RebuildMap),
        _ => None,
    }
}

pub struct Dashboard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    started: Instant,
    frames: usize,
    status: Option<(NoticeLevel, String)>,
}

impl Dashboard {
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        Ok(Self {
            terminal,
            started: Instant::now(),
            frames: 0,
            status: None,
        })
    }

    /// Show a message in the footer until the next one replaces it.
    pub fn set_status(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.status = Some((level, message.into()));
    }

    /// Non-blocking check for a key press.
    pub fn poll_event(&mut self) -> io::Result<Option<DashboardEvent>> {
        if !event::poll(Duration::ZERO)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                Ok(event_for_key(key.code, key.modifiers))
            }
            _ => Ok(None),
        }
    }

    pub fn draw(&mut self, snapshot: &TrackingSnapshot, map: Option<&MapSnapshot>) -> io::Result<()> {
        self.frames = self.frames.wrapping_add(1);
        let spinner = SPINNER[self.frames % SPINNER.len()];
        let uptime = self.started.elapsed();
        let status = self.status.clone();

        // Nothing to show until the first fetch lands.
        if snapshot.last_refresh.is_none() && snapshot.vehicles.is_empty() {
            self.terminal.draw(|frame| {
                render_loading_ui(frame, snapshot, spinner, uptime);
            })?;
            return Ok(());
        }

        self.terminal.draw(|frame| {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1),
                    Constraint::Min(8),
                    Constraint::Length(3),
                ])
                .split(frame.area());

            let title = Line::from(vec![
                Span::styled(
                    format!(" RideDesk {} ", ridedesk::VERSION),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(" up {}", format_duration(uptime)),
                    Style::default().fg(Color::DarkGray),
                ),
            ]);
            let header = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(20), Constraint::Length(48)])
                .split(rows[0]);
            frame.render_widget(Paragraph::new(title), header[0]);
            frame.render_widget(ConnectionWidget::new(snapshot, spinner), header[1]);

            let body = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                .split(rows[1]);
            frame.render_widget(MapWidget::new(map), body[0]);
            frame.render_widget(FleetTableWidget::new(&snapshot.vehicles, snapshot.filter), body[1]);

            frame.render_widget(footer(snapshot, status.as_ref()), rows[2]);
        })?;

        Ok(())
    }
}

fn footer<'a>(snapshot: &TrackingSnapshot, status: Option<&(NoticeLevel, String)>) -> Paragraph<'a> {
    let stats = snapshot.stats;
    let counts = Line::from(vec![
        Span::styled("Total ", Style::default().fg(Color::DarkGray)),
        Span::raw(stats.total.to_string()),
        Span::styled("  Online ", Style::default().fg(Color::DarkGray)),
        Span::styled(stats.online.to_string(), Style::default().fg(Color::Green)),
        Span::styled("  Busy ", Style::default().fg(Color::DarkGray)),
        Span::styled(stats.busy.to_string(), Style::default().fg(Color::Yellow)),
        Span::styled("  Offline ", Style::default().fg(Color::DarkGray)),
        Span::styled(stats.offline.to_string(), Style::default().fg(Color::Red)),
        Span::styled("  No fix ", Style::default().fg(Color::DarkGray)),
        Span::raw(stats.unplaced.to_string()),
        Span::styled("  │  ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            "q quit  f filter  r refresh  m rebuild map",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let message = match (status, snapshot.last_error.as_ref()) {
        (Some((level, text)), _) => Line::from(Span::styled(
            text.clone(),
            Style::default().fg(level_color(*level)),
        )),
        (None, Some(error)) => {
            Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red)))
        }
        (None, None) => Line::from(""),
    };

    Paragraph::new(vec![counts, message]).block(Block::default().borders(Borders::TOP))
}

fn level_color(level: NoticeLevel) -> Color {
    match level {
        NoticeLevel::Success => Color::Green,
        NoticeLevel::Info => Color::Cyan,
        NoticeLevel::Warning => Color::Yellow,
        NoticeLevel::Error => Color::Red,
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bindings() {
        let none = KeyModifiers::NONE;
        assert_eq!(event_for_key(KeyCode::Char('q'), none), Some(DashboardEvent::Quit));
        assert_eq!(event_for_key(KeyCode::Esc, none), Some(DashboardEvent::Quit));
        assert_eq!(
            event_for_key(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Some(DashboardEvent::Quit)
        );
        assert_eq!(event_for_key(KeyCode::Char('c'), none), None);
        assert_eq!(
            event_for_key(KeyCode::Char('f'), none),
            Some(DashboardEvent::CycleFilter)
        );
        assert_eq!(event_for_key(KeyCode::Char('r'), none), Some(DashboardEvent::Refresh));
        assert_eq!(
            event_for_key(KeyCode::Char('m'), none),
            Some(DashboardEvent::RebuildMap)
        );
    }
}
