//! Live channel and refresh status.

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use ridedesk::tracking::{ConnectionState, TrackingSnapshot};

/// Header widget: channel state, refresh time and a busy spinner.
pub struct ConnectionWidget<'a> {
    snapshot: &'a TrackingSnapshot,
    spinner: char,
}

impl<'a> ConnectionWidget<'a> {
    pub fn new(snapshot: &'a TrackingSnapshot, spinner: char) -> Self {
        Self { snapshot, spinner }
    }

    fn state_color(state: ConnectionState) -> Color {
        match state {
            ConnectionState::Connected => Color::Green,
            ConnectionState::Connecting => Color::Yellow,
            ConnectionState::Disconnected => Color::Red,
            ConnectionState::Closed => Color::DarkGray,
        }
    }
}

impl Widget for ConnectionWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let state = self.snapshot.connection;
        let refreshed = self
            .snapshot
            .last_refresh
            .map(|at| at.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string());

        let mut spans = vec![
            Span::styled("● ", Style::default().fg(Self::state_color(state))),
            Span::styled(state.label(), Style::default().fg(Self::state_color(state))),
            Span::styled("  refreshed ", Style::default().fg(Color::DarkGray)),
            Span::raw(refreshed),
        ];
        if self.snapshot.loading {
            spans.push(Span::styled(
                format!(" {}", self.spinner),
                Style::default().fg(Color::Yellow),
            ));
        }
        spans.push(Span::raw(" "));

        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Right)
            .render(area, buf);
    }
}
