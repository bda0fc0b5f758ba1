//! Loading screen shown until the first driver fetch completes.

use std::time::Duration;

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use ridedesk::tracking::TrackingSnapshot;

/// Render the loading UI in a centered box.
pub fn render_loading_ui(
    frame: &mut Frame,
    snapshot: &TrackingSnapshot,
    spinner: char,
    elapsed: Duration,
) {
    let size = frame.area();

    let box_width = 56u16.min(size.width.saturating_sub(4));
    let box_height = 8u16.min(size.height);
    let area = Rect {
        x: size.width.saturating_sub(box_width) / 2,
        y: size.height.saturating_sub(box_height) / 2,
        width: box_width,
        height: box_height,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            format!(" RideDesk {} ", ridedesk::VERSION),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let (status_text, status_color) = match (&snapshot.last_error, snapshot.session) {
        (Some(error), _) => (format!("Retrying: {}", error), Color::Red),
        (None, None) => ("Loading map...".to_string(), Color::Yellow),
        (None, Some(_)) => ("Fetching driver locations...".to_string(), Color::Green),
    };

    let lines = vec![
        Line::from(Span::styled(
            "Starting fleet tracking",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled(format!("{} ", spinner), Style::default().fg(Color::Yellow)),
            Span::styled(status_text, Style::default().fg(status_color)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Live channel: ", Style::default().fg(Color::DarkGray)),
            Span::raw(snapshot.connection.label()),
            Span::styled("   Elapsed: ", Style::default().fg(Color::DarkGray)),
            Span::raw(format!("{}s", elapsed.as_secs())),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines), inner);
}
