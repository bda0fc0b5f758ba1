//! Fleet table widget.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Cell, Row, Table, Widget},
};
use ridedesk::map::Placeable;
use ridedesk::tracking::{VehicleFilter, VehiclePosition};

use super::marker_color;

/// Vehicles passing the current filter, sorted by name.
pub struct FleetTableWidget<'a> {
    vehicles: &'a [VehiclePosition],
    filter: VehicleFilter,
}

impl<'a> FleetTableWidget<'a> {
    pub fn new(vehicles: &'a [VehiclePosition], filter: VehicleFilter) -> Self {
        Self { vehicles, filter }
    }
}

impl Widget for FleetTableWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut shown: Vec<&VehiclePosition> = self
            .vehicles
            .iter()
            .filter(|v| self.filter.matches(v))
            .collect();
        shown.sort_by(|a, b| a.display_name.cmp(&b.display_name).then(a.id.cmp(&b.id)));

        let rows = shown.iter().map(|v| {
            let position = v
                .position()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "no fix".to_string());
            Row::new(vec![
                Cell::from(v.id.to_string()),
                Cell::from(v.display_name.clone()),
                Cell::from(Span::styled(
                    v.online_state.label(),
                    Style::default().fg(marker_color(v.online_state.color())),
                )),
                Cell::from(if v.available { "yes" } else { "-" }),
                Cell::from(Span::styled(position, Style::default().fg(Color::DarkGray))),
            ])
        });

        let header = Row::new(vec!["ID", "Driver", "State", "Free", "Position"])
            .style(Style::default().add_modifier(Modifier::BOLD));

        let title = format!(
            " Fleet: {} ({} of {}) ",
            self.filter.label(),
            shown.len(),
            self.vehicles.len()
        );

        Table::new(
            rows,
            [
                Constraint::Length(6),
                Constraint::Min(10),
                Constraint::Length(8),
                Constraint::Length(5),
                Constraint::Length(20),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .render(area, buf);
    }
}
