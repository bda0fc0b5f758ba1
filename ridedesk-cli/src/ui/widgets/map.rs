//! Map pane drawn from the in-memory engine's snapshot.
//!
//! Markers are printed as their icon glyph at their coordinates; circles
//! (demand zones) are drawn as canvas circles scaled from metres to degrees.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    symbols::Marker,
    text::Span,
    widgets::{
        canvas::{Canvas, Circle},
        Block, Borders, Paragraph, Widget,
    },
};
use ridedesk::map::{LatLng, MapSnapshot};

use super::marker_color;

const METRES_PER_DEGREE: f64 = 111_320.0;
const MIN_SPAN_DEG: f64 = 0.01;

/// Canvas bounds as `(x = [lng_min, lng_max], y = [lat_min, lat_max])`.
///
/// Fits every layer with a margin; an empty map falls back to the viewport
/// centre with a span derived from the zoom level.
pub fn bounds(snapshot: &MapSnapshot) -> ([f64; 2], [f64; 2]) {
    let points: Vec<LatLng> = snapshot
        .layers
        .iter()
        .map(|(_, layer)| layer.position())
        .collect();

    if points.is_empty() {
        let center = snapshot.view.center;
        let span = (360.0 / 2f64.powi(i32::from(snapshot.view.zoom))).max(MIN_SPAN_DEG);
        return (
            [center.lng - span, center.lng + span],
            [center.lat - span / 2.0, center.lat + span / 2.0],
        );
    }

    let (mut lat_min, mut lat_max) = (f64::MAX, f64::MIN);
    let (mut lng_min, mut lng_max) = (f64::MAX, f64::MIN);
    for p in &points {
        lat_min = lat_min.min(p.lat);
        lat_max = lat_max.max(p.lat);
        lng_min = lng_min.min(p.lng);
        lng_max = lng_max.max(p.lng);
    }

    let lat_pad = ((lat_max - lat_min) * 0.1).max(MIN_SPAN_DEG / 2.0);
    let lng_pad = ((lng_max - lng_min) * 0.1).max(MIN_SPAN_DEG / 2.0);
    (
        [lng_min - lng_pad, lng_max + lng_pad],
        [lat_min - lat_pad, lat_max + lat_pad],
    )
}

pub struct MapWidget<'a> {
    snapshot: Option<&'a MapSnapshot>,
}

impl<'a> MapWidget<'a> {
    pub fn new(snapshot: Option<&'a MapSnapshot>) -> Self {
        Self { snapshot }
    }
}

impl Widget for MapWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(snapshot) = self.snapshot else {
            Paragraph::new(Span::styled(
                "Map unavailable (press m to rebuild)",
                Style::default().fg(Color::DarkGray),
            ))
            .block(Block::default().borders(Borders::ALL).title(" Map "))
            .render(area, buf);
            return;
        };

        let (x_bounds, y_bounds) = bounds(snapshot);
        let title = format!(
            " Map: {} @ z{} ",
            snapshot.view.center, snapshot.view.zoom
        );

        Canvas::default()
            .block(Block::default().borders(Borders::ALL).title(title))
            .marker(Marker::Braille)
            .x_bounds(x_bounds)
            .y_bounds(y_bounds)
            .paint(|ctx| {
                for circle in snapshot.circles() {
                    ctx.draw(&Circle {
                        x: circle.center.lng,
                        y: circle.center.lat,
                        radius: circle.radius_m / METRES_PER_DEGREE,
                        color: marker_color(circle.color),
                    });
                }
                ctx.layer();
                for marker in snapshot.markers() {
                    ctx.print(
                        marker.position.lng,
                        marker.position.lat,
                        Span::styled(
                            marker.icon.glyph.to_string(),
                            Style::default().fg(marker_color(marker.icon.color)),
                        ),
                    );
                }
            })
            .render(area, buf);
    }
}
