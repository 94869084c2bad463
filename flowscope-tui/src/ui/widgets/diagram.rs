use std::collections::BTreeMap;

use chrono::Utc;
use flowscope_core::{
    FlowKind, MessageFlow, Position, ServiceStatus, Topology, CANVAS_SIZE,
};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Context, Line as Segment, Rectangle},
        Block, Borders,
    },
    Frame,
};

use crate::theme::Theme;
use crate::ui::utils::{token_position, truncate, EasingFunction};

const BOX_WIDTH: f64 = 17.0;
const BOX_HEIGHT: f64 = 12.0;

/// Service boxes from the topology plus the message tokens in flight.
pub struct Diagram<'a> {
    pub topology: &'a Topology,
    pub statuses: &'a BTreeMap<String, ServiceStatus>,
    pub flows: &'a [MessageFlow],
    pub hop_ms: u64,
    pub title: String,
}

/// Topology positions grow downwards; the canvas y axis grows upwards.
fn to_canvas(p: Position) -> (f64, f64) {
    (p.x, CANVAS_SIZE - p.y)
}

impl<'a> Diagram<'a> {
    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &dyn Theme) {
        let now = Utc::now();
        let canvas = Canvas::default()
            .block(
                Block::default()
                    .title(self.title.clone())
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(theme.border())),
            )
            .marker(Marker::Braille)
            .background_color(theme.background())
            .x_bounds([0.0, CANVAS_SIZE])
            .y_bounds([0.0, CANVAS_SIZE])
            .paint(|ctx| {
                self.paint_paths(ctx, theme);
                self.paint_services(ctx, theme);
                ctx.layer();
                self.paint_tokens(ctx, theme, now);
                Self::paint_legend(ctx, theme);
            });

        frame.render_widget(canvas, area);
    }

    fn paint_paths(&self, ctx: &mut Context, theme: &dyn Theme) {
        for flow in self.flows {
            let (x1, y1) = to_canvas(flow.path.0);
            let (x2, y2) = to_canvas(flow.path.1);
            ctx.draw(&Segment::new(x1, y1, x2, y2, theme.border()));
        }
    }

    fn paint_services(&self, ctx: &mut Context, theme: &dyn Theme) {
        for node in &self.topology.nodes {
            let (x, y) = to_canvas(node.position);
            let status = self.statuses.get(&node.id).copied().unwrap_or_default();
            let color = match status {
                ServiceStatus::Healthy => theme.accent(),
                other => theme.status_color(other),
            };

            ctx.draw(&Rectangle {
                x: x - BOX_WIDTH / 2.0,
                y: y - BOX_HEIGHT / 2.0,
                width: BOX_WIDTH,
                height: BOX_HEIGHT,
                color,
            });

            let left = x - BOX_WIDTH / 2.0 + 1.5;
            ctx.print(
                left,
                y + 2.0,
                Line::from(vec![
                    Span::styled(format!("{} ", node.kind.icon()), Style::default().fg(color)),
                    Span::styled(
                        truncate(&node.label, 13),
                        Style::default()
                            .fg(theme.foreground())
                            .add_modifier(Modifier::BOLD),
                    ),
                ]),
            );

            if status != ServiceStatus::Healthy {
                ctx.print(
                    left,
                    y - 3.0,
                    Line::styled(
                        format!("● {}", status),
                        Style::default().fg(theme.status_color(status)),
                    ),
                );
            }
        }
    }

    fn paint_tokens(&self, ctx: &mut Context, theme: &dyn Theme, now: chrono::DateTime<Utc>) {
        for flow in self.flows {
            let (x, y) = to_canvas(token_position(
                flow,
                now,
                self.hop_ms,
                EasingFunction::EaseInOut,
            ));

            let (glyph, color) = match flow.success {
                Some(false) => ("✗", theme.error()),
                _ => ("●", theme.flow_color(flow.kind)),
            };

            ctx.print(
                x,
                y,
                Line::styled(glyph, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            );
            ctx.print(
                x + 2.0,
                y + 4.0,
                Line::styled(truncate(&flow.label, 24), Style::default().fg(color)),
            );
        }
    }

    fn paint_legend(ctx: &mut Context, theme: &dyn Theme) {
        let spans: Vec<Span> = [FlowKind::Http, FlowKind::Event, FlowKind::Cache, FlowKind::Db]
            .into_iter()
            .flat_map(|kind| {
                [
                    Span::styled("● ", Style::default().fg(theme.flow_color(kind))),
                    Span::styled(format!("{}  ", kind), Style::default().fg(theme.foreground_dim())),
                ]
            })
            .collect();
        ctx.print(1.0, 3.0, Line::from(spans));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_flips_y() {
        assert_eq!(to_canvas(Position::new(10.0, 20.0)), (10.0, 80.0));
        assert_eq!(to_canvas(Position::new(50.0, 50.0)), (50.0, 50.0));
    }
}
