use std::collections::BTreeMap;

use flowscope_core::{ControlInfo, ControlKind, Indicator, ScenarioInfo, ServiceStatus};
use ratatui::{
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::events::{Action, Keybinds};
use crate::theme::{Theme, ThemedStyles};

/// Scenario list, pattern controls, live indicators and service health.
pub struct ControlsPanel<'a> {
    pub scenarios: &'a [ScenarioInfo],
    pub current_scenario: Option<&'a str>,
    pub controls: &'a [ControlInfo],
    pub indicators: &'a [Indicator],
    pub statuses: &'a BTreeMap<String, ServiceStatus>,
    pub keybinds: &'a Keybinds,
    pub kafka_lag_ms: u64,
}

impl<'a> ControlsPanel<'a> {
    fn control_keys(&self, kind: ControlKind) -> String {
        match kind {
            ControlKind::ToggleDependency => self
                .keybinds
                .hint(&Action::ToggleDependency)
                .unwrap_or_default(),
            ControlKind::Lag => {
                let down = self.keybinds.hint(&Action::LagDown).unwrap_or_default();
                let up = self.keybinds.hint(&Action::LagUp).unwrap_or_default();
                format!("{}/{}", down, up)
            }
        }
    }

    pub fn lines(&self, theme: &dyn Theme) -> Vec<Line<'static>> {
        let styles = ThemedStyles::new(theme);
        let heading = |text: &str| Line::from(Span::styled(text.to_string(), styles.table_header()));

        let mut lines = vec![heading("Scenarios")];
        for (i, scenario) in self.scenarios.iter().enumerate().take(9) {
            let active = self.current_scenario == Some(scenario.name);
            let name_style = if active {
                styles.accent().add_modifier(Modifier::BOLD)
            } else {
                styles.base()
            };
            lines.push(Line::from(vec![
                Span::styled(format!(" {} ", i + 1), styles.keybind()),
                Span::styled(
                    format!("{}{}", if active { "▸ " } else { "" }, scenario.name),
                    name_style,
                ),
            ]));
        }

        if !self.controls.is_empty() {
            lines.push(Line::from(""));
            lines.push(heading("Controls"));
            for control in self.controls {
                let mut spans = vec![
                    Span::styled(format!(" {} ", self.control_keys(control.kind)), styles.keybind()),
                    Span::styled(control.label.to_string(), styles.base()),
                ];
                if control.kind == ControlKind::Lag {
                    spans.push(Span::styled(
                        format!("  {}ms", self.kafka_lag_ms),
                        styles.accent(),
                    ));
                }
                lines.push(Line::from(spans));
            }
        }

        if !self.indicators.is_empty() {
            lines.push(Line::from(""));
            lines.push(heading("State"));
            for indicator in self.indicators {
                lines.push(Line::from(vec![
                    Span::styled(format!(" {}: ", indicator.label), styles.dimmed()),
                    Span::styled(indicator.value.clone(), styles.tone(indicator.tone)),
                ]));
            }
        }

        lines.push(Line::from(""));
        lines.push(heading("Services"));
        for (service, status) in self.statuses {
            lines.push(Line::from(vec![
                Span::styled(" ● ", styles.status(*status)),
                Span::styled(format!("{} ", service), styles.base()),
                Span::styled(status.to_string(), styles.status(*status)),
            ]));
        }

        lines
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &dyn Theme) {
        let styles = ThemedStyles::new(theme);
        frame.render_widget(
            Paragraph::new(self.lines(theme))
                .block(
                    Block::default()
                        .title(" Controls ")
                        .borders(Borders::ALL)
                        .border_style(styles.border()),
                )
                .wrap(Wrap { trim: false }),
            area,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::ThemeManager;

    const SCENARIOS: &[ScenarioInfo] = &[
        ScenarioInfo {
            id: "happy",
            name: "Happy Path",
            description: "",
        },
        ScenarioInfo {
            id: "down",
            name: "Kafka Down",
            description: "",
        },
    ];

    const CONTROLS: &[ControlInfo] = &[ControlInfo {
        kind: ControlKind::Lag,
        label: "Consumer lag",
        description: "",
    }];

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_lines_mark_current_scenario_and_lag() {
        let keybinds = Keybinds::new();
        let statuses = BTreeMap::from([("kafka".to_string(), ServiceStatus::Down)]);
        let panel = ControlsPanel {
            scenarios: SCENARIOS,
            current_scenario: Some("Kafka Down"),
            controls: CONTROLS,
            indicators: &[],
            statuses: &statuses,
            keybinds: &keybinds,
            kafka_lag_ms: 1500,
        };

        let manager = ThemeManager::new();
        let lines: Vec<String> = panel.lines(manager.current_theme()).iter().map(text).collect();

        assert!(lines.contains(&" 1 Happy Path".to_string()));
        assert!(lines.contains(&" 2 ▸ Kafka Down".to_string()));
        assert!(lines.contains(&" [/] Consumer lag  1500ms".to_string()));
        assert!(lines.contains(&" ● kafka down".to_string()));
    }
}
