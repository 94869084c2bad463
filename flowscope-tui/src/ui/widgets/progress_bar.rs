use flowscope_core::{PlaybackPhase, PlaybackSnapshot};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::Spinner;
use crate::theme::Theme;

/// Step panel: scenario name, a segmented step bar and the narration of the
/// step under the cursor.
pub struct StepProgress;

impl StepProgress {
    pub fn segments(playback: &PlaybackSnapshot) -> (usize, usize) {
        let done = match playback.phase {
            PlaybackPhase::Complete => playback.total_steps,
            PlaybackPhase::Idle => 0,
            _ => playback.current_step.saturating_sub(1),
        };
        (done, playback.total_steps)
    }

    pub fn render(
        frame: &mut Frame,
        area: Rect,
        playback: &PlaybackSnapshot,
        theme: &dyn Theme,
        tick: u64,
    ) {
        let block = Block::default()
            .title(" Step ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.border()));

        let Some(scenario) = playback.scenario.as_deref() else {
            let hint = Paragraph::new(Line::from(Span::styled(
                "Press 1-9 to load a scenario",
                Style::default().fg(theme.foreground_dim()),
            )))
            .block(block);
            frame.render_widget(hint, area);
            return;
        };

        let (done, total) = Self::segments(playback);
        let mut bar: Vec<Span> = (0..total)
            .map(|i| {
                let (glyph, color) = if i < done {
                    ("▰", theme.success())
                } else if i == done && playback.is_running {
                    ("▰", theme.warning())
                } else {
                    ("▱", theme.foreground_dim())
                };
                Span::styled(glyph, Style::default().fg(color))
            })
            .collect();
        bar.push(Span::raw(" "));

        let state = match playback.phase {
            PlaybackPhase::Executing => format!("{} running", Spinner::frame(tick)),
            PlaybackPhase::Complete => "✓ complete".to_string(),
            _ if playback.is_autoplaying => "▶ autoplay".to_string(),
            _ => format!("{}/{}", playback.current_step, total),
        };
        bar.push(Span::styled(state, Style::default().fg(theme.accent())));

        let explanation = if playback.phase == PlaybackPhase::Complete {
            "Scenario complete. Pick another with 1-9.".to_string()
        } else {
            playback.explanation.clone()
        };

        let lines = vec![
            Line::from(Span::styled(
                scenario.to_string(),
                Style::default()
                    .fg(theme.accent_secondary())
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(bar),
            Line::from(""),
            Line::from(Span::styled(
                explanation,
                Style::default().fg(theme.foreground()),
            )),
        ];

        frame.render_widget(
            Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
            area,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playback(current_step: usize, total_steps: usize, phase: PlaybackPhase) -> PlaybackSnapshot {
        PlaybackSnapshot {
            scenario: Some("Cache Hit".into()),
            current_step,
            total_steps,
            explanation: String::new(),
            is_running: phase == PlaybackPhase::Executing,
            is_autoplaying: false,
            phase,
            speed: 1.0,
        }
    }

    #[test]
    fn test_segments() {
        assert_eq!(StepProgress::segments(&playback(1, 5, PlaybackPhase::Ready)), (0, 5));
        assert_eq!(StepProgress::segments(&playback(3, 5, PlaybackPhase::Executing)), (2, 5));
        assert_eq!(StepProgress::segments(&playback(5, 5, PlaybackPhase::Complete)), (5, 5));
    }
}
