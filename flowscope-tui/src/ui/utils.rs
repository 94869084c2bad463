use chrono::{DateTime, Utc};
use flowscope_core::{MessageFlow, Position};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::Span,
};

use crate::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EasingFunction {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl EasingFunction {
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            EasingFunction::Linear => t,
            EasingFunction::EaseIn => t * t,
            EasingFunction::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            EasingFunction::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// How long a token takes to cross the diagram at `speed`.
pub fn hop_duration_ms(base_ms: u64, speed: f64) -> u64 {
    if speed <= 0.0 {
        return base_ms;
    }
    (base_ms as f64 / speed).round() as u64
}

/// Where a token sits at `now`. Finished hops stay parked on their target.
pub fn token_position(
    flow: &MessageFlow,
    now: DateTime<Utc>,
    duration_ms: u64,
    easing: EasingFunction,
) -> Position {
    let t = flow.progress(now, duration_ms);
    flow.position_at(easing.apply(t))
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", kept)
}

pub fn centered_rect(width: u16, height: u16, screen: Rect) -> Rect {
    let width = width.min(screen.width.saturating_sub(2));
    let height = height.min(screen.height.saturating_sub(2));
    Rect::new(
        screen.x + (screen.width.saturating_sub(width)) / 2,
        screen.y + (screen.height.saturating_sub(height)) / 2,
        width,
        height,
    )
}

/// Splits `text` into spans, highlighting case-insensitive matches of `query`.
pub fn highlight_text(
    text: &str,
    query: &str,
    base_style: Style,
    theme: &dyn Theme,
) -> Vec<Span<'static>> {
    let query = query.trim();
    if query.is_empty() || !text.is_ascii() || !query.is_ascii() {
        return vec![Span::styled(text.to_string(), base_style)];
    }

    let highlight = base_style
        .fg(theme.warning())
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let lower = text.to_ascii_lowercase();
    let needle = query.to_ascii_lowercase();

    let mut spans = Vec::new();
    let mut last = 0;
    for (start, _) in lower.match_indices(&needle) {
        if start > last {
            spans.push(Span::styled(text[last..start].to_string(), base_style));
        }
        let end = start + needle.len();
        spans.push(Span::styled(text[start..end].to_string(), highlight));
        last = end;
    }
    if last < text.len() {
        spans.push(Span::styled(text[last..].to_string(), base_style));
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use flowscope_core::FlowKind;

    use crate::theme::ThemeManager;

    fn flow() -> MessageFlow {
        MessageFlow::new(
            "client",
            "api",
            FlowKind::Http,
            "GET /",
            (Position::new(0.0, 50.0), Position::new(100.0, 50.0)),
        )
    }

    #[test]
    fn test_easing_endpoints() {
        for easing in [
            EasingFunction::Linear,
            EasingFunction::EaseIn,
            EasingFunction::EaseOut,
            EasingFunction::EaseInOut,
        ] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert_eq!(easing.apply(1.0), 1.0);
            assert_eq!(easing.apply(2.0), 1.0);
        }
        assert_eq!(EasingFunction::EaseInOut.apply(0.5), 0.5);
    }

    #[test]
    fn test_hop_duration_scales_with_speed() {
        assert_eq!(hop_duration_ms(600, 1.0), 600);
        assert_eq!(hop_duration_ms(600, 2.0), 300);
        assert_eq!(hop_duration_ms(600, 0.5), 1200);
    }

    #[test]
    fn test_token_position() {
        let flow = flow();
        let halfway = flow.started_at + Duration::milliseconds(300);
        let done = flow.started_at + Duration::milliseconds(900);

        let mid = token_position(&flow, halfway, 600, EasingFunction::Linear);
        assert!((mid.x - 50.0).abs() < 1e-9);

        let end = token_position(&flow, done, 600, EasingFunction::EaseInOut);
        assert_eq!(end, Position::new(100.0, 50.0));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Kafka", 10), "Kafka");
        assert_eq!(truncate("Notification Service", 8), "Notific…");
    }

    #[test]
    fn test_centered_rect() {
        let area = centered_rect(20, 10, Rect::new(0, 0, 100, 50));
        assert_eq!(area, Rect::new(40, 20, 20, 10));

        let clamped = centered_rect(200, 100, Rect::new(0, 0, 40, 20));
        assert_eq!(clamped.width, 38);
        assert_eq!(clamped.height, 18);
    }

    #[test]
    fn test_highlight_text() {
        let manager = ThemeManager::new();
        let spans = highlight_text("Circuit Breaker", "break", Style::default(), manager.current_theme());

        let texts: Vec<_> = spans.iter().map(|s| s.content.to_string()).collect();
        assert_eq!(texts, vec!["Circuit ", "Break", "er"]);
    }
}
