use flowscope_core::LedgerTable;
use ratatui::{
    layout::{Constraint, Rect},
    text::Span,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::theme::{Theme, ThemedStyles};

pub struct LedgerView;

impl LedgerView {
    /// Even column split; the first column gets a little more room for ids.
    pub fn widths(columns: usize) -> Vec<Constraint> {
        match columns {
            0 => Vec::new(),
            1 => vec![Constraint::Percentage(100)],
            n => {
                let rest = 70 / (n as u16 - 1);
                std::iter::once(Constraint::Percentage(30))
                    .chain(std::iter::repeat(Constraint::Percentage(rest)).take(n - 1))
                    .collect()
            }
        }
    }

    pub fn render(frame: &mut Frame, area: Rect, ledger: Option<&LedgerTable>, theme: &dyn Theme) {
        let styles = ThemedStyles::new(theme);

        let Some(ledger) = ledger else {
            frame.render_widget(
                Paragraph::new(Span::styled("This pattern keeps no ledger", styles.dimmed()))
                    .block(
                        Block::default()
                            .title(" Ledger ")
                            .borders(Borders::ALL)
                            .border_style(styles.border()),
                    ),
                area,
            );
            return;
        };

        let block = Block::default()
            .title(format!(" {} ({}) ", ledger.title, ledger.rows.len()))
            .borders(Borders::ALL)
            .border_style(styles.border());

        let header = Row::new(
            ledger
                .columns
                .iter()
                .map(|c| Cell::from(c.clone()).style(styles.table_header())),
        )
        .bottom_margin(1);

        // Keep the newest rows when the panel is too short.
        let visible = area.height.saturating_sub(4) as usize;
        let start = ledger.rows.len().saturating_sub(visible);
        let rows = ledger.rows[start..].iter().map(|row| {
            Row::new(row.cells.iter().map(|c| Cell::from(c.clone()))).style(styles.tone(row.tone))
        });

        frame.render_widget(
            Table::new(rows, Self::widths(ledger.columns.len()))
                .header(header)
                .block(block),
            area,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths() {
        assert!(LedgerView::widths(0).is_empty());
        assert_eq!(LedgerView::widths(1), vec![Constraint::Percentage(100)]);

        let three = LedgerView::widths(3);
        assert_eq!(three.len(), 3);
        assert_eq!(three[0], Constraint::Percentage(30));
        assert_eq!(three[2], Constraint::Percentage(35));
    }
}
