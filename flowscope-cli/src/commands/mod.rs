pub mod config;
pub mod patterns;
pub mod run;

pub use config::{handle_config_command, ConfigCommand};
pub use patterns::{cmd_patterns, cmd_scenarios};
pub use run::{cmd_run, RunOptions};

use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use flowscope_core::{FlowscopeError, LedgerTable, LogKind, PatternInfo, RowTone, ServiceStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub(crate) fn resolve_pattern(query: &str) -> Result<&'static PatternInfo, FlowscopeError> {
    flowscope_core::find(query)
}

pub(crate) fn styled_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).fg(comfy_table::Color::Cyan))
                .collect::<Vec<_>>(),
        );
    table
}

pub(crate) fn tone_color(tone: RowTone) -> comfy_table::Color {
    match tone {
        RowTone::Neutral => comfy_table::Color::Reset,
        RowTone::Good => comfy_table::Color::Green,
        RowTone::Warn => comfy_table::Color::Yellow,
        RowTone::Bad => comfy_table::Color::Red,
    }
}

pub(crate) fn render_ledger(ledger: &LedgerTable) -> Table {
    let columns: Vec<&str> = ledger.columns.iter().map(String::as_str).collect();
    let mut table = styled_table(&columns);
    for row in &ledger.rows {
        let color = tone_color(row.tone);
        table.add_row(
            row.cells
                .iter()
                .map(|c| Cell::new(c).fg(color))
                .collect::<Vec<_>>(),
        );
    }
    table
}

pub(crate) fn colored_log(message: &str, kind: LogKind) -> ColoredString {
    let line = format!("{} {}", kind.icon(), message);
    match kind {
        LogKind::Info => line.normal(),
        LogKind::Success => line.green(),
        LogKind::Error => line.red(),
        LogKind::Warning => line.yellow(),
        LogKind::Request => line.blue(),
    }
}

pub(crate) fn colored_status(status: ServiceStatus) -> ColoredString {
    match status {
        ServiceStatus::Healthy => status.to_string().green(),
        ServiceStatus::Degraded => status.to_string().yellow(),
        ServiceStatus::Down => status.to_string().red(),
    }
}
