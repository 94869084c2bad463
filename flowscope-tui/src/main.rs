use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use flowscope_core::{ensure_data_dir, FlowscopeConfig, FlowscopeError};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use flowscope_tui::app::App;

const LOG_FILE: &str = "flowscope-tui.log";

fn main() -> Result<()> {
    let config = FlowscopeConfig::load().map_err(FlowscopeError::from)?;
    setup_logging(&config)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Flowscope TUI");

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, config);
    restore_terminal(&mut terminal)?;

    if let Err(e) = result {
        tracing::error!(error = %e, "Application error");
        eprintln!("Application error: {e}");
        return Err(e);
    }

    Ok(())
}

/// Logs go to a file in the data dir; stdout belongs to the terminal UI.
fn setup_logging(config: &FlowscopeConfig) -> Result<()> {
    let path = ensure_data_dir()?.join(LOG_FILE);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let writer = Mutex::new(file);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.json_format {
        registry.with(fmt::layer().json().with_writer(writer)).init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(writer),
            )
            .init();
    }
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: FlowscopeConfig,
) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut app = App::new(config)?;
        app.run(terminal).await
    })
}
