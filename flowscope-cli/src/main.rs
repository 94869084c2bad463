use clap::{Parser, Subcommand};
use colored::Colorize;
use flowscope_core::{CliErrorDisplay, FlowscopeError, PatternId};
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

use commands::{
    cmd_patterns, cmd_run, cmd_scenarios, handle_config_command, ConfigCommand, OutputFormat,
    RunOptions,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

#[derive(Parser)]
#[command(name = "flowscope")]
#[command(version = VERSION)]
#[command(about = "Flowscope - step through distributed-system communication patterns")]
#[command(long_about = r#"
Flowscope plays scripted scenarios of common distributed-system patterns
(request/response, async messaging, transactional outbox, saga, circuit
breaker, pub/sub) one step at a time.

Use 'flowscope patterns' to see what is available, 'flowscope scenarios
<pattern>' to list a pattern's scenarios and 'flowscope run <pattern>
<scenario>' to play one in the terminal. 'flowscope-tui' is the animated
interactive version.
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List the available patterns")]
    Patterns {
        #[arg(short, long, help = "Fuzzy filter on name, tags and description")]
        search: Option<String>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    #[command(about = "List the scenarios and controls of a pattern")]
    Scenarios {
        #[arg(help = "Pattern slug or name (e.g. outbox, circuit-breaker)")]
        pattern: String,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    #[command(about = "Play a scenario step by step")]
    Run {
        #[arg(help = "Pattern slug or name")]
        pattern: String,

        #[arg(help = "Scenario id (see 'flowscope scenarios <pattern>')")]
        scenario: String,

        #[arg(short, long, help = "Playback speed between 0.5 and 3.0")]
        speed: Option<f64>,

        #[arg(short, long, help = "Skip all delays")]
        instant: bool,

        #[arg(long, help = "Toggle the pattern's dependency before running")]
        toggle: bool,

        #[arg(long, help = "Kafka consumer lag in ms (async messaging only)")]
        lag: Option<u64>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    #[command(about = "Show or locate the configuration")]
    Config {
        #[command(subcommand)]
        action: Option<ConfigCommand>,
    },

    #[command(about = "Show version information")]
    Version {
        #[arg(short, long)]
        detailed: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<FlowscopeError>() {
                Some(err) => eprintln!("{}: {}", "Error".red().bold(), CliErrorDisplay::new(err)),
                None => eprintln!("{}: {}", "Error".red().bold(), e),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Patterns { search, format } => cmd_patterns(search.as_deref(), format),
        Commands::Scenarios { pattern, format } => cmd_scenarios(&pattern, format).await,
        Commands::Run {
            pattern,
            scenario,
            speed,
            instant,
            toggle,
            lag,
            format,
        } => {
            let options = RunOptions {
                speed,
                instant,
                toggle,
                lag,
                format,
            };
            cmd_run(&pattern, &scenario, options).await
        }
        Commands::Config { action } => handle_config_command(action),
        Commands::Version { detailed } => cmd_version(detailed),
    }
}

fn cmd_version(detailed: bool) -> anyhow::Result<()> {
    if detailed {
        println!("{}", "Flowscope Version Information".cyan().bold());
        println!("{}", "═".repeat(40).dimmed());
        println!("  {:<15} {}", "Version:".bold(), VERSION);
        println!("  {:<15} {}", "Name:".bold(), NAME);
        println!("  {:<15} Apache-2.0", "License:".bold());
        println!();
        println!("  {}", "Patterns:".bold());
        for id in PatternId::all() {
            let info = flowscope_core::patterns::registry::info(*id);
            println!("    {} {}", info.icon, info.name);
        }
        println!();
        println!("  {}", "Build Information:".bold());
        println!("    Rust Edition: 2021");
        #[cfg(debug_assertions)]
        println!("    Build:        Debug");
        #[cfg(not(debug_assertions))]
        println!("    Build:        Release");
    } else {
        println!("flowscope {}", VERSION);
    }

    Ok(())
}
