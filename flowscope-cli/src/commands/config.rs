use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use flowscope_core::{get_config_dir, get_data_dir, FlowscopeConfig, FlowscopeError};

use super::OutputFormat;

#[derive(Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Print the effective configuration")]
    Show {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    #[command(about = "Print the configuration and data directories")]
    Path,
}

pub fn handle_config_command(action: Option<ConfigCommand>) -> Result<()> {
    match action {
        Some(ConfigCommand::Show { format }) => cmd_config_show(format),
        Some(ConfigCommand::Path) => cmd_config_path(),
        None => cmd_config_show(OutputFormat::Text),
    }
}

fn cmd_config_show(format: OutputFormat) -> Result<()> {
    let config = FlowscopeConfig::load().map_err(FlowscopeError::from)?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("{}", "Effective configuration".cyan().bold());
    println!("{}", "═".repeat(40).dimmed());
    println!();
    print!("{}", toml::to_string_pretty(&config)?);

    Ok(())
}

fn cmd_config_path() -> Result<()> {
    let show = |label: &str, dir: Option<std::path::PathBuf>| match dir {
        Some(d) => println!("  {:<10} {}", label.bold(), d.display()),
        None => println!("  {:<10} {}", label.bold(), "unavailable".yellow()),
    };

    show("Config:", get_config_dir().map(|d| d.join("config.toml")));
    show("Local:", std::env::current_dir().ok().map(|d| d.join("flowscope.toml")));
    show("Data:", get_data_dir());

    Ok(())
}
