use anyhow::Result;
use colored::Colorize;
use comfy_table::Cell;
use flowscope_core::{catalog, create_session, search, Pacer, PatternInfo};

use super::{resolve_pattern, styled_table, OutputFormat};

pub fn cmd_patterns(query: Option<&str>, format: OutputFormat) -> Result<()> {
    let patterns: Vec<&'static PatternInfo> = match query {
        Some(q) => search(q),
        None => catalog().iter().collect(),
    };

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&patterns)?);
        return Ok(());
    }

    if patterns.is_empty() {
        println!(
            "No patterns match '{}'",
            query.unwrap_or_default().yellow()
        );
        return Ok(());
    }

    println!("{}", "Patterns".cyan().bold());
    println!("{}", "═".repeat(60).dimmed());
    println!();

    let mut table = styled_table(&["", "Slug", "Name", "Category", "Level", "Description"]);
    for info in &patterns {
        table.add_row(vec![
            Cell::new(info.icon),
            Cell::new(info.id.slug()),
            Cell::new(info.name),
            Cell::new(info.category.to_string()),
            Cell::new(info.difficulty.to_string()),
            Cell::new(info.description),
        ]);
    }

    println!("{}", table);
    println!();
    println!(
        "Run {} to see a pattern's scenarios.",
        "flowscope scenarios <pattern>".cyan().bold()
    );

    Ok(())
}

pub async fn cmd_scenarios(pattern: &str, format: OutputFormat) -> Result<()> {
    let info = resolve_pattern(pattern)?;
    let session = create_session(info.id, Pacer::instant());
    let scenarios = session.scenarios();
    let controls = session.controls();

    if format == OutputFormat::Json {
        let output = serde_json::json!({
            "pattern": info,
            "scenarios": scenarios,
            "controls": controls,
            "services": session.topology().nodes,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{} {}", info.icon, info.name.cyan().bold());
    println!("{}", info.description.dimmed());
    println!("{}", "═".repeat(60).dimmed());
    println!();

    let mut table = styled_table(&["#", "Scenario", "Name", "Description"]);
    for (i, scenario) in scenarios.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(scenario.id),
            Cell::new(scenario.name),
            Cell::new(scenario.description),
        ]);
    }
    println!("{}", table);

    if !controls.is_empty() {
        println!();
        println!("  {}", "Controls".yellow().bold());
        for control in controls {
            println!(
                "    {:<20} {} {}",
                control.kind.to_string(),
                control.label.bold(),
                format!("({})", control.description).dimmed()
            );
        }
    }

    println!();
    println!(
        "Run {} to play one.",
        format!("flowscope run {} <scenario>", info.id.slug())
            .cyan()
            .bold()
    );

    session.shutdown();
    Ok(())
}
