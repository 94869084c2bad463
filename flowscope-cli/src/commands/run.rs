use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use flowscope_core::{
    create_session, Activity, ActivityKind, ControlKind, FlowscopeConfig, FlowscopeError, Pacer,
    PatternControl, PatternController, PatternSnapshot, PlaybackPhase, PlaybackSnapshot,
    SpeedControl, StepOutcome,
};
use tracing::{debug, info};

use super::{colored_log, colored_status, render_ledger, resolve_pattern, OutputFormat};

pub struct RunOptions {
    pub speed: Option<f64>,
    pub instant: bool,
    pub toggle: bool,
    pub lag: Option<u64>,
    pub format: OutputFormat,
}

pub async fn cmd_run(pattern: &str, scenario: &str, options: RunOptions) -> Result<()> {
    let config = FlowscopeConfig::load().map_err(FlowscopeError::from)?;
    let info = resolve_pattern(pattern)?;

    let pacer = if options.instant {
        Pacer::instant()
    } else {
        let speed = options.speed.unwrap_or(config.playback.speed);
        Pacer::new(SpeedControl::new(speed)?)
    };

    let session = create_session(info.id, pacer);
    apply_controls(session.as_ref(), &options, &config).await?;

    if !session.load_scenario(scenario).await? {
        println!("{}", "Scenario has no steps.".yellow());
        return Ok(());
    }

    info!(pattern = %info.id, scenario = %scenario, "Running scenario");

    let executed = match options.format {
        OutputFormat::Json => session.play().await?,
        OutputFormat::Text => play_verbose(&session).await?,
    };

    let snapshot = session.snapshot().await;
    session.shutdown();

    match options.format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "pattern": info.id,
                "scenario": scenario,
                "steps_executed": executed,
                "snapshot": snapshot,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => print_summary(&snapshot, executed),
    }

    Ok(())
}

async fn apply_controls(
    session: &dyn PatternController,
    options: &RunOptions,
    config: &FlowscopeConfig,
) -> Result<()> {
    let supports_lag = session.controls().iter().any(|c| c.kind == ControlKind::Lag);

    let lag = match options.lag {
        Some(ms) => Some(ms),
        None if supports_lag && config.patterns.kafka_lag_ms > 0 => {
            Some(config.patterns.kafka_lag_ms)
        }
        None => None,
    };

    if let Some(ms) = lag {
        debug!(lag_ms = ms, "Applying consumer lag");
        session.apply_control(PatternControl::SetLag(ms)).await?;
    }

    if options.toggle {
        debug!("Toggling pattern dependency");
        session
            .apply_control(PatternControl::ToggleDependency)
            .await?;
    }

    Ok(())
}

async fn play_verbose(session: &Arc<dyn PatternController>) -> Result<usize> {
    let playback = session.playback();
    println!(
        "{} {} {} {}",
        session.info().icon,
        session.info().name.cyan().bold(),
        "›".dimmed(),
        playback.scenario.unwrap_or_default().bold()
    );
    println!(
        "{}",
        format!("speed {}", session.speed().label()).dimmed()
    );
    println!("{}", "═".repeat(60).dimmed());

    let mut last_seq = 0;
    let mut executed = 0;

    loop {
        let playback = session.playback();
        if !session_complete(&playback) {
            println!();
            println!(
                "{} {}",
                format!("[{}/{}]", playback.current_step, playback.total_steps)
                    .cyan()
                    .bold(),
                playback.explanation
            );
        }

        match session.next_step().await? {
            StepOutcome::Advanced => executed += 1,
            StepOutcome::Busy => {
                tokio::task::yield_now().await;
                continue;
            }
            StepOutcome::Complete | StepOutcome::NotLoaded | StepOutcome::Superseded => break,
        }

        let snapshot = session.snapshot().await;
        for activity in snapshot.timeline.iter().filter(move |a| a.seq > last_seq) {
            print_activity(activity);
            last_seq = activity.seq;
        }
    }

    Ok(executed)
}

fn session_complete(playback: &PlaybackSnapshot) -> bool {
    playback.phase == PlaybackPhase::Complete
}

fn print_activity(activity: &Activity) {
    let time = activity.at.with_timezone(&chrono::Local).format("%H:%M:%S");
    match &activity.kind {
        ActivityKind::ScenarioStarted { .. } => {}
        ActivityKind::Log { message, kind } => {
            println!("  {} {}", time.to_string().dimmed(), colored_log(message, *kind));
        }
        ActivityKind::StatusChange { service, from, to } => {
            println!(
                "  {} {} {} {} {}",
                time.to_string().dimmed(),
                format!("● {}:", service).bold(),
                colored_status(*from),
                "→".dimmed(),
                colored_status(*to)
            );
        }
    }
}

fn print_summary(snapshot: &PatternSnapshot, executed: usize) {
    println!();
    println!(
        "{} {}",
        "✓".green().bold(),
        format!("Scenario complete: {} steps", executed).green()
    );

    if let Some(ledger) = snapshot.ledger.as_ref().filter(|l| !l.is_empty()) {
        println!();
        println!("  {}", ledger.title.yellow().bold());
        println!("{}", render_ledger(ledger));
    }

    if !snapshot.indicators.is_empty() {
        println!();
        for indicator in &snapshot.indicators {
            println!("  {:<18} {}", format!("{}:", indicator.label).bold(), indicator.value);
        }
    }
}
