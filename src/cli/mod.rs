use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;

use crate::config::Config;
use crate::console::{render_reminders, run_console};
use crate::engine::{open_registry, Engine, RunMode};
use crate::notifier::{build_notifier, Notifier};
use crate::trigger::TriggerSpec;

pub use commands::{Args, Commands};

mod commands;

pub async fn handle_add(
    title: String,
    message: String,
    in_offset: Option<String>,
    at: Option<String>,
    data_dir: Option<PathBuf>,
) -> Result<()> {
    let config = Config::new(data_dir)?;

    let when = match (in_offset, at) {
        (Some(offset), _) => TriggerSpec::parse_offset(&offset)?,
        (None, Some(at)) => TriggerSpec::parse_at(&at)?,
        (None, None) => anyhow::bail!("Either --in or --at is required"),
    };
    let trigger_time = when.resolve(Local::now())?;

    let registry = open_registry(&config);
    let id = registry
        .add(&title, &message, trigger_time)
        .await
        .context("Failed to add reminder")?;

    println!("✅ Added reminder {} ({})", id, when.describe());
    Ok(())
}

pub async fn handle_list(data_dir: Option<PathBuf>) -> Result<()> {
    let config = Config::new(data_dir)?;
    let registry = open_registry(&config);

    println!("{}", render_reminders(&registry.display_order().await));
    Ok(())
}

pub async fn handle_remove(id: i64, data_dir: Option<PathBuf>) -> Result<()> {
    let config = Config::new(data_dir)?;
    let registry = open_registry(&config);

    if registry.remove(id).await.context("Failed to remove reminder")? {
        println!("🗑️  Removed reminder {}", id);
    } else {
        println!("No reminder with id {}", id);
    }
    Ok(())
}

pub async fn handle_cleanup(data_dir: Option<PathBuf>) -> Result<()> {
    let config = Config::new(data_dir)?;
    let registry = open_registry(&config);

    if registry
        .cleanup_completed()
        .await
        .context("Failed to clean up reminders")?
    {
        println!("🧹 Cleanup Complete");
        println!("All completed reminders have been removed.");
    } else {
        println!("No completed reminders.");
    }
    Ok(())
}

pub async fn handle_run(background: bool, show_ui: bool, data_dir: Option<PathBuf>) -> Result<()> {
    let config = Config::new(data_dir)?;
    let notifier: Arc<dyn Notifier> = Arc::from(build_notifier(config.notifier, &config.app_name));
    let engine = Engine::start(&config, notifier);

    let mode = RunMode::from_flags(background, show_ui);
    let registry = engine.registry();
    let session = async move {
        match mode {
            RunMode::Headless => {
                println!("Running in background mode");
                tokio::signal::ctrl_c()
                    .await
                    .context("Failed to listen for Ctrl-C")
            }
            RunMode::Interactive => {
                tokio::select! {
                    result = run_console(registry) => result,
                    _ = tokio::signal::ctrl_c() => Ok(()),
                }
            }
        }
    };

    let stats = engine.run_until(session).await?;
    println!(
        "⏹️  Stopped after {} cycles, {} reminders delivered",
        stats.cycles, stats.fired
    );
    Ok(())
}
