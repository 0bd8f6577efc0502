// ABOUTME: Engine readiness and sandbox housekeeping commands (check, list, reap)
// ABOUTME: Operates only on containers carrying the coderunner management label

use anyhow::Result;
use clap::Args;
use coderunner_cli::report::{self, EXIT_ERROR, EXIT_SUCCESS};
use coderunner_sandbox::settings::minutes;
use coderunner_sandbox::{
    start_reaper_task, ExecutorSettings, RuntimeGateway, MAX_REAP_MAX_AGE_MINUTES,
};
use colored::*;
use std::sync::Arc;

#[derive(Args)]
pub struct ListArgs {
    /// Only show the sandbox of this job
    #[arg(long)]
    pub job: Option<String>,

    /// Print the listing as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ReapArgs {
    /// Remove sandboxes older than this (default from CODERUNNER_REAP_MAX_AGE_MINUTES)
    #[arg(
        long,
        value_parser = clap::value_parser!(u64).range(1..=MAX_REAP_MAX_AGE_MINUTES)
    )]
    pub max_age_minutes: Option<u64>,

    /// Keep sweeping on the configured interval until interrupted
    #[arg(long)]
    pub watch: bool,
}

pub async fn handle_check(settings: &ExecutorSettings) -> Result<i32> {
    match RuntimeGateway::connect(settings.image.clone()).await {
        Ok(_) => {
            println!(
                "{} Container engine reachable, image '{}' present",
                "✓".green().bold(),
                settings.image
            );
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            println!("{} Not ready: {}", "✗".red().bold(), e);
            Ok(EXIT_ERROR)
        }
    }
}

pub async fn handle_list(args: ListArgs, settings: &ExecutorSettings) -> Result<i32> {
    let gateway = RuntimeGateway::connect(settings.image.clone()).await?;
    let sandboxes = gateway.list_sandboxes(args.job.as_deref()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sandboxes)?);
    } else if sandboxes.is_empty() {
        println!("{}", "No coderunner sandboxes found".yellow());
    } else {
        println!("{}", report::sandbox_table(&sandboxes));
    }

    Ok(EXIT_SUCCESS)
}

pub async fn handle_reap(args: ReapArgs, settings: &ExecutorSettings) -> Result<i32> {
    let gateway = Arc::new(RuntimeGateway::connect(settings.image.clone()).await?);
    let max_age = args
        .max_age_minutes
        .map(minutes)
        .unwrap_or_else(|| settings.reap_max_age());

    if args.watch {
        let task = start_reaper_task(gateway, settings.reap_interval(), max_age);
        tokio::signal::ctrl_c().await?;
        task.abort();
        println!("Stopped reaper");
        return Ok(EXIT_SUCCESS);
    }

    let removed = gateway.reap_stale_sandboxes(max_age).await?;
    if removed.is_empty() {
        println!("No stale sandboxes older than {:?}", max_age);
    } else {
        println!(
            "{} Removed {} stale sandboxes",
            "✓".green().bold(),
            removed.len()
        );
        for id in removed {
            println!("  {}", id);
        }
    }

    Ok(EXIT_SUCCESS)
}
