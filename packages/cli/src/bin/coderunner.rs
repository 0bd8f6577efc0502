use clap::{Parser, Subcommand};
use colored::*;
use std::process;

mod cli;

use cli::run::RunArgs;
use cli::sandboxes::{ListArgs, ReapArgs};
use coderunner_sandbox::ExecutorSettings;

#[derive(Parser)]
#[command(name = "coderunner")]
#[command(about = "Run untrusted Python programs in isolated Docker sandboxes")]
#[command(version)]
struct Cli {
    /// Override the execution image (default from CODERUNNER_IMAGE)
    #[arg(long, global = true)]
    image: Option<String>,

    /// Log at debug level when RUST_LOG is unset
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a program in a fresh sandbox
    Run(RunArgs),
    /// Check that the container engine is reachable and the image is present
    Check,
    /// List sandboxes created by coderunner
    List(ListArgs),
    /// Remove sandboxes left behind by crashed processes
    Reap(ReapArgs),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    coderunner_cli::logging::init(cli.verbose);

    match handle_command(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            process::exit(1);
        }
    }
}

async fn handle_command(cli: Cli) -> anyhow::Result<i32> {
    let mut settings = ExecutorSettings::from_env()?;
    if let Some(image) = cli.image {
        settings.image = image;
    }

    match cli.command {
        Commands::Run(args) => cli::run::handle_run(args, settings).await,
        Commands::Check => cli::sandboxes::handle_check(&settings).await,
        Commands::List(args) => cli::sandboxes::handle_list(args, &settings).await,
        Commands::Reap(args) => cli::sandboxes::handle_reap(args, &settings).await,
    }
}
