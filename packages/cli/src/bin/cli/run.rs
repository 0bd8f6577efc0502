// ABOUTME: `coderunner run` executes one program in a fresh sandbox
// ABOUTME: Reads the source from a file or stdin and prints the result as text or JSON

use anyhow::{Context, Result};
use clap::Args;
use coderunner_cli::report;
use coderunner_sandbox::{
    ExecutorSettings, RuntimeGateway, SandboxExecutor, DEFAULT_TIMEOUT_SECS, MAX_TIMEOUT_SECS,
    MIN_TIMEOUT_SECS,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args)]
pub struct RunArgs {
    /// Python source file; the program is read from stdin when omitted or `-`
    pub file: Option<PathBuf>,

    /// Text fed to the program's standard input
    #[arg(long, conflicts_with = "input_file")]
    pub input: Option<String>,

    /// File whose contents are fed to the program's standard input
    #[arg(long, value_name = "PATH")]
    pub input_file: Option<PathBuf>,

    /// Wall-clock limit in seconds
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS)
    )]
    pub timeout: u64,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn handle_run(args: RunArgs, settings: ExecutorSettings) -> Result<i32> {
    let code = read_source(args.file.as_deref())?;
    let stdin = match (&args.input, &args.input_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display()))?,
        (None, None) => String::new(),
    };

    let gateway = RuntimeGateway::connect(settings.image.clone()).await?;
    let executor = SandboxExecutor::new(Arc::new(gateway), settings);

    let result = executor.run(&code, &stdin, args.timeout).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", result.output);
        if !result.error.is_empty() {
            eprint!("{}", result.error);
            if !result.error.ends_with('\n') {
                eprintln!();
            }
        }
        eprintln!("{}", report::summary_line(&result));
    }

    Ok(report::exit_code(&result))
}

fn read_source(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read source file {}", path.display())),
        _ => {
            let mut code = String::new();
            std::io::stdin()
                .read_to_string(&mut code)
                .context("Failed to read program from stdin")?;
            Ok(code)
        }
    }
}
