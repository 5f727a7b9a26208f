use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pagereport::links::{LinkDescriptor, load_links};
use pagereport::run::{self, RunContext, RunServices};
use pagereport::selection::{ScoringEngine, SelectionPolicy};
use pagereport::{config, logging};

#[derive(Parser)]
#[command(
    name = "pagereport",
    about = "Select meeting materials and summarize the chosen documents"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score and select candidates only.
    Select(RunArgs),
    /// Select, resolve summary/full pairs, and process the winners.
    Run {
        #[command(flatten)]
        args: RunArgs,
        /// Override the configured worker count.
        #[arg(long)]
        max_workers: Option<usize>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Link list as a JSON array or `text<TAB>url` lines.
    #[arg(long)]
    links_file: PathBuf,
    /// Minutes text used for the mention bonus.
    #[arg(long)]
    minutes_file: Option<PathBuf>,
    /// Run identifier; generated when omitted.
    #[arg(long)]
    run_id: Option<String>,
}

impl Command {
    fn args(&self) -> &RunArgs {
        match self {
            Command::Select(args) | Command::Run { args, .. } => args,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    let config = config::init_config().context("failed to load configuration")?;
    let args = cli.command.args();
    let context = RunContext::new(&config.tmp_root, args.run_id.clone())?;
    logging::init_tracing(context.run_dir());
    tracing::info!(run_id = %context.run_id(), run_dir = %context.run_dir().display(), "Starting run");

    let (links, minutes) = load_inputs(args).await?;
    let engine = ScoringEngine::default();
    let policy = SelectionPolicy::new(engine.table().clone());

    match &cli.command {
        Command::Select(_) => {
            let outcome = run::select(&context, &engine, &policy, &links, &minutes).await?;
            println!("{}", context.run_dir().display());
            tracing::info!(selected = ?outcome.selected_ids(), "Selection finished");
        }
        Command::Run { max_workers, .. } => {
            let mut services = RunServices::from_config(config, &context)
                .context("failed to initialise collaborators")?;
            if let Some(workers) = max_workers {
                services.settings.max_workers = (*workers).max(1);
            }
            let report = run::execute(&context, &engine, &policy, &services, &links, &minutes)
                .await
                .with_context(|| format!("run {} failed", context.run_id()))?;
            println!(
                "{}",
                context.run_dir().join(run::PIPELINE_REPORT_FILE).display()
            );
            tracing::info!(
                documents = report.final_selected_document_ids.len(),
                failed = report.metrics.documents_failed,
                "Run finished"
            );
        }
    }
    Ok(())
}

async fn load_inputs(args: &RunArgs) -> Result<(Vec<LinkDescriptor>, String)> {
    let path: &Path = &args.links_file;
    let links = load_links(Some(path), Some(path))
        .await
        .with_context(|| format!("failed to load links from {}", path.display()))?;
    let minutes = match &args.minutes_file {
        Some(file) => tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("failed to read minutes from {}", file.display()))?,
        None => String::new(),
    };
    Ok((links, minutes))
}
