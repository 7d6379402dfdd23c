//! FeedRules CLI - manage and run feed reader automation rules

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{apply, evaluate, import, process, rules};

/// FeedRules - automation rules for your feed reader
#[derive(Parser)]
#[command(name = "fr", version, about, long_about = None)]
struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage rules
    Rules {
        #[command(subcommand)]
        command: rules::RulesCommands,
    },

    /// Show which rules match an article
    Evaluate {
        /// Article ID
        article_id: i64,
        /// Also apply the actions of every matched rule
        #[arg(long)]
        apply: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply one rule's action to an article if it matches
    Apply {
        /// Rule ID
        rule_id: i64,
        /// Article ID
        article_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run every enabled rule over stored articles
    Process {
        /// Include articles already marked as read
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load feeds and articles from a JSON document
    Import {
        /// Path to JSON file (reads stdin if omitted)
        file: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Rules { command } => rules::run(command).await,
        Commands::Evaluate { article_id, apply, json } => {
            evaluate::run(article_id, apply, json).await
        }
        Commands::Apply { rule_id, article_id, json } => apply::run(rule_id, article_id, json).await,
        Commands::Process { all, json } => process::run(all, json).await,
        Commands::Import { file, json } => import::run(file.as_deref(), json),
    }
}
