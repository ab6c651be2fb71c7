use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use formpilot_cli::cli::{
    cmd_fill, cmd_history, cmd_search, cmd_status, cmd_test_llm, FillArgs, HistoryArgs, SearchArgs,
};
use formpilot_cli::config::Settings;
use formpilot_cli::context::AppContext;

#[derive(Parser, Debug)]
#[command(name = "formpilot")]
#[command(about = "Job application filler with RAG-grounded answers")]
#[command(version)]
struct Cli {
    /// Path to the settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check system status
    Status,
    /// Test the Gemini connection
    TestLlm,
    /// Search the knowledge base
    Search(SearchArgs),
    /// View answer history
    History(HistoryArgs),
    /// Fill a job application form
    Fill(FillArgs),
}

fn print_banner() {
    println!(
        r#"
+------------------------------------------------------+
|        Formpilot - Intelligent Form Automation       |
|     Retrieval-grounded job application filling       |
+------------------------------------------------------+
"#
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    print_banner();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let ctx = AppContext::new(settings)?;

    match cli.command {
        Command::Status => cmd_status(&ctx).await,
        Command::TestLlm => cmd_test_llm(&ctx).await,
        Command::Search(args) => cmd_search(&ctx, args).await,
        Command::History(args) => cmd_history(&ctx, args).await,
        Command::Fill(args) => cmd_fill(&ctx, args).await,
    }
}
