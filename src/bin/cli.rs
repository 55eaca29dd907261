//! job-scout command line
//!
//! Searches one job board with a real browser and prints the listings as
//! JSON. Auth progress goes to stderr; a visible window (`--headed`) lets
//! you sign in when a board asks for it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use job_scout::auth::FileSessionStore;
use job_scout::automation::PageAutomation;
use job_scout::browser::{
    AutomationConfig, BrowserSession, ConnectionOptions, LaunchOptions, PageDriver,
};
use job_scout::jobs::{JobBoard, JobSearch, SearchQuery, BOARDS};
use job_scout::llm::{LlmClient, OpenAiClient};

#[derive(Parser)]
#[command(name = "job-scout")]
#[command(version)]
#[command(about = "Search job boards with an LLM-driven browser", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search one board and print the listings as JSON
    Search(SearchArgs),
    /// List the built-in job boards
    Boards,
}

#[derive(Args)]
struct SearchArgs {
    /// Board to search (see `job-scout boards`)
    #[arg(long, short = 'b', env = "JOB_SCOUT_BOARD")]
    board: String,

    /// Search keywords, e.g. "rust developer"
    #[arg(long, short = 'k', env = "JOB_SCOUT_KEYWORDS")]
    keywords: String,

    /// Location filter
    #[arg(long, short = 'l', env = "JOB_SCOUT_LOCATION")]
    location: Option<String>,

    /// Show the browser window (needed to sign in by hand)
    #[arg(long, short = 'H', env = "JOB_SCOUT_HEADED")]
    headed: bool,

    /// Directory for saved login sessions
    #[arg(
        long,
        value_name = "DIR",
        env = "JOB_SCOUT_SESSION_DIR",
        default_value = ".job-scout/sessions"
    )]
    session_dir: PathBuf,

    /// Path to a custom Chrome/Chromium executable
    #[arg(long, value_name = "PATH", env = "CHROME_PATH")]
    executable_path: Option<PathBuf>,

    /// Persistent browser profile directory
    #[arg(long, value_name = "DIR")]
    user_data_dir: Option<PathBuf>,

    /// Attach to a running browser instead of launching one
    #[arg(long, value_name = "URL")]
    ws_endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Boards => {
            for board in BOARDS {
                println!("{:<10} {:<10} {}", board.name, board.display_name, board.url);
            }
            Ok(())
        }
        Command::Search(args) => search(args).await,
    }
}

fn open_browser(args: &SearchArgs) -> anyhow::Result<BrowserSession> {
    if let Some(ws) = &args.ws_endpoint {
        eprintln!("Connecting to browser at {}", ws);
        return Ok(BrowserSession::connect(ConnectionOptions::new(ws))?);
    }

    let mut options = LaunchOptions::new().headless(!args.headed);
    if let Some(path) = &args.executable_path {
        options = options.chrome_path(path);
    }
    if let Some(dir) = &args.user_data_dir {
        options = options.user_data_dir(dir);
    }
    eprintln!("Browser mode: {}", if options.headless { "headless" } else { "headed" });
    Ok(BrowserSession::launch(options)?)
}

async fn search(args: SearchArgs) -> anyhow::Result<()> {
    let board = JobBoard::find(&args.board).with_context(|| {
        format!(
            "Unknown board '{}' (known: {})",
            args.board,
            JobBoard::names().collect::<Vec<_>>().join(", ")
        )
    })?;
    let llm: Arc<dyn LlmClient> =
        Arc::new(OpenAiClient::from_env().context("LLM client setup failed")?);

    let browser = open_browser(&args)?;
    let page: Arc<dyn PageDriver> = Arc::new(browser.new_page()?);
    let automation = Arc::new(PageAutomation::new(page, llm, AutomationConfig::default()));

    let search = JobSearch::new(Arc::clone(&automation))
        .with_session_store(Arc::new(FileSessionStore::new(&args.session_dir)));
    let mut query = SearchQuery::new(args.keywords.clone());
    if let Some(location) = &args.location {
        query = query.location(location.clone());
    }

    let result = search
        .run(board, &query, |state| {
            eprintln!("[{}] {}", state.board_name, state.message);
            if let Some(details) = &state.details {
                eprintln!("    {}", details);
            }
        })
        .await;

    if let Err(e) = automation.cleanup().await {
        log::warn!("Cleanup failed: {}", e);
    }
    if let Some(recorder) = automation.snapshots().recorder() {
        recorder.flush_default().await?;
    }

    let listings = result?;
    println!("{}", serde_json::to_string_pretty(&listings)?);
    Ok(())
}
