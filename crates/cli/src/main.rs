mod browser;
mod config_cmd;
mod context;
mod datasets_cmd;
mod login_cmd;
mod output;
mod query_cmd;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::context::AppContext;

#[derive(Parser)]
#[command(name = "opalview", about = "opalview - browse datasets and run OPAL queries")]
struct Cli {
    /// Use this config file instead of the one in the user config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in, approving in the browser if the stored token is missing or stale
    Login(login_cmd::LoginArgs),

    /// Forget the stored token
    Logout,

    /// Show the stored credentials and check the token
    Status,

    /// List datasets visible to the logged-in user
    Datasets {
        /// Only show datasets whose name or id contains this text
        #[arg(long, short)]
        filter: Option<String>,
    },

    /// Run an OPAL pipeline over one dataset
    Query(query_cmd::QueryArgs),

    /// Show or set configuration
    Config(config_cmd::ConfigArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = AppContext::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Login(args) => login_cmd::run_login(&ctx, args).await,
        Commands::Logout => login_cmd::run_logout(&ctx),
        Commands::Status => login_cmd::run_status(&ctx).await,
        Commands::Datasets { filter } => datasets_cmd::run_datasets(&ctx, filter.as_deref()).await,
        Commands::Query(args) => query_cmd::run_query(&ctx, args).await,
        Commands::Config(args) => config_cmd::run_config(&ctx, args),
    }
}
