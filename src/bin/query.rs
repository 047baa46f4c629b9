use anyhow::Result;
use clap::{Parser, Subcommand};
use token_insight::config::SnapshotConfig;
use token_insight::query::commands::cmd_token_details;
use token_insight::query::formatters::OutputFormat;
use token_insight::repository::{QueryService, SnapshotSource};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "query")]
#[command(about = "Query token data from the read-only snapshot database", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "table")]
    format: String,

    /// Snapshot URL or local path, overrides SNAPSHOT_URL
    #[arg(long)]
    snapshot: Option<String>,

    /// Download the snapshot again even if a cached copy exists
    #[arg(long, default_value = "false")]
    refresh: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Token row, balances, pairs and liquidity providers for a token name
    Details { name: String },
    /// Make sure the snapshot is available locally and print its path
    Fetch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("warn"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from(cli.format.as_str());

    let mut config = SnapshotConfig::from_env()?;
    if let Some(snapshot) = cli.snapshot {
        config.source = snapshot;
    }

    let source = SnapshotSource::from_config(&config);
    let service = QueryService::new(source).with_refresh(cli.refresh);

    match cli.command {
        Commands::Details { name } => {
            cmd_token_details(&service, &name, &format).await?;
        }
        Commands::Fetch => {
            let path = service.resolve().await?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
