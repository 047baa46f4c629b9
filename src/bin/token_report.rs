use anyhow::Result;
use clap::Parser;
use token_insight::aggregator::TokenAggregator;
use token_insight::chain::RpcChain;
use token_insight::config::RpcConfig;
use token_insight::network::Network;
use token_insight::nicknames::NicknameBook;
use token_insight::query::commands::{cmd_token_report, cmd_token_report_strict};
use token_insight::query::formatters::OutputFormat;
use token_insight::rpc::RpcClient;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "token-report")]
#[command(about = "Aggregate holders, reserves and value links of a token", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "table")]
    format: String,

    /// Fail with the underlying error instead of printing an empty result
    #[arg(long, default_value = "false")]
    strict: bool,

    /// Token contract address
    token: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from(cli.format.as_str());

    let config = RpcConfig::from_env()?;
    info!(
        "RPC URLs: {} endpoint(s) configured",
        config.json_rpc_urls.len()
    );

    let client = RpcClient::new(&config)?;
    let network = match config.network {
        Some(network) => network,
        None => Network::from_chain_id(client.get_chain_id().await?)?,
    };
    info!("Using network {} (chain id {})", network, network.chain_id());

    let nicknames = match &config.nicknames_path {
        Some(path) => NicknameBook::from_path(path)?,
        None => NicknameBook::empty(),
    };

    let chain = RpcChain::new(client, config.log_batch_size);
    let aggregator = TokenAggregator::new(chain, network.constants(), nicknames);

    let result = if cli.strict {
        cmd_token_report_strict(&aggregator, &cli.token, &format).await
    } else {
        cmd_token_report(&aggregator, &cli.token, &format).await
    };

    if let Err(e) = result {
        error!("Token report failed: {:#}", e);
        return Err(e);
    }

    Ok(())
}
