use clap::Parser;
use snip_gateway::cli::CLI;
use snip_gateway::server::{build_shortener, run_server};
use snip_gateway::telemetry::init_tracing;
use snip_gateway::AppState;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_format)?;

    info!(
        listen_addr = %config.listen_addr,
        base_url = %config.base_url,
        storage_backend = %config.storage,
        code_length = config.code_length,
        "starting snip"
    );

    let shortener = build_shortener(&config).await?;
    let listener = TcpListener::bind(config.listen_addr).await?;

    run_server(listener, AppState::new(shortener, config.base_url)).await
}
