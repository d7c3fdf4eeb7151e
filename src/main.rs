use acme_dns_rust::{api, config};
use anyhow::{Context, Result};
use clap::Parser;
use log::info;

#[derive(Parser, Debug)]
#[command(name = "acme-dns-rust")]
#[command(about = "HTTP relay publishing ACME challenge tokens through acme-dns")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration first (before logger init)
    let config = config::Config::load(&args.config)?;

    // Initialize logger with config log level (env var takes precedence)
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&config.server.log_level)
    ).init();

    info!("Loading configuration from: {}", args.config);
    info!(
        "Loaded {} provider(s): {:?}",
        config.providers.len(),
        config.providers.iter().map(|p| &p.name).collect::<Vec<_>>()
    );

    let client = reqwest::Client::builder()
        .timeout(config.server.request_timeout())
        .build()
        .context("Failed to build HTTP client")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = api::create_router(config, client);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Records endpoint: GET|POST|PUT|DELETE /zones/{{provider}}/{{zone}}/records");

    axum::serve(listener, app).await?;

    Ok(())
}
