use clap::Parser;
use price_relay::cli::{Cli, Commands};
use price_relay::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Local development: pick up a .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load_or_default(&cli.config)?;
    config.apply_env()?;

    // Initialize telemetry
    price_relay::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            if let Err(e) = config.validate() {
                tracing::error!(error = %e, "FATAL: refusing to start");
                return Err(e.into());
            }
            tracing::info!("Starting price relay");
            args.execute(&config).await?;
        }
        Commands::Status(args) => {
            args.execute().await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Feed: {} ({}) {}",
                config.feed.base_url,
                config.feed.endpoint.path(),
                config.feed.symbols.join(",")
            );
            println!(
                "  Reconnect: {:?} every {}s",
                config.feed.reconnect.mode, config.feed.reconnect_delay_secs
            );
            println!("  HTTP port: {}", config.http.port);
            println!(
                "  Telemetry: level={} format={:?} metrics_port={:?}",
                config.telemetry.log_level,
                config.telemetry.log_format,
                config.telemetry.metrics_port
            );
            println!("  Secrets: {:?}", config.secrets);
        }
    }

    Ok(())
}
