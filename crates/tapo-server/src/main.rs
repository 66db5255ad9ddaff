use clap::Parser;
use tapo_config::{ConfigLoader, DEFAULT_CONFIG_PATH};
use tapo_core::ErrorKind;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match ConfigLoader::new(&args.config).load() {
        Ok(config) => config,
        Err(e) => {
            tapo_server::init_tracing("info");
            tracing::error!(
                config = %args.config,
                kind = %ErrorKind::InvalidConfiguration,
                error = %e,
                "Failed to load configuration"
            );
            return Err(e.into());
        }
    };

    tapo_server::init_tracing(&config.log_level);
    tracing::info!(config = %args.config, "Starting Tapo exporter");

    tapo_server::run(config).await
}
