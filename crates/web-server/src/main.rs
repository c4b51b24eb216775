use std::path::Path;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// This main function is the entry point when running `cargo run -p web-server`.
// It reads `config.toml` from the working directory and serves the API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = configuration::load_config(Path::new("config.toml"))?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    web_server::run_server(&config).await
}
