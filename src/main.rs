use env_logger::Builder;
use flexo_jobs::config::AppConfig;
use log::LevelFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("sqlx", LevelFilter::Warn)
        .parse_default_env()
        .init();

    let config = AppConfig::load()?;
    log::info!(
        "Configuration loaded: server={}, backend={:?}",
        config.server_address(),
        config.database.backend
    );

    flexo_jobs::run_server(&config).await
}
