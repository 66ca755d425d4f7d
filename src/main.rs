use dbsql_relay::config::{self, RelayConfig};
use dbsql_relay::RelayServer;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = RelayConfig::from_args();

    let missing = config.missing_required();
    if !missing.is_empty() {
        warn!(
            "Missing one or more env vars: {}; /query calls will fail until they are set",
            missing.join(", ")
        );
    }

    RelayServer::from_config(&config)
        .serve(config.listen_addr())
        .await
}
