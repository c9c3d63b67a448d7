use anyhow::Result;
use clap::Parser;

use latchkey_bridge::config::BridgeConfig;
use latchkey_bridge::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let config = BridgeConfig::parse();
    let _guard = logging::init(&config.log_dir())?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        store = ?config.store,
        biometric = ?config.biometric,
        accounts = ?config.accounts,
        "latchkey bridge starting"
    );

    latchkey_bridge::run(config).await
}
