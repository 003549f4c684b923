use std::sync::Arc;

use raidbot_core::config::Config;
use tracing::error;

#[tokio::main]
async fn main() -> Result<(), raidbot_core::Error> {
    raidbot_core::logging::init("raidbot")?;

    let cfg = match Config::load() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return Err(e);
        }
    };

    raidbot_telegram::router::run_polling(cfg)
        .await
        .map_err(|e| raidbot_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
