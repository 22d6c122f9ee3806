use records_infrastructure::create_pool;
use records_shared::config::AppConfig;
use records_shared::telemetry::init_telemetry;
use records_worker::worker::Worker;
use records_worker::ProcessorSettings;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let _guard = init_telemetry("info,records_worker=debug")?;

    let config = AppConfig::load()?;
    info!(app = %config.app.name, env = %config.app.env, "Starting print job worker");

    let pool = create_pool(&config.database).await?;
    let worker = Worker::new(ProcessorSettings::from(&config.worker), pool.clone());

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                shutdown.cancel();
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    worker.run(cancel).await;

    pool.close().await;
    Ok(())
}
