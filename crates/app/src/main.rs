use engine::{Engine, MemoryLedger, TracingEvents};
use std::sync::Arc;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "groupledger={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let engine = Engine::builder()
        .store(MemoryLedger::new())
        .events(Arc::new(TracingEvents))
        .build()?;

    let bind = settings
        .server
        .bind
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, settings.server.port);
    tracing::info!("starting ledger server on {addr}");
    server::run(engine, &addr).await;

    Ok(())
}
