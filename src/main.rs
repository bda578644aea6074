//! Stress engine entrypoint: NDJSON requests on stdin, one NDJSON reply per
//! request on stdout, logs on stderr. Stops on EOF or Ctrl+C.

use stress_engine::{
    config::EngineConfig, logging::StructuredLogger, model::load_optional, protocol::Bridge,
    session::SessionHub,
};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("STRESS_ENGINE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.json"));
    let config = EngineConfig::load(&config_path);

    StructuredLogger::init(config.log.json, &config.log.level);
    config.validate()?;

    info!(
        artifact_dir = %config.model.artifact_dir.display(),
        window = config.features.window_len,
        schema = ?config.features.schema,
        "stress engine starting"
    );

    let model = load_optional(&config.model, &config.features)?;
    let default_session = uuid::Uuid::new_v4().to_string();
    let hub = SessionHub::new(config, model).with_runtime(tokio::runtime::Handle::current());
    let mut bridge = Bridge::new(hub, default_session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let stdout = std::io::stdout();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        let reply = bridge.handle_line(&line).await;
        if let Err(e) = StructuredLogger::emit_json(&reply, &mut stdout.lock()) {
            warn!(error = %e, "stdout closed");
            break;
        }
    }

    bridge.shutdown().await;
    info!("stress engine stopping");
    Ok(())
}
