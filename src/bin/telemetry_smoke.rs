use anyhow::Result;
use tracing::info;

use bonding_router::telemetry;


#[tokio::main]
async fn main() -> Result<()> {
    let handle = telemetry::init("bonding-router")?;
    let span = telemetry::make_info_span("telemetry_smoke", 0, "smoke");
    let _e = span.enter();
    info!("emitindo métrica e finalizando…");
    telemetry::bump_test_metric();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    handle.shutdown();
    Ok(())
}
