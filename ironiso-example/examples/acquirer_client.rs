//! Acquirer Client Example
//!
//! Connects to the issuer, sends an echo test, then fires a batch of
//! concurrent authorizations through one multiplexed connection.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use ironiso_core::{IsoMessage, Mti, StanSequence, TransmissionTime};
use ironiso_mux::{Mux, MuxConfig, MuxError, NoOpHandler};
use ironiso_transport::IsoChannel;

mod common;
use common::{ExampleConfig, init_logging};

const BATCH_SIZE: u64 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cfg = ExampleConfig::from_env();
    info!("Acquirer connecting to {}", cfg.addr());

    let channel = IsoChannel::connect(&cfg.addr(), cfg.packager()?, cfg.frame_codec()).await?;
    let mux_config = MuxConfig::new().with_default_timeout(Duration::from_secs(5));
    let mux = Arc::new(Mux::new(channel, mux_config, Arc::new(NoOpHandler)));
    let stans = Arc::new(StanSequence::new());

    let echo = IsoMessage::new(Mti::NETWORK_MANAGEMENT_REQUEST)
        .with(7, TransmissionTime::now().transmission_date_time())
        .with(11, stans.allocate().to_string())
        .with(41, cfg.terminal_id.as_str())
        .with(70, "301");
    match mux.request_default(&echo).await {
        Ok(resp) => info!("Echo OK: {}", resp.get_str(39).unwrap_or("--")),
        Err(e) => {
            error!("Echo failed: {}", e);
            return Ok(());
        }
    }

    let mut tasks = Vec::new();
    for i in 0..BATCH_SIZE {
        let mux = Arc::clone(&mux);
        let request = authorization(&cfg.terminal_id, &stans, 10_000 * (i + 1));
        tasks.push(tokio::spawn(async move {
            let result = mux.request_default(&request).await;
            (request, result)
        }));
    }

    for task in tasks {
        let (request, result) = task.await?;
        let stan = request.get_str(11).unwrap_or("------").to_string();
        match result {
            Ok(resp) => info!(
                "STAN {} amount {} -> {}",
                stan,
                request.get_str(4).unwrap_or("0"),
                resp.get_str(39).unwrap_or("--")
            ),
            Err(MuxError::RequestTimeout { .. }) => error!("STAN {} timed out", stan),
            Err(e) => error!("STAN {} failed: {}", stan, e),
        }
    }

    info!("Metrics: {:?}", mux.metrics());
    mux.shutdown().await;
    Ok(())
}

fn authorization(terminal_id: &str, stans: &StanSequence, amount: u64) -> IsoMessage {
    let now = TransmissionTime::now();
    IsoMessage::new(Mti::AUTHORIZATION_REQUEST)
        .with(2, "4111111111111111")
        .with(3, "000000")
        .with(4, format!("{amount:012}"))
        .with(7, now.transmission_date_time())
        .with(11, stans.allocate().to_string())
        .with(12, now.local_time())
        .with(13, now.local_date())
        .with(41, terminal_id)
        .with(49, "840")
}
