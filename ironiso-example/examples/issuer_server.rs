//! Issuer Server Example
//!
//! Answers authorization and financial requests, declining amounts above a
//! fixed limit, and echoes network management requests. Each request is
//! answered after a random short delay, so responses leave out of order.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use ironiso_core::{IsoMessage, TransmissionTime};
use ironiso_packager::Packager;
use ironiso_transport::{ChannelWriter, IsoChannel};

mod common;
use common::{ExampleConfig, init_logging};

/// Amounts above this (minor units) are declined with response code 51.
const APPROVAL_LIMIT: u64 = 50_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cfg = ExampleConfig::from_env();
    let packager = cfg.packager()?;
    info!("Starting issuer on {} ({} dialect)", cfg.addr(), cfg.dialect);

    let listener = TcpListener::bind(&cfg.addr()).await?;
    loop {
        let (socket, addr) = listener.accept().await?;
        info!("Connection from {}", addr);
        let packager = Arc::clone(&packager);
        let cfg = cfg.clone();
        tokio::spawn(async move {
            if let Err(e) = handle(socket, packager, cfg).await {
                error!("Error: {}", e);
            }
        });
    }
}

async fn handle(
    socket: TcpStream,
    packager: Arc<Packager>,
    cfg: ExampleConfig,
) -> anyhow::Result<()> {
    socket.set_nodelay(true)?;
    let channel = IsoChannel::new(socket, packager, cfg.frame_codec());
    let (mut reader, writer) = channel.split();
    let writer = Arc::new(Mutex::new(writer));

    loop {
        let request = match reader.receive().await {
            Ok(Some(msg)) => msg,
            Ok(None) => break,
            Err(e) if !e.is_fatal() => {
                warn!("Skipping bad message: {}", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        info!("Received: {}", request.protected());

        let Some(response) = respond(request) else {
            continue;
        };
        let writer = Arc::clone(&writer);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(jitter_ms(&response))).await;
            if let Err(e) = send(&writer, &response).await {
                error!("Send failed: {}", e);
            }
        });
    }
    info!("Connection closed");
    Ok(())
}

async fn send(writer: &Mutex<ChannelWriter>, msg: &IsoMessage) -> anyhow::Result<()> {
    writer.lock().await.send(msg).await?;
    info!("Sent: {}", msg.protected());
    Ok(())
}

fn respond(request: IsoMessage) -> Option<IsoMessage> {
    let class = request.mti().class();
    if !request.mti().is_request() {
        warn!("Unhandled: {}", request.mti());
        return None;
    }
    let code = match class {
        1 | 2 => {
            let amount: u64 = request.get_str(4).and_then(|a| a.parse().ok()).unwrap_or(0);
            if amount > APPROVAL_LIMIT { "51" } else { "00" }
        }
        8 => "00",
        _ => {
            warn!("Unhandled: {}", request.mti());
            return None;
        }
    };

    let mut response = request;
    response.set_response_mti();
    response.unset(2);
    response.unset(35);
    response.unset(52);
    response.set(7, TransmissionTime::now().transmission_date_time());
    response.set(39, code);
    Some(response)
}

/// Spreads responses over 0..50 ms, derived from the STAN.
fn jitter_ms(msg: &IsoMessage) -> u64 {
    msg.get_str(11)
        .and_then(|stan| stan.parse::<u64>().ok())
        .map_or(0, |stan| (stan * 37) % 50)
}
