//! TCP ingestion listener.
//!
//! Producers connect over plain TCP and send newline-delimited JSON, one
//! reading per line. A trailing `\r` is stripped and blank lines are skipped.
//! Producers get no acknowledgement.

use crate::error::{Result, ServiceError};
use crate::pipeline::Pipeline;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// Longest accepted line; a longer one drops the connection
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Bind the listener and serve producers forever.
pub async fn start_ingest_listener(addr: &str, pipeline: Arc<Pipeline>) -> Result<()> {
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        ServiceError::network_error(format!("Failed to bind ingest listener to {}: {}", addr, e))
    })?;
    info!("TCP ingest listener on {}", addr);

    serve_ingest(listener, pipeline).await
}

/// Accept producer connections on an already bound listener.
///
/// Failed accepts and broken connections are logged; the loop only ends if
/// the task is dropped.
pub async fn serve_ingest(listener: TcpListener, pipeline: Arc<Pipeline>) -> Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                info!("TCP client connected: {}", peer);
                let pipeline = pipeline.clone();
                tokio::spawn(async move {
                    match handle_connection(stream, peer, pipeline).await {
                        Ok(()) => info!("Closing connection with TCP client {}", peer),
                        Err(e) => warn!("TCP client {} dropped: {}", peer, e),
                    }
                });
            }
            Err(e) => {
                warn!("Failed to accept TCP client: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    pipeline: Arc<Pipeline>,
) -> Result<()> {
    let mut reader = BufReader::new(stream);
    let mut frame = Vec::new();

    loop {
        frame.clear();
        let read = (&mut reader)
            .take(MAX_FRAME_BYTES as u64 + 1)
            .read_until(b'\n', &mut frame)
            .await?;
        if read == 0 {
            return Ok(());
        }
        if frame.len() > MAX_FRAME_BYTES && frame.last() != Some(&b'\n') {
            return Err(ServiceError::network_error(format!(
                "frame exceeds {} bytes",
                MAX_FRAME_BYTES
            )));
        }

        let payload = trim_frame(&frame);
        if payload.is_empty() {
            continue;
        }

        let outcome = pipeline.ingest(payload).await;
        debug!("Payload from {}: {:?}", peer, outcome);
    }
}

/// Strip the line terminator and surrounding whitespace.
fn trim_frame(frame: &[u8]) -> &[u8] {
    let start = frame
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(frame.len());
    let end = frame
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &frame[start..end]
}
