//! Listen: UDP datagram receipt and handoff to the ingest queue.

use std::future::Future;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

use crate::ingest::{IngestMetrics, QueueSender, TransportErrorKind};

/// Turn one datagram payload into the text handed to the core:
/// UTF-8 only, trailing whitespace removed, never empty.
pub fn payload_text(payload: &[u8]) -> Result<&str, TransportErrorKind> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| TransportErrorKind::NonUtf8)?
        .trim_end();
    if text.is_empty() {
        return Err(TransportErrorKind::Empty);
    }
    Ok(text)
}

/// Receive datagrams until `shutdown` resolves or the queue closes.
/// Consumes the sender so the writer sees end-of-input when this returns.
pub async fn listen<F>(
    socket: UdpSocket,
    queue: QueueSender,
    metrics: Arc<IngestMetrics>,
    max_datagram_bytes: usize,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    let mut buf = BytesMut::zeroed(max_datagram_bytes);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Listener received shutdown");
                break;
            }
            received = socket.recv_from(&mut buf[..]) => {
                let (len, peer) = match received {
                    Ok(r) => r,
                    Err(e) => {
                        metrics.record_transport_error(TransportErrorKind::Receive);
                        warn!("UDP receive failed: {}", e);
                        continue;
                    }
                };
                metrics.record_datagram();

                let text = match payload_text(&buf[..len]) {
                    Ok(text) => text,
                    Err(kind) => {
                        metrics.record_transport_error(kind);
                        debug!("Discarding datagram from {}: {:?}", peer, kind);
                        continue;
                    }
                };

                if queue.submit(text.to_string()).await.is_err() {
                    error!("Store writer has stopped, no longer accepting datagrams");
                    break;
                }
            }
        }
    }
}
