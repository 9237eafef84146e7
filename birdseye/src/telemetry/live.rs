//! Live telemetry receiver - UDP listener for sensor platform records.
//!
//! Each datagram carries one JSON telemetry record. The receiver stamps it
//! with the arrival time and fuses it into the [`SharedTrackState`]
//! immediately, so records arriving faster than the tick rate are merged
//! eagerly rather than queued.

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{SourceMode, TelemetrySource};
use crate::time::unix_now;
use crate::track::{SharedTrackState, TelemetryRecord};

/// Maximum datagram size we expect.
const MAX_PACKET_SIZE: usize = 4096;

/// Error type for the telemetry receiver.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to bind the UDP socket.
    #[error("Failed to bind UDP socket on {host}:{port}: {source}")]
    SocketBindError {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

/// Counters reported when the receiver stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub packets_received: u64,
    pub records_merged: u64,
}

/// UDP receiver that fuses records into the shared track state.
pub struct LiveTelemetryReceiver {
    socket: UdpSocket,
    fusion: SharedTrackState,
    shutdown: CancellationToken,
}

impl LiveTelemetryReceiver {
    /// Bind the listener socket.
    pub async fn bind(
        host: &str,
        port: u16,
        fusion: SharedTrackState,
        shutdown: CancellationToken,
    ) -> Result<Self, TelemetryError> {
        let socket = UdpSocket::bind((host, port))
            .await
            .map_err(|e| TelemetryError::SocketBindError {
                host: host.to_string(),
                port,
                source: e,
            })?;

        Ok(Self {
            socket,
            fusion,
            shutdown,
        })
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Spawn the receive loop and return a [`LiveSource`] tracking it.
    pub fn start(self) -> LiveSource {
        let shutdown = self.shutdown.clone();
        let handle = tokio::spawn(self.run());
        LiveSource { handle, shutdown }
    }

    async fn run(self) -> ReceiverStats {
        info!(local_addr = ?self.socket.local_addr().ok(), "Telemetry receiver started");

        let mut buffer = [0u8; MAX_PACKET_SIZE];
        let mut stats = ReceiverStats::default();

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("Telemetry receiver shutting down");
                    break;
                }
                result = self.socket.recv_from(&mut buffer) => match result {
                    Ok((len, peer)) => {
                        stats.packets_received += 1;
                        if self.handle_packet(&buffer[..len], peer, &stats) {
                            stats.records_merged += 1;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "UDP receive error");
                        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    }
                },
            }
        }

        info!(
            packets_received = stats.packets_received,
            records_merged = stats.records_merged,
            "Telemetry receiver stopped"
        );
        stats
    }

    fn handle_packet(&self, data: &[u8], peer: SocketAddr, stats: &ReceiverStats) -> bool {
        let record = match TelemetryRecord::from_json_slice(data) {
            Ok(record) => record.with_received_at(unix_now()),
            Err(e) => {
                let preview = String::from_utf8_lossy(&data[..data.len().min(50)]);
                warn!(%peer, error = %e, preview = %preview, "Dropping malformed telemetry record");
                return false;
            }
        };

        let state = self.fusion.merge(record);
        if stats.records_merged == 0 {
            info!(
                %peer,
                position = ?state.position,
                heading = ?state.heading,
                "Received first telemetry record"
            );
        }
        true
    }
}

/// Push-based telemetry source backed by a running [`LiveTelemetryReceiver`].
#[derive(Debug)]
pub struct LiveSource {
    handle: JoinHandle<ReceiverStats>,
    shutdown: CancellationToken,
}

impl LiveSource {
    /// Stop the receiver and wait for its final counters.
    pub async fn stop(self) -> ReceiverStats {
        self.shutdown.cancel();
        self.handle.await.unwrap_or_default()
    }
}

impl TelemetrySource for LiveSource {
    fn next(&mut self) -> Option<TelemetryRecord> {
        None
    }

    fn has_more(&self) -> bool {
        !self.shutdown.is_cancelled() && !self.handle.is_finished()
    }

    fn mode(&self) -> SourceMode {
        SourceMode::Live
    }
}
