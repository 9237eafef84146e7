//! HTTP live view.
//!
//! Routes:
//!
//! - `/` - auto-refreshing page with the latest map inlined as base64
//! - `/image.png` - the latest map
//! - `/state` - the latest snapshot as JSON
//!
//! The controller publishes into a `watch` slot (most recent wins). A render
//! task turns each new snapshot into a PNG off the control loop, and the
//! handlers only read what has already been rendered.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use base64::Engine;
use parking_lot::RwLock;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{render_png, LiveView, LiveViewError, TickSnapshot};

type SnapshotSlot = Option<Arc<TickSnapshot>>;

#[derive(Clone)]
struct ViewState {
    snapshot: watch::Receiver<SnapshotSlot>,
    image: Arc<RwLock<Option<Arc<Vec<u8>>>>>,
}

/// Live view served over HTTP.
pub struct LiveViewServer {
    tx: watch::Sender<SnapshotSlot>,
    addr: SocketAddr,
}

impl LiveViewServer {
    /// Bind the listener and spawn the render and serve tasks.
    pub async fn start(
        host: &str,
        port: u16,
        shutdown: CancellationToken,
    ) -> Result<Self, LiveViewError> {
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|source| LiveViewError::Bind {
                addr: format!("{host}:{port}"),
                source,
            })?;
        let addr = listener.local_addr().map_err(LiveViewError::LocalAddr)?;

        let (tx, rx) = watch::channel(None);
        let state = ViewState {
            snapshot: rx.clone(),
            image: Arc::new(RwLock::new(None)),
        };

        tokio::spawn(render_loop(rx, Arc::clone(&state.image), shutdown.clone()));

        let app = Router::new()
            .route("/", get(index))
            .route("/image.png", get(image_png))
            .route("/state", get(latest_state))
            .with_state(state);

        tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await;
            if let Err(e) = result {
                warn!(error = %e, "Live view server stopped with error");
            }
        });

        info!(%addr, "Live view available at http://{}/", addr);
        Ok(Self { tx, addr })
    }
}

impl LiveView for LiveViewServer {
    fn publish(&self, snapshot: TickSnapshot) {
        self.tx.send_replace(Some(Arc::new(snapshot)));
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        Some(self.addr)
    }
}

async fn render_loop(
    mut rx: watch::Receiver<SnapshotSlot>,
    image: Arc<RwLock<Option<Arc<Vec<u8>>>>>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let Some(snapshot) = rx.borrow_and_update().clone() else {
                    continue;
                };
                let tick = snapshot.tick;
                match tokio::task::spawn_blocking(move || render_png(&snapshot)).await {
                    Ok(Ok(png)) => {
                        *image.write() = Some(Arc::new(png));
                        debug!(tick, "Rendered live view");
                    }
                    Ok(Err(e)) => warn!(tick, error = %e, "Failed to render live view"),
                    Err(e) => warn!(tick, error = %e, "Live view render task failed"),
                }
            }
        }
    }
    debug!("Live view renderer stopped");
}

async fn index(State(state): State<ViewState>) -> Html<String> {
    let image = state.image.read().clone();
    match image {
        Some(png) => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(png.as_slice());
            Html(format!(
                "<!doctype html><html><head><meta http-equiv=\"refresh\" content=\"1\">\
                 <title>BirdsEye</title></head><body>\
                 <img src=\"data:image/png;base64,{encoded}\" alt=\"BirdsEye\"/>\
                 </body></html>"
            ))
        }
        None => Html(
            "<!doctype html><html><head><meta http-equiv=\"refresh\" content=\"1\">\
             <title>BirdsEye</title></head><body><p>Loading...</p></body></html>"
                .to_string(),
        ),
    }
}

async fn image_png(State(state): State<ViewState>) -> Response {
    let image = state.image.read().clone();
    match image {
        Some(png) => ([(header::CONTENT_TYPE, "image/png")], png.as_ref().clone()).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "no image rendered yet").into_response(),
    }
}

async fn latest_state(State(state): State<ViewState>) -> Response {
    let snapshot = state.snapshot.borrow().clone();
    match snapshot {
        Some(snapshot) => Json(snapshot.as_ref().clone()).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "no tick completed yet").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::{Belief, SensorPose};
    use crate::track::TrackState;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn snapshot(tick: u64) -> TickSnapshot {
        TickSnapshot {
            tick,
            utc_time: 1.0,
            state: TrackState::default(),
            sensor: SensorPose::default(),
            belief: Belief::default(),
            particles: vec![],
            other_platform: None,
            map_extent: 100.0,
        }
    }

    async fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8_lossy(&response).into_owned()
    }

    #[tokio::test]
    async fn test_serves_loading_page_then_image() {
        let shutdown = CancellationToken::new();
        let server = LiveViewServer::start("127.0.0.1", 0, shutdown.clone())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();

        let page = get(addr, "/").await;
        assert!(page.starts_with("HTTP/1.1 200"));
        assert!(page.contains("Loading..."));
        assert!(get(addr, "/state").await.starts_with("HTTP/1.1 503"));

        server.publish(snapshot(1));
        server.publish(snapshot(2));

        let mut page = String::new();
        for _ in 0..200 {
            page = get(addr, "/").await;
            if page.contains("data:image/png;base64,") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(page.contains("data:image/png;base64,"));

        let state = get(addr, "/state").await;
        assert!(state.contains("\"tick\":2"));
        assert!(get(addr, "/image.png").await.contains("image/png"));

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_publish_without_server_task_never_blocks() {
        let shutdown = CancellationToken::new();
        let server = LiveViewServer::start("127.0.0.1", 0, shutdown.clone())
            .await
            .unwrap();
        shutdown.cancel();
        for tick in 0..1000 {
            server.publish(snapshot(tick));
        }
    }
}
