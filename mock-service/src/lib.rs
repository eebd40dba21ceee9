//! Stub HTTP endpoint for exercising the benchmarker in tests.
use axum::{extract::Path, extract::State, http::StatusCode, routing::get, Router};
use rand::Rng;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Shared per-instance counters, cloneable into handlers and tests.
#[derive(Clone, Default)]
pub struct ServiceState {
    hits: Arc<AtomicU64>,
}

impl ServiceState {
    /// Total requests served, warmups included.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
    }
}

pub fn router(state: ServiceState) -> Router {
    Router::new()
        .route("/ok", get(ok))
        .route("/delay/ms/:delay_ms", get(delay))
        .route("/status/:code", get(status))
        .route("/flaky/:fail_percent", get(flaky))
        .with_state(state)
}

pub async fn run(addr: SocketAddr, state: ServiceState) {
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, router(state)).await.unwrap();
}

/// Binds an ephemeral port and serves in the background. Returns the bound
/// address and the instance counters.
pub async fn spawn() -> (SocketAddr, ServiceState) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = ServiceState::default();
    let served = state.clone();
    tokio::spawn(async move {
        axum::serve(listener, router(served)).await.unwrap();
    });
    (addr, state)
}

async fn ok(State(state): State<ServiceState>) -> &'static str {
    state.hits.fetch_add(1, Ordering::Relaxed);
    "ok"
}

async fn delay(State(state): State<ServiceState>, Path(delay_ms): Path<u64>) -> &'static str {
    state.hits.fetch_add(1, Ordering::Relaxed);
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    "ok"
}

async fn status(State(state): State<ServiceState>, Path(code): Path<u16>) -> StatusCode {
    state.hits.fetch_add(1, Ordering::Relaxed);
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn flaky(
    State(state): State<ServiceState>,
    Path(fail_percent): Path<u8>,
) -> Result<&'static str, StatusCode> {
    state.hits.fetch_add(1, Ordering::Relaxed);
    if rand::thread_rng().gen_range(0..100) < fail_percent {
        debug!("MOCK SERVER ___ ERR");
        Err(StatusCode::INTERNAL_SERVER_ERROR)
    } else {
        debug!("MOCK SERVER ___ OK");
        Ok("ok")
    }
}
