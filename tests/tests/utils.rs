use reqwest::{Method, Request, Url};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use volley::workload::BoxError;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();
    ONCE_LOCK.get_or_init(|| {
        let _ = FmtSubscriber::builder()
            .with_max_level(Level::INFO)
            .try_init();
    });
}

/// Unit builder issuing GETs against one path of the mock service.
#[allow(unused)]
pub fn get_builder(
    addr: SocketAddr,
    path: &str,
) -> impl Fn() -> Result<Request, BoxError> + Send + Sync + 'static {
    let url: Url = format!("http://{addr}{path}").parse().unwrap();
    move || -> Result<Request, BoxError> { Ok(Request::new(Method::GET, url.clone())) }
}
