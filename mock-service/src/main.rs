use mock_service::ServiceState;
use std::net::SocketAddr;
use std::time::Duration;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let state = ServiceState::default();
    tokio::task::spawn(hits_measure_task(state.clone()));

    let addr: SocketAddr = "0.0.0.0:3002".parse().unwrap();
    mock_service::run(addr, state).await;
}

async fn hits_measure_task(state: ServiceState) {
    let mut last = 0;
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let hits = state.hits();
        println!("{} req/sec", hits - last);
        last = hits;
    }
}
