use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use sflow_rt_mock::Fixture;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Optional JSON file replacing the built-in fixture.
    let fixture = match std::env::var("SFLOW_RT_MOCK_FIXTURE") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)?;
            tracing::info!(%path, "loaded fixture");
            serde_json::from_str::<Fixture>(&raw)?
        }
        Err(_) => Fixture::default(),
    };

    let port = std::env::var("PORT").unwrap_or_else(|_| "8008".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, agents = fixture.agents.len(), "mock sFlow-RT listening");
    sflow_rt_mock::run_with(listener, fixture).await?;
    Ok(())
}
