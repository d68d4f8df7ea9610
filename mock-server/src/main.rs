use mock_server::Credentials;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port = env_or("PORT", "3000");
    let addr = format!("127.0.0.1:{port}");
    let credentials = Credentials::new(
        &env_or("MOCK_KEY", "demo-key"),
        &env_or("MOCK_PREFIX", "demo"),
        &env_or("MOCK_SECRET", "demo-secret"),
    );

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, key = %credentials.key, "mock API listening on /api");
    mock_server::run(listener, credentials).await
}
