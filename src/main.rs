use clap::Parser;
use peerreview::{
    config::{Config, create_app},
    state::run_migrations,
};
use tokio::{net::TcpListener, task::spawn_blocking};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    tracing::info!(database_url = %config.database_url, "opening database");

    let pool = config.make_pool()?;

    {
        let pool = pool.clone();
        spawn_blocking(move || {
            let mut conn = pool.get()?;
            run_migrations(&mut conn)
        })
        .await??;
    }

    let listener = TcpListener::bind(&config.bind).await?;
    tracing::info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, create_app(pool)).await?;

    Ok(())
}
