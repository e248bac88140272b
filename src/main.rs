use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pluma::store::sql::{self, SqlPostStore, SqlUserStore};
use pluma::{AppState, Config, Server, TokenCodec, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = Config::parse();

    let pool = sql::connect(&cfg.database_url)
        .await
        .context("connecting to the database")?;

    let state = Arc::new(AppState {
        users: Arc::new(SqlUserStore::new(pool.clone())),
        posts: Arc::new(SqlPostStore::new(pool)),
        tokens: TokenCodec::new(&cfg.jwt_secret),
    });

    let app = routes(state, Duration::from_secs(cfg.handler_timeout_secs));

    Server::bind(&cfg.addr)
        .header_read_timeout(Duration::from_secs(cfg.header_read_timeout_secs))
        .max_header_bytes(cfg.max_header_bytes)
        .serve(app)
        .await
        .context("server error")?;

    Ok(())
}
