//! Run the suggest HTTP server.
//!
//! Usage:
//!     cargo run --bin serve -- --db palengke.sqlite --bind 127.0.0.1:3000
//!
//! Pass `--seed-demo` to populate an empty database with demo stalls first.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use palengke::database::Catalog;
use palengke::server;
use palengke::service::SuggestService;

#[derive(Debug, Parser)]
#[command(name = "serve", about = "Marketplace suggest server")]
struct Args {
    /// Path to the catalog database.
    #[arg(long, default_value = "palengke.sqlite")]
    db: PathBuf,

    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Seed demo stalls and items if the catalog is empty.
    #[arg(long)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "palengke=debug,info".into()),
        )
        .init();

    let args = Args::parse();

    let catalog = Arc::new(
        Catalog::open(&args.db)
            .with_context(|| format!("opening catalog at {}", args.db.display()))?,
    );

    if args.seed_demo && catalog.count_stalls()? == 0 {
        palengke::demo::seed(&catalog).context("seeding demo catalog")?;
        tracing::info!("seeded demo catalog");
    }

    tracing::info!(
        stalls = catalog.count_stalls()?,
        items = catalog.count_items()?,
        "catalog opened"
    );

    let service = Arc::new(SuggestService::new(catalog));
    let app = server::router(service);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    tracing::info!("listening on http://{}", args.bind);
    axum::serve(listener, app).await?;

    Ok(())
}
