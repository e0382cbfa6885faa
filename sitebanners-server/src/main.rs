//! SiteBanners admin server and demo runner.
//!
//! Usage:
//!   sitebanners serve --port 8080 --data banners.json --seed
//!   sitebanners demo --test cache
//!
//! The store is in memory; with `--data` it is loaded from and flushed back
//! to a JSON snapshot on shutdown.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sitebanners_repository::{BannerRepository, DEFAULT_CONFIG_FILE, RepositoryConfig};
use sitebanners_server::build_router;
use sitebanners_server::demo::{self, DemoTest};
use sitebanners_store::MemoryStore;
use sitebanners_types::{Clock, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "sitebanners")]
#[command(about = "SiteBanners repository server and interceptor demos")]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the repository config file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the admin HTTP API
    Serve(ServeArgs),
    /// Walk through the cache, latency and delete-guard interceptors
    Demo(DemoArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// HTTP port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// JSON snapshot to load on start and write on shutdown
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Insert the sample banners when the store starts empty
    #[arg(long)]
    seed: bool,
}

#[derive(Args, Debug)]
struct DemoArgs {
    /// Which walkthrough to run
    #[arg(short, long, value_enum, default_value = "all")]
    test: DemoTest,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let config = RepositoryConfig::load_from(&cli.config);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    match cli.command {
        Command::Serve(args) => serve(args, &config, clock).await,
        Command::Demo(args) => {
            let store = Arc::new(MemoryStore::with_clock(Arc::clone(&clock)));
            let repository = BannerRepository::new(store, &config, clock);
            let mut stdout = std::io::stdout();
            demo::run(&repository, args.test, &mut stdout).await
        }
    }
}

async fn serve(args: ServeArgs, config: &RepositoryConfig, clock: Arc<dyn Clock>) -> Result<()> {
    let store = match &args.data {
        Some(path) => MemoryStore::open(path, Arc::clone(&clock))
            .with_context(|| format!("loading snapshot {}", path.display()))?,
        None => MemoryStore::with_clock(Arc::clone(&clock)),
    };
    let store = Arc::new(store);
    let repository = Arc::new(BannerRepository::new(store.clone(), config, clock));

    if args.seed && store.is_empty() {
        let seeded = repository.seed_sample_banners().await?;
        info!("Seeded {} sample banners", seeded.len());
    }

    let app = build_router(Arc::clone(&repository));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port))
        .await
        .with_context(|| format!("binding HTTP port {}", args.port))?;
    info!("HTTP API listening on port {}", args.port);

    println!("\n========================================");
    println!("  SiteBanners Admin API Running");
    println!("========================================");
    println!("  HTTP Port: {}", args.port);
    println!("  Banners:   {}", store.len());
    if let Some(path) = &args.data {
        println!("  Snapshot:  {}", path.display());
    }
    println!("========================================\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
        .context("HTTP server failed")?;

    if let Some(path) = &args.data {
        store
            .flush(path)
            .with_context(|| format!("writing snapshot {}", path.display()))?;
        info!("Snapshot written to {:?}", path);
    }
    info!("Shutting down");
    Ok(())
}
