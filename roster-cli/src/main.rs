//! Roster CLI
//!
//! Runs the user service and benchmarks its read-through cache.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use roster_api::{ApiConfig, ApiServer};
use roster_cache::{CacheCounters, CacheStore};
use roster_core::traits::RecordProvider;
use roster_core::types::{Gender, NewUser, User, UserId};
use roster_registry::MemoryStore;

/// Roster - user records behind a read-through TTL cache
#[derive(Parser)]
#[command(name = "roster")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "SERVICE_PORT")]
        port: Option<u16>,
        /// Bind address
        #[arg(short, long, env = "BIND_ADDR")]
        bind: Option<String>,
        /// Cache TTL in seconds
        #[arg(long, env = "CACHE_TTL_SECS")]
        ttl_secs: Option<u64>,
        /// Persist users to this file instead of memory
        #[arg(long, env = "DATA_FILE")]
        data_file: Option<PathBuf>,
    },

    /// Run benchmarks
    Bench {
        /// Number of users to generate
        #[arg(short, long, default_value = "10000")]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json);

    match cli.command {
        Commands::Serve {
            port,
            bind,
            ttl_secs,
            data_file,
        } => cmd_serve(port, bind, ttl_secs, data_file).await,
        Commands::Bench { count } => cmd_bench(count).await,
    }
}

fn init_logging(verbose: bool, json: bool) {
    let default = if verbose {
        "roster=debug,info".to_owned()
    } else {
        std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned())
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&default))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Run API server
async fn cmd_serve(
    port: Option<u16>,
    bind: Option<String>,
    ttl_secs: Option<u64>,
    data_file: Option<PathBuf>,
) -> Result<()> {
    let mut config = ApiConfig::from_env();
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(bind) = bind {
        config.bind_addr = bind
            .parse()
            .with_context(|| format!("invalid bind address '{}'", bind))?;
    }
    if let Some(secs) = ttl_secs {
        config.cache_ttl = Duration::from_secs(secs);
    }
    if data_file.is_some() {
        config.data_file = data_file;
    }

    let addr = config.socket_addr();

    println!("{}", "🚀 Starting Roster API server...".cyan().bold());
    println!("   {} http://{}", "Listening on:".green(), addr);
    println!("   {} http://{}/health", "Health check:".dimmed(), addr);
    println!("   {} {}s", "Cache TTL:".dimmed(), config.cache_ttl.as_secs());
    match &config.data_file {
        Some(path) => println!("   {} {}", "Data file:".dimmed(), path.display()),
        None => println!("   {} in-memory", "Storage:".dimmed()),
    }
    println!("\n   Press Ctrl+C to stop.\n");

    let server = ApiServer::new(config)
        .await
        .context("failed to initialise server state")?;
    server.run(addr).await.context("server error")?;

    Ok(())
}

/// Run benchmarks
async fn cmd_bench(count: usize) -> Result<()> {
    println!("{} {} users", "📊 Benchmarking with".cyan().bold(), count);

    let counters = Arc::new(CacheCounters::new());
    let cache = CacheStore::<User>::with_metrics(
        MemoryStore::<User>::with_capacity(count),
        Default::default(),
        counters.clone(),
    )?;

    // Create
    println!("\n{}", "1. Creating users...".dimmed());
    let pb = ProgressBar::new(count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("   [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );

    let mut ids = Vec::with_capacity(count);
    let start = Instant::now();
    for i in 0..count {
        let user = NewUser {
            name: format!("user{}", i),
            age: (i % 100) as u8,
            gender: if i % 2 == 0 { Gender::Female } else { Gender::Male },
            email: format!("user{}@example.com", i),
        }
        .into_user(UserId::generate());
        ids.push(cache.create(&user).await?);
        pb.inc(1);
    }
    pb.finish();
    println!("   ✓ Created {} users: {:?}", count, start.elapsed());

    // Cold reads
    println!("\n{}", "2. Reading with an empty cache...".dimmed());
    cache.clear();
    let start = Instant::now();
    for id in &ids {
        cache.read(id).await?;
    }
    let miss_time = start.elapsed();
    println!("   ✓ {} misses: {:?}", count, miss_time);

    // Warm reads
    println!("\n{}", "3. Reading with a warm cache...".dimmed());
    let start = Instant::now();
    for id in &ids {
        cache.read(id).await?;
    }
    let hit_time = start.elapsed();
    println!("   ✓ {} hits: {:?}", count, hit_time);

    cache.shutdown().await;

    let snapshot = counters.snapshot();
    let per_read = |elapsed: Duration| elapsed.as_nanos() as f64 / count.max(1) as f64;

    println!("\n{}", "📈 Results:".green().bold());
    println!("   Hits: {}  Misses: {}  Cached: {}", snapshot.hits, snapshot.misses, snapshot.size);
    println!("   Miss latency: {:.0}ns/read", per_read(miss_time));
    println!("   Hit latency:  {:.0}ns/read", per_read(hit_time));

    if snapshot.hits == count as u64 && snapshot.misses == count as u64 {
        println!("   {} Every warm read was served from the cache", "✅".green());
    } else {
        println!(
            "   {} Expected {} hits and {} misses",
            "❌".red(),
            count,
            count
        );
    }

    Ok(())
}
