use clap::Parser;
use encore_core::EncoreConfig;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use encore_server::http::{self, HttpState};
use encore_server::subsystems::pipeline::Orchestrator;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "encore.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Init logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    // Load config
    let config = match EncoreConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Connect to DB and ensure the schema exists
    let pool = match encore_core::db::create_pool(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };
    encore_core::db::init_schema(&pool).await?;

    if args.health {
        match encore_core::db::health_check(&pool).await {
            Ok(v) => println!("✅ SQLite connected: {}", v),
            Err(e) => {
                println!("❌ SQLite connection failed: {}", e);
                std::process::exit(1);
            }
        }

        println!("✅ Encore DB health check passed");
        return Ok(());
    }

    let orchestrator = match Orchestrator::from_config(pool.clone(), &config) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Failed to build pipeline orchestrator: {}", e);
            std::process::exit(1);
        }
    };

    // Shutdown signal
    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    let state = HttpState { pool, orchestrator };
    http::start_http_server(state, &config, tx.subscribe()).await?;

    Ok(())
}
