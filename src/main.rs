use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use inventory_engine::{config, db, events, metrics, InventoryEngine};

#[derive(Parser)]
#[command(
    name = "inventory-engine",
    about = "Operator tooling for the warehouse inventory engine",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Print Prometheus metrics after the command finishes"
    )]
    metrics: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,
    /// Compare every balance with its ledger; exits non-zero on mismatch
    Reconcile,
    /// List active SKUs at or below their minimum stock level
    LowStock,
    /// Show balances, totals and recent movements for one SKU
    Snapshot {
        #[arg(help = "SKU id")]
        sku_id: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;

    if matches!(cli.command, Commands::Migrate) {
        db::run_migrations(&pool).await?;
        info!("Schema is up to date");
        return finish(cli.metrics);
    }
    if cfg.auto_migrate {
        db::run_migrations(&pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }

    let (event_sender, event_rx) = events::EventSender::channel(cfg.event_channel_capacity);
    tokio::spawn(events::process_events(event_rx));
    let engine = InventoryEngine::new(Arc::new(pool), &cfg, event_sender);

    match cli.command {
        Commands::Migrate => {}
        Commands::Reconcile => {
            let mismatches = engine.reconciliation.audit_ledger().await?;
            print_json(&mismatches)?;
            if !mismatches.is_empty() {
                if cli.metrics {
                    println!("{}", metrics::gather_text()?);
                }
                bail!("{} balance(s) diverge from the ledger", mismatches.len());
            }
        }
        Commands::LowStock => {
            let items = engine.query.list_low_stock().await?;
            print_json(&items)?;
        }
        Commands::Snapshot { sku_id } => {
            let snapshot = engine.query.get_sku_snapshot(sku_id).await?;
            print_json(&snapshot)?;
        }
    }

    finish(cli.metrics)
}

fn finish(print_metrics: bool) -> Result<()> {
    if print_metrics {
        println!("{}", metrics::gather_text()?);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to render output")?
    );
    Ok(())
}
