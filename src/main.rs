//! CRM resilience daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   Application code ──▶ CircuitBreakerRegistry ──▶ breaker ──▶ external dependency
//!          │
//!          └── add_job ──▶ queue:<worker> ──▶ Worker poll loop ──▶ JobProcessor
//!                                                  │                    │
//!                                                  │                    └─▶ breaker ──▶ gateway / relay
//!                                                  ├─▶ job:result:<id>
//!                                                  └─▶ queue:<worker>:failed
//!
//!   Operator ──▶ admin API (bearer auth) ──▶ breaker stats / force ops, worker status
//! ```
//!
//! Startup order: logging → config → metrics → context → workers → admin API.
//! Shutdown order: signal → admin API → workers (parallel drain).

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use crm_resilience::admin::{setup_admin_router, AdminState};
use crm_resilience::config::loader::load_or_default;
use crm_resilience::lifecycle::{bootstrap, signals, Shutdown};
use crm_resilience::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "crm-resilience")]
#[command(about = "Circuit breakers and background job workers for the CRM", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_or_default(args.config.as_deref())?;
    logging::init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        breakers = config.breakers.len(),
        store = ?config.store.backend,
        "crm-resilience starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let context = bootstrap(&config).await?;
    context.workers.initialize();

    let shutdown = Shutdown::new();
    let admin_task = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");

        let router = setup_admin_router(AdminState::new(&context, &config.admin.api_key));
        let stop = shutdown.clone();
        Some(tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { stop.wait().await })
                .await
        }))
    } else {
        None
    };

    signals::wait_for_signal().await;
    tracing::info!("Shutdown signal received");
    shutdown.trigger();

    if let Some(task) = admin_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Admin API exited with error"),
            Err(e) => tracing::error!(error = %e, "Admin API task failed"),
        }
    }

    context.workers.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
