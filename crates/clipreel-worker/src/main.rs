//! Compilation worker binary.
//!
//! Runs a scheduling pass on a fixed interval until interrupted.

use chrono::Utc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clipreel_worker::{WorkerConfig, WorkerContext};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider already installed");
    }

    dotenvy::dotenv().ok();

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = "clipreel=info".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting clipreel-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Err(e) = clipreel_media::check_ffmpeg() {
        error!("FFmpeg unavailable: {}", e);
        std::process::exit(1);
    }

    let (shutdown, shutdown_rx) = tokio::sync::watch::channel(false);

    let context = match WorkerContext::from_env(config.clone(), shutdown_rx.clone()).await {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to initialize worker: {}", e);
            std::process::exit(1);
        }
    };

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        let _ = shutdown.send(true);
    });

    let pass = context.schedule_pass().with_cancel(shutdown_rx.clone());
    let mut shutdown_rx = shutdown_rx;
    let mut interval = tokio::time::interval(config.schedule_interval);

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                match pass.run(Utc::now()).await {
                    Ok(report) if report.failures.is_empty() => {
                        info!(compiled = report.compiled.len(), created = report.windows_created, "Pass complete");
                    }
                    Ok(report) => {
                        warn!(
                            compiled = report.compiled.len(),
                            failures = report.failures.len(),
                            "Pass complete with failures"
                        );
                    }
                    Err(e) => error!("Scheduling pass failed: {}", e),
                }
            }
        }
    }

    info!("Worker shutdown complete");
}
