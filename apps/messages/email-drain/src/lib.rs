//! Email Drain Worker
//!
//! Drains the push queue for the email method and publishes one dispatch
//! event per recipient to a Redis stream, where the mail sender picks it up.
//!
//! ## Architecture
//!
//! ```text
//! cron (per interval)
//!   ↓
//! EmailNotifier::process(email, interval)
//!   ↓ pull (locked) ─────────── Redis push queue
//!   ↓ resolve ───────────────── identity + message services (HTTP)
//!   ↓ publish ───────────────── Redis stream (messages:email:events)
//!   ↓ delete
//! ```
//!
//! ## Commands
//!
//! - `drain --interval daily`: one run, exits when the queue is empty
//! - `schedule`: cron-driven runs for every advertised interval
//! - `options`: print the method options as JSON

pub mod config;

use clap::{Parser, Subcommand};
use config::Config;
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::{Environment, FromEnv};
use domain_messages_email::{
    EMAIL_METHOD, EmailNotifier, HttpClientConfig, HttpIdentityClient, HttpMessageClient,
    MessagesEmailConfig, NotificationMethod, ProcessOptions, StreamEventBus, email_method_options,
};
use eyre::{Result, WrapErr};
use metrics_exporter_prometheus::PrometheusBuilder;
use push_queue::{Interval, QueueConfig, RedisJobQueue, RetryConfig, connect_with_retry};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "email-drain")]
#[command(about = "Drain queued message notifications into email dispatch events")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Drain the queue once and exit
    Drain {
        /// Delivery method tag
        #[arg(short, long, default_value = EMAIL_METHOD)]
        method: String,

        /// Interval to drain (daily, immediate)
        #[arg(short, long)]
        interval: Interval,
    },

    /// Run every interval on its cron schedule until stopped
    Schedule,

    /// Print the method options as JSON
    Options,
}

/// Entry point for the `email-drain` binary.
pub async fn run() -> Result<()> {
    install_color_eyre();
    let environment = Environment::from_env();
    init_tracing(&environment);

    let cli = Cli::parse();

    match cli.command {
        Commands::Options => {
            let settings = MessagesEmailConfig::from_env()
                .wrap_err("Failed to load email configuration")?
                .default_user_settings;
            println!("{}", serde_json::to_string_pretty(&email_method_options(settings))?);
        }
        Commands::Drain { method, interval } => {
            let config = Config::from_env().wrap_err("Failed to load configuration")?;
            let notifier = build_notifier(&config).await?;
            let options = ProcessOptions::new(method, interval);

            tokio::select! {
                result = notifier.process(&options) => result?,
                _ = shutdown_signal() => {
                    warn!("Drain interrupted; locked jobs become visible when their lock expires");
                }
            }
        }
        Commands::Schedule => {
            let config = Config::from_env().wrap_err("Failed to load configuration")?;
            let notifier = Arc::new(build_notifier(&config).await?);
            install_metrics_exporter(config.metrics_port)?;
            run_scheduled(notifier, &config).await?;
        }
    }

    Ok(())
}

/// Wire the notifier to Redis and the HTTP services.
async fn build_notifier(config: &Config) -> Result<EmailNotifier> {
    info!("Connecting to Redis...");
    let redis = connect_with_retry(&config.redis.url, &RetryConfig::default())
        .await
        .wrap_err("Failed to connect to Redis")?;

    let queue = RedisJobQueue::new(
        redis.clone(),
        QueueConfig::new(&config.queue_prefix).with_lock_ttl(config.lock_ttl),
    );
    let bus = StreamEventBus::new(redis, &config.event_stream)
        .with_max_len(config.event_stream_max_len);

    let identities = HttpIdentityClient::new(
        HttpClientConfig::new(&config.identity_url).with_timeout(config.http_timeout),
    )?;
    let messages = HttpMessageClient::new(
        HttpClientConfig::new(&config.messages_url).with_timeout(config.http_timeout),
    )?;

    info!(
        prefix = %config.queue_prefix,
        stream = %bus.stream(),
        lanes = config.drain.max_concurrent_jobs,
        "Email drain ready"
    );

    Ok(EmailNotifier::new(
        Arc::new(queue),
        Arc::new(identities),
        Arc::new(messages),
        Arc::new(bus),
        config.messages_email.clone(),
    )
    .with_drain_config(config.drain.clone()))
}

fn install_metrics_exporter(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .wrap_err("Failed to install Prometheus exporter")?;
    info!(port, "Prometheus exporter listening");
    Ok(())
}

/// Schedule a drain per advertised interval and wait for a shutdown signal.
///
/// A tick that fires while the previous run for the same interval is still
/// going is skipped.
async fn run_scheduled(method: Arc<dyn NotificationMethod>, config: &Config) -> Result<()> {
    let mut sched = JobScheduler::new().await?;

    for option in method.options().intervals {
        let interval = option.value;
        let cron = config.cron_for(interval).to_string();
        let running = Arc::new(Mutex::new(()));
        let method = method.clone();

        let job = Job::new_async(cron.as_str(), move |_uuid, _l| {
            let method = method.clone();
            let running = running.clone();

            Box::pin(async move {
                let Ok(_guard) = running.try_lock() else {
                    warn!(interval = %interval, "Previous run still in progress, skipping");
                    return;
                };

                let options = ProcessOptions::new(method.name(), interval);
                if let Err(e) = method.process(&options).await {
                    error!(interval = %interval, error = %e, "Scheduled drain failed");
                }
            })
        })
        .wrap_err_with(|| format!("Invalid cron expression for {}: {}", interval, cron))?;

        sched.add(job).await?;
        info!(interval = %interval, cron = %cron, "Scheduled drain");
    }

    sched.start().await?;
    shutdown_signal().await;

    info!("Stopping scheduler");
    sched.shutdown().await?;
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_drain() {
        let cli = Cli::try_parse_from(["email-drain", "drain", "--interval", "daily"]).unwrap();
        match cli.command {
            Commands::Drain { method, interval } => {
                assert_eq!(method, "email");
                assert_eq!(interval, Interval::Daily);
            }
            _ => panic!("expected drain"),
        }
    }

    #[test]
    fn test_rejects_unknown_interval() {
        assert!(Cli::try_parse_from(["email-drain", "drain", "--interval", "weekly"]).is_err());
    }
}
