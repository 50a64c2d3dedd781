#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::missing_crate_level_docs
)]

//! Standalone email processing loop

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use email_dispatch::{
    domain::processing::EmailProcessor,
    infrastructure::{
        email::smtp::{SMTPConfig, SMTPMailer},
        metrics::{init_metrics, EmailMetricsRecorder, MetricsConfig},
        persistence::InMemoryEmailStatusStore,
        processing::ProcessingConfig,
        queue::{EmailQueueBackend, QueueConfig},
        shutdown::cancel_on_shutdown_signal,
        time::SystemClock,
    },
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments / environment variables
#[derive(Debug, Parser)]
pub struct Args {
    /// The queue configuration
    #[clap(flatten)]
    pub queue: QueueConfig,

    /// The SMTP configuration
    #[clap(flatten)]
    pub smtp: SMTPConfig,

    /// The processing loop configuration
    #[clap(flatten)]
    pub processing: ProcessingConfig,

    /// The metrics export configuration
    #[clap(flatten)]
    pub metrics: MetricsConfig,
}

#[mutants::skip]
#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to load environment: {}", e);

            return Err(e.into());
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    args.queue.ensure_consumable(false)?;

    let meter_provider = init_metrics(&args.metrics)?;

    let queue = Arc::new(EmailQueueBackend::connect(&args.queue).await?);

    let processor = EmailProcessor::new(
        queue.clone(),
        queue,
        Arc::new(InMemoryEmailStatusStore::new()),
        Arc::new(SMTPMailer::new(&args.smtp)?),
        Arc::new(EmailMetricsRecorder::new()),
        Arc::new(SystemClock),
        (&args.processing).into(),
    );

    let cancel = CancellationToken::new();
    cancel_on_shutdown_signal(cancel.clone());

    processor.run(cancel).await;

    info!("worker stopped");

    if let Some(provider) = meter_provider {
        if let Err(err) = provider.shutdown() {
            warn!(%err, "failed to flush metrics");
        }
    }

    Ok(())
}
