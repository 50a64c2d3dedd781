#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::missing_crate_level_docs
)]

//! REST API for submitting emails, with an embedded processing loop

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use email_dispatch::{
    domain::{emails::EmailServiceImpl, processing::EmailProcessor},
    infrastructure::{
        email::smtp::{SMTPConfig, SMTPMailer},
        health::Readiness,
        http::{AppState, HttpServer, HttpServerConfig},
        metrics::{init_metrics, EmailMetricsRecorder, MetricsConfig},
        persistence::InMemoryEmailStatusStore,
        processing::ProcessingConfig,
        queue::{EmailQueueBackend, QueueConfig},
        shutdown::cancel_on_shutdown_signal,
        templates::{InMemoryTemplateRenderer, TemplateConfig},
        time::SystemClock,
    },
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments / environment variables
#[derive(Debug, Parser)]
pub struct Args {
    /// The HTTP server configuration
    #[clap(flatten)]
    pub server: HttpServerConfig,

    /// The queue configuration
    #[clap(flatten)]
    pub queue: QueueConfig,

    /// The SMTP configuration
    #[clap(flatten)]
    pub smtp: SMTPConfig,

    /// The processing loop configuration
    #[clap(flatten)]
    pub processing: ProcessingConfig,

    /// The template configuration
    #[clap(flatten)]
    pub templates: TemplateConfig,

    /// The metrics export configuration
    #[clap(flatten)]
    pub metrics: MetricsConfig,

    /// Run the processing loop inside the server process
    #[arg(
        long,
        env = "EMBEDDED_WORKER",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub embedded_worker: bool,
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

    args.queue.ensure_consumable(args.embedded_worker)?;

    let meter_provider = init_metrics(&args.metrics)?;

    let store = Arc::new(InMemoryEmailStatusStore::new());
    let queue = Arc::new(EmailQueueBackend::connect(&args.queue).await?);
    let mailer = SMTPMailer::new(&args.smtp)?;
    let metrics = EmailMetricsRecorder::new();
    let templates = Arc::new(InMemoryTemplateRenderer::from_config(&args.templates).await?);
    let clock = Arc::new(SystemClock);

    let emails = EmailServiceImpl::new(
        store.clone(),
        queue.clone(),
        Arc::new(metrics.clone()),
        templates,
        clock.clone(),
    );

    let cancel = CancellationToken::new();
    cancel_on_shutdown_signal(cancel.clone());

    let worker = if args.embedded_worker {
        let processor = EmailProcessor::new(
            queue.clone(),
            queue.clone(),
            store,
            Arc::new(mailer.clone()),
            Arc::new(metrics.clone()),
            clock,
            (&args.processing).into(),
        );

        let cancel = cancel.clone();

        Some(tokio::spawn(async move { processor.run(cancel).await }))
    } else {
        info!("embedded worker disabled");

        None
    };

    let readiness = Readiness::new()
        .with_check(mailer)
        .with_check(queue.as_ref().clone());

    let server = HttpServer::new(AppState::new(emails, metrics, readiness), &args.server)?;
    let result = server.run(cancel.clone()).await;

    cancel.cancel();

    if let Some(worker) = worker {
        worker.await?;
    }

    if let Some(provider) = meter_provider {
        if let Err(err) = provider.shutdown() {
            warn!(%err, "failed to flush metrics");
        }
    }

    result
}
