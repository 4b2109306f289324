use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use docproc::{
    cache::{JobCache, MemoryCache, RedisCache},
    db::{JobStore, MemoryJobStore, PostgresJobStore},
    events::{AnalysisTrigger, HttpAnalysisTrigger, NoopTrigger},
    extraction::{ExtractionPipeline, PdfTextExtractor, TesseractOcr},
    Config, DocumentProcessor, ProcessingLimits, WorkerPool,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "fatal error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::from_env()?;
    tracing::info!(
        service = %config.service_name,
        workers = config.worker_count,
        trace_endpoint = ?config.trace_endpoint,
        "starting document processor"
    );

    let cache: Arc<dyn JobCache> = match &config.redis_url {
        Some(url) => Arc::new(RedisCache::connect(url).await?),
        None => {
            tracing::warn!("REDIS_URL not set, using in-memory cache (single-node only)");
            Arc::new(MemoryCache::new())
        }
    };

    let store: Arc<dyn JobStore> = match &config.database_url {
        Some(url) => Arc::new(PostgresJobStore::connect(url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store (development only)");
            Arc::new(MemoryJobStore::new())
        }
    };

    let trigger: Arc<dyn AnalysisTrigger> = match &config.analysis_endpoint {
        Some(endpoint) => Arc::new(HttpAnalysisTrigger::new(endpoint)),
        None => Arc::new(NoopTrigger),
    };

    let pipeline = ExtractionPipeline::new(
        Arc::new(PdfTextExtractor::new()),
        Arc::new(TesseractOcr::new(config.ocr.clone())),
    );

    let processor = Arc::new(DocumentProcessor::new(
        cache,
        store,
        pipeline,
        trigger,
        ProcessingLimits::from_config(&config),
    ));

    let pool = WorkerPool::new(config.worker_count, processor);
    pool.start();

    shutdown_signal().await;
    tracing::info!("shutdown signal received, draining worker pool");
    pool.stop().await;
    tracing::info!("worker pool drained, exiting");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
