//! Sercha CLI entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use sercha::adapters::connectors::ConnectorRegistry;
use sercha::adapters::embeddings::{OpenAiEmbeddingConfig, OpenAiEmbeddingService};
use sercha::adapters::llm::{OpenAiLlmConfig, OpenAiLlmService};
use sercha::adapters::memory::MemorySearchEngine;
use sercha::adapters::sqlite::{
    DatabaseConnection, SqliteChunkStore, SqliteDocumentStore, SqliteScheduleStore,
    SqliteSourceStore, SqliteSyncStateStore, SqliteTaskQueue,
};
use sercha::domain::models::{Config, SearchMode, SearchRequest};
use sercha::domain::ports::{SourceStore, TaskQueue};
use sercha::infrastructure::config::ConfigLoader;
use sercha::infrastructure::logging::init_logging;
use sercha::services::handlers::{SyncAllHandler, SyncSourceHandler};
use sercha::services::pipeline::{HtmlNormalizer, MarkdownNormalizer};
use sercha::services::worker_pool::WorkerPoolConfig;
use sercha::services::{
    CapabilityRegistry, PostProcessor, Scheduler, SearchService, SyncOrchestrator, WorkerPool,
};

#[derive(Parser)]
#[command(name = "sercha", about = "Multi-source knowledge ingestion and hybrid search", version)]
struct Cli {
    /// Path to a config file (defaults to sercha.yaml discovery).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the worker pool and the schedule evaluator.
    Serve,
    /// Sync one source by name, immediately.
    Sync {
        /// Source name.
        source: String,
    },
    /// Search the corpus.
    Search {
        /// Query text.
        query: String,
        /// Search mode: text_only, semantic_only or hybrid.
        #[arg(long)]
        mode: Option<String>,
        /// Maximum results.
        #[arg(long)]
        limit: Option<usize>,
    },
}

struct App {
    db: DatabaseConnection,
    sources: Arc<dyn SourceStore>,
    queue: Arc<dyn TaskQueue>,
    registry: Arc<CapabilityRegistry>,
    orchestrator: Arc<SyncOrchestrator>,
    search: Arc<SearchService>,
    worker_pool: Arc<WorkerPool>,
    scheduler: Arc<Scheduler>,
}

impl App {
    async fn build(config: &Config) -> Result<Self> {
        let db = DatabaseConnection::open(&config.database.path, config.database.max_connections)
            .await
            .context("Failed to open database")?;
        db.migrate().await.context("Failed to run migrations")?;
        let pool = db.pool().clone();

        let sources: Arc<dyn SourceStore> = Arc::new(SqliteSourceStore::new(pool.clone()));
        let documents = Arc::new(SqliteDocumentStore::new(pool.clone()));
        let chunks = Arc::new(SqliteChunkStore::new(pool.clone()));
        let sync_states = Arc::new(SqliteSyncStateStore::new(pool.clone()));
        let schedules = Arc::new(SqliteScheduleStore::new(pool.clone()));
        let queue: Arc<dyn TaskQueue> = Arc::new(SqliteTaskQueue::new(pool));

        let registry = Arc::new(CapabilityRegistry::new());
        if config.embedding.enabled {
            let service = OpenAiEmbeddingService::new(OpenAiEmbeddingConfig::from(
                &config.embedding,
            ))
            .context("Failed to build embedding client")?;
            if let Err(err) = registry.validate_and_set_embedding(Arc::new(service)).await {
                warn!(error = %err, "embedding service unavailable, search runs text-only");
            }
        }
        if config.llm.enabled {
            let service = OpenAiLlmService::new(OpenAiLlmConfig::from(&config.llm))
                .context("Failed to build llm client")?;
            if let Err(err) = registry.validate_and_set_llm(Arc::new(service)).await {
                warn!(error = %err, "llm service unavailable");
            }
        }

        let mut pipeline =
            PostProcessor::new(config.pipeline.clone()).context("Invalid pipeline config")?;
        pipeline.register_normalizer(Arc::new(HtmlNormalizer));
        pipeline.register_normalizer(Arc::new(MarkdownNormalizer));

        // Provider connector factories register here as they are deployed.
        let connectors = ConnectorRegistry::new();

        let search_engine = Arc::new(MemorySearchEngine::new());

        let orchestrator = Arc::new(SyncOrchestrator::new(
            sources.clone(),
            documents.clone(),
            chunks,
            sync_states,
            Arc::new(connectors),
            Arc::new(pipeline),
            registry.clone(),
            search_engine.clone(),
        ));

        let mut worker_pool = WorkerPool::new(
            queue.clone(),
            WorkerPoolConfig {
                concurrency: config.workers.concurrency,
                dequeue_timeout: std::time::Duration::from_secs(config.workers.dequeue_timeout_secs),
            },
        );
        worker_pool.register_handler(Arc::new(SyncSourceHandler::new(orchestrator.clone())));
        worker_pool.register_handler(Arc::new(SyncAllHandler::new(orchestrator.clone())));

        let scheduler = Arc::new(Scheduler::new(
            schedules,
            queue.clone(),
            std::time::Duration::from_secs(config.scheduler.poll_interval_secs),
        ));

        let search = Arc::new(SearchService::new(
            search_engine,
            registry.clone(),
            documents,
        ));

        Ok(Self {
            db,
            sources,
            queue,
            registry,
            orchestrator,
            search,
            worker_pool: Arc::new(worker_pool),
            scheduler,
        })
    }

    async fn shutdown(&self) {
        self.scheduler.stop().await;
        self.worker_pool.stop().await;
        if let Err(err) = self.queue.close().await {
            warn!(error = %err, "queue close failed");
        }
        self.registry.close().await;
        self.db.close().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let _logging_guard = init_logging(&config.logging)?;

    let app = App::build(&config).await?;

    match cli.command {
        Commands::Serve => {
            let shutdown_token = CancellationToken::new();
            app.worker_pool.start(&shutdown_token).await;
            app.scheduler.clone().start(&shutdown_token).await;
            info!("sercha serving; press ctrl-c to stop");

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for shutdown signal")?;
            info!("shutting down");
            shutdown_token.cancel();
            app.shutdown().await;
        }
        Commands::Sync { source } => {
            let Some(source) = app.sources.get_by_name(&source).await? else {
                anyhow::bail!("source {source:?} not found");
            };
            let token = CancellationToken::new();
            let result = app.orchestrator.sync_source(&token, &source.id).await?;
            println!(
                "sync {}: success={} added={} updated={} deleted={} chunks={} errors={}",
                source.name,
                result.success,
                result.stats.documents_added,
                result.stats.documents_updated,
                result.stats.documents_deleted,
                result.stats.chunks_indexed,
                result.stats.errors,
            );
            if let Some(error) = result.error {
                println!("error: {error}");
            }
            app.shutdown().await;
        }
        Commands::Search { query, mode, limit } => {
            let request = SearchRequest {
                query,
                mode: mode.as_deref().and_then(SearchMode::from_str),
                limit,
                source_ids: vec![],
            };
            let response = app.search.search(&request).await?;
            println!(
                "{} results ({} total, mode {}, {}ms)",
                response.results.len(),
                response.total_count,
                response.effective_mode.as_str(),
                response.elapsed_ms,
            );
            for result in response.results {
                let title = result
                    .document
                    .map(|d| d.title)
                    .unwrap_or_else(|| result.chunk.document_id.clone());
                println!("  {:.3}  {}  {}", result.score, title, result.chunk.id);
            }
            app.shutdown().await;
        }
    }

    Ok(())
}
