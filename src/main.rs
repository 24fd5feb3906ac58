use std::sync::Arc;

mod ai;
mod api;
mod config;
mod db;
mod error;
mod models;
mod pipeline;
mod scheduler;
mod sources;

use ai::{Assistant, ClaudeClient, SummaryGateway, TextGenerator};
use config::Config;
use db::Repository;
use error::Result;
use pipeline::Pipeline;
use scheduler::Scheduler;
use sources::pokebattler::Pokebattler;
use sources::HttpClient;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (info and above unless RUST_LOG says otherwise)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let run_scrape = args.iter().any(|a| a == "--scrape");
    let run_raids = args.iter().any(|a| a == "--refresh-raids");

    // Load configuration
    let config = Config::load()?;
    let generator = build_generator(&config);
    let pipeline = Arc::new(build_pipeline(&config, generator.clone()).await?);

    // One-shot modes: run the requested cycles and exit
    if run_scrape || run_raids {
        if run_scrape {
            let report = pipeline.run_news_cycle().await?;
            println!(
                "Added {} news items and {} events",
                report.news_added, report.events_added
            );
        }
        if run_raids {
            let report = pipeline.run_raid_cycle().await?;
            println!(
                "Processed {} raid bosses ({} added, {} updated)",
                report.total_processed, report.added, report.updated
            );
        }
        return Ok(());
    }

    let scheduler = Scheduler::start(
        pipeline.clone(),
        config.news_interval(),
        config.raid_interval(),
        config.scrape_on_startup,
    );

    let app = api::router(api::AppState::new(pipeline, Assistant::new(generator)));
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let status = scheduler.status();
    info!(news = ?status.news, raids = ?status.raids, "Stopping scheduler");
    scheduler.shutdown().await;

    Ok(())
}

fn build_generator(config: &Config) -> Option<Arc<dyn TextGenerator>> {
    match &config.anthropic_api_key {
        Some(key) => Some(Arc::new(ClaudeClient::new(key.clone()))),
        None => {
            warn!("ANTHROPIC_API_KEY not set, summaries will use truncation fallback and the assistant is disabled");
            None
        }
    }
}

async fn build_pipeline(
    config: &Config,
    generator: Option<Arc<dyn TextGenerator>>,
) -> Result<Pipeline> {
    if let Some(parent) = std::path::Path::new(&config.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let repo = Repository::new(&config.db_path).await?;

    let client = HttpClient::new();
    Ok(Pipeline::new(
        sources::default_sources(&client),
        Box::new(
            Pokebattler::new(client).with_delays(config.render_settle(), config.detail_delay()),
        ),
        SummaryGateway::new(generator),
        repo,
    ))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
