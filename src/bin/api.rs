use sdrag_assistant::{
    agent::Orchestrator,
    api::start_server,
    audit::AuditLog,
    config::AppConfig,
    llm::ChatCompletionClient,
    metrics::MetricStore,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();
    let config = AppConfig::from_env();

    if config.llm_api_key.is_none() {
        eprintln!("⚠️  OPENROUTER_API_KEY not set in .env");
        eprintln!("📌 Explanations will show a configuration notice until it is set");
    }

    info!("🚀 SDRAG Assistant - API Server");
    info!("📍 Port: {}", config.api_port);
    info!("🤖 Model: {} @ {}", config.llm_model, config.llm_base_url);

    let explainer = ChatCompletionClient::new(&config)?;
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(MetricStore::reference()),
        Arc::new(explainer),
        AuditLog::new(),
    ));

    info!("✅ Orchestrator initialized");
    info!("📡 Starting API server...");

    start_server(orchestrator, config.api_port).await?;

    Ok(())
}
