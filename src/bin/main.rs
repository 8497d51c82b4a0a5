use sdrag_assistant::{
    agent::Orchestrator,
    audit::AuditLog,
    config::AppConfig,
    llm::ChatCompletionClient,
    metrics::MetricStore,
    sink::StdoutSink,
    trace::LogEmitter,
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

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        eprintln!("usage: sdrag \"<question>\"");
        eprintln!("example: sdrag \"¿Cuál fue el revenue del Q4 2024?\"");
        std::process::exit(2);
    }

    info!(model = %config.llm_model, "SDRAG assistant starting");

    let explainer = ChatCompletionClient::new(&config)?;
    let orchestrator = Orchestrator::new(
        Arc::new(MetricStore::reference()),
        Arc::new(explainer),
        AuditLog::new(),
    );

    let sink = StdoutSink;
    let session = orchestrator.start_session(None, &sink).await;
    let outcome = orchestrator
        .handle_query(&session, &query, &LogEmitter, &sink)
        .await;

    info!(
        audit_id = %outcome.audit_id,
        route = %outcome.classification.route,
        "Query answered"
    );

    Ok(())
}
