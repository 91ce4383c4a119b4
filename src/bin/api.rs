use config_assistant_orchestrator::{
    api::start_server,
    llm::{LlmClient, MockLlm, WorkersAiClient, DEFAULT_MODEL},
    planning::PlanGenerator,
    retrieval::{ContextRetriever, HttpRetriever, StaticRetriever},
    session::{InMemorySessionStore, SessionManager},
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let account_id = std::env::var("CF_ACCOUNT_ID").unwrap_or_default();
    let api_token = std::env::var("CF_API_TOKEN").unwrap_or_default();
    let model = std::env::var("CF_AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    info!("Config Assistant Orchestrator - API Server");
    info!("Port: {}", api_port);

    // Create components
    let llm: Arc<dyn LlmClient> = if !account_id.is_empty() && !api_token.is_empty() {
        info!(model = %model, "Using Workers AI");
        Arc::new(WorkersAiClient::new(&account_id, api_token, &model))
    } else {
        warn!("CF_ACCOUNT_ID / CF_API_TOKEN not set, using scripted client (fallback plans only)");
        Arc::new(MockLlm::new())
    };

    let retriever: Arc<dyn ContextRetriever> = match std::env::var("RETRIEVAL_URL") {
        Ok(url) if !url.trim().is_empty() => {
            info!(url = %url, "Using docs-search retrieval");
            Arc::new(HttpRetriever::new(url))
        }
        _ => {
            info!("RETRIEVAL_URL not set, using seeded static corpus");
            Arc::new(StaticRetriever::seeded())
        }
    };

    let generator = PlanGenerator::new(llm, retriever);
    let sessions = Arc::new(SessionManager::new(
        Arc::new(InMemorySessionStore::new()),
        generator,
    ));

    info!("Session manager initialized");
    info!("Starting API server...");

    // Start API server
    start_server(sessions, api_port).await?;

    Ok(())
}
