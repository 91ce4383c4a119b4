use config_assistant_orchestrator::{
    llm::MockLlm,
    planning::PlanGenerator,
    retrieval::StaticRetriever,
    session::{InMemorySessionStore, SessionManager, FOLLOWUP_KEY},
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("Config Assistant Orchestrator starting");

    // Create components. The scripted client never returns JSON, so this
    // demo exercises the retry, repair, and fallback path end to end.
    let generator = PlanGenerator::new(
        Arc::new(MockLlm::new()),
        Arc::new(StaticRetriever::seeded()),
    );
    let sessions = SessionManager::new(Arc::new(InMemorySessionStore::new()), generator);

    let session_id = "demo-session";

    // Walk one conversation
    sessions.set_goal(session_id, "secure my /api/login").await?;
    sessions
        .set_answer(session_id, "protected_path", "/api/login")
        .await?;
    sessions
        .set_answer(session_id, FOLLOWUP_KEY, "it's a public REST API")
        .await?;

    info!(session_id, "Generating plan");
    let plan = sessions.generate_plan(session_id).await?;

    println!("\n=== GENERATED PLAN ===");
    println!("{}", serde_json::to_string_pretty(&plan)?);

    let state = sessions.state(session_id).await?;
    println!("\n=== PENDING QUESTIONS ===");
    if state.pending_questions.is_empty() {
        println!("(none)");
    }
    for (i, q) in state.pending_questions.iter().enumerate() {
        println!("  {}: [{}] {}", i + 1, q.key, q.question);
    }

    Ok(())
}
