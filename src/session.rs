//! Session state machine
//!
//! Responsible for storing and loading per-session conversation state.
//! Currently uses in-memory; can be replaced with Postgres. Mutations for a
//! given session are serialized with a per-session lock so concurrent
//! requests cannot interleave a load-modify-store cycle.

use crate::error::AssistantError;
use crate::models::{PendingQuestion, Plan, SessionState};
use crate::planning::PlanGenerator;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// Reserved answer key: the value is also appended to the free-text
/// followup transcript fed back into retrieval and classification.
pub const FOLLOWUP_KEY: &str = "followup";

/// Oldest followups are evicted beyond this.
pub const MAX_FOLLOWUPS: usize = 10;

/// Trait for session persistence
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<SessionState>>;
    async fn save(&self, session_id: &str, state: &SessionState) -> Result<()>;
}

/// In-memory session store for development
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionState>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<SessionState>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).cloned())
    }

    async fn save(&self, session_id: &str, state: &SessionState) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id.to_string(), state.clone());
        Ok(())
    }
}

/// Coordinates the store and the plan generator behind one session-scoped
/// API. All reads and writes for one session go through its lock.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    generator: PlanGenerator,
    locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, generator: PlanGenerator) -> Self {
        Self {
            store,
            generator,
            locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn load_or_default(&self, session_id: &str) -> Result<SessionState> {
        Ok(self.store.load(session_id).await?.unwrap_or_default())
    }

    /// Set a new goal. This is a hard reset: answers, followups, pending
    /// questions, and the cached plan are all discarded.
    pub async fn set_goal(&self, session_id: &str, goal: &str) -> Result<String> {
        let goal = goal.trim();
        if goal.is_empty() {
            return Err(AssistantError::InvalidInput("Missing goal".to_string()));
        }

        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        let state = SessionState {
            goal: Some(goal.to_string()),
            ..Default::default()
        };
        self.store.save(session_id, &state).await?;

        info!(session_id, "Goal set");
        Ok(goal.to_string())
    }

    /// Record an answer. The reserved `followup` key also appends to the
    /// followup transcript, keeping only the newest ten entries.
    pub async fn set_answer(&self, session_id: &str, key: &str, value: &str) -> Result<()> {
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() {
            return Err(AssistantError::InvalidInput("Missing key".to_string()));
        }
        if value.is_empty() {
            return Err(AssistantError::InvalidInput("Missing value".to_string()));
        }

        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        let mut state = self.load_or_default(session_id).await?;
        if key == FOLLOWUP_KEY {
            state.followups.push(value.to_string());
            if state.followups.len() > MAX_FOLLOWUPS {
                let excess = state.followups.len() - MAX_FOLLOWUPS;
                state.followups.drain(..excess);
            }
        }
        state.answers.insert(key.to_string(), value.to_string());

        self.store.save(session_id, &state).await
    }

    pub async fn pending_questions(&self, session_id: &str) -> Result<Vec<PendingQuestion>> {
        let state = self.load_or_default(session_id).await?;
        Ok(state.pending_questions)
    }

    pub async fn state(&self, session_id: &str) -> Result<SessionState> {
        self.load_or_default(session_id).await
    }

    /// Generate a plan from the current state, then persist the resulting
    /// pending questions and serialized plan in one step.
    pub async fn generate_plan(&self, session_id: &str) -> Result<Plan> {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        let mut state = self.load_or_default(session_id).await?;
        let outcome = self.generator.generate(&state).await?;

        state.pending_questions = outcome.pending_questions;
        state.last_plan = Some(outcome.last_plan_json);
        self.store.save(session_id, &state).await?;

        Ok(outcome.plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;
    use crate::retrieval::StaticRetriever;

    fn manager() -> SessionManager {
        let generator = PlanGenerator::new(
            Arc::new(MockLlm::new()),
            Arc::new(StaticRetriever::empty()),
        );
        SessionManager::new(Arc::new(InMemorySessionStore::new()), generator)
    }

    #[tokio::test]
    async fn test_empty_inputs_are_rejected_before_mutation() {
        let mgr = manager();
        mgr.set_answer("s1", "traffic", "low").await.unwrap();

        assert!(mgr.set_goal("s1", "   ").await.is_err());
        assert!(mgr.set_answer("s1", "  ", "x").await.is_err());
        assert!(mgr.set_answer("s1", "k", "  ").await.is_err());

        // failed calls left the state untouched
        let state = mgr.state("s1").await.unwrap();
        assert_eq!(state.answers.len(), 1);
        assert!(state.goal.is_none());
    }

    #[tokio::test]
    async fn test_new_goal_resets_everything() {
        let mgr = manager();
        mgr.set_goal("s1", "migrate my dns").await.unwrap();
        mgr.set_answer("s1", "dns_provider", "godaddy").await.unwrap();
        mgr.set_answer("s1", FOLLOWUP_KEY, "and keep email working")
            .await
            .unwrap();
        mgr.generate_plan("s1").await.unwrap();

        let before = mgr.state("s1").await.unwrap();
        assert!(!before.answers.is_empty());
        assert!(!before.followups.is_empty());
        assert!(before.last_plan.is_some());

        mgr.set_goal("s1", "speed up my site").await.unwrap();
        let after = mgr.state("s1").await.unwrap();
        assert_eq!(after.goal.as_deref(), Some("speed up my site"));
        assert!(after.answers.is_empty());
        assert!(after.followups.is_empty());
        assert!(after.pending_questions.is_empty());
        assert!(after.last_plan.is_none());
    }

    #[tokio::test]
    async fn test_followup_key_feeds_transcript_and_answers() {
        let mgr = manager();
        mgr.set_goal("s1", "secure my /api/login").await.unwrap();
        mgr.set_answer("s1", FOLLOWUP_KEY, "it is a public API")
            .await
            .unwrap();

        let state = mgr.state("s1").await.unwrap();
        assert_eq!(state.followups, vec!["it is a public API"]);
        assert_eq!(
            state.answers.get(FOLLOWUP_KEY).map(|s| s.as_str()),
            Some("it is a public API")
        );
    }

    #[tokio::test]
    async fn test_followup_transcript_keeps_newest_ten() {
        let mgr = manager();
        mgr.set_goal("s1", "secure my /api/login").await.unwrap();
        for i in 1..=11 {
            mgr.set_answer("s1", FOLLOWUP_KEY, &format!("note {}", i))
                .await
                .unwrap();
        }

        let state = mgr.state("s1").await.unwrap();
        assert_eq!(state.followups.len(), MAX_FOLLOWUPS);
        assert_eq!(state.followups.first().map(|s| s.as_str()), Some("note 2"));
        assert_eq!(state.followups.last().map(|s| s.as_str()), Some("note 11"));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let mgr = manager();
        mgr.set_goal("s1", "migrate my dns").await.unwrap();
        mgr.set_goal("s2", "speed up my site").await.unwrap();

        assert_eq!(
            mgr.state("s1").await.unwrap().goal.as_deref(),
            Some("migrate my dns")
        );
        assert_eq!(
            mgr.state("s2").await.unwrap().goal.as_deref(),
            Some("speed up my site")
        );
    }

    #[tokio::test]
    async fn test_generate_plan_persists_outcome() {
        let mgr = manager();
        mgr.set_goal("s1", "migrate my dns records").await.unwrap();

        let plan = mgr.generate_plan("s1").await.unwrap();
        let state = mgr.state("s1").await.unwrap();

        let saved = state.last_plan.expect("plan json persisted");
        assert_eq!(saved, serde_json::to_string_pretty(&plan).unwrap());
        assert_eq!(state.pending_questions, plan.follow_up_questions);
    }
}
