//! Lazy, shared ownership of the single agent instance.

use parlance_agent::Agent;
use parlance_config::AppConfig;
use parlance_core::{Error, Result, ToolRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

type AgentFactory = Box<dyn Fn() -> Result<Arc<Agent>> + Send + Sync>;

/// Holds the one shared [`Agent`], constructing it on first use.
///
/// The slot lock covers the whole construction, so concurrent first requests
/// build at most one agent. A failed construction leaves the slot empty and
/// the next request retries.
pub struct AgentManager {
    slot: Mutex<Option<Arc<Agent>>>,
    factory: AgentFactory,
}

impl AgentManager {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<Agent>> + Send + Sync + 'static,
    {
        Self {
            slot: Mutex::new(None),
            factory: Box::new(factory),
        }
    }

    /// A manager whose factory builds the agent from application config.
    pub fn from_config(config: &AppConfig) -> Self {
        let config = config.clone();
        Self::new(move || {
            let provider = parlance_providers::build_from_config(&config).map_err(|e| {
                Error::Config {
                    message: e.to_string(),
                }
            })?;
            let tools: Arc<ToolRegistry> = Arc::new(parlance_tools::default_registry());

            let mut agent = Agent::new(provider, config.model.clone(), config.temperature, tools)
                .with_max_tokens(config.max_tokens)
                .with_history_dir(config.history.directory.clone())
                .with_turn_timeout(Duration::from_secs(config.limits.turn_timeout_secs));
            if let Some(prompt) = &config.system_prompt {
                agent = agent.with_system_prompt(prompt.as_str());
            }

            info!(model = %config.model, "Agent constructed");
            Ok(Arc::new(agent))
        })
    }

    /// A manager pre-seeded with an agent; the factory never runs.
    pub fn with_agent(agent: Arc<Agent>) -> Self {
        Self {
            slot: Mutex::new(Some(agent)),
            factory: Box::new(|| Err(Error::Internal("agent already seeded".into()))),
        }
    }

    /// Discard the current instance; the next `get` reconstructs.
    ///
    /// Exists for test isolation, not wired to any route.
    pub async fn reset(&self) {
        *self.slot.lock().await = None;
    }

    /// Fetch the shared agent, constructing it if this is the first use.
    pub async fn get(&self) -> Result<Arc<Agent>> {
        let mut slot = self.slot.lock().await;
        if let Some(agent) = slot.as_ref() {
            return Ok(Arc::clone(agent));
        }
        let agent = (self.factory)()?;
        *slot = Some(Arc::clone(&agent));
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlance_providers::scripted::ScriptedProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scripted_agent() -> Arc<Agent> {
        Arc::new(Agent::new(
            Arc::new(ScriptedProvider::say(["ok"])),
            "scripted",
            0.0,
            Arc::new(ToolRegistry::new()),
        ))
    }

    #[tokio::test]
    async fn constructs_once_across_concurrent_gets() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let manager = Arc::new(AgentManager::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(scripted_agent())
        }));

        let a = Arc::clone(&manager);
        let b = Arc::clone(&manager);
        let (first, second) = tokio::join!(
            tokio::spawn(async move { a.get().await.map(|_| ()) }),
            tokio::spawn(async move { b.get().await.map(|_| ()) }),
        );
        first.unwrap().unwrap();
        second.unwrap().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn both_gets_see_the_same_instance() {
        let manager = AgentManager::new(|| Ok(scripted_agent()));
        let one = manager.get().await.unwrap();
        let two = manager.get().await.unwrap();
        assert!(Arc::ptr_eq(&one, &two));
    }

    #[tokio::test]
    async fn failed_construction_retries_on_next_get() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let manager = AgentManager::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::Config {
                    message: "no API key".into(),
                })
            } else {
                Ok(scripted_agent())
            }
        });

        assert!(manager.get().await.is_err());
        assert!(manager.get().await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn reset_forces_reconstruction() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let manager = AgentManager::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(scripted_agent())
        });

        let before = manager.get().await.unwrap();
        manager.reset().await;
        let after = manager.get().await.unwrap();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn seeded_manager_skips_the_factory() {
        let manager = AgentManager::with_agent(scripted_agent());
        assert!(manager.get().await.is_ok());
    }
}
