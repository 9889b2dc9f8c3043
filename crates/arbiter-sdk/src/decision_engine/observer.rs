//! Decision observers
//!
//! Observers run after a decision is stored: webhook emission, case
//! creation for block-and-review outcomes and the like. A failing observer
//! is logged and never fails the decision.

use arbiter_core::Decision;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait DecisionObserver: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    async fn on_decision(&self, decision: &Decision) -> anyhow::Result<()>;
}

pub(crate) async fn notify_all(observers: &[Arc<dyn DecisionObserver>], decision: &Decision) {
    for observer in observers {
        if let Err(e) = observer.on_decision(decision).await {
            tracing::warn!(
                "Observer '{}' failed for decision {}: {}",
                observer.name(),
                decision.id,
                e
            );
        }
    }
}
