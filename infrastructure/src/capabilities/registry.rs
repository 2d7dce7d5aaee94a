//! Capability registry
//!
//! The [`CapabilityRegistry`] aggregates capability handlers and implements
//! [`CapabilityPort`]. When two handlers serve the same capability, the one
//! with the higher priority wins.
//!
//! ```ignore
//! let registry = CapabilityRegistry::new()
//!     .register(RiskHandler)
//!     .register(ObservationHandler)
//!     .register(MemorySearchHandler::new(memory));
//! ```

use async_trait::async_trait;
use fleet_application::ports::capability::{CapabilityContext, CapabilityPort};
use fleet_domain::{Capability, CapabilityError, CapabilityName};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Serves one or more capabilities
#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    fn id(&self) -> &str;

    /// Higher wins when two handlers serve the same capability
    fn priority(&self) -> i32 {
        0
    }

    fn serves(&self) -> Vec<CapabilityName>;

    async fn invoke(
        &self,
        context: &CapabilityContext<'_>,
        capability: &Capability,
    ) -> Result<String, CapabilityError>;
}

#[derive(Default)]
pub struct CapabilityRegistry {
    routes: HashMap<CapabilityName, Arc<dyn CapabilityHandler>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H: CapabilityHandler + 'static>(self, handler: H) -> Self {
        self.register_arc(Arc::new(handler))
    }

    pub fn register_arc(mut self, handler: Arc<dyn CapabilityHandler>) -> Self {
        for name in handler.serves() {
            match self.routes.get(&name) {
                Some(current) if current.priority() >= handler.priority() => {
                    trace!(
                        capability = %name,
                        handler = handler.id(),
                        "Already served by a higher priority handler"
                    );
                }
                _ => {
                    debug!(capability = %name, handler = handler.id(), "Registered capability");
                    self.routes.insert(name, Arc::clone(&handler));
                }
            }
        }
        self
    }

    /// Handler id serving `name`, if any
    pub fn handler_for(&self, name: CapabilityName) -> Option<&str> {
        self.routes.get(&name).map(|h| h.id())
    }
}

#[async_trait]
impl CapabilityPort for CapabilityRegistry {
    fn available(&self) -> Vec<CapabilityName> {
        let mut names: Vec<CapabilityName> = self.routes.keys().copied().collect();
        names.sort_by_key(|n| n.as_str());
        names
    }

    async fn invoke(
        &self,
        context: &CapabilityContext<'_>,
        capability: &Capability,
    ) -> Result<String, CapabilityError> {
        let name = capability.name();
        let handler = self
            .routes
            .get(&name)
            .ok_or_else(|| CapabilityError::Unavailable(name.to_string()))?;
        debug!(
            agent_id = %context.agent_id,
            capability = %name,
            handler = handler.id(),
            "Invoking capability"
        );
        handler.invoke(context, capability).await
    }
}
