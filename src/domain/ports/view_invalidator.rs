//! View invalidation port.
//!
//! Consumers that cache a host's event list subscribe to invalidations keyed
//! by `(host_id, view)`. The reconciler only emits the signal; it does not
//! care how consumers react.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::models::HostId;

/// Named family of cached views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewName {
    /// Every cached list of a host's events, whatever the status filter.
    Events,
}

impl ViewName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Events => "events",
        }
    }
}

/// Key identifying a family of cached views.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewKey {
    pub host_id: HostId,
    pub view: ViewName,
}

impl ViewKey {
    /// The `(host_id, "events")` key.
    pub fn events(host_id: &HostId) -> Self {
        Self {
            host_id: host_id.clone(),
            view: ViewName::Events,
        }
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.host_id, self.view.as_str())
    }
}

/// Accepts invalidation signals for cached views.
#[async_trait]
pub trait ViewInvalidator: Send + Sync {
    /// Mark every view under `key` stale.
    async fn invalidate(&self, key: &ViewKey);
}

/// Invalidator for contexts with no cached views.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullViewInvalidator;

#[async_trait]
impl ViewInvalidator for NullViewInvalidator {
    async fn invalidate(&self, _key: &ViewKey) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_key_display() {
        let host = HostId::parse("H1").unwrap();
        assert_eq!(ViewKey::events(&host).to_string(), "(H1, events)");
    }
}
