//! Service health: the promotion store gates readiness, the tracking
//! consumer only degrades it.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Overall service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Calculations work, analytics do not
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Default)]
struct ComponentState {
    up: bool,
    message: Option<String>,
    changed_at: Option<DateTime<Utc>>,
}

/// Up/down flag for one dependency, with the reason it went down.
#[derive(Debug)]
pub struct ComponentHealth {
    name: &'static str,
    state: RwLock<ComponentState>,
}

impl ComponentHealth {
    /// Starts down until the component reports in.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: RwLock::new(ComponentState::default()),
        }
    }

    pub fn set_healthy(&self) {
        let mut state = self.state.write();
        if !state.up {
            state.changed_at = Some(Utc::now());
        }
        state.up = true;
        state.message = None;
    }

    pub fn set_unhealthy(&self, reason: impl Into<String>) {
        let mut state = self.state.write();
        if state.up || state.changed_at.is_none() {
            state.changed_at = Some(Utc::now());
        }
        state.up = false;
        state.message = Some(reason.into());
    }

    pub fn is_healthy(&self) -> bool {
        self.state.read().up
    }

    fn report(&self) -> ComponentHealthReport {
        let state = self.state.read().clone();
        ComponentHealthReport {
            name: self.name.to_string(),
            healthy: state.up,
            message: state.message,
            since: state.changed_at,
        }
    }
}

/// Body of `GET /health` (metrics are added by the API layer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealthReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealthReport {
    pub name: String,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Last time the flag flipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
}

pub struct HealthRegistry {
    /// Promotion catalogue, up once seeded
    pub store: ComponentHealth,
    /// Background consumer writing tracking events
    pub tracking: ComponentHealth,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            store: ComponentHealth::new("store"),
            tracking: ComponentHealth::new("tracking"),
        }
    }

    pub fn status(&self) -> HealthStatus {
        match (self.store.is_healthy(), self.tracking.is_healthy()) {
            (false, _) => HealthStatus::Unhealthy,
            (true, false) => HealthStatus::Degraded,
            (true, true) => HealthStatus::Healthy,
        }
    }

    pub fn report(&self) -> HealthReport {
        HealthReport {
            status: self.status(),
            components: vec![self.store.report(), self.tracking.report()],
        }
    }

    /// Ready as soon as the catalogue can be served.
    pub fn is_ready(&self) -> bool {
        self.store.is_healthy()
    }

    /// The process answers, so it is alive.
    pub fn is_alive(&self) -> bool {
        true
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static HEALTH: LazyLock<HealthRegistry> = LazyLock::new(HealthRegistry::new);

/// Process-wide health registry.
pub fn health() -> &'static HealthRegistry {
    &HEALTH
}
