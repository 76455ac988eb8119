use chrono::{DateTime, Utc};

use crate::utils::CircuitState;

// ============================================================================
// Health Reporting
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded(_) => "degraded",
            HealthStatus::Unhealthy(_) => "unhealthy",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            HealthStatus::Healthy => None,
            HealthStatus::Degraded(reason) | HealthStatus::Unhealthy(reason) => Some(reason),
        }
    }
}

impl From<CircuitState> for HealthStatus {
    fn from(state: CircuitState) -> Self {
        match state {
            CircuitState::Closed => HealthStatus::Healthy,
            CircuitState::HalfOpen => HealthStatus::Degraded("broker recovering".to_string()),
            CircuitState::Open => HealthStatus::Unhealthy("broker circuit open".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub last_check: DateTime<Utc>,
    pub details: Option<String>,
}

impl ComponentHealth {
    pub fn new(name: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            name: name.into(),
            status,
            last_check: Utc::now(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "name": self.name,
            "status": self.status.label(),
            "last_check": self.last_check.to_rfc3339(),
        });
        if let Some(reason) = self.status.reason() {
            body["reason"] = reason.into();
        }
        if let Some(details) = &self.details {
            body["details"] = details.as_str().into();
        }
        body
    }
}

/// Something the /health endpoint can ask about its state
#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn check_health(&self) -> ComponentHealth;
}

#[async_trait::async_trait]
impl HealthCheckable for crate::messaging::RedpandaClient {
    async fn check_health(&self) -> ComponentHealth {
        let state = self.circuit_state().await;
        ComponentHealth::new("redpanda_producer", state.into()).with_details(format!("circuit {:?}", state))
    }
}
