use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

// ============================================================================
// Circuit Breaker - guards the outbound broker
// ============================================================================
//
// States:
// - Closed: sends pass through
// - Open: too many consecutive failures, sends fail fast
// - HalfOpen: cool-down elapsed, probing with real sends
//
// Every transition is reported to the optional observer (the metrics gauge).
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Gauge encoding: 0=Closed, 1=Open, 2=HalfOpen
    pub fn as_gauge(self) -> u8 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening
    pub failure_threshold: u32,
    /// Cool-down before a half-open probe
    pub timeout: Duration,
    /// Successes in half-open needed to close
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(30),
            success_threshold: 3,
        }
    }
}

type Observer = Arc<dyn Fn(CircuitState) + Send + Sync>;

struct Inner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
}

#[derive(Clone)]
pub struct CircuitBreaker {
    inner: Arc<Mutex<Inner>>,
    config: CircuitBreakerConfig,
    observer: Option<Observer>,
}

#[derive(Debug)]
pub enum CircuitBreakerError<E> {
    CircuitOpen,
    OperationFailed(E),
}

impl<E: std::fmt::Display> std::fmt::Display for CircuitBreakerError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitBreakerError::CircuitOpen => write!(f, "Circuit breaker is open"),
            CircuitBreakerError::OperationFailed(e) => write!(f, "Operation failed: {}", e),
        }
    }
}

impl<E: std::error::Error> std::error::Error for CircuitBreakerError<E> {}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                opened_at: None,
            })),
            config,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: impl Fn(CircuitState) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Run `operation` unless the circuit is open
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        {
            let mut inner = self.inner.lock().await;
            if inner.state == CircuitState::Open {
                let cooled = inner
                    .opened_at
                    .map_or(true, |opened| opened.elapsed() >= self.config.timeout);
                if !cooled {
                    return Err(CircuitBreakerError::CircuitOpen);
                }
                self.transition(&mut inner, CircuitState::HalfOpen);
            }
        }

        let result = operation.await;

        let mut inner = self.inner.lock().await;
        match result {
            Ok(value) => {
                self.on_success(&mut inner);
                Ok(value)
            }
            Err(err) => {
                self.on_failure(&mut inner);
                Err(CircuitBreakerError::OperationFailed(err))
            }
        }
    }

    fn on_success(&self, inner: &mut Inner) {
        inner.failure_count = 0;
        if inner.state == CircuitState::HalfOpen {
            inner.success_count += 1;
            if inner.success_count >= self.config.success_threshold {
                self.transition(inner, CircuitState::Closed);
            }
        }
    }

    fn on_failure(&self, inner: &mut Inner) {
        inner.failure_count += 1;
        match inner.state {
            CircuitState::Closed if inner.failure_count >= self.config.failure_threshold => {
                self.transition(inner, CircuitState::Open);
            }
            CircuitState::HalfOpen => self.transition(inner, CircuitState::Open),
            _ => {}
        }
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState) {
        tracing::warn!(
            from = ?inner.state,
            to = ?to,
            failures = inner.failure_count,
            "Circuit breaker transition"
        );

        inner.state = to;
        inner.success_count = 0;
        match to {
            CircuitState::Open => inner.opened_at = Some(Instant::now()),
            CircuitState::Closed => {
                inner.failure_count = 0;
                inner.opened_at = None;
            }
            CircuitState::HalfOpen => {}
        }

        if let Some(observer) = &self.observer {
            observer(to);
        }
    }

    pub async fn get_state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    pub async fn get_failure_count(&self) -> u32 {
        self.inner.lock().await.failure_count
    }
}
