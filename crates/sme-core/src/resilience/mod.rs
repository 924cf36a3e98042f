//! Per-user rate limiting and the model-call circuit breaker

mod circuit_breaker;
mod rate_limit;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use rate_limit::{RateLimitConfig, RateLimiter};
