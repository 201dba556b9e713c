pub mod csrf;
pub mod host_routing;
pub mod rate_limit;
pub mod security_headers;

pub use csrf::{
    csrf_middleware, ensure_token, generate_csrf_token, invalidate_token, validate, CsrfConfig,
    CsrfToken, IssuedCsrfToken, CSRF_HEADER, CSRF_TOKEN_KEY,
};
pub use host_routing::{host_routing_middleware, HostRouter, RouteDecision};
pub use rate_limit::{rate_limit_middleware, FixedWindowRateLimiter, RateLimitDecision, RateLimiter};
pub use security_headers::add_security_headers;
