//! Host based routing for the single deployment serving every sub-application.
//!
//! The landing page lives on the bare and `www` root domain, the storefront
//! on `shop.` and the admin dashboard on `dashboard.`. Requests are mapped
//! onto internal path segments before the router sees them, so the browser
//! URL never changes. Legacy cart and product URLs on any other host are
//! redirected to the storefront.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, uri::PathAndQuery, HeaderMap, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, warn};

pub const LANDING_PATH: &str = "/landing";
pub const SHOP_PREFIX: &str = "/shop";
pub const DASHBOARD_PREFIX: &str = "/dashboard";

const PASSTHROUGH_PREFIXES: [&str; 3] = ["/api", "/_next", "/favicon.ico"];

/// What a rule does with a path that is not passed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteTarget {
    /// Serve every page path from one internal route.
    Fixed(String),
    /// Ensure the internal path starts with this prefix.
    Prefix(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRoutingRule {
    pub host: String,
    pub target: RewriteTarget,
    pub passthrough_prefixes: Vec<String>,
}

impl HostRoutingRule {
    fn new(host: String, target: RewriteTarget) -> Self {
        Self {
            host,
            target,
            passthrough_prefixes: PASSTHROUGH_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// API, build assets and anything that looks like a file skip rewriting.
    pub fn is_passthrough(&self, path: &str) -> bool {
        path.contains('.')
            || self
                .passthrough_prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
    }

    fn apply(&self, path: &str) -> RouteDecision {
        if self.is_passthrough(path) {
            return RouteDecision::Passthrough;
        }

        match &self.target {
            RewriteTarget::Fixed(target) => RouteDecision::Rewrite(target.clone()),
            RewriteTarget::Prefix(prefix) => {
                let already_prefixed = path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'));
                if already_prefixed {
                    RouteDecision::Passthrough
                } else if path == "/" || path.is_empty() {
                    RouteDecision::Rewrite(prefix.clone())
                } else {
                    RouteDecision::Rewrite(format!("{}{}", prefix, path))
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Leave the request untouched.
    Passthrough,
    /// Route internally to this path; the query string is kept.
    Rewrite(String),
    /// Send the client to this absolute URL.
    Redirect(String),
}

/// Static, read-only routing table for one root domain.
#[derive(Debug, Clone)]
pub struct HostRouter {
    shop_host: String,
    rules: Vec<HostRoutingRule>,
}

impl HostRouter {
    pub fn for_domain(root_domain: &str) -> Self {
        let root = normalize_host(root_domain);
        let shop_host = format!("shop.{}", root);

        let rules = vec![
            HostRoutingRule::new(root.clone(), RewriteTarget::Fixed(LANDING_PATH.to_string())),
            HostRoutingRule::new(
                format!("www.{}", root),
                RewriteTarget::Fixed(LANDING_PATH.to_string()),
            ),
            HostRoutingRule::new(
                shop_host.clone(),
                RewriteTarget::Prefix(SHOP_PREFIX.to_string()),
            ),
            HostRoutingRule::new(
                format!("dashboard.{}", root),
                RewriteTarget::Prefix(DASHBOARD_PREFIX.to_string()),
            ),
        ];

        Self { shop_host, rules }
    }

    pub fn shop_host(&self) -> &str {
        &self.shop_host
    }

    pub fn rules(&self) -> &[HostRoutingRule] {
        &self.rules
    }

    /// Decide how to route one request. Pure; evaluated in order, first match wins.
    pub fn resolve(&self, host: &str, path: &str, query: Option<&str>) -> RouteDecision {
        let host = normalize_host(host);

        if host != self.shop_host && is_legacy_shop_path(path) {
            let mut location = format!("https://{}{}", self.shop_host, path);
            if let Some(query) = query.filter(|q| !q.is_empty()) {
                location.push('?');
                location.push_str(query);
            }
            return RouteDecision::Redirect(location);
        }

        self.rules
            .iter()
            .find(|rule| rule.host == host)
            .map(|rule| rule.apply(path))
            .unwrap_or(RouteDecision::Passthrough)
    }
}

fn is_legacy_shop_path(path: &str) -> bool {
    path == "/cart" || path.starts_with("/cart/") || path.starts_with("/products/")
}

/// Lower-cases the host and drops any `:port` suffix.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let without_port = match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };
    without_port.to_ascii_lowercase()
}

fn request_host(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .or_else(|| uri.host().map(String::from))
}

fn rewrite_uri(uri: &Uri, path: &str) -> Option<Uri> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}

/// Applies [`HostRouter::resolve`] before routing.
///
/// Must wrap the router from the outside so rewrites are visible to it.
pub async fn host_routing_middleware(
    State(router): State<Arc<HostRouter>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(host) = request_host(request.headers(), request.uri()) else {
        return next.run(request).await;
    };

    let decision = router.resolve(&host, request.uri().path(), request.uri().query());
    match decision {
        RouteDecision::Passthrough => next.run(request).await,
        RouteDecision::Rewrite(path) => {
            match rewrite_uri(request.uri(), &path) {
                Some(uri) => {
                    debug!("Rewriting {}{} -> {}", host, request.uri().path(), path);
                    *request.uri_mut() = uri;
                }
                None => warn!("Could not rewrite {} to {}", request.uri(), path),
            }
            next.run(request).await
        }
        RouteDecision::Redirect(location) => {
            debug!("Redirecting {}{} -> {}", host, request.uri().path(), location);
            Redirect::temporary(&location).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> HostRouter {
        HostRouter::for_domain("bltnm.store")
    }

    #[test]
    fn normalize_host_strips_port_and_case() {
        assert_eq!(normalize_host("Shop.BLTNM.store:443"), "shop.bltnm.store");
        assert_eq!(normalize_host("localhost"), "localhost");
    }

    #[test]
    fn one_rule_per_host() {
        let router = router();
        let mut hosts: Vec<_> = router.rules().iter().map(|r| r.host.as_str()).collect();
        hosts.sort();
        hosts.dedup();
        assert_eq!(hosts.len(), router.rules().len());
    }

    #[test]
    fn prefix_rule_does_not_match_lookalike_segment() {
        assert_eq!(
            router().resolve("shop.bltnm.store", "/shopping", None),
            RouteDecision::Rewrite("/shop/shopping".to_string())
        );
    }

    #[test]
    fn root_of_prefixed_host_maps_to_bare_prefix() {
        assert_eq!(
            router().resolve("dashboard.bltnm.store", "/", None),
            RouteDecision::Rewrite("/dashboard".to_string())
        );
    }

    #[test]
    fn rewrite_uri_keeps_query() {
        let uri: Uri = "/foo?page=2".parse().unwrap();
        let rewritten = rewrite_uri(&uri, "/shop/foo").unwrap();
        assert_eq!(rewritten.path(), "/shop/foo");
        assert_eq!(rewritten.query(), Some("page=2"));
    }
}
