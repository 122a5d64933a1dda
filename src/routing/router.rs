//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Own the compiled route table and the optional fallback
//! - Resolve each request to a redirect, a proxied response, or 404
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Constructed explicitly and shared via `Arc`, never held in a global
//! - A miss is an expected outcome, not an error

use std::borrow::Cow;
use std::net::SocketAddr;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use percent_encoding::percent_decode_str;

use crate::http::proxy::ReverseProxy;
use crate::http::request::{request_host, request_id};
use crate::http::response;
use crate::observability::metrics;
use crate::routing::matcher::{route_key, PatternTrie, TrieError};
use crate::routing::redirect;
use crate::routing::route::Route;

/// Table of routes keyed by pattern.
pub type RouteTable = PatternTrie<Route>;

/// Insert a route under its own pattern.
pub fn insert_route(table: &mut RouteTable, route: Route) -> Result<(), TrieError> {
    let pattern = route.pattern.clone();
    table.insert(&pattern, route)
}

/// Redirects requests according to a route table.
#[derive(Debug)]
pub struct Redirector {
    routes: RouteTable,
    fallback: Option<ReverseProxy>,
}

impl Redirector {
    /// Create a redirector answering misses with 404.
    pub fn new(routes: RouteTable) -> Self {
        Self {
            routes,
            fallback: None,
        }
    }

    /// Forward requests matching no route to `proxy` instead of answering 404.
    pub fn with_fallback(mut self, proxy: ReverseProxy) -> Self {
        self.fallback = Some(proxy);
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Find the route for a request host and path.
    pub fn lookup(&self, host: &str, path: &str) -> Option<&Route> {
        self.routes.lookup(&route_key(host, path))
    }

    /// Handle one request.
    pub async fn handle(&self, request: Request<Body>, client_addr: Option<SocketAddr>) -> Response {
        let start_time = Instant::now();
        let method = request.method().to_string();
        let key = route_key(request_host(&request), &decoded_path(request.uri().path()));

        if let Some(route) = self.routes.lookup(&key) {
            let response = redirect::execute(route, request.uri());
            tracing::debug!(
                request_id = %request_id(&request),
                key = %key,
                pattern = %route.pattern,
                status = %response.status(),
                "Redirecting request"
            );
            metrics::record_request(&method, "redirect", response.status(), start_time);
            return response;
        }

        match &self.fallback {
            Some(proxy) => {
                tracing::debug!(request_id = %request_id(&request), key = %key, "Forwarding unmatched request");
                let response = proxy.forward(request, client_addr).await;
                metrics::record_request(&method, "proxy", response.status(), start_time);
                response
            }
            None => {
                tracing::info!(
                    request_id = %request_id(&request),
                    key = %key,
                    "Request did not match any configured routes"
                );
                metrics::record_request(&method, "not_found", StatusCode::NOT_FOUND, start_time);
                response::plain(StatusCode::NOT_FOUND)
            }
        }
    }
}

/// Percent-decode a request path for matching; the raw path is kept if it is not UTF-8.
fn decoded_path(path: &str) -> Cow<'_, str> {
    percent_decode_str(path)
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use std::sync::Arc;
    use tokio::task::JoinSet;

    fn redirector(specs: &[&str]) -> Redirector {
        let mut table = RouteTable::new();
        for spec in specs {
            insert_route(&mut table, Route::parse(spec).unwrap()).unwrap();
        }
        Redirector::new(table)
    }

    fn request(host: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("Host", host)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_lookup_by_host_and_path() {
        let r = redirector(&["a.com/x b.com", "a.com/* c.com"]);
        assert_eq!(r.lookup("a.com", "/x/").unwrap().pattern, "a.com/x");
        assert_eq!(r.lookup("A.COM", "/y").unwrap().pattern, "a.com/*");
        assert!(r.lookup("b.com", "/x").is_none());
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let mut table = RouteTable::new();
        insert_route(&mut table, Route::parse("a.com/x b.com").unwrap()).unwrap();
        let err = insert_route(&mut table, Route::parse("a.com/x c.com").unwrap()).unwrap_err();
        assert!(matches!(err, TrieError::Duplicate { .. }));

        let r = Redirector::new(table);
        assert_eq!(
            r.lookup("a.com", "/x").unwrap().destination.to_string(),
            "https://b.com"
        );
    }

    #[tokio::test]
    async fn test_handle_redirect() {
        let r = redirector(&["www.example.com/* example.com path query code=301"]);
        let response = r.handle(request("www.example.com", "/foo?x=1"), None).await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://example.com/foo?x=1"
        );
    }

    #[tokio::test]
    async fn test_handle_matches_decoded_path() {
        let r = redirector(&[r#""a.com/my page" b.com"#, "a.com/café c.com"]);

        let spaced = r.handle(request("a.com", "/my%20page"), None).await;
        assert_eq!(spaced.headers().get(header::LOCATION).unwrap(), "https://b.com");

        let accented = r.handle(request("a.com", "/caf%C3%A9"), None).await;
        assert_eq!(accented.headers().get(header::LOCATION).unwrap(), "https://c.com");
    }

    #[tokio::test]
    async fn test_carried_path_stays_encoded() {
        let r = redirector(&["a.com/* b.com path"]);
        let response = r.handle(request("a.com", "/my%20page"), None).await;
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://b.com/my%20page"
        );
    }

    #[test]
    fn test_invalid_utf8_path_kept_raw() {
        assert_eq!(decoded_path("/caf%E9"), "/caf%E9");
        assert_eq!(decoded_path("/a%2Fb"), "/a/b");
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_route() {
        let r = Arc::new(redirector(&["a.com/* b.com/base path query"]));

        let mut tasks = JoinSet::new();
        for i in 0..16 {
            let r = Arc::clone(&r);
            tasks.spawn(async move {
                let uri = format!("/page/{i}?n={i}");
                let response = r.handle(request("a.com", &uri), None).await;
                let location = response.headers().get(header::LOCATION).unwrap().to_str().unwrap().to_string();
                (i, location)
            });
        }

        while let Some(result) = tasks.join_next().await {
            let (i, location) = result.unwrap();
            assert_eq!(location, format!("https://b.com/base/page/{i}?n={i}"));
        }
        assert_eq!(
            r.lookup("a.com", "/x").unwrap().destination.to_string(),
            "https://b.com/base"
        );
    }

    #[tokio::test]
    async fn test_handle_miss_without_fallback() {
        let r = redirector(&[]);
        assert!(!r.has_fallback());
        let response = r.handle(request("other.com", "/"), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
