//! Redirect execution.
//!
//! Builds the `Location` for a matched route from a request-local copy of the route's
//! destination. The shared [`Route`] is never written to, so concurrent requests against the
//! same route cannot observe each other's paths or queries.

use axum::http::{header, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

use crate::http::response;
use crate::routing::route::{Destination, Route};

/// Compute the redirect destination for a request.
pub fn destination_for(route: &Route, uri: &Uri) -> Destination {
    let mut destination = route.destination.clone();
    if route.carry_path {
        destination.path = join_paths(&destination.path, uri.path());
    }
    if route.carry_query {
        destination.query = uri.query().map(str::to_string);
    }
    destination
}

/// Execute a route against a request, producing the redirect response.
pub fn execute(route: &Route, uri: &Uri) -> Response {
    let location = destination_for(route, uri).to_string();

    match HeaderValue::from_str(&location) {
        Ok(value) => (route.status, [(header::LOCATION, value)]).into_response(),
        Err(e) => {
            tracing::error!(pattern = %route.pattern, location = %location, error = %e, "Invalid Location header");
            response::plain(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Join two slash-separated paths and clean the result.
///
/// Empty elements are skipped; an empty result stays empty.
pub fn join_paths(base: &str, suffix: &str) -> String {
    let joined = [base, suffix]
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        return joined;
    }
    clean_path(&joined)
}

/// Lexically clean a path: collapse repeated slashes, resolve `.` and `..`, drop any
/// trailing slash.
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if !rooted => parts.push(".."),
                _ => {}
            },
            other => parts.push(other),
        }
    }

    let cleaned = parts.join("/");
    match (rooted, cleaned.is_empty()) {
        (true, _) => format!("/{cleaned}"),
        (false, true) => ".".to_string(),
        (false, false) => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("/a//b/"), "/a/b");
        assert_eq!(clean_path("/a/./b/../c"), "/a/c");
        assert_eq!(clean_path("/../a"), "/a");
        assert_eq!(clean_path("a/../.."), "..");
        assert_eq!(clean_path("/"), "/");
        assert_eq!(clean_path("./"), ".");
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("", "/foo"), "/foo");
        assert_eq!(join_paths("/blog", "/foo/"), "/blog/foo");
        assert_eq!(join_paths("/blog/", "//foo//bar"), "/blog/foo/bar");
        assert_eq!(join_paths("", "/"), "/");
        assert_eq!(join_paths("", ""), "");
    }

    #[test]
    fn test_carry_path_and_query() {
        let route = Route::parse("www.example.com/* example.com path query code=301").unwrap();
        let dest = destination_for(&route, &uri("/foo?x=1"));
        assert_eq!(dest.to_string(), "https://example.com/foo?x=1");
    }

    #[test]
    fn test_no_carry_keeps_destination() {
        let route = Route::parse("a.com/* https://b.com/landing?ref=a").unwrap();
        let dest = destination_for(&route, &uri("/foo?x=1"));
        assert_eq!(dest.to_string(), "https://b.com/landing?ref=a");
    }

    #[test]
    fn test_carry_query_replaces_or_clears() {
        let route = Route::parse("a.com/* https://b.com/?ref=a query").unwrap();
        assert_eq!(
            destination_for(&route, &uri("/x?y=%20z")).to_string(),
            "https://b.com/?y=%20z"
        );
        assert_eq!(destination_for(&route, &uri("/x")).to_string(), "https://b.com/");
    }

    #[test]
    fn test_root_request_adds_no_trailing_slash() {
        let route = Route::parse("a.com/* example.com/blog path").unwrap();
        assert_eq!(destination_for(&route, &uri("/")).to_string(), "https://example.com/blog");
        assert_eq!(destination_for(&route, &uri("/post/")).to_string(), "https://example.com/blog/post");
    }

    #[test]
    fn test_route_is_not_mutated() {
        let route = Route::parse("a.com/* b.com/base path query").unwrap();
        let before = route.clone();

        let first = destination_for(&route, &uri("/one?a=1"));
        let second = destination_for(&route, &uri("/two"));

        assert_eq!(first.to_string(), "https://b.com/base/one?a=1");
        assert_eq!(second.to_string(), "https://b.com/base/two");
        assert_eq!(route, before);
    }

    #[test]
    fn test_execute_sets_status_and_location() {
        let route = Route::parse("a.com/* b.com path code=307").unwrap();
        let response = execute(&route, &uri("/docs"));
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://b.com/docs"
        );
    }
}
