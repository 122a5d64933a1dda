//! Reverse proxy fallback to the wrapped process.
//!
//! # Responsibilities
//! - Forward unmatched requests to `http://localhost:<port>`
//! - Preserve method, path, query, headers and (streamed) body
//! - Relay the backend response verbatim
//! - Map backend failures to 502 Bad Gateway
//!
//! # Design Decisions
//! - Single pooled client (connection reuse across requests)
//! - Bodies are streamed in both directions, never buffered
//! - The original `Host` header is kept; `X-Forwarded-For` is appended

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{HeaderValue, Request, StatusCode, Uri, Version};
use axum::response::Response;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::http::response::{self, strip_hop_by_hop};

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Error type for building a proxy.
#[derive(Debug, thiserror::Error)]
#[error("invalid proxy target {target:?}")]
pub struct ProxyError {
    target: String,
    #[source]
    source: axum::http::uri::InvalidUri,
}

/// Single-target reverse proxy.
#[derive(Debug, Clone)]
pub struct ReverseProxy {
    authority: Authority,
    client: Client<HttpConnector, Body>,
}

impl ReverseProxy {
    /// Build a proxy forwarding to the local `port`.
    pub fn new(port: u16) -> Result<Self, ProxyError> {
        let target = format!("localhost:{port}");
        let authority = target
            .parse::<Authority>()
            .map_err(|source| ProxyError { target, source })?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self { authority, client })
    }

    /// The backend address requests are forwarded to.
    pub fn target(&self) -> &Authority {
        &self.authority
    }

    /// Forward a request and relay the backend's response.
    pub async fn forward(&self, request: Request<Body>, client_addr: Option<SocketAddr>) -> Response {
        let (mut parts, body) = request.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));
        let mut uri_parts = axum::http::uri::Parts::default();
        uri_parts.scheme = Some(Scheme::HTTP);
        uri_parts.authority = Some(self.authority.clone());
        uri_parts.path_and_query = Some(path_and_query);
        parts.uri = match Uri::from_parts(uri_parts) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build upstream URI");
                return response::plain(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        // The pooled client speaks HTTP/1.1 to the backend regardless of the client's version.
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);
        if let Some(addr) = client_addr {
            append_forwarded_for(&mut parts.headers, addr);
        }

        let upstream = Request::from_parts(parts, body);
        let method = upstream.method().clone();
        let uri = upstream.uri().clone();

        match self.client.request(upstream).await {
            Ok(response) => relay(response),
            Err(e) => {
                tracing::error!(
                    method = %method,
                    uri = %uri,
                    error = %e,
                    "Upstream error"
                );
                response::plain(StatusCode::BAD_GATEWAY)
            }
        }
    }
}

fn relay(response: Response<Incoming>) -> Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}

/// Append the client IP to any existing `X-Forwarded-For` chain.
fn append_forwarded_for(headers: &mut axum::http::HeaderMap, addr: SocketAddr) {
    let ip = addr.ip().to_string();
    let chain = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{prior}, {ip}"),
        None => ip,
    };
    if let Ok(value) = HeaderValue::from_str(&chain) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
