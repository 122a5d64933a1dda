//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with a catch-all handler
//! - Wire up middleware (request ID, tracing, timeout)
//! - Bind server to listener
//! - Dispatch every request to the redirector

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::TimeoutConfig;
use crate::http::request::UuidRequestId;
use crate::routing::Redirector;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub redirector: Arc<Redirector>,
}

/// HTTP server for the redirector.
pub struct HttpServer {
    router: Router,
    drain_timeout: Duration,
}

impl HttpServer {
    /// Create a new HTTP server dispatching to `redirector`.
    pub fn new(redirector: Arc<Redirector>, timeouts: &TimeoutConfig) -> Self {
        let state = AppState { redirector };
        let router = Self::build_router(timeouts, state);
        Self {
            router,
            drain_timeout: Duration::from_secs(timeouts.shutdown_secs),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(timeouts: &TimeoutConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::with_status_code(
                        StatusCode::GATEWAY_TIMEOUT,
                        Duration::from_secs(timeouts.request_secs),
                    )),
            )
    }

    /// The configured router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server on `listener` until `shutdown` completes, then drain in-flight requests.
    ///
    /// Connections still open when the drain timeout expires are abandoned.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        let (draining_tx, draining_rx) = oneshot::channel();
        let signal = async move {
            shutdown.await;
            let _ = draining_tx.send(());
        };

        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .into_future();
        tokio::pin!(serve);

        tokio::select! {
            result = &mut serve => {
                result?;
                tracing::info!("HTTP server stopped");
                return Ok(());
            }
            Ok(()) = draining_rx => {}
        }

        match tokio::time::timeout(self.drain_timeout, &mut serve).await {
            Ok(result) => {
                result?;
                tracing::info!("HTTP server stopped");
            }
            Err(_) => {
                tracing::warn!(
                    drain_timeout_secs = self.drain_timeout.as_secs(),
                    "Drain timeout expired, abandoning open connections"
                );
            }
        }
        Ok(())
    }
}

/// Catch-all handler.
///
/// `ConnectInfo` is absent when the router is driven directly rather than through `run`.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    state.redirector.handle(request, client_addr).await
}
