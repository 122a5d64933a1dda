//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use redirector::config::TimeoutConfig;
use redirector::http::ReverseProxy;
use redirector::routing::router::insert_route;
use redirector::routing::{Route, RouteTable};
use redirector::{HttpServer, Redirector, Shutdown, TerminalEvent};

/// Start a mock backend on an ephemeral port.
///
/// Every response body is the raw request head it answers, so tests can inspect
/// what was forwarded.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let body = String::from_utf8_lossy(&head).into_owned();
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\nX-Backend: echo\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Build a redirector from route specs.
pub fn redirector(specs: &[&str]) -> Redirector {
    let mut table = RouteTable::new();
    for spec in specs {
        insert_route(&mut table, Route::parse(spec).unwrap()).unwrap();
    }
    Redirector::new(table)
}

/// Build a redirector whose misses go to a backend on `port`.
pub fn redirector_with_fallback(specs: &[&str], port: u16) -> Redirector {
    redirector(specs).with_fallback(ReverseProxy::new(port).unwrap())
}

/// A redirector serving on an ephemeral port.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    handle: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server to drain.
    pub async fn stop(self) {
        self.stop_within(Duration::from_secs(5)).await;
    }

    /// Trigger shutdown and require the server to finish within `limit`.
    pub async fn stop_within(self, limit: Duration) {
        self.shutdown.trigger(TerminalEvent::Signal);
        tokio::time::timeout(limit, self.handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}

pub async fn start_server(redirector: Redirector) -> RunningServer {
    start_server_with(redirector, TimeoutConfig::default()).await
}

pub async fn start_server_with(redirector: Redirector, timeouts: TimeoutConfig) -> RunningServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = HttpServer::new(Arc::new(redirector), &timeouts);
    let waiter = shutdown.clone();
    let handle = tokio::spawn(server.run(listener, async move {
        waiter.wait().await;
    }));

    RunningServer {
        addr,
        shutdown,
        handle,
    }
}

/// HTTP client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
