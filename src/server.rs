//! HTTP server: the blocking accept loop and graceful shutdown.
//!
//! One tokio task per connection, requests on a connection dispatched
//! through the shared [`Router`]. The loop runs until the process receives
//! SIGTERM or Ctrl-C, then stops accepting and drains in-flight connections
//! before returning.
//!
//! Per-connection protection lives here (header-read timeout, header-size
//! ceiling); per-*handler* budgets are the timeout middleware's job.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use http_body_util::BodyExt;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::context::HttpResponse;
use crate::error::ErrorBody;
use crate::router::Router;

/// The HTTP server. Configure with the builder-style setters, then
/// [`serve`](Server::serve).
pub struct Server {
    addr: SocketAddr,
    header_read_timeout: Duration,
    max_header_bytes: usize,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string — a configuration
    /// error, caught before the process does anything useful.
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self {
            addr,
            header_read_timeout: Duration::from_secs(15),
            max_header_bytes: 1 << 20, // 1 MiB
        }
    }

    /// How long a connection may take to deliver a full request header.
    pub fn header_read_timeout(mut self, timeout: Duration) -> Self {
        self.header_read_timeout = timeout;
        self
    }

    /// Ceiling on buffered header bytes per connection.
    pub fn max_header_bytes(mut self, bytes: usize) -> Self {
        self.max_header_bytes = bytes;
        self
    }

    /// Starts accepting connections and dispatching requests through
    /// `router`. Returns only after a full graceful shutdown.
    pub async fn serve(self, router: Router) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        let router = Arc::new(router);

        info!(addr = %self.addr, routes = router.len(), "pluma listening");

        // JoinSet tracks every connection task so shutdown can drain them.
        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        let header_read_timeout = self.header_read_timeout;
        let max_header_bytes = self.max_header_bytes;

        loop {
            tokio::select! {
                // `biased` checks shutdown first so SIGTERM stops the accept
                // loop immediately even with connections queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { Ok::<_, Infallible>(handle(router, req).await) }
                        });

                        let mut builder = ConnBuilder::new(TokioExecutor::new());
                        builder
                            .http1()
                            .timer(TokioTimer::new())
                            .header_read_timeout(header_read_timeout)
                            .max_buf_size(max_header_bytes);

                        if let Err(e) = builder.serve_connection(io, svc).await {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished tasks so the JoinSet stays bounded.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("pluma stopped");
        Ok(())
    }
}

/// Buffers the request body and hands the request to the router. Infallible
/// from hyper's point of view — every failure becomes a JSON error response.
async fn handle(router: Arc<Router>, req: hyper::Request<hyper::body::Incoming>) -> HttpResponse {
    let (head, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("failed to read request body: {e}");
            return ErrorBody::response(StatusCode::BAD_REQUEST, "failed to read request body");
        }
    };
    router.dispatch(http::Request::from_parts(head, body)).await
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal: SIGTERM (orchestrators) or SIGINT
/// (Ctrl-C, local dev). On non-Unix platforms only Ctrl-C exists.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
