//! Serving adapter: hyper in, [`RouteRegistry`] dispatch, hyper out.
//!
//! The registry is built before [`Server::serve`] is called and moved behind
//! an `Arc`; from then on it is only read. For each request:
//!
//! 1. no route matches: `404 Not Found`
//! 2. the matched route's authentication fails: the provider's failure response
//! 3. otherwise: the route's handler
//!
//! # Graceful shutdown
//!
//! On SIGTERM or Ctrl-C the server stops accepting connections, lets every
//! in-flight connection finish, then returns from [`Server::serve`].

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::registry::{MatchResult, RouteRegistry};
use crate::request::Request;
use crate::response::Response;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` (`host:port`) when
    /// [`serve`](Server::serve) is called.
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let addr = addr.parse().map_err(|_| Error::InvalidAddress(addr.to_owned()))?;
        Ok(Self { addr })
    }

    pub fn addr(&self) -> SocketAddr { self.addr }

    /// Serves `registry` until SIGTERM or Ctrl-C, then drains in-flight
    /// connections.
    pub async fn serve(self, registry: RouteRegistry) -> Result<(), Error> {
        self.serve_with_shutdown(registry, shutdown_signal()).await
    }

    /// Serves `registry` until `signal` resolves, then drains in-flight
    /// connections.
    pub async fn serve_with_shutdown(
        self,
        registry: RouteRegistry,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let registry = Arc::new(registry);

        info!(addr = %self.addr, routes = registry.len(), "junction listening");

        let mut tasks = tokio::task::JoinSet::new();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Shutdown first, so a signal stops accepting immediately even
                // with connections queued.
                biased;

                () = &mut signal => {
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

                    let registry = Arc::clone(&registry);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let registry = Arc::clone(&registry);
                            async move { serve_request(registry, req, remote_addr).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("junction stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

async fn serve_request(
    registry: Arc<RouteRegistry>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_http());
        }
    };

    let response = dispatch(&registry, Request::from_parts(parts, body)).await;
    Ok(response.into_http())
}

/// Routes one request and produces one response. Never fails: every outcome
/// is an HTTP response.
pub async fn dispatch(registry: &RouteRegistry, request: Request) -> Response {
    let route = match registry.match_request(&request).await {
        MatchResult::Matched(route) => route,
        MatchResult::NotMatched     => return Response::status(StatusCode::NOT_FOUND),
    };

    if !route.authenticate_request(&request).await.succeeded() {
        debug!(route = route.name(), path = request.path(), "authentication failed");
        return route.failed_authentication_response(&request);
    }

    match route.respond(request).await {
        Ok(response) => response,
        Err(e) => {
            error!(route = route.name(), "{e}");
            Response::status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C). On Windows only Ctrl-C
/// is available. A handler that cannot be installed never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => { sigterm.recv().await; }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_rejects_bad_address() {
        assert!(matches!(Server::bind("not-an-address"), Err(Error::InvalidAddress(_))));
        assert_eq!(Server::bind("127.0.0.1:3000").unwrap().addr().port(), 3000);
    }
}
