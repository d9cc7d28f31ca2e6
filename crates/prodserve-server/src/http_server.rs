//! HTTP Server
//!
//! hyper-based HTTP/1.1 front end for a [`FunctionHost`]. The server accepts
//! connections on a TCP socket and hands each request to the [`HostRouter`].
//!
//! # Architecture
//!
//! The HTTP server:
//! - Listens on a TCP socket for incoming HTTP connections
//! - Spawns a tokio task for each connection
//! - Collects each request body and dispatches method, path, query and body
//!   to the router
//! - Returns the router's JSON response as the HTTP response
//!
//! # Example
//!
//! ```no_run
//! use prodserve_server::{FunctionHost, HttpServer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let host = Arc::new(FunctionHost::new());
//!     let server = HttpServer::new(host);
//!     server.run("127.0.0.1:9910".parse().unwrap()).await.unwrap();
//! }
//! ```

use http_body_util::BodyExt;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::host::FunctionHost;
use crate::http_router::HostRouter;
use prodserve_common::protocol::error::ProdserveError;
use prodserve_common::transport::{HyperRequest, HyperResponse};

/// HTTP server exposing a function host.
pub struct HttpServer {
    /// The router for dispatching protocol requests
    router: Arc<HostRouter>,
}

impl HttpServer {
    /// Creates a new HTTP server over the given host.
    ///
    /// # Arguments
    ///
    /// * `host` - The function host to serve
    ///
    /// # Returns
    ///
    /// A new `HttpServer` instance
    pub fn new(host: Arc<FunctionHost>) -> Self {
        let router = Arc::new(HostRouter::new(host));
        Self { router }
    }

    /// Runs the HTTP server on the specified address.
    ///
    /// # Arguments
    ///
    /// * `addr` - The socket address to bind to
    ///
    /// # Returns
    ///
    /// A `Result` indicating success or failure
    pub async fn run(self, addr: SocketAddr) -> Result<(), ProdserveError> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            ProdserveError::Transport(format!("Failed to bind to {}: {}", addr, e))
        })?;
        self.serve(listener).await
    }

    /// Serves connections from an already-bound listener.
    ///
    /// Useful when the caller binds to an ephemeral port first and needs the
    /// resolved address before the server starts.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ProdserveError> {
        tracing::info!(
            "HTTP server listening on {}",
            listener.local_addr().map_err(|e| ProdserveError::Transport(
                format!("Failed to get local address: {}", e)
            ))?
        );

        loop {
            let (stream, _) = listener.accept().await.map_err(|e| {
                ProdserveError::Transport(format!("Failed to accept connection: {}", e))
            })?;

            let io = TokioIo::new(stream);
            let router = self.router.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let router = router.clone();
                    async move { Self::handle_request(router, req).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::error!("Error serving connection: {}", err);
                }
            });
        }
    }

    /// Handles an HTTP request.
    ///
    /// # Arguments
    ///
    /// * `router` - The router to dispatch the request to
    /// * `req` - The incoming HTTP request
    ///
    /// # Returns
    ///
    /// A `Result` containing the HTTP response or an error
    async fn handle_request(
        router: Arc<HostRouter>,
        req: HyperRequest,
    ) -> Result<HyperResponse, ProdserveError> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(str::to_string);

        let body = req
            .into_body()
            .collect()
            .await
            .map_err(|e| ProdserveError::Transport(format!("Failed to read request body: {}", e)))?
            .to_bytes();

        Ok(router.handle(&method, &path, query.as_deref(), body).await)
    }
}
