//! HTTP server implementation using Hyper 1.0
//!
//! Wraps the [`Router`] with:
//! - one Tokio task per connection (HTTP/1.1, keep-alive)
//! - bounded body collection (413 past `max_body_size`)
//! - graceful shutdown on Ctrl+C/SIGTERM or a caller-supplied future
//! - request logging

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::StatusCode;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request as HyperRequest, Response as HyperResponse};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, error, info, warn};

use crate::error::{ApiError, ApiResult, ServerError};
use crate::request::{HttpMethod, Request};
use crate::response::Response;
use crate::router::Router;

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080")
    pub bind_addr: String,
    /// Maximum request body size in bytes (default: 10MB)
    pub max_body_size: usize,
    /// Enable request logging
    pub enable_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            max_body_size: 10 * 1024 * 1024, // 10MB
            enable_logging: true,
        }
    }
}

impl ServerConfig {
    /// Create a new server config with bind address
    pub fn new(bind_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            ..Default::default()
        }
    }

    /// Set maximum request body size
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Enable or disable request logging
    pub fn logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }
}

/// HTTP server
pub struct Server {
    router: Arc<Router>,
    config: ServerConfig,
}

impl Server {
    /// Create a new server
    pub fn new(router: Router, config: ServerConfig) -> Self {
        Self::with_shared_router(Arc::new(router), config)
    }

    /// Create a server around an already shared router
    pub fn with_shared_router(router: Arc<Router>, config: ServerConfig) -> Self {
        Self { router, config }
    }

    /// Run the server until Ctrl+C (SIGINT) or SIGTERM is received
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use courier_api::{Router, Server, ServerConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let router = Router::new();
    ///     let config = ServerConfig::new("127.0.0.1:8080");
    ///     Server::new(router, config).run().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn run(self) -> Result<(), ServerError> {
        let addr: SocketAddr =
            self.config
                .bind_addr
                .parse()
                .map_err(|source| ServerError::InvalidAddress {
                    addr: self.config.bind_addr.clone(),
                    source,
                })?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.config.bind_addr.clone(),
                source,
            })?;

        info!("Press Ctrl+C to shutdown");
        self.serve(listener, shutdown_signal()).await
    }

    /// Accept connections on `listener` until `shutdown` completes
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let local_addr = listener.local_addr()?;
        info!("Server listening on http://{}", local_addr);
        info!("Max body size: {} bytes", self.config.max_body_size);
        for route in self.router.routes() {
            info!("  {} {} -> {}", route.method, route.path, route.metadata.name);
        }

        let router = self.router.clone();
        let config = self.config.clone();

        tokio::select! {
            _ = accept_loop(listener, router, config) => {}
            _ = shutdown => {
                info!("Shutdown signal received, stopping server");
            }
        }

        Ok(())
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> &str {
        &self.config.bind_addr
    }

    /// Get the router
    pub fn router(&self) -> &Router {
        &self.router
    }
}

async fn accept_loop(listener: TcpListener, router: Arc<Router>, config: ServerConfig) {
    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                // Usually fd exhaustion; back off instead of spinning.
                warn!("Failed to accept connection: {}", err);
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let router = router.clone();
        let config = config.clone();

        // Spawn a task to handle this connection
        tokio::spawn(async move {
            let service = service_fn(move |req| {
                handle_request(req, router.clone(), config.clone(), remote_addr)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Error serving connection from {}: {:?}", remote_addr, err);
            }
        });
    }
}

/// Handle a single HTTP request
async fn handle_request(
    hyper_req: HyperRequest<Incoming>,
    router: Arc<Router>,
    config: ServerConfig,
    remote_addr: SocketAddr,
) -> Result<HyperResponse<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let (parts, body) = hyper_req.into_parts();
    let method = parts.method.clone();
    let path = parts.uri.path().to_string();

    let response = match HttpMethod::try_from(&parts.method) {
        Ok(http_method) => match collect_body(body, config.max_body_size).await {
            Ok(body) => {
                let mut req = Request::new(http_method, path.clone())
                    .with_headers(parts.headers)
                    .with_body(body);
                if let Some(query) = parts.uri.query() {
                    req = req.with_query(query);
                }
                router.dispatch(req).await
            }
            Err(err) => {
                warn!("Rejected body of {} {}: {}", method, path, err);
                Response::error(&err)
            }
        },
        Err(_) => {
            warn!("Unsupported HTTP method: {}", method);
            Response::error(&ApiError::MethodNotAllowed(format!(
                "Unsupported method: {}",
                method
            )))
        }
    };

    if config.enable_logging {
        info!(
            "{} {} {} - from {} in {:?}",
            method,
            path,
            response.status_code(),
            remote_addr,
            started.elapsed()
        );
    }

    Ok(convert_response_to_hyper(response))
}

/// Collect the body, refusing to buffer more than `max_size` bytes
async fn collect_body(body: Incoming, max_size: usize) -> ApiResult<Bytes> {
    match Limited::new(body, max_size).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => Err(
            ApiError::PayloadTooLarge(format!("Request body exceeds {} bytes", max_size)),
        ),
        Err(err) => Err(ApiError::BadRequest(format!(
            "Failed to read request body: {}",
            err
        ))),
    }
}

/// Convert Response to Hyper response
fn convert_response_to_hyper(response: Response) -> HyperResponse<Full<Bytes>> {
    let status =
        StatusCode::from_u16(response.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body_bytes = response.body_bytes();
    let content_length = body_bytes.len();

    let mut builder = HyperResponse::builder().status(status);
    for (name, value) in response.headers() {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if response.header_value("content-length").is_none() {
        builder = builder.header(CONTENT_LENGTH, content_length);
    }

    builder.body(Full::new(body_bytes)).unwrap_or_else(|err| {
        error!("Failed to build response: {}", err);
        let mut fallback = HyperResponse::new(Full::new(Bytes::from_static(
            b"Internal Server Error",
        )));
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
