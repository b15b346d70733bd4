//! Router for HTTP request routing
//!
//! Uses a radix tree (matchit) per HTTP method. A path registered under a
//! different method produces 405 with an `Allow` header; an unknown path
//! produces 404.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::{debug, error};

use crate::error::{ApiError, ApiResult};
use crate::handler::{HandlerFn, HandlerMeta};
use crate::middleware::{panic_message, wrap, Middleware};
use crate::request::{HttpMethod, Request};
use crate::response::Response;

/// Registered route with metadata
pub struct Route {
    pub method: HttpMethod,
    pub path: String,
    /// Handler function, already wrapped by its middleware
    pub handler: HandlerFn,
    pub metadata: HandlerMeta,
}

/// Route match result
pub struct RouteMatch<'a> {
    /// Matched route
    pub route: &'a Route,
    /// Extracted path parameters
    pub params: HashMap<String, String>,
}

/// HTTP Router using radix tree (matchit)
#[derive(Default)]
pub struct Router {
    /// Route trees per HTTP method, values index into `routes`
    trees: HashMap<HttpMethod, matchit::Router<usize>>,
    /// Routes in registration order
    routes: Vec<Route>,
}

impl Router {
    /// Create a new router
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route
    pub fn route(
        &mut self,
        method: HttpMethod,
        path: &str,
        handler: HandlerFn,
        metadata: HandlerMeta,
    ) -> ApiResult<()> {
        let route_id = self.routes.len();

        let tree = self.trees.entry(method).or_default();
        tree.insert(path, route_id)
            .map_err(|e| ApiError::Internal(format!("Route registration failed: {}", e)))?;

        self.routes.push(Route {
            method,
            path: path.to_string(),
            handler,
            metadata,
        });

        Ok(())
    }

    /// Register a route whose handler is wrapped by `middleware`
    pub fn route_with(
        &mut self,
        method: HttpMethod,
        path: &str,
        middleware: Arc<dyn Middleware>,
        handler: HandlerFn,
        metadata: HandlerMeta,
    ) -> ApiResult<()> {
        self.route(method, path, wrap(middleware, handler), metadata)
    }

    /// Match a request to a route
    pub fn match_route(&self, method: HttpMethod, path: &str) -> Option<RouteMatch<'_>> {
        let tree = self.trees.get(&method)?;
        let matched = tree.at(path).ok()?;
        let route = self.routes.get(*matched.value)?;

        let params: HashMap<String, String> = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Some(RouteMatch { route, params })
    }

    /// Methods with a route matching `path`
    pub fn allowed_methods(&self, path: &str) -> Vec<HttpMethod> {
        let mut methods: Vec<HttpMethod> = self
            .trees
            .iter()
            .filter(|(_, tree)| tree.at(path).is_ok())
            .map(|(method, _)| *method)
            .collect();
        methods.sort_by_key(|method| method.as_str());
        methods
    }

    /// All registered routes, in registration order
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    // Convenience methods

    /// Register a GET route
    pub fn get(&mut self, path: &str, handler: HandlerFn, metadata: HandlerMeta) -> ApiResult<()> {
        self.route(HttpMethod::Get, path, handler, metadata)
    }

    /// Register a POST route
    pub fn post(&mut self, path: &str, handler: HandlerFn, metadata: HandlerMeta) -> ApiResult<()> {
        self.route(HttpMethod::Post, path, handler, metadata)
    }

    /// Register a PUT route
    pub fn put(&mut self, path: &str, handler: HandlerFn, metadata: HandlerMeta) -> ApiResult<()> {
        self.route(HttpMethod::Put, path, handler, metadata)
    }

    /// Route `req` to its handler and turn the outcome into a response
    ///
    /// Handler errors become their status with a JSON `detail` body. A
    /// panic that no middleware caught becomes a 500.
    pub async fn dispatch(&self, mut req: Request) -> Response {
        let method = req.method();
        let path = req.path().to_string();

        let Some(matched) = self.match_route(method, &path) else {
            let allowed = self.allowed_methods(&path);
            if allowed.is_empty() {
                debug!("No route for {} {}", method, path);
                return Response::error(&ApiError::NotFound(path));
            }

            let allow = allowed
                .iter()
                .map(HttpMethod::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            return Response::error(&ApiError::MethodNotAllowed(format!("{} {}", method, path)))
                .header("allow", allow);
        };

        req.set_path_params(matched.params);
        let handler = matched.route.handler.clone();

        let outcome = match std::panic::catch_unwind(AssertUnwindSafe(|| handler(req))) {
            Ok(future) => AssertUnwindSafe(future).catch_unwind().await,
            Err(panic) => Err(panic),
        };

        match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                if err.status_code() >= 500 {
                    error!("Handler error on {} {}: {}", method, path, err);
                } else {
                    debug!("Handler rejected {} {}: {}", method, path, err);
                }
                Response::error(&err)
            }
            Err(panic) => {
                error!(
                    "Handler panicked on {} {}: {}",
                    method,
                    path,
                    panic_message(&*panic)
                );
                Response::error(&ApiError::Internal("handler panicked".to_string()))
            }
        }
    }
}
