//! Middleware system
//!
//! A middleware wraps the next handler in the chain: it receives the request
//! together with `next` and decides what to return. Wrapping happens once,
//! at route registration, so dispatch only sees plain `HandlerFn`s.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use tracing::warn;

use crate::error::ApiResult;
use crate::handler::HandlerFn;
use crate::request::Request;
use crate::response::Response;

/// Middleware trait
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Handle `req`, usually by calling `next(req)` and inspecting the result
    async fn handle(&self, req: Request, next: HandlerFn) -> ApiResult<Response>;
}

/// Wrap `next` with `middleware`
pub fn wrap(middleware: Arc<dyn Middleware>, next: HandlerFn) -> HandlerFn {
    Arc::new(move |req| {
        let middleware = middleware.clone();
        let next = next.clone();
        Box::pin(async move { middleware.handle(req, next).await })
    })
}

// ============================================================================
// Exception Middleware
// ============================================================================

/// Maps handler failures to a fixed status with an empty body
///
/// Both `Err` results and panics are caught. Successful responses pass
/// through untouched, whatever their status.
#[derive(Debug, Clone, Copy)]
pub struct ExceptionMiddleware {
    status: u16,
}

impl Default for ExceptionMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl ExceptionMiddleware {
    /// 418 I'm a teapot
    pub const DEFAULT_STATUS: u16 = 418;

    pub fn new() -> Self {
        Self::with_status(Self::DEFAULT_STATUS)
    }

    pub fn with_status(status: u16) -> Self {
        Self { status }
    }

    pub fn status(&self) -> u16 {
        self.status
    }
}

#[async_trait]
impl Middleware for ExceptionMiddleware {
    async fn handle(&self, req: Request, next: HandlerFn) -> ApiResult<Response> {
        let path = req.path().to_string();

        let future = match std::panic::catch_unwind(AssertUnwindSafe(|| next(req))) {
            Ok(future) => future,
            Err(panic) => {
                warn!("Handler for {} panicked: {}", path, panic_message(&*panic));
                return Ok(Response::for_status(self.status));
            }
        };

        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => {
                warn!("Handler for {} failed: {}", path, err);
                Ok(Response::for_status(self.status))
            }
            Err(panic) => {
                warn!("Handler for {} panicked: {}", path, panic_message(&*panic));
                Ok(Response::for_status(self.status))
            }
        }
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
