//! Handler trait and metadata
//!
//! Handlers are the core units of request processing. The router stores
//! every handler as a type-erased [`HandlerFn`]; closures go through
//! [`handler_fn`] and trait objects through [`from_handler`].

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::error::ApiResult;
use crate::request::Request;
use crate::response::Response;

/// Type-erased async handler
pub type HandlerFn = Arc<dyn Fn(Request) -> BoxFuture<'static, ApiResult<Response>> + Send + Sync>;

/// Handler trait for stateful request processors
#[async_trait]
pub trait Handler: Send + Sync {
    /// Process a request and return a response
    async fn handle(&self, req: Request) -> ApiResult<Response>;
}

/// Handler metadata, used for route listings and logs
#[derive(Debug, Clone)]
pub struct HandlerMeta {
    /// Handler name
    pub name: String,
    /// One-line summary
    pub summary: Option<String>,
}

impl HandlerMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summary: None,
        }
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// Erase an async closure into a [`HandlerFn`]
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ApiResult<Response>> + Send + 'static,
{
    Arc::new(move |req| Box::pin(f(req)))
}

/// Erase a [`Handler`] implementation into a [`HandlerFn`]
pub fn from_handler<H: Handler + 'static>(handler: Arc<H>) -> HandlerFn {
    Arc::new(move |req| {
        let handler = handler.clone();
        Box::pin(async move { handler.handle(req).await })
    })
}
