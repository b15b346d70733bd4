//! courier-api: minimal HTTP application layer
//!
//! Just enough framework for the courier example services:
//! - `Request`/`Response` types with case-insensitive, multi-valued headers
//! - radix-tree routing per HTTP method (matchit)
//! - wrapping middleware, including the exception-to-status mapping
//! - a hyper HTTP/1 server with body limits and graceful shutdown

pub mod error;
pub mod handler;
pub mod middleware;
pub mod request;
pub mod response;
pub mod router;
pub mod server;

// Re-exports
pub use error::{ApiError, ApiResult, ServerError};
pub use handler::{from_handler, handler_fn, Handler, HandlerFn, HandlerMeta};
pub use middleware::{ExceptionMiddleware, Middleware};
pub use request::{HttpMethod, Request};
pub use response::{Response, ResponseBody};
pub use router::Router;
pub use server::{Server, ServerConfig};
