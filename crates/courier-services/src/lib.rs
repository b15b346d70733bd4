//! courier-services: example HTTP services
//!
//! - calculator: `GET /add` and `GET /unsafeadd`
//! - file upload: `PUT /upload` (raw body) and `POST /upload` (multipart)
//!
//! plus the configuration, logging and assembly used by the `courier` binary.

pub mod app;
pub mod calculator;
pub mod config;
pub mod logging;
pub mod storage;
pub mod upload;

pub use app::{build_router, build_server, run, run_until};
pub use config::{Cli, LogFormat, ServiceConfig};
pub use logging::init_logging;
pub use storage::{FileStore, StorageError, StoredFile};
pub use upload::UploadHandler;
