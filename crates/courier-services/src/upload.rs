//! File upload service
//!
//! `PUT /upload` takes a raw body, `POST /upload` a `multipart/form-data`
//! form. Both go through the same extractor, so a multipart `PUT` works
//! too and a plain `POST` is stored as a single anonymous file. A request
//! either stores all of its files or none of them.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use courier_api::{
    from_handler, ApiResult, ExceptionMiddleware, Handler, HandlerMeta, HttpMethod, Request,
    Response, Router,
};
use courier_multipart::extract;
use tracing::{debug, error, info, warn};

use crate::storage::{FileStore, StorageError};

pub const STORED_MESSAGE: &str = "Thanks, come again.";
pub const NO_DATA_MESSAGE: &str = "No file data has been included in the request!";
pub const SAVE_FAILED_MESSAGE: &str = "We failed to save the file, please try again.";
pub const CONFLICT_MESSAGE: &str = "A file with that name already exists.";

/// Stores every non-empty part of the request body
pub struct UploadHandler {
    store: FileStore,
}

impl UploadHandler {
    pub fn new(store: FileStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Undo the files a failed request already wrote
    async fn discard(&self, names: &[String]) {
        for name in names {
            match self.store.remove(name).await {
                Ok(()) => debug!("Rolled back {}", name),
                Err(err) => error!("Failed to roll back {}: {}", name, err),
            }
        }
    }
}

#[async_trait]
impl Handler for UploadHandler {
    async fn handle(&self, req: Request) -> ApiResult<Response> {
        if !req.has_payload() {
            return Ok(Response::bad_request(NO_DATA_MESSAGE));
        }

        let content_type = req.content_type().map(str::to_string);
        let uploads = extract(req.into_body(), content_type.as_deref());

        // Browsers send an empty part for a file input left blank.
        let files: Vec<_> = uploads
            .into_parts()
            .into_iter()
            .filter(|part| !part.data.is_empty())
            .collect();
        if files.is_empty() {
            return Ok(Response::bad_request(NO_DATA_MESSAGE));
        }

        // Claim every declared name up front so a refused request writes nothing.
        let mut declared = HashSet::new();
        for part in &files {
            let (name, content_named) =
                FileStore::target_name(&part.data, part.filename.as_deref());
            if content_named {
                continue;
            }
            let taken = match self.store.contains(&name).await {
                Ok(taken) => taken,
                Err(err) => {
                    error!("Upload failed: {}", err);
                    return Ok(Response::internal_error(SAVE_FAILED_MESSAGE));
                }
            };
            if taken || !declared.insert(name.clone()) {
                warn!("Refusing to overwrite {}", name);
                return Ok(Response::for_status(409).with_payload(CONFLICT_MESSAGE));
            }
        }

        let count = files.len();
        let mut created = Vec::with_capacity(count);
        for part in files {
            let failure = match self.store.save(&part.data, part.filename.as_deref()).await {
                Ok(stored) => {
                    info!(
                        "Upload stored as {} ({}, new: {})",
                        stored.name,
                        stored.human_size(),
                        stored.created
                    );
                    if stored.created {
                        created.push(stored.name);
                    }
                    continue;
                }
                Err(StorageError::Conflict(name)) => {
                    warn!("Refusing to overwrite {}", name);
                    Response::for_status(409).with_payload(CONFLICT_MESSAGE)
                }
                Err(err) => {
                    error!("Upload failed: {}", err);
                    Response::internal_error(SAVE_FAILED_MESSAGE)
                }
            };
            self.discard(&created).await;
            return Ok(failure);
        }

        info!("Stored {} uploaded file(s)", count);
        Ok(Response::created().with_payload(STORED_MESSAGE))
    }
}

/// Register `PUT /upload` and `POST /upload`, both behind the exception middleware
pub fn register(router: &mut Router, store: FileStore) -> ApiResult<()> {
    let handler = from_handler(Arc::new(UploadHandler::new(store)));
    let exceptions = Arc::new(ExceptionMiddleware::new());

    router.route_with(
        HttpMethod::Put,
        "/upload",
        exceptions.clone(),
        handler.clone(),
        HandlerMeta::new("upload_raw").summary("Store the request body as a file"),
    )?;
    router.route_with(
        HttpMethod::Post,
        "/upload",
        exceptions,
        handler,
        HandlerMeta::new("upload_form").summary("Store each part of a multipart form"),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_multipart::{Boundary, MultipartEncoder};

    fn handler(dir: &tempfile::TempDir) -> UploadHandler {
        UploadHandler::new(FileStore::new(dir.path()))
    }

    #[tokio::test]
    async fn test_empty_body_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let resp = handler(&dir)
            .handle(Request::new(HttpMethod::Put, "/upload"))
            .await
            .unwrap();
        assert_eq!(resp.status_code(), 400);
        assert_eq!(resp.body_text(), NO_DATA_MESSAGE);
    }

    #[tokio::test]
    async fn test_raw_body_stored_by_hash() {
        let dir = tempfile::tempdir().unwrap();
        let req = Request::new(HttpMethod::Put, "/upload").with_body("raw bytes");

        let resp = handler(&dir).handle(req).await.unwrap();
        assert_eq!(resp.status_code(), 201);
        assert_eq!(resp.body_text(), STORED_MESSAGE);

        let path = dir.path().join(FileStore::content_name(b"raw bytes"));
        assert_eq!(std::fs::read(path).unwrap(), b"raw bytes");
    }

    #[tokio::test]
    async fn test_multipart_parts_stored_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut encoder = MultipartEncoder::new(Boundary::new("XYZ").unwrap());
        encoder
            .add_file("f", Some("a.txt"), b"alpha")
            .add_file("f", Some("b.txt"), b"beta")
            .add_file("blank", Some("unused.txt"), b"");
        let req = Request::new(HttpMethod::Post, "/upload")
            .with_header("Content-Type", &encoder.content_type())
            .with_body(encoder.finish());

        let resp = handler(&dir).handle(req).await.unwrap();
        assert_eq!(resp.status_code(), 201);
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"alpha");
        assert_eq!(std::fs::read(dir.path().join("b.txt")).unwrap(), b"beta");
        assert!(!dir.path().join("unused.txt").exists());
    }

    #[tokio::test]
    async fn test_only_empty_parts_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let mut encoder = MultipartEncoder::new(Boundary::new("XYZ").unwrap());
        encoder.add_file("f", Some("empty.txt"), b"");
        let req = Request::new(HttpMethod::Post, "/upload")
            .with_header("Content-Type", &encoder.content_type())
            .with_body(encoder.finish());

        let resp = handler(&dir).handle(req).await.unwrap();
        assert_eq!(resp.status_code(), 400);
    }

    #[tokio::test]
    async fn test_duplicate_declared_name_is_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let mut encoder = MultipartEncoder::new(Boundary::new("dup").unwrap());
        encoder
            .add_file("f", Some("same.txt"), b"first")
            .add_file("f", Some("same.txt"), b"second");
        let req = Request::new(HttpMethod::Post, "/upload")
            .with_header("Content-Type", &encoder.content_type())
            .with_body(encoder.finish());

        let resp = handler(&dir).handle(req).await.unwrap();
        assert_eq!(resp.status_code(), 409);
        assert_eq!(resp.body_text(), CONFLICT_MESSAGE);
        assert!(!dir.path().join("same.txt").exists());
    }

    #[tokio::test]
    async fn test_conflict_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("taken.txt"), b"original").unwrap();

        let mut encoder = MultipartEncoder::new(Boundary::new("XYZ").unwrap());
        encoder
            .add_file("f", Some("fresh.txt"), b"fresh")
            .add_file("f", None, b"anonymous")
            .add_file("f", Some("taken.txt"), b"replacement");
        let req = Request::new(HttpMethod::Post, "/upload")
            .with_header("Content-Type", &encoder.content_type())
            .with_body(encoder.finish());

        let resp = handler(&dir).handle(req).await.unwrap();
        assert_eq!(resp.status_code(), 409);
        assert!(!dir.path().join("fresh.txt").exists());
        assert!(!dir.path().join(FileStore::content_name(b"anonymous")).exists());
        assert_eq!(std::fs::read(dir.path().join("taken.txt")).unwrap(), b"original");

        // Nothing was half-written, so the same form succeeds once the name is free.
        std::fs::remove_file(dir.path().join("taken.txt")).unwrap();
        let mut encoder = MultipartEncoder::new(Boundary::new("XYZ").unwrap());
        encoder
            .add_file("f", Some("fresh.txt"), b"fresh")
            .add_file("f", None, b"anonymous")
            .add_file("f", Some("taken.txt"), b"replacement");
        let req = Request::new(HttpMethod::Post, "/upload")
            .with_header("Content-Type", &encoder.content_type())
            .with_body(encoder.finish());
        let resp = handler(&dir).handle(req).await.unwrap();
        assert_eq!(resp.status_code(), 201);
        assert_eq!(std::fs::read(dir.path().join("taken.txt")).unwrap(), b"replacement");
    }

    #[tokio::test]
    async fn test_failed_part_rolls_back_earlier_parts() {
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on the hash name makes the second write fail.
        let blocker = dir.path().join(FileStore::content_name(b"second"));
        std::fs::create_dir(&blocker).unwrap();

        let mut encoder = MultipartEncoder::new(Boundary::new("XYZ").unwrap());
        encoder
            .add_file("f", Some("first.txt"), b"first")
            .add_file("f", None, b"second");
        let req = Request::new(HttpMethod::Post, "/upload")
            .with_header("Content-Type", &encoder.content_type())
            .with_body(encoder.finish());

        let resp = handler(&dir).handle(req).await.unwrap();
        assert_eq!(resp.status_code(), 500);
        assert_eq!(resp.body_text(), SAVE_FAILED_MESSAGE);
        assert!(!dir.path().join("first.txt").exists());
    }

    #[tokio::test]
    async fn test_write_failure_is_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("missing"));
        let req = Request::new(HttpMethod::Put, "/upload").with_body("data");

        let resp = UploadHandler::new(store).handle(req).await.unwrap();
        assert_eq!(resp.status_code(), 500);
        assert_eq!(resp.body_text(), SAVE_FAILED_MESSAGE);
    }

    #[test]
    fn test_register_routes() {
        let mut router = Router::new();
        register(&mut router, FileStore::new("unused")).unwrap();
        assert!(router.match_route(HttpMethod::Put, "/upload").is_some());
        assert!(router.match_route(HttpMethod::Post, "/upload").is_some());
        assert!(router.match_route(HttpMethod::Get, "/upload").is_none());
    }
}
