//! courier-multipart: permissive multipart/form-data upload extraction
//!
//! Turns a raw request body plus its `Content-Type` header into an ordered
//! list of `(bytes, Option<filename>)` pairs:
//! - multipart bodies are split on their declared boundary
//! - each part's filename comes from its `Content-Disposition` sub-header
//! - anything that is not a well-formed multipart body becomes a single
//!   anonymous part
//!
//! Extraction never fails on malformed input. The only error is an I/O
//! failure while draining a body reader (see [`read_and_extract`]).
//!
//! # Example
//!
//! ```rust
//! use courier_multipart::extract;
//!
//! let body = "--XYZ\r\n\
//!     Content-Disposition: form-data; name=\"f\"; filename=\"a.txt\"\r\n\
//!     \r\n\
//!     hello\r\n\
//!     --XYZ--";
//!
//! let result = extract(body, Some("multipart/form-data; boundary=XYZ"));
//! assert_eq!(result.len(), 1);
//! assert_eq!(&result[0].data[..], b"hello");
//! assert_eq!(result[0].filename.as_deref(), Some("a.txt"));
//! ```

pub mod content_type;
pub mod disposition;
pub mod encode;
pub mod error;
pub mod extract;
pub mod headers;
pub mod parser;

mod params;

pub use content_type::{Boundary, ContentType};
pub use disposition::ContentDisposition;
pub use encode::MultipartEncoder;
pub use error::{ParseError, Result};
pub use extract::{extract, read_and_extract, UploadResult, UploadedPart};
pub use headers::PartHeaders;
pub use parser::{MultipartParser, Part};
