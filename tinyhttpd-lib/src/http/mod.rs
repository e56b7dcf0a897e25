//! Hand-rolled HTTP/1.x surface: one request line in, one buffered response out.

pub mod encoding;
pub mod request;
pub mod response;
pub mod router;
pub mod static_files;

pub use request::{Request, RequestError, RequestLine, RequestLineError, MAX_REQUEST_BYTES};
pub use response::{Response, Status, GREETING};
pub use router::{Route, Router};
