use std::path::PathBuf;
use tracing::{debug, warn};

use crate::http::encoding::accepts_gzip;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::static_files;

/// Where a request path is dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    /// Path contains a `.`: serve the file it names under the root
    File(&'a str),
    /// `/home` or `/`
    Home,
    /// Every other path. Answers like `Home`; there is no 404.
    Fallback,
}

impl<'a> Route<'a> {
    pub fn for_path(path: &'a str) -> Self {
        if path.contains('.') {
            Route::File(path)
        } else if path == "/home" || path == "/" {
            Route::Home
        } else {
            Route::Fallback
        }
    }
}

/// Turns parsed requests into responses
#[derive(Debug, Clone)]
pub struct Router {
    root: PathBuf,
}

impl Router {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn respond(&self, request: &Request<'_>) -> Response {
        match Route::for_path(request.line.path) {
            Route::File(path) => self.serve_file(path, accepts_gzip(request.accept_encoding)).await,
            Route::Home | Route::Fallback => Response::greeting(),
        }
    }

    async fn serve_file(&self, path: &str, gzip: bool) -> Response {
        let file = match static_files::read(&self.root, path).await {
            Ok(file) => file,
            Err(e) => {
                warn!(path, error = %e, "failed to serve file");
                return Response::bad_request();
            }
        };
        debug!(file = %file.path.display(), bytes = file.bytes.len(), gzip, "serving file");

        let response = Response::ok(file.content_type, file.bytes);
        if !gzip {
            return response;
        }
        match response.clone().gzipped() {
            Ok(compressed) => compressed,
            Err(e) => {
                warn!(path, error = %e, "gzip encoding failed, sending identity body");
                response
            }
        }
    }
}
