use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StaticFileError {
    #[error("path escapes the served root: {0}")]
    Traversal(String),
    #[error("path does not name a file: {0}")]
    NoFileName(String),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// File contents ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFile {
    pub path: PathBuf,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Map a request path onto a file below `root`.
///
/// Only plain names are accepted: `..`, absolute components and drive prefixes
/// are refused, `.` is skipped.
pub fn resolve(root: &Path, request_path: &str) -> Result<PathBuf, StaticFileError> {
    let relative = Path::new(request_path.trim_start_matches('/'));
    let mut resolved = root.to_path_buf();
    let mut depth = 0usize;

    for component in relative.components() {
        match component {
            Component::Normal(name) => {
                resolved.push(name);
                depth = depth.saturating_add(1);
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(StaticFileError::Traversal(request_path.to_string()));
            }
        }
    }

    if depth == 0 {
        return Err(StaticFileError::NoFileName(request_path.to_string()));
    }
    Ok(resolved)
}

/// Content type by file extension
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        _ => "text/plain",
    }
}

pub async fn read(root: &Path, request_path: &str) -> Result<StaticFile, StaticFileError> {
    let path = resolve(root, request_path)?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| StaticFileError::Read { path: path.clone(), source })?;
    Ok(StaticFile { content_type: content_type(&path), path, bytes })
}
