//! Static file serving.

use crate::handler::RequestHandler;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use switchyard_http::protocol::{HandlerError, Header, Method, Request, Response, ResponseBody, StatusCode};
use tokio::fs::File;
use tracing::debug;

const INDEX_FILE: &str = "index.html";

/// Serves the files under a root directory, registered through
/// [`RouterBuilder::files`](crate::router::RouterBuilder::files).
///
/// The file is named by the `path` catch-all parameter. Directories serve their
/// `index.html`, a missing file or a path climbing out of the root with `..` is a `404`,
/// and any method but `GET` is a `501`. All three errors carry a short text body.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub const PATH_PARAM: &'static str = "path";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps the decoded request path below the root, or `None` if it tries to leave it.
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for segment in relative.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => return None,
                segment => path.push(segment),
            }
        }
        Some(path)
    }

    async fn open(path: &Path) -> io::Result<(File, u64, PathBuf)> {
        let metadata = tokio::fs::metadata(path).await?;
        let path = if metadata.is_dir() { path.join(INDEX_FILE) } else { path.to_path_buf() };

        let file = File::open(&path).await?;
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "not a regular file"));
        }
        Ok((file, metadata.len(), path))
    }
}

#[async_trait]
impl RequestHandler for StaticFiles {
    async fn invoke(&self, request: Request) -> Result<Response, HandlerError> {
        if request.method() != Method::Get {
            return Ok(Response::text(StatusCode::NOT_IMPLEMENTED, format!("{} is not supported for static files", request.method())));
        }

        let relative = request.path_param(Self::PATH_PARAM).unwrap_or_default();
        let Some(path) = self.resolve(relative) else {
            debug!(path = request.path(), "rejected static file path");
            return Ok(not_found(request.path()));
        };

        match Self::open(&path).await {
            Ok((file, len, path)) => {
                let content_type = mime_guess::from_path(&path).first_or_octet_stream();
                let header = Header::new("Content-Type", content_type.as_ref()).map_err(HandlerError::internal)?;
                Ok(Response::new(StatusCode::OK).header(header).with_body(ResponseBody::file(file, len)))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "static file not found");
                Ok(not_found(request.path()))
            }
            Err(e) => Err(HandlerError::internal(e)),
        }
    }
}

fn not_found(path: &str) -> Response {
    Response::text(StatusCode::NOT_FOUND, format!("file not found: {path}"))
}
