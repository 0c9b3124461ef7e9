//! Static asset delegation for paths outside the tunnel routes.

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;
use std::path::{Component, Path, PathBuf};

/// Map a request path onto a file under `root`. Returns `None` for paths
/// that would escape `root`.
fn asset_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(request_path).ok()?;
    let relative = decoded.trim_start_matches('/');

    let mut path = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if relative.is_empty() || relative.ends_with('/') {
        path.push("index.html");
    }
    Some(path)
}

/// Read the asset for `request_path`, if there is one. Any failure yields
/// `None` so the caller can fall back to its default payload.
pub async fn serve(root: &Path, request_path: &str) -> Option<Response> {
    let path = asset_path(root, request_path)?;
    let bytes = tokio::fs::read(&path).await.ok()?;
    let mime = mime_guess::from_path(&path).first_or_octet_stream();

    tracing::debug!(path = %path.display(), "serving static asset");

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_path_rejects_traversal() {
        let root = Path::new("/srv/www");
        assert_eq!(
            asset_path(root, "/app.js"),
            Some(PathBuf::from("/srv/www/app.js"))
        );
        assert_eq!(
            asset_path(root, "/"),
            Some(PathBuf::from("/srv/www/index.html"))
        );
        assert_eq!(
            asset_path(root, "/docs/"),
            Some(PathBuf::from("/srv/www/docs/index.html"))
        );
        assert_eq!(asset_path(root, "/../etc/passwd"), None);
        assert_eq!(asset_path(root, "/%2e%2e/etc/passwd"), None);
    }

    #[tokio::test]
    async fn test_serves_file_with_mime_type() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>hi</h1>").unwrap();
        std::fs::write(dir.path().join("style.css"), "body{}").unwrap();

        let response = serve(dir.path(), "/").await.unwrap();
        assert_eq!(response.headers()["content-type"], "text/html");

        let response = serve(dir.path(), "/style.css").await.unwrap();
        assert_eq!(response.headers()["content-type"], "text/css");

        assert!(serve(dir.path(), "/missing.js").await.is_none());
    }
}
