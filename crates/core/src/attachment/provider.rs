//! Sharable references for local files.
//!
//! A `FileProvider` exposes a set of named root directories under a single
//! authority. A file below one of them is published as
//! `content://<authority>/<root name>/<relative path>`; the real location
//! never leaves this process.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use url::Url;

const CONTENT_SCHEME: &str = "content";

/// Errors that can occur when converting between files and references.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Path is not absolute: {0}")]
    RelativePath(PathBuf),

    #[error("Path escapes its root: {0}")]
    Traversal(PathBuf),

    #[error("Failed to find configured root that contains {0}")]
    NoRoot(PathBuf),

    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8(PathBuf),

    #[error("Not a content URI: {0}")]
    NotContentUri(String),

    #[error("Unknown authority: {0}")]
    UnknownAuthority(String),

    #[error("Invalid URI: {0}")]
    InvalidUri(String),
}

#[derive(Debug, Clone)]
struct ProviderRoot {
    name: String,
    path: PathBuf,
}

/// Maps files under configured roots to `content://` references and back.
#[derive(Debug, Clone)]
pub struct FileProvider {
    authority: String,
    roots: Vec<ProviderRoot>,
}

impl FileProvider {
    pub fn new(authority: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            roots: Vec::new(),
        }
    }

    /// Expose `path` under `name`. Relative paths are taken from the working directory.
    pub fn with_root(mut self, name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let path = normalize(&absolute).unwrap_or(absolute);
        self.roots.push(ProviderRoot {
            name: name.into(),
            path,
        });
        self
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Build the sharable reference for a local file.
    pub fn uri_for_file(&self, path: &Path) -> Result<Url, ProviderError> {
        let path = normalize(path)?;

        let root = self
            .roots
            .iter()
            .filter(|root| path.starts_with(&root.path))
            .max_by_key(|root| root.path.components().count())
            .ok_or_else(|| ProviderError::NoRoot(path.clone()))?;

        let relative = path
            .strip_prefix(&root.path)
            .map_err(|_| ProviderError::NoRoot(path.clone()))?;

        let mut uri = format!(
            "{}://{}/{}",
            CONTENT_SCHEME,
            self.authority,
            urlencoding::encode(&root.name)
        );
        for segment in relative.components() {
            let segment = segment
                .as_os_str()
                .to_str()
                .ok_or_else(|| ProviderError::NonUtf8(path.clone()))?;
            uri.push('/');
            uri.push_str(&urlencoding::encode(segment));
        }

        Url::parse(&uri).map_err(|e| ProviderError::InvalidUri(e.to_string()))
    }

    /// Resolve a reference issued by this provider back to its file.
    pub fn path_for_uri(&self, uri: &Url) -> Result<PathBuf, ProviderError> {
        if uri.scheme() != CONTENT_SCHEME {
            return Err(ProviderError::NotContentUri(uri.to_string()));
        }
        if uri.host_str() != Some(self.authority.as_str()) {
            return Err(ProviderError::UnknownAuthority(
                uri.host_str().unwrap_or_default().to_string(),
            ));
        }

        let mut segments = uri
            .path_segments()
            .ok_or_else(|| ProviderError::InvalidUri(uri.to_string()))?
            .map(|s| {
                urlencoding::decode(s)
                    .map(|d| d.into_owned())
                    .map_err(|e| ProviderError::InvalidUri(e.to_string()))
            });

        let root_name = segments
            .next()
            .ok_or_else(|| ProviderError::InvalidUri(uri.to_string()))??;
        let root = self
            .roots
            .iter()
            .find(|root| root.name == root_name)
            .ok_or_else(|| ProviderError::InvalidUri(uri.to_string()))?;

        let mut path = root.path.clone();
        for segment in segments {
            let segment = segment?;
            if segment.is_empty() {
                continue;
            }
            if segment == "." || segment == ".." || segment.contains('/') {
                return Err(ProviderError::Traversal(path.join(segment)));
            }
            path.push(segment);
        }
        Ok(path)
    }
}

/// Lexically normalise an absolute path, refusing parent components.
fn normalize(path: &Path) -> Result<PathBuf, ProviderError> {
    if !path.is_absolute() {
        return Err(ProviderError::RelativePath(path.to_path_buf()));
    }

    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                normalized.push(component.as_os_str())
            }
            Component::CurDir => {}
            Component::ParentDir => return Err(ProviderError::Traversal(path.to_path_buf())),
        }
    }
    Ok(normalized)
}
