#[cfg(feature = "ehttp")]
pub mod ehttp;

#[cfg(feature = "fs")]
pub mod file;

#[cfg(feature = "reqwest")]
pub mod reqwest;

#[cfg(all(feature = "fs", feature = "reqwest"))]
pub mod hybrid;

pub mod memory;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Transport used to fetch metadata documents, hierarchy chunks and node files.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn get(
        &self,
        url: &str,
        headers: Option<BTreeMap<String, String>>,
    ) -> Result<Vec<u8>, ResourceError>;
}

#[async_trait]
impl<C: ResourceClient> ResourceClient for Arc<C> {
    async fn get(
        &self,
        url: &str,
        headers: Option<BTreeMap<String, String>>,
    ) -> Result<Vec<u8>, ResourceError> {
        (**self).get(url, headers).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected HTTP status code: {0}")]
    Status(u16),

    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported scheme: {0}")]
    Unsupported(String),
}

/// Joins `relative` onto `base` without resolving anything, e.g.
/// `http://host/cloud.js` + `data` gives `http://host/cloud.js/../data`.
pub fn join_relative(base: &str, relative: &str) -> String {
    format!("{}/../{}", base, relative)
}

/// True for urls carrying a scheme, such as `http://` or `file://`.
pub fn is_absolute_url(url: &str) -> bool {
    url.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Collapses `.` and `..` path segments, keeping the scheme and leading segment.
pub fn normalize_url(url: &str) -> String {
    let (prefix, path) = match url.split_once("://") {
        Some((scheme, rest)) => (format!("{}://", scheme), rest),
        None => (String::new(), url),
    };

    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&"..") | None => segments.push(".."),
                Some(_) => {
                    segments.pop();
                }
            },
            segment => segments.push(segment),
        }
    }

    format!(
        "{}{}{}",
        prefix,
        if absolute { "/" } else { "" },
        segments.join("/")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_urls() {
        assert!(is_absolute_url("http://host/data"));
        assert!(is_absolute_url("https://host/data"));
        assert!(is_absolute_url("file:///tmp/data"));
        assert!(!is_absolute_url("data"));
        assert!(!is_absolute_url("../data"));
        assert!(!is_absolute_url("://data"));
        assert!(!is_absolute_url("some dir://data"));
    }

    #[test]
    fn join_is_not_resolved() {
        assert_eq!(
            join_relative("http://host/cloud.json", "data"),
            "http://host/cloud.json/../data"
        );
    }

    #[test]
    fn normalize() {
        assert_eq!(normalize_url("http://host/cloud.json/../data"), "http://host/data");
        assert_eq!(
            normalize_url("file:///tmp/set/cloud.js/../data/./r/r0.bin"),
            "file:///tmp/set/data/r/r0.bin"
        );
        assert_eq!(normalize_url("assets/a/../../b"), "b");
        assert_eq!(normalize_url("../b"), "../b");
    }
}
