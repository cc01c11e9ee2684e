use super::{ResourceClient, ResourceError, normalize_url};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Reads `file://` urls from the local filesystem.
#[derive(Clone, Debug, Default)]
pub struct FileClient;

#[async_trait]
impl ResourceClient for FileClient {
    async fn get(
        &self,
        url: &str,
        _headers: Option<BTreeMap<String, String>>,
    ) -> Result<Vec<u8>, ResourceError> {
        let url = normalize_url(url);
        if let Some(path) = url.strip_prefix("file://") {
            let bytes = tokio::fs::read(path).await?;
            Ok(bytes)
        } else {
            Err(ResourceError::Unsupported(
                "This client supports only file:// urls.".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_through_unresolved_parent_segment() {
        let dir = std::env::temp_dir().join(format!("potree-index-file-{}", std::process::id()));
        tokio::fs::create_dir_all(dir.join("data")).await.unwrap();
        tokio::fs::write(dir.join("data/r.bin"), b"points").await.unwrap();

        let url = format!("file://{}/cloud.js/../data/r.bin", dir.display());
        let bytes = FileClient.get(&url, None).await.unwrap();
        assert_eq!(bytes, b"points");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn reject_other_schemes() {
        assert!(matches!(
            FileClient.get("http://host/cloud.js", None).await,
            Err(ResourceError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn missing_file_is_a_transport_error() {
        assert!(matches!(
            FileClient.get("file:///nonexistent/potree-index/cloud.js", None).await,
            Err(ResourceError::File(_))
        ));
    }
}
