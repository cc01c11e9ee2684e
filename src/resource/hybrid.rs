use super::{ResourceClient, ResourceError};
use crate::resource::file::FileClient;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Serves `file://` urls from disk and everything else through `inner`.
pub struct HybridClient<T: ResourceClient> {
    file_client: FileClient,
    inner: T,
}

impl<T: ResourceClient> HybridClient<T> {
    pub fn new(inner: T) -> Self {
        Self {
            file_client: FileClient,
            inner,
        }
    }
}

#[async_trait]
impl<T: ResourceClient> ResourceClient for HybridClient<T> {
    async fn get(
        &self,
        url: &str,
        headers: Option<BTreeMap<String, String>>,
    ) -> Result<Vec<u8>, ResourceError> {
        if url.starts_with("file://") {
            self.file_client.get(url, headers).await
        } else {
            self.inner.get(url, headers).await
        }
    }
}
