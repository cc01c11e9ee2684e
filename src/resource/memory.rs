use super::{ResourceClient, ResourceError, normalize_url};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// Serves resources from memory, keyed by normalized url.
///
/// Every request is recorded, which makes it handy to check what a loader
/// actually fetched.
#[derive(Debug, Default)]
pub struct MemoryClient {
    resources: BTreeMap<String, Bytes>,
    requests: Mutex<Vec<String>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: &str, bytes: impl Into<Bytes>) {
        self.resources.insert(normalize_url(url), bytes.into());
    }

    pub fn with(mut self, url: &str, bytes: impl Into<Bytes>) -> Self {
        self.insert(url, bytes);
        self
    }

    /// Normalized urls requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ResourceClient for MemoryClient {
    async fn get(
        &self,
        url: &str,
        _headers: Option<BTreeMap<String, String>>,
    ) -> Result<Vec<u8>, ResourceError> {
        let url = normalize_url(url);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.clone());

        self.resources
            .get(&url)
            .map(|bytes| bytes.to_vec())
            .ok_or(ResourceError::NotFound(url))
    }
}
