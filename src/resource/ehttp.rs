use super::{ResourceClient, ResourceError};
use async_trait::async_trait;
#[cfg(target_arch = "wasm32")]
use ehttp::Mode;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Default)]
pub struct EhttpClient;

#[async_trait]
impl ResourceClient for EhttpClient {
    async fn get(
        &self,
        url: &str,
        headers: Option<BTreeMap<String, String>>,
    ) -> Result<Vec<u8>, ResourceError> {
        let (tx, rx) = futures::channel::oneshot::channel();

        let mut request_headers = ehttp::Headers::default();
        for (k, v) in headers.unwrap_or_default() {
            request_headers.insert(k, v);
        }

        let request = ehttp::Request {
            method: "GET".to_owned(),
            url: url.to_string(),
            body: vec![],
            headers: request_headers,
            #[cfg(target_arch = "wasm32")]
            mode: Mode::default(),
        };

        ehttp::fetch(request, move |res| {
            let _ = tx.send(res);
        });

        let response = rx
            .await
            .map_err(|_| ResourceError::Network("channel closed".to_string()))?
            .map_err(ResourceError::Network)?;

        if !response.ok {
            return Err(ResourceError::Status(response.status));
        }

        Ok(response.bytes)
    }
}
