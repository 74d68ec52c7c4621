use async_trait::async_trait;
use reqwest::{Client, Url};

use super::LoadTarget;
use crate::error::{ConfigError, TargetError};

/// GETs one URL per job.
///
/// A job succeeds only if the request goes out, the status is 2xx, *and* the
/// body reads to completion; each of the three failure classes maps to its
/// own [`TargetError`] variant. The client reuses pooled connections across
/// jobs; the per-job deadline is the dispatcher's timeout, not the client's.
pub struct HttpTarget {
    client: Client,
    url: Url,
}

impl HttpTarget {
    pub fn new(url: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(url).map_err(|e| ConfigError::InvalidTargetUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl LoadTarget for HttpTarget {
    async fn call(&self) -> Result<(), TargetError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| TargetError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TargetError::Status(status.as_u16()));
        }

        response
            .bytes()
            .await
            .map_err(|e| TargetError::Body(e.to_string()))?;
        Ok(())
    }
}
