use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Serialize};

use super::serialization_strategy::SerializationStrategy;
use super::GenerationError;
use crate::prelude::*;

/// A thin wrapper over an HTTP client that encodes and decodes bodies with a
/// [`SerializationStrategy`]. Every failure is reported as a
/// [`GenerationError`]; there is no fallback value.
pub struct HttpClient<S> {
    client: reqwest::Client,
    strategy: S,
}

impl<S: SerializationStrategy> HttpClient<S> {
    pub fn new(strategy: S, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Could not build the HTTP client")?;
        Ok(Self::from_client(client, strategy))
    }

    pub fn from_client(client: reqwest::Client, strategy: S) -> Self {
        Self { client, strategy }
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub async fn post<B, T>(&self, url: &str, payload: &B) -> Result<T, GenerationError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .strategy
            .encode(payload)
            .map_err(GenerationError::Encode)?;
        log::debug!("Posting {} bytes to {url}", body.len());

        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, self.strategy.content_type())
            .header(ACCEPT, self.strategy.content_type())
            .body(body);
        self.execute(request).await
    }

    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, GenerationError> {
        log::debug!("Fetching {url}");
        let request = self
            .client
            .get(url)
            .header(ACCEPT, self.strategy.content_type());
        self.execute(request).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GenerationError> {
        let response = request.send().await.map_err(GenerationError::Transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(GenerationError::Transport)?;

        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        log::debug!("Parsing {} byte response ({status})", bytes.len());
        self.strategy
            .decode(&bytes)
            .map_err(GenerationError::Decode)
    }
}
