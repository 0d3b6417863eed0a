// ========================================================
// File: lunar-core/src/http.rs
// ========================================================
//! REST client abstraction for the streaming platform APIs
//!
//! Both Twitch (Helix) and YouTube (Data API v3) are plain authenticated GETs
//! against a fixed host that answer with JSON. `ApiClient` is the seam the
//! stream sources talk through, so tests can script responses without a
//! network.
//!
//! Outcomes of `ApiClient::call`:
//!
//! - `Ok(ApiData::Present(json))`: HTTP 200 with a parseable body
//! - `Ok(ApiData::Absent)`: any other status; "no data" is a normal outcome
//! - `Err(Error::Http(_))`: transport failure or timeout
//! - `Err(Error::Json(_))`: a 200 whose body is not JSON
//!
//! Nothing here retries. The next scheduled poll is the retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{trace, warn};
use url::Url;

use crate::Error;

/// Tagged result of an API call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiData {
    Present(Value),
    Absent,
}

impl ApiData {
    /// Deserializes a present body into `T`.
    pub fn parse<T: DeserializeOwned>(self) -> Result<Option<T>, Error> {
        match self {
            ApiData::Present(v) => Ok(Some(serde_json::from_value(v)?)),
            ApiData::Absent => Ok(None),
        }
    }
}

#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn call(&self, path: &str, query: &[(&str, &str)]) -> Result<ApiData, Error>;
}

/// How the client proves its identity to the API.
#[derive(Debug, Clone)]
pub enum ApiAuth {
    /// Extra request headers (Twitch `Client-ID` / `Authorization`).
    Headers(Vec<(String, String)>),
    /// A query parameter appended to every request (YouTube `key`).
    QueryKey { name: String, value: String },
}

/// reqwest-backed `ApiClient` bound to one host and a fixed set of endpoints.
#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: Url,
    auth: ApiAuth,
    endpoints: &'static [&'static str],
}

impl RestClient {
    /// `base_url` must end with a `/` so endpoint paths join beneath it.
    pub fn new(
        base_url: &str,
        auth: ApiAuth,
        endpoints: &'static [&'static str],
        timeout: Duration,
    ) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Parse(format!("invalid API base URL '{base_url}': {e}")))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            auth,
            endpoints,
        })
    }

    /// Builds the full request URL, rejecting endpoints outside the allowed set.
    pub fn endpoint_url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, Error> {
        if !self.endpoints.contains(&path) {
            return Err(Error::Platform(format!(
                "'{path}' is not a known endpoint of {}",
                self.base_url
            )));
        }

        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| Error::Parse(format!("bad endpoint path '{path}': {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
            if let ApiAuth::QueryKey { name, value } = &self.auth {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl ApiClient for RestClient {
    async fn call(&self, path: &str, query: &[(&str, &str)]) -> Result<ApiData, Error> {
        let url = self.endpoint_url(path, query)?;

        let mut request = self.client.get(url);
        if let ApiAuth::Headers(headers) = &self.auth {
            for (key, value) in headers {
                request = request.header(key.as_str(), value.as_str());
            }
        }

        let response = request.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            warn!("GET {path} on {} answered HTTP {status}; treating as no data", self.base_url);
            return Ok(ApiData::Absent);
        }

        let body = response.text().await?;
        trace!("GET {path} => {} bytes", body.len());
        let json: Value = serde_json::from_str(&body)?;
        Ok(ApiData::Present(json))
    }
}
