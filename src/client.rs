//! REST client for the Tsuga API.
//!
//! One HTTP call per operation, a fixed request timeout and no retries.
//! Successful responses wrap the entity in `{"data": ...}`; failed ones carry
//! `{"requestId": ..., "error": {"code", "message", "statusCode"}}`.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::ResolvedConfig;
use crate::error::ProviderError;

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Value of the `x-tsuga-source` header.
pub const SOURCE_HEADER_VALUE: &str = "tsuga-provider";

/// Commit the binary was built from, taken from `TSUGA_PROVIDER_COMMIT` at
/// build time.
pub const SOURCE_COMMIT: &str = match option_env!("TSUGA_PROVIDER_COMMIT") {
    Some(commit) => commit,
    None => "unknown",
};

/// Build date, taken from `TSUGA_PROVIDER_BUILD_DATE` at build time.
pub const SOURCE_DATE: &str = match option_env!("TSUGA_PROVIDER_BUILD_DATE") {
    Some(date) => date,
    None => "unknown",
};

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorEnvelope {
    #[serde(default)]
    request_id: Option<String>,
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status_code: Option<u16>,
}

/// Authenticated client shared by every resource handler.
#[derive(Debug, Clone)]
pub struct TsugaClient {
    http: reqwest::Client,
    base_url: Url,
    token: SecretString,
}

impl TsugaClient {
    /// Build a client from resolved provider settings.
    pub fn new(config: &ResolvedConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        })
    }

    /// The API endpoint this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// POST `body` to `path` and decode the created entity.
    pub async fn create<B, T>(&self, path: &str, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path, None)?;
        let response = self.send(self.request(Method::POST, url).json(body)).await?;
        decode_data(response).await
    }

    /// GET `path/{id}`. Returns `None` when the API answers 404.
    pub async fn get<T>(&self, path: &str, id: &str) -> Result<Option<T>, ProviderError>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path, Some(id))?;
        let response = self.request(Method::GET, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(path, id, "resource not found");
            return Ok(None);
        }
        let response = check_response(response).await?;
        decode_data(response).await.map(Some)
    }

    /// PUT `body` to `path/{id}` and decode the updated entity.
    pub async fn update<B, T>(&self, path: &str, id: &str, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path, Some(id))?;
        let response = self.send(self.request(Method::PUT, url).json(body)).await?;
        decode_data(response).await
    }

    /// DELETE `path/{id}`. Returns `false` when the resource was already gone.
    pub async fn delete(&self, path: &str, id: &str) -> Result<bool, ProviderError> {
        let url = self.endpoint(path, Some(id))?;
        let response = self.request(Method::DELETE, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(path, id, "resource already deleted");
            return Ok(false);
        }
        check_response(response).await?;
        Ok(true)
    }

    /// GET `path?query` for endpoints that look objects up by attributes
    /// rather than by id. Returns `None` when the API answers 404.
    pub async fn find<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<Option<T>, ProviderError>
    where
        T: DeserializeOwned,
    {
        let mut url = self.endpoint(path, None)?;
        url.query_pairs_mut().extend_pairs(query);
        let response = self.request(Method::GET, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(path, "lookup found nothing");
            return Ok(None);
        }
        let response = check_response(response).await?;
        decode_data(response).await.map(Some)
    }

    /// PUT `body` to the collection `path` itself.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path, None)?;
        let response = self.send(self.request(Method::PUT, url).json(body)).await?;
        decode_data(response).await
    }

    /// DELETE the collection `path` with a JSON body identifying the object.
    /// Returns `false` when it was already gone.
    pub async fn delete_matching<B>(&self, path: &str, body: &B) -> Result<bool, ProviderError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path, None)?;
        let response = self.request(Method::DELETE, url).json(body).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(path, "resource already deleted");
            return Ok(false);
        }
        check_response(response).await?;
        Ok(true)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "sending request");
        self.http
            .request(method, url)
            .bearer_auth(self.token.expose_secret())
            .header(reqwest::header::ACCEPT, "application/json")
            .header("x-tsuga-source", SOURCE_HEADER_VALUE)
            .header("x-tsuga-source-version", env!("CARGO_PKG_VERSION"))
            .header("x-tsuga-source-commit", SOURCE_COMMIT)
            .header("x-tsuga-source-date", SOURCE_DATE)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ProviderError> {
        let response = builder.send().await?;
        check_response(response).await
    }

    fn endpoint(&self, path: &str, id: Option<&str>) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                ProviderError::Configuration(format!(
                    "base_url {} cannot carry a path",
                    self.base_url
                ))
            })?;
            segments
                .pop_if_empty()
                .extend(path.trim_matches('/').split('/'));
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }
}

/// Turn a non-2xx response into [`ProviderError::Api`].
async fn check_response(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Could not read error response body".to_string());
    debug!(status = status.as_u16(), "request failed");
    Err(api_error(status.as_u16(), &body))
}

fn api_error(status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => ProviderError::Api {
            status: envelope.error.status_code.unwrap_or(status),
            code: envelope.error.code,
            message: envelope
                .error
                .message
                .unwrap_or_else(|| body.to_string()),
            request_id: envelope.request_id,
        },
        Err(_) => ProviderError::Api {
            status,
            code: None,
            message: body.to_string(),
            request_id: None,
        },
    }
}

async fn decode_data<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let body = response
        .bytes()
        .await
        .map_err(|e| ProviderError::Parse(format!("unable to read response body: {}", e)))?;
    serde_json::from_slice::<DataEnvelope<T>>(&body)
        .map(|envelope| envelope.data)
        .map_err(|e| ProviderError::Parse(format!("unable to parse response: {}", e)))
}
