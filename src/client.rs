use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response};
use serde::Deserialize;
use url::Url;

use crate::config::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::dispatch::GenerateBackend;
use crate::error::{Error, Result};
use crate::ingest::ChunkStream;
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::types::{GenerateRequest, ModelListResponse};

/// Client for an Ollama-style generate API.
///
/// Only connection establishment is bounded by the timeout on the generate
/// path; a response may stream for as long as the model keeps producing.  The
/// catalog fetch is bounded as a whole.
#[derive(Debug, Clone)]
pub struct Ollama {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl Ollama {
    /// Create a client for the default local endpoint.
    pub fn new() -> Result<Self> {
        Self::with_options(None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut base = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| Error::url(format!("Invalid base URL {base:?}: {e}"), Some(e)))?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// The base URL endpoints are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::url(format!("Invalid endpoint {path:?}: {e}"), Some(e)))
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        CLIENT_REQUEST_ERRORS.click();
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        CLIENT_REQUEST_ERRORS.click();
        let status_code = response.status().as_u16();

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let error_message = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.error)
            .unwrap_or(error_body);

        match status_code {
            400 => Error::bad_request(error_message),
            404 => Error::not_found(error_message, None, None),
            408 => Error::timeout(error_message, None),
            500 => Error::internal_server(error_message),
            502..=504 => Error::service_unavailable(error_message),
            _ => Error::api(status_code, error_message),
        }
    }

    /// Fetch the model catalog.
    pub async fn list_models(&self) -> Result<ModelListResponse> {
        let url = self.endpoint("tags")?;
        CLIENT_REQUESTS.click();
        let start = Instant::now();

        let response = self
            .client
            .get(url)
            .headers(Self::default_headers())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        let models = response.json::<ModelListResponse>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        Ok(models)
    }

    /// Send a generate request and return the response body as raw chunks.
    ///
    /// The returned stream yields each body chunk exactly as the transport
    /// delivered it.  A failure of the body mid-stream is yielded as a
    /// `StreamTransport` error.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<ChunkStream> {
        let url = self.endpoint("generate")?;
        CLIENT_REQUESTS.click();
        let start = Instant::now();

        let response = self
            .client
            .post(url)
            .headers(Self::default_headers())
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        let body = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                Error::stream_transport(format!("Error in HTTP stream: {}", e), Some(Box::new(e)))
            })
        });
        Ok(Box::pin(body))
    }
}

#[async_trait::async_trait]
impl GenerateBackend for Ollama {
    async fn generate(&self, request: GenerateRequest) -> Result<ChunkStream> {
        Ollama::generate(self, &request).await
    }
}
