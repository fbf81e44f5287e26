use std::env;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::Stream;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;

use crate::client_logger::ClientLogger;
use crate::error::{ApiError, Error, Result};
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, STREAM_DURATION,
};
use crate::provider::{ChunkStream, CompletionProvider};
use crate::sse::process_sse;
use crate::types::{ChatCompletionChunk, CompletionRequest};

const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/";
const API_KEY_VAR: &str = "GROQ_API_KEY";
// Generous because the timeout covers the whole streamed body.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Client for Groq's OpenAI-compatible completion API.
#[derive(Clone)]
pub struct Groq {
    api_key: String,
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl Groq {
    /// Create a new Groq client.
    ///
    /// The API key can be provided directly or read from the GROQ_API_KEY
    /// environment variable.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_options(api_key, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = match api_key {
            Some(key) => key,
            None => env::var(API_KEY_VAR).map_err(|_| {
                Error::config(
                    "API key not provided and GROQ_API_KEY environment variable not set",
                    None,
                )
            })?,
        };
        if api_key.trim().is_empty() {
            return Err(Error::config("API key is empty", None));
        }

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::config(format!("failed to build HTTP client: {e}"), Some(Box::new(e)))
            })?;

        let mut base_url = base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            api_key,
            client,
            base_url,
            timeout,
            logger: None,
        })
    }

    /// Attach a logger that sees every request and streamed chunk.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| Error::config("API key contains invalid header characters", None))?;
        headers.insert(header::AUTHORIZATION, bearer);
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status = response.status();
        let status_code = status.as_u16();

        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|val| val.to_str().ok())
            .map(String::from);

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            #[serde(rename = "type")]
            error_type: Option<String>,
            message: Option<String>,
            param: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::transport(
                    format!("failed to read {status_code} response body: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        let detail = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|parsed| parsed.error);
        let (message, error_type, param) = match detail {
            Some(detail) => (
                detail.message.unwrap_or_else(|| error_body.clone()),
                detail.error_type,
                detail.param,
            ),
            None => (error_body, None, None),
        };

        ApiError::new(status_code, message)
            .with_error_type(error_type)
            .with_param(param)
            .with_request_id(request_id)
            .with_retry_after(retry_after)
            .into()
    }

    /// Send a completion request and return the response as a chunk stream.
    ///
    /// The request's `stream` flag is forced on.
    pub async fn stream(&self, request: &CompletionRequest) -> Result<ChunkStream> {
        let mut request = request.clone();
        request.stream = true;

        if let Some(logger) = &self.logger {
            logger.log_request(&request);
        }
        CLIENT_REQUESTS.click();

        let url = format!("{}chat/completions", self.base_url);
        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .headers(self.default_headers()?)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                if e.is_timeout() {
                    Error::timeout(
                        format!("no response within {}s", self.timeout.as_secs()),
                        Some(Box::new(e)),
                    )
                } else if e.is_connect() {
                    Error::transport(format!("could not connect to {url}: {e}"), Some(Box::new(e)))
                } else {
                    Error::transport(e.to_string(), Some(Box::new(e)))
                }
            })?;
        CLIENT_REQUEST_DURATION.add(started.elapsed().as_secs_f64());

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        let chunks = process_sse(response.bytes_stream());
        Ok(Box::pin(LoggedStream::new(chunks, self.logger.clone())))
    }
}

impl fmt::Debug for Groq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Groq")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("logger", &self.logger.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl CompletionProvider for Groq {
    async fn create_completion(&self, request: &CompletionRequest) -> Result<ChunkStream> {
        self.stream(request).await
    }
}

/// Passes chunks through while feeding the client logger and stream timing.
struct LoggedStream {
    inner: Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk>> + Send>>,
    logger: Option<Arc<dyn ClientLogger>>,
    reply: String,
    started: Instant,
    finished: bool,
}

impl LoggedStream {
    fn new<S>(inner: S, logger: Option<Arc<dyn ClientLogger>>) -> Self
    where
        S: Stream<Item = Result<ChatCompletionChunk>> + Send + 'static,
    {
        Self {
            inner: Box::pin(inner),
            logger,
            reply: String::new(),
            started: Instant::now(),
            finished: false,
        }
    }
}

impl Stream for LoggedStream {
    type Item = Result<ChatCompletionChunk>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                if let Some(logger) = &this.logger {
                    logger.log_stream_chunk(&chunk);
                    if let Some(fragment) = chunk.fragment() {
                        this.reply.push_str(fragment);
                    }
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.finished = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                if !this.finished {
                    this.finished = true;
                    STREAM_DURATION.add(this.started.elapsed().as_secs_f64());
                    if let Some(logger) = &this.logger {
                        logger.log_stream_reply(&this.reply);
                    }
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
