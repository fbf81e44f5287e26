//! Error types for dataeng-chat.
//!
//! Failures fall into the phases a turn goes through: configuration before the
//! session starts, local validation, the provider's answer to a request, the
//! transport carrying it, and the response stream once it is open. Everything
//! after configuration is caught at the turn boundary and shown as a notice.

use std::error;
use std::fmt;
use std::sync::Arc;

type Source = Arc<dyn error::Error + Send + Sync>;

/// The main error type for dataeng-chat.
#[derive(Clone, Debug)]
pub enum Error {
    /// Startup configuration failed: no API key, or an unusable secrets or log
    /// file. Fatal before the first turn.
    Config {
        /// What was being configured and why it failed.
        message: String,
        /// The underlying cause.
        source: Option<Source>,
    },

    /// A value was rejected locally before anything was sent.
    Validation {
        /// Human-readable error message.
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },

    /// The provider answered the request with a non-success status.
    Api(ApiError),

    /// The request never got a response.
    Transport {
        /// Human-readable error message.
        message: String,
        /// Whether the client gave up waiting.
        timed_out: bool,
        /// The underlying cause.
        source: Option<Source>,
    },

    /// The response stream broke after it opened.
    Stream {
        /// What went wrong in the stream.
        failure: StreamFailure,
        /// Human-readable error message.
        message: String,
        /// The underlying cause.
        source: Option<Source>,
    },
}

/// Classification of a provider error response by HTTP status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// 400 and 422: the provider rejected the model or a parameter.
    BadRequest,
    /// 401: the key was refused.
    Authentication,
    /// 403.
    Permission,
    /// 404: usually a model the provider no longer serves.
    NotFound,
    /// 408.
    Timeout,
    /// 429.
    RateLimit,
    /// 500.
    Server,
    /// 502 through 504.
    Unavailable,
    /// Any other status.
    Other,
}

impl ApiErrorKind {
    /// Classifies an HTTP status code.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => ApiErrorKind::BadRequest,
            401 => ApiErrorKind::Authentication,
            403 => ApiErrorKind::Permission,
            404 => ApiErrorKind::NotFound,
            408 => ApiErrorKind::Timeout,
            429 => ApiErrorKind::RateLimit,
            500 => ApiErrorKind::Server,
            502..=504 => ApiErrorKind::Unavailable,
            _ => ApiErrorKind::Other,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ApiErrorKind::BadRequest => "request rejected",
            ApiErrorKind::Authentication => "API key rejected",
            ApiErrorKind::Permission => "permission denied",
            ApiErrorKind::NotFound => "not found",
            ApiErrorKind::Timeout => "provider timed out",
            ApiErrorKind::RateLimit => "rate limited",
            ApiErrorKind::Server => "provider error",
            ApiErrorKind::Unavailable => "provider unavailable",
            ApiErrorKind::Other => "unexpected response",
        }
    }
}

/// A provider error response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiError {
    /// Classification derived from `status`.
    pub kind: ApiErrorKind,
    /// HTTP status code.
    pub status: u16,
    /// The provider's message, or the raw body when it was not JSON.
    pub message: String,
    /// The provider's `error.type`, such as `invalid_request_error`.
    pub error_type: Option<String>,
    /// The offending parameter, when the provider names one.
    pub param: Option<String>,
    /// The `x-request-id` header.
    pub request_id: Option<String>,
    /// The `retry-after` header, in seconds.
    pub retry_after: Option<u64>,
}

impl ApiError {
    /// Creates an error for `status`, classifying it.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::from_status(status),
            status,
            message: message.into(),
            error_type: None,
            param: None,
            request_id: None,
            retry_after: None,
        }
    }

    /// Sets the provider's error type.
    pub fn with_error_type(mut self, error_type: Option<String>) -> Self {
        self.error_type = error_type;
        self
    }

    /// Sets the offending parameter.
    pub fn with_param(mut self, param: Option<String>) -> Self {
        self.param = param;
        self
    }

    /// Sets the request ID.
    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    /// Sets the retry delay.
    pub fn with_retry_after(mut self, retry_after: Option<u64>) -> Self {
        self.retry_after = retry_after;
        self
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind.label(), self.status, self.message)?;
        if let Some(param) = &self.param {
            write!(f, " [param: {param}]")?;
        }
        if let Some(retry_after) = self.retry_after {
            write!(f, " [retry after {retry_after}s]")?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, " [request {request_id}]")?;
        }
        Ok(())
    }
}

/// What broke in an open response stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamFailure {
    /// The connection dropped or the body could not be read.
    Transport,
    /// An event was not valid UTF-8.
    Encoding,
    /// An event's data was not a completion chunk.
    Malformed,
    /// The provider sent an error event in place of a chunk.
    Provider,
}

impl Error {
    /// Creates a configuration error.
    pub fn config(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Config {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Creates a transport error that is not a timeout.
    pub fn transport(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Transport {
            message: message.into(),
            timed_out: false,
            source: source.map(Arc::from),
        }
    }

    /// Creates a transport error for a request that timed out.
    pub fn timeout(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Transport {
            message: message.into(),
            timed_out: true,
            source: source.map(Arc::from),
        }
    }

    /// Creates a stream error.
    pub fn stream(
        failure: StreamFailure,
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Stream {
            failure,
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Returns true for startup configuration failures.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config { .. })
    }

    /// Returns true if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns the provider error kind, if the provider answered.
    pub fn api_kind(&self) -> Option<ApiErrorKind> {
        match self {
            Error::Api(api) => Some(api.kind),
            _ => None,
        }
    }

    /// Returns true if the provider refused the API key.
    pub fn is_authentication(&self) -> bool {
        self.api_kind() == Some(ApiErrorKind::Authentication)
    }

    /// Returns true if the provider rejected the request's content.
    pub fn is_bad_request(&self) -> bool {
        self.api_kind() == Some(ApiErrorKind::BadRequest)
    }

    /// Returns true if the provider is rate limiting.
    pub fn is_rate_limit(&self) -> bool {
        self.api_kind() == Some(ApiErrorKind::RateLimit)
    }

    /// Returns true for provider-side failures.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self.api_kind(),
            Some(ApiErrorKind::Server | ApiErrorKind::Unavailable)
        )
    }

    /// Returns true if the request got no response.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    /// Returns true if this error occurred after the response stream opened.
    pub fn is_stream_error(&self) -> bool {
        matches!(self, Error::Stream { .. })
    }

    /// Returns the stream failure, if this is a stream error.
    pub fn stream_failure(&self) -> Option<StreamFailure> {
        match self {
            Error::Stream { failure, .. } => Some(*failure),
            _ => None,
        }
    }

    /// Returns the request ID associated with this error, if any.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Error::Api(api) => api.request_id.as_deref(),
            _ => None,
        }
    }

    /// Returns the HTTP status of a provider error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api(api) => Some(api.status),
            _ => None,
        }
    }
}

impl From<ApiError> for Error {
    fn from(api: ApiError) -> Self {
        Error::Api(api)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config { message, .. } => write!(f, "configuration error: {message}"),
            Error::Validation { message, param } => match param {
                Some(param) => write!(f, "invalid {param}: {message}"),
                None => write!(f, "invalid input: {message}"),
            },
            Error::Api(api) => api.fmt(f),
            Error::Transport {
                message, timed_out, ..
            } => {
                if *timed_out {
                    write!(f, "request timed out: {message}")
                } else {
                    write!(f, "request failed: {message}")
                }
            }
            Error::Stream {
                failure, message, ..
            } => {
                let what = match failure {
                    StreamFailure::Transport => "stream interrupted",
                    StreamFailure::Encoding => "stream not UTF-8",
                    StreamFailure::Malformed => "malformed chunk",
                    StreamFailure::Provider => "provider error mid-stream",
                };
                write!(f, "{what}: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Config { source, .. }
            | Error::Transport { source, .. }
            | Error::Stream { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Validation { .. } | Error::Api(_) => None,
        }
    }
}

/// A specialized Result type for dataeng-chat operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(ApiErrorKind::from_status(400), ApiErrorKind::BadRequest);
        assert_eq!(ApiErrorKind::from_status(422), ApiErrorKind::BadRequest);
        assert_eq!(ApiErrorKind::from_status(401), ApiErrorKind::Authentication);
        assert_eq!(ApiErrorKind::from_status(404), ApiErrorKind::NotFound);
        assert_eq!(ApiErrorKind::from_status(429), ApiErrorKind::RateLimit);
        assert_eq!(ApiErrorKind::from_status(503), ApiErrorKind::Unavailable);
        assert_eq!(ApiErrorKind::from_status(418), ApiErrorKind::Other);
    }

    #[test]
    fn api_error_display() {
        let err: Error = ApiError::new(400, "model decommissioned")
            .with_param(Some("model".to_string()))
            .with_request_id(Some("req_1".to_string()))
            .into();
        assert_eq!(
            err.to_string(),
            "request rejected (400): model decommissioned [param: model] [request req_1]"
        );
        assert!(err.is_bad_request());
        assert_eq!(err.status_code(), Some(400));
        assert_eq!(err.request_id(), Some("req_1"));
    }

    #[test]
    fn validation_display_names_param() {
        let err = Error::validation("outside 512..=8192", Some("max_tokens".to_string()));
        assert_eq!(err.to_string(), "invalid max_tokens: outside 512..=8192");
        assert!(err.is_validation());
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn phases_are_distinct() {
        let stream = Error::stream(StreamFailure::Malformed, "bad chunk", None);
        assert!(stream.is_stream_error());
        assert_eq!(stream.stream_failure(), Some(StreamFailure::Malformed));
        assert!(!stream.is_transport());

        let timeout = Error::timeout("after 600s", None);
        assert!(timeout.is_transport());
        assert_eq!(timeout.to_string(), "request timed out: after 600s");

        assert!(Error::config("no API key", None).is_config());
        assert!(Error::from(ApiError::new(502, "bad gateway")).is_server_error());
        assert!(!Error::from(ApiError::new(401, "nope")).is_server_error());
    }

    #[test]
    fn source_is_exposed() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = Error::config("failed to read secrets file", Some(Box::new(io)));
        assert!(error::Error::source(&err).is_some());
        assert!(error::Error::source(&Error::validation("x", None)).is_none());
    }
}
