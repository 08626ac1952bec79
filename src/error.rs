use std::error::Error as StdError;
use std::fmt;

use http::StatusCode;
use thiserror::Error;

/// Name of the root class every [`ErrorClass`] belongs to.
pub const HTTP_ERROR: &str = "HTTP Error";

// =============================================================================
// HTTP error classes
// =============================================================================

/// Classes of HTTP errors, each tied to a status code.
///
/// All classes are subclasses of the root [`HTTP_ERROR`] class; the class
/// decides the status used when an error is rendered to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    NotAcceptable,
    RequestTimeout,
    Conflict,
    Gone,
    LengthRequired,
    PreconditionFailed,
    RequestEntityTooLarge,
    RequestUriTooLong,
    UnsupportedMediaType,
    RangeNotSatisfiable,
    ExpectationFailed,
    Teapot,
    InternalServerError,
    NotImplemented,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
}

impl ErrorClass {
    /// The status code errors of this class render with.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorClass::BadRequest => StatusCode::BAD_REQUEST,
            ErrorClass::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorClass::Forbidden => StatusCode::FORBIDDEN,
            ErrorClass::NotFound => StatusCode::NOT_FOUND,
            ErrorClass::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorClass::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            ErrorClass::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            ErrorClass::Conflict => StatusCode::CONFLICT,
            ErrorClass::Gone => StatusCode::GONE,
            ErrorClass::LengthRequired => StatusCode::LENGTH_REQUIRED,
            ErrorClass::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            ErrorClass::RequestEntityTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorClass::RequestUriTooLong => StatusCode::URI_TOO_LONG,
            ErrorClass::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorClass::RangeNotSatisfiable => StatusCode::RANGE_NOT_SATISFIABLE,
            ErrorClass::ExpectationFailed => StatusCode::EXPECTATION_FAILED,
            ErrorClass::Teapot => StatusCode::IM_A_TEAPOT,
            ErrorClass::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorClass::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            ErrorClass::BadGateway => StatusCode::BAD_GATEWAY,
            ErrorClass::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorClass::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// The class's own name, e.g. `"Not Found"`.
    pub fn name(self) -> &'static str {
        self.status().canonical_reason().unwrap_or("Unknown error")
    }

    /// Create an error of this class.
    pub fn new(self, message: impl fmt::Display) -> HttpError {
        HttpError {
            class: self,
            message: message.to_string(),
        }
    }

    /// Whether `err`, or anything in its source chain, is of this class.
    pub fn contains(self, err: &(dyn StdError + 'static)) -> bool {
        find_http_error(err).is_some_and(|e| e.class == self)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", HTTP_ERROR, self.name())
    }
}

// =============================================================================
// HttpError
// =============================================================================

/// An error tagged with an HTTP class.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{class}: {message}")]
pub struct HttpError {
    class: ErrorClass,
    message: String,
}

impl HttpError {
    pub fn class(&self) -> ErrorClass {
        self.class
    }

    pub fn status(&self) -> StatusCode {
        self.class.status()
    }

    /// The human-readable message, without the class prefix.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Find the first [`HttpError`] in `err`'s source chain.
pub fn find_http_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a HttpError> {
    let mut cursor = Some(err);
    while let Some(current) = cursor {
        if let Some(http) = current.downcast_ref::<HttpError>() {
            return Some(http);
        }
        cursor = current.source();
    }
    None
}

/// The status `err` should render with, or `default` if it isn't classed.
pub fn status_code(err: &(dyn StdError + 'static), default: StatusCode) -> StatusCode {
    find_http_error(err).map_or(default, HttpError::status)
}

/// The body text `err` should render with.
///
/// Classed errors expose their message; anything else collapses to the
/// reason phrase of `default` so internal details do not leak.
pub fn error_body(err: &(dyn StdError + 'static), default: StatusCode) -> String {
    match find_http_error(err) {
        Some(http) => http.message().to_string(),
        None => default.canonical_reason().unwrap_or("Error").to_string(),
    }
}

// =============================================================================
// Session errors
// =============================================================================

/// Errors from the session layer.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// `session::load` was called without a store installed upstream
    #[error("session: no session store handler wrapper installed")]
    NoStore,

    /// The cookie name cannot appear in a `Set-Cookie` header
    #[error("session: invalid cookie {0:?}")]
    InvalidCookie(String),

    /// The session values could not be serialized
    #[error("session: failed to serialize values: {0}")]
    Serialize(String),

    /// Sealing the payload failed
    #[error("session: failed to seal cookie")]
    Seal,

    /// The secret could not be loaded or is unusable
    #[error("session: {0}")]
    Secret(#[from] HttpError),
}

// =============================================================================
// Configuration errors
// =============================================================================

/// Invalid command line / environment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("session secret must be at least {min} bytes (got {actual})")]
    SecretTooShort { min: usize, actual: usize },

    #[error("body limit must be greater than 0")]
    ZeroBodyLimit,

    #[error("host must not be empty")]
    EmptyHost,
}

// =============================================================================
// Tests
// =============================================================================
