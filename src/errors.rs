use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::path::PathBuf;
use utoipa::ToSchema;

/// Message returned when `/predict` is missing any of the required fields.
pub const MISSING_FIELDS_MESSAGE: &str = "Missing one or more required fields.";

/// Message returned when `/reward` has no usable `activity`.
pub const MISSING_ACTIVITY_MESSAGE: &str = "Missing 'activity' in request body.";

/// Request-scoped error types.
#[derive(Debug)]
pub enum AppError {
    /// Client fault detected before any model runs.
    Validation(String),
    /// Failure while adapting features, invoking a model or decoding its output.
    Inference(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// The message that is sent back to the caller.
    ///
    /// Context labels are only logged; the caller sees the innermost message.
    pub fn message(&self) -> &str {
        match self {
            AppError::Validation(msg) | AppError::Inference(msg) => msg,
            AppError::WithContext { source, .. } => source.message(),
        }
    }

    /// HTTP status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::WithContext { source, .. } => source.status(),
        }
    }

    pub fn missing_fields() -> Self {
        AppError::Validation(MISSING_FIELDS_MESSAGE.to_string())
    }

    pub fn missing_activity() -> Self {
        AppError::Validation(MISSING_ACTIVITY_MESSAGE.to_string())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Inference(msg) => write!(f, "Inference error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

/// JSON body for every non-200 response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Inference messages are echoed verbatim, including whatever the
    /// underlying model library reported.
    fn into_response(self) -> Response {
        match &self {
            AppError::Validation(msg) => {
                tracing::warn!("Rejected request: {}", msg);
            }
            AppError::Inference(msg) => {
                tracing::error!("Inference error: {}", msg);
            }
            AppError::WithContext { .. } => {
                tracing::error!("Error with context: {}", self);
            }
        }

        let body = Json(json!({
            "error": self.message(),
        }));

        (self.status(), body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    /// Keeps the whole cause chain (`outer: inner`) in the message.
    fn from(err: anyhow::Error) -> Self {
        AppError::Inference(format!("{:#}", err))
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// Model failures become `Inference` errors tagged with the stage that failed.
impl<T> ResultExt<T> for anyhow::Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::from(e)),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::from(e)),
            context: f(),
        })
    }
}

/// Fatal problems found while loading artifacts. The server does not start.
#[derive(Debug)]
pub enum StartupError {
    /// A required artifact file is absent.
    MissingArtifact { kind: &'static str, path: PathBuf },
    /// An artifact exists but cannot be parsed or is inconsistent.
    InvalidArtifact {
        kind: &'static str,
        path: PathBuf,
        reason: String,
    },
    /// The selected API variant needs a model slot that was not provided.
    IncompleteContext(String),
    /// The configured inference device cannot be opened.
    Device(String),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::MissingArtifact { kind, path } => {
                write!(f, "{} artifact not found at {}", kind, path.display())
            }
            StartupError::InvalidArtifact { kind, path, reason } => {
                write!(
                    f,
                    "{} artifact at {} is invalid: {}",
                    kind,
                    path.display(),
                    reason
                )
            }
            StartupError::IncompleteContext(msg) => write!(f, "Incomplete model context: {}", msg),
            StartupError::Device(msg) => write!(f, "Inference device unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StartupError {}
