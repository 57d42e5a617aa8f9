//! Error types for the order-to-payment pipeline.
//!
//! Each layer gets its own enum; seams map between them. Transience is
//! carried explicitly so the consumer can turn any failure into the
//! right acknowledgment without inspecting error text.

/// Wire decoding errors (poison-message conditions).
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Wrong event tag: expected {expected}, got {got}")]
    WrongTag {
        expected: &'static str,
        got: String,
    },

    #[error("Invalid field {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Payment gateway errors (the charge action itself).
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Charge declined: {0}")]
    Declined(String),

    #[error("Gateway unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// Whether retrying the same charge later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Unavailable(_))
    }
}

/// Store-level errors (data access failures).
///
/// `Gateway` is here because the charge runs inside the settlement
/// transaction; a declined charge rolls the unit back like any other
/// failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Entity not found")]
    NotFound,
}

impl StoreError {
    /// Whether retrying the same unit later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Gateway(e) => e.is_transient(),
            StoreError::Unavailable(_) => true,
            _ => false,
        }
    }
}

/// Publisher errors (hand-off to the broker).
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Broker unavailable: {0}")]
    Unavailable(String),

    #[error("Publish was not confirmed by the broker in time")]
    NotConfirmed,
}

impl PublishError {
    /// Whether retrying the same publish later could succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, PublishError::Encode(_))
    }
}

/// Typed outcome of handling one delivered message.
///
/// The consumer derives its acknowledgment decision from this value,
/// never from whether an error escaped the handler.
#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    /// Retrying the same message later could succeed.
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Retrying the same message can never succeed.
    #[error("Permanent failure: {0}")]
    Permanent(String),
}

impl From<StoreError> for HandleError {
    fn from(err: StoreError) -> Self {
        if err.is_transient() {
            HandleError::Transient(err.to_string())
        } else {
            HandleError::Permanent(err.to_string())
        }
    }
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound("Resource not found".into()),
            e => AppError::Internal(e.to_string()),
        }
    }
}

impl From<PublishError> for AppError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::Encode(e) => AppError::Internal(e.to_string()),
            e => AppError::Unavailable(e.to_string()),
        }
    }
}
