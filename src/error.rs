//! Error types for the Piastrix client

use thiserror::Error;

/// Result type alias for Piastrix operations
pub type Result<T> = std::result::Result<T, PiastrixError>;

/// Numeric codes for failures detected locally, before or instead of a
/// round trip to Piastrix.
pub mod codes {
    pub const EXTRA_FIELDS: i64 = 1000;
    pub const UNTRUSTED_SOURCE: i64 = 1001;
    pub const SIGNATURE: i64 = 1002;
    pub const SHOP_AMOUNT: i64 = 1003;
    pub const SHOP_CURRENCY: i64 = 1004;
    pub const STATUS: i64 = 1005;
    pub const LANGUAGE: i64 = 1006;
    pub const AMOUNT_TYPE: i64 = 1007;
}

/// Main error type for Piastrix operations
#[derive(Error, Debug)]
pub enum PiastrixError {
    /// An extra field would overwrite a field the client already set
    #[error("Extra field conflicts with request field: {key}")]
    ExtraFieldConflict { key: String },

    /// Amount type outside the set accepted by the operation
    #[error("Invalid amount type: {amount_type}")]
    InvalidAmountType { amount_type: String },

    /// Pay form language other than `ru` or `en`
    #[error("Invalid language: {lang}")]
    InvalidLanguage { lang: String },

    /// A field named in the signed set is absent from the request
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// HTTP transport failure, including non-2xx status codes
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Piastrix answered with `result: false`
    #[error("Piastrix error: {message} (code {code:?})")]
    Remote { message: String, code: Option<i64> },

    /// Callback carried no `sign` field
    #[error("Callback is missing its signature")]
    MissingSignature,

    /// Callback came from an address outside the allow-list
    #[error("Untrusted callback source: {address}")]
    UntrustedSource { address: String },

    /// Recomputed callback signature differs from the received one
    #[error("Callback signature mismatch")]
    SignatureMismatch,

    /// Callback `shop_amount` differs from the expected amount
    #[error("Shop amount mismatch: expected {expected}, got {got}")]
    AmountMismatch { expected: String, got: String },

    /// Callback `shop_currency` differs from the expected currency
    #[error("Shop currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// Callback status is not `success`
    #[error("Callback status is not success: {status}")]
    StatusNotSuccess { status: String },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL construction error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PiastrixError {
    /// Create an extra field conflict error
    pub fn extra_field_conflict(key: impl Into<String>) -> Self {
        Self::ExtraFieldConflict { key: key.into() }
    }

    /// Create an invalid amount type error
    pub fn invalid_amount_type(amount_type: impl Into<String>) -> Self {
        Self::InvalidAmountType {
            amount_type: amount_type.into(),
        }
    }

    /// Create an invalid language error
    pub fn invalid_language(lang: impl Into<String>) -> Self {
        Self::InvalidLanguage { lang: lang.into() }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create a remote error from the vendor's message and code
    pub fn remote(message: impl Into<String>, code: Option<i64>) -> Self {
        Self::Remote {
            message: message.into(),
            code,
        }
    }

    /// Create an untrusted source error
    pub fn untrusted_source(address: impl Into<String>) -> Self {
        Self::UntrustedSource {
            address: address.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Numeric error code.
    ///
    /// Local validation failures map onto the codes in [`codes`]; a
    /// [`PiastrixError::Remote`] carries whatever code Piastrix returned.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::ExtraFieldConflict { .. } => Some(codes::EXTRA_FIELDS),
            Self::UntrustedSource { .. } => Some(codes::UNTRUSTED_SOURCE),
            Self::SignatureMismatch => Some(codes::SIGNATURE),
            Self::AmountMismatch { .. } => Some(codes::SHOP_AMOUNT),
            Self::CurrencyMismatch { .. } => Some(codes::SHOP_CURRENCY),
            Self::StatusNotSuccess { .. } => Some(codes::STATUS),
            Self::InvalidLanguage { .. } => Some(codes::LANGUAGE),
            Self::InvalidAmountType { .. } => Some(codes::AMOUNT_TYPE),
            Self::Remote { code, .. } => *code,
            _ => None,
        }
    }

    /// Whether the failure came from the callback checks
    pub fn is_callback_rejection(&self) -> bool {
        matches!(
            self,
            Self::MissingSignature
                | Self::UntrustedSource { .. }
                | Self::SignatureMismatch
                | Self::AmountMismatch { .. }
                | Self::CurrencyMismatch { .. }
                | Self::StatusNotSuccess { .. }
        )
    }
}
