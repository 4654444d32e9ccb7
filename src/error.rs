use serde::Serialize;

/// Everything that can go wrong with a single search call.
///
/// None of these escape the batch driver: each one is caught at the call
/// boundary and recorded as a [`crate::data_models::CallFailure`].
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("empty response body")]
    EmptyResponse,

    #[error("malformed JSON: {0}")]
    JsonParse(String),

    #[error("missing field `{field}` in {context}")]
    MissingField { field: &'static str, context: String },
}

/// Serializable tag for a [`CallError`], used in reports and exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CallErrorKind {
    NetworkError,
    HttpStatusError,
    EmptyResponseError,
    JsonParseError,
    MissingFieldError,
}

impl CallError {
    pub fn kind(&self) -> CallErrorKind {
        match self {
            Self::Network(_) => CallErrorKind::NetworkError,
            Self::HttpStatus { .. } => CallErrorKind::HttpStatusError,
            Self::EmptyResponse => CallErrorKind::EmptyResponseError,
            Self::JsonParse(_) => CallErrorKind::JsonParseError,
            Self::MissingField { .. } => CallErrorKind::MissingFieldError,
        }
    }
}

impl std::fmt::Display for CallErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NetworkError => "NetworkError",
            Self::HttpStatusError => "HttpStatusError",
            Self::EmptyResponseError => "EmptyResponseError",
            Self::JsonParseError => "JsonParseError",
            Self::MissingFieldError => "MissingFieldError",
        };
        f.write_str(name)
    }
}

impl From<reqwest::Error> for CallError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest's top-level message is generic; append the source chain.
        let mut detail = e.to_string();
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = std::error::Error::source(cause);
        }
        CallError::Network(detail)
    }
}

/// Rejected batch input, caught at the boundary before the driver runs.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Invalid(String),
}
