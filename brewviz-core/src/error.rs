//! Error types for brewviz-core.

use thiserror::Error;

/// A `#RRGGBB` string that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid hex color `{0}` (expected #RRGGBB)")]
pub struct ColorParseError(pub String);

/// Errors raised while loading the menu catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog document is not valid JSON or does not match the schema.
    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A drink entry failed to decode.
    #[error("drink `{key}`: {source}")]
    Entry {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The same drink key appears twice in the document.
    #[error("drink `{0}` is listed more than once")]
    DuplicateKey(String),

    /// A drink has no ingredient layers.
    #[error("drink `{0}` has no ingredients")]
    EmptyIngredients(String),

    /// A drink has an ingredient with a zero, negative or non-finite volume.
    #[error("drink `{key}`: ingredient `{ingredient}` has invalid volume {volume}")]
    InvalidVolume {
        key: String,
        ingredient: String,
        volume: f32,
    },

    /// The configured featured drink is not in the catalog.
    #[error("featured drink `{0}` is not in the catalog")]
    UnknownFeatured(String),
}

/// Errors raised by the cup builder.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("cannot stack an empty ingredient list")]
    EmptyIngredients,

    #[error("ingredient `{name}` has invalid volume {volume}")]
    InvalidVolume { name: String, volume: f32 },
}

/// Input rejected locally before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please choose a drink first.")]
    MissingDrink,

    #[error("Please pick a size or variant.")]
    MissingVariant,

    #[error("Please select a rating.")]
    MissingRating,

    #[error("Rating must be between 1 and 5 (got {0}).")]
    RatingOutOfRange(i64),
}

/// Failure reported by (or while reaching) the remote insert endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The database client has not been loaded or configured.
    #[error("remote store unavailable")]
    Unavailable,

    #[error("connectivity: {0}")]
    Connectivity(String),

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("duplicate row: {0}")]
    Duplicate(String),

    #[error("schema mismatch: {0}")]
    Schema(String),

    #[error("remote error: {0}")]
    Other(String),
}

impl RemoteError {
    /// Classify a failed insert from its HTTP status and response body.
    ///
    /// Understands PostgREST-style bodies (`{"code": "...", "message": "..."}`)
    /// and falls back to the raw body or status line otherwise.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let code = parsed
            .as_ref()
            .and_then(|v| v.get("code"))
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string();
        let reason = parsed
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    format!("HTTP {status}")
                } else {
                    trimmed.to_string()
                }
            });

        match (code.as_str(), status) {
            ("23505", _) | (_, 409) => Self::Duplicate(reason),
            ("42501", _) | (_, 401) | (_, 403) => Self::Permission(reason),
            ("42703", _) | ("22P02", _) | ("23502", _) | ("PGRST204", _) | (_, 400) | (_, 422) => {
                Self::Schema(reason)
            }
            _ => Self::Other(reason),
        }
    }

    /// Short human-readable text for the status indicator.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unavailable => "Ordering is unavailable right now.".to_string(),
            Self::Connectivity(reason) => format!("Couldn't reach the shop: {reason}"),
            Self::Permission(reason) => format!("Not allowed: {reason}"),
            Self::Duplicate(reason) => format!("Already received: {reason}"),
            Self::Schema(reason) => format!("The shop rejected the details: {reason}"),
            Self::Other(reason) => format!("Something went wrong: {reason}"),
        }
    }
}

/// Failure of an order or feedback submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl SubmitError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Remote(e) => e.user_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_from_postgrest_code() {
        let body = r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#;
        let err = RemoteError::from_response(409, body);
        assert!(matches!(err, RemoteError::Duplicate(_)));
        assert!(err.user_message().contains("duplicate key value"));
    }

    #[test]
    fn test_permission_from_status() {
        let err = RemoteError::from_response(403, "");
        assert_eq!(err, RemoteError::Permission("HTTP 403".to_string()));
    }

    #[test]
    fn test_schema_mismatch() {
        let body = r#"{"code":"PGRST204","message":"Could not find the 'variant' column"}"#;
        let err = RemoteError::from_response(400, body);
        assert!(matches!(err, RemoteError::Schema(ref m) if m.contains("variant")));
    }

    #[test]
    fn test_plain_text_body_is_kept() {
        let err = RemoteError::from_response(500, "upstream timed out\n");
        assert_eq!(err, RemoteError::Other("upstream timed out".to_string()));
    }

    #[test]
    fn test_validation_message_is_user_facing() {
        let err: SubmitError = ValidationError::RatingOutOfRange(6).into();
        assert_eq!(err.user_message(), "Rating must be between 1 and 5 (got 6).");
    }
}
