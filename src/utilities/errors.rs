//! Error types shared by the generators and backend clients.

use thiserror::Error;

/// Errors produced while generating a media artifact.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No character description was supplied where one is mandatory.
    #[error("missing character description")]
    MissingDescription,

    /// A required API credential is not configured.
    #[error("API key not set: {var} environment variable is missing or empty")]
    MissingApiKey { var: &'static str },

    /// A backend accepted the request but reported a failure.
    #[error("{backend} request failed: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    /// A backend reply did not carry the field we need.
    #[error("{backend} response missing expected field: {field}")]
    MalformedResponse {
        backend: &'static str,
        field: &'static str,
    },

    /// A polling loop ran out of attempts before the artifact was ready.
    #[error("{backend} did not finish within {attempts} polling attempts")]
    PollExhausted {
        backend: &'static str,
        attempts: u32,
    },

    /// The init image handed to an image-guided generation does not exist.
    #[error("init image path is invalid: {path}")]
    InvalidInitImage { path: String },

    /// Transport-level HTTP failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Local file IO failure while saving an artifact.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A backend reply that should be JSON was not.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
