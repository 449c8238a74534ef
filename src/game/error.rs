use thiserror::Error;

/// Invalid round parameters. Raised before any network activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("choice_count must be between 1 and 4 (got {0})")]
    ChoiceCount(u8),

    #[error("allowed_wrong_guesses must be between 0 and {max} (got {got})")]
    WrongGuesses { got: u8, max: u8 },

    #[error("target_id must be positive")]
    TargetId,

    #[error("timeout must be at most {max_secs}s (got {got_secs}s)")]
    Timeout { got_secs: u64, max_secs: u64 },
}

/// Failures talking to the record/sprite API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The API answered with a non-success status.
    #[error("API Error: {message} (status {status_code})")]
    Status { status_code: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid request URL: {0}")]
    Url(String),

    #[error("invalid response body: {0}")]
    Decode(String),

    /// Could not collect enough distinct records for a choice set.
    #[error("could not collect {wanted} distinct candidates after {attempts} attempts")]
    Exhausted { wanted: usize, attempts: usize },
}

/// The chat surface rejected a publish or update.
#[derive(Debug, Clone, Error)]
#[error("presentation failed: {0}")]
pub struct PresentationError(pub String);

impl PresentationError {
    pub fn new(reason: impl Into<String>) -> Self {
        PresentationError(reason.into())
    }
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Presentation(#[from] PresentationError),

    /// The task driving the round panicked or was cancelled.
    #[error("round task aborted: {0}")]
    Aborted(String),
}
