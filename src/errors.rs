use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeskPilotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Inference error: {0}")]
    Inference(String),

    /// Structurally wrong model-server response (bad JSON body, missing
    /// fields). Never retried.
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Input injection error: {0}")]
    Input(String),

    #[error("Action error: {0}")]
    Action(String),

    /// Operator drove the pointer into a screen corner. The agent loop
    /// treats this like an external abort.
    #[error("Failsafe triggered")]
    FailsafeTriggered,

    #[error("Aborted")]
    Aborted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type DeskPilotResult<T> = Result<T, DeskPilotError>;
