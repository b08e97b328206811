/// Error types for each pipeline stage
///
/// A failure inside one stage is converted to that stage's error at the
/// stage boundary; stages never panic across it.
use thiserror::Error;

/// Malformed raw message from the provider
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Message ID is undefined")]
    MissingId,
}

/// Failure while retrieving mail from the provider
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Error fetching messages: authentication failed: {0}")]
    Auth(String),

    #[error("Error fetching messages: {0}")]
    Listing(String),

    #[error("Error fetching message {id}: {reason}")]
    Message { id: String, reason: String },

    #[error("Error fetching messages: {operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },
}

/// Transport or API failure from the generative model
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("could not encode prompt: {0}")]
    Prompt(serde_json::Error),

    #[error("response contained no candidate text")]
    EmptyResponse,

    #[error("unreadable response envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Error classifying messages: {0}")]
    Model(#[from] ModelError),

    #[error("Error classifying messages: malformed model output: {0}")]
    MalformedResponse(serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Error extracting roles: {0}")]
    Model(#[from] ModelError),

    #[error("Error extracting roles: malformed model output: {0}")]
    MalformedResponse(serde_json::Error),

    #[error("Error extracting roles: invalid record for message {id}: {reason}")]
    InvalidRecord { id: String, reason: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid role for message {id}: {reason}")]
    InvalidRole { id: String, reason: String },
}

/// First failing stage of a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("Error persisting roles: {0}")]
    Store(#[from] StoreError),
}
