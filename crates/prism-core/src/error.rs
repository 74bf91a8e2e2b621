use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown artifact kind: {0}")]
    UnknownArtifactKind(String),

    #[error("missing required field: {0}")]
    MissingField(String),
}
