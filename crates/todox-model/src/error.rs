use thiserror::Error;

/// Structural problems found in a todo document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("{what} id must not be empty")]
    EmptyId { what: &'static str },
    #[error("duplicate item id: {id}")]
    DuplicateItemId { id: String },
    #[error("unknown todo status: {0}")]
    UnknownStatus(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
