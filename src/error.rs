use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum CatalogError {
    InvalidInput(String),
    NotFound(String),
    PathConflict(String),
    Persistence(String),
    Io(String),
}

impl CatalogError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::PathConflict(msg) => write!(f, "storage path conflict: {msg}"),
            Self::Persistence(msg) => write!(f, "persistence error: {msg}"),
            Self::Io(msg) => write!(f, "io error: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<rusqlite::Error> for CatalogError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Persistence(value.to_string())
    }
}
