pub mod catalog;
pub mod error;
pub mod infra;
pub mod ingest;
pub mod maintenance;
pub mod metadata;
pub mod projects;
pub mod search;
pub mod tags;

pub use catalog::CatalogDb;
pub use error::CatalogError;
