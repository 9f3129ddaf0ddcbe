pub mod db;
pub mod migrations;
pub mod models;
pub mod queries;

pub use db::CatalogDb;
