#[derive(Debug, Clone)]
pub struct AppConfig {
    pub catalog_path: String,
    pub upload_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog_path: "library.sqlite3".to_string(),
            upload_dir: "uploads".to_string(),
        }
    }
}
