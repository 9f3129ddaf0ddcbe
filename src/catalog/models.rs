use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: i64,
    pub filepath: String,
    pub book: Option<String>,
    pub page: Option<String>,
    pub row: Option<String>,
    pub column: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub material: Option<String>,
    pub width: Option<String>,
    pub length: Option<String>,
    pub remark: Option<String>,
    pub brand: Option<String>,
    pub color: Option<String>,
    pub created_at: String,
    pub ownership: Option<String>,
}

/// Structured fields recognized by the metadata extractor. Every field is
/// optional; unrecognized tags stay freeform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub book: Option<String>,
    pub page: Option<String>,
    pub row: Option<String>,
    pub column: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub material: Option<String>,
    pub width: Option<String>,
    pub length: Option<String>,
    pub remark: Option<String>,
    pub brand: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub count: usize,
    pub metadata: ImageMetadata,
    pub freeform_tags: Vec<String>,
    pub stored_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagUsage {
    pub name: String,
    pub usage_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectRecord {
    pub id: i64,
    pub name: String,
    pub image_ids: Vec<i64>,
    pub created_at: String,
    pub ownership: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailRecord {
    pub id: i64,
    pub project_id: i64,
    pub recipient_email: String,
    pub sender_message: Option<String>,
    pub sent_at: String,
    pub success: bool,
}
