use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use uuid::Uuid;

use crate::catalog::models::IngestReport;
use crate::catalog::queries;
use crate::error::CatalogError;
use crate::metadata;
use crate::tags;

const MAX_PATH_ATTEMPTS: usize = 10;

/// An uploaded file whose bytes already sit at a tentative storage path.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub tentative_path: PathBuf,
    pub original_name: String,
}

impl UploadedFile {
    fn extension(&self) -> String {
        Path::new(&self.original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase()
    }
}

/// Produces replacement storage paths when the tentative one is taken.
pub trait StoragePathPlanner {
    fn next_candidate(&mut self, upload_dir: &Path, extension: &str) -> PathBuf;
}

/// Default planner: an opaque UUID token plus the original extension. The
/// token space makes a second collision practically impossible, but the
/// retry budget still bounds the loop.
#[derive(Debug, Default)]
pub struct OpaquePathPlanner;

impl StoragePathPlanner for OpaquePathPlanner {
    fn next_candidate(&mut self, upload_dir: &Path, extension: &str) -> PathBuf {
        let token = Uuid::new_v4().simple().to_string();
        if extension.is_empty() {
            upload_dir.join(token)
        } else {
            upload_dir.join(format!("{token}.{extension}"))
        }
    }
}

/// Ingests a batch of files sharing one raw tag list, atomically.
///
/// Either every file in the batch gets an image row or none does. Renames
/// performed while resolving path collisions are not rolled back with the
/// transaction; reconciliation picks up any file the rows no longer point at.
pub fn ingest_batch(
    conn: &mut Connection,
    upload_dir: &Path,
    files: &[UploadedFile],
    raw_tags: &[String],
    ownership: Option<&str>,
    planner: &mut dyn StoragePathPlanner,
) -> Result<IngestReport, CatalogError> {
    if files.is_empty() {
        return Err(CatalogError::InvalidInput(
            "no files supplied for ingestion".to_string(),
        ));
    }

    let (extracted, freeform_tags) = metadata::extract(raw_tags);
    let mut stored_paths = Vec::with_capacity(files.len());

    let tx = conn.transaction()?;

    for file in files {
        let stored_path = ingest_one(&tx, upload_dir, file, &extracted, ownership, planner)?;
        tags::link_tags(&tx, stored_path.image_id, raw_tags)?;
        stored_paths.push(stored_path.filepath);
    }

    tx.commit()?;

    Ok(IngestReport {
        count: files.len(),
        metadata: extracted,
        freeform_tags,
        stored_paths,
    })
}

struct StoredImage {
    image_id: i64,
    filepath: String,
}

fn ingest_one(
    conn: &Connection,
    upload_dir: &Path,
    file: &UploadedFile,
    extracted: &crate::catalog::models::ImageMetadata,
    ownership: Option<&str>,
    planner: &mut dyn StoragePathPlanner,
) -> Result<StoredImage, CatalogError> {
    let extension = file.extension();
    let mut current = file.tentative_path.clone();

    for _attempt in 0..MAX_PATH_ATTEMPTS {
        let current_str = current.to_string_lossy().to_string();

        match queries::insert_image(conn, &current_str, extracted, ownership) {
            Ok(image_id) => {
                return Ok(StoredImage {
                    image_id,
                    filepath: current_str,
                });
            }
            Err(error) if is_filepath_collision(&error) => {
                let candidate = planner.next_candidate(upload_dir, &extension);
                tracing::info!(
                    from = %current.display(),
                    to = %candidate.display(),
                    "storage path taken, relocating upload"
                );

                if let Err(rename_error) = fs::rename(&current, &candidate) {
                    // The row will point at the candidate path either way;
                    // reconciliation repairs the stray file.
                    tracing::warn!(
                        from = %current.display(),
                        to = %candidate.display(),
                        error = %rename_error,
                        "failed to relocate upload during collision retry"
                    );
                }

                current = candidate;
            }
            Err(error) => return Err(error.into()),
        }
    }

    Err(CatalogError::PathConflict(format!(
        "could not find a free storage path for {} after {MAX_PATH_ATTEMPTS} attempts",
        file.original_name
    )))
}

fn is_filepath_collision(error: &rusqlite::Error) -> bool {
    match error {
        rusqlite::Error::SqliteFailure(code, message) => {
            code.code == rusqlite::ErrorCode::ConstraintViolation
                && message
                    .as_deref()
                    .is_some_and(|text| text.contains("images.filepath"))
        }
        _ => false,
    }
}
