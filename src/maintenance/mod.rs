use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use walkdir::WalkDir;

use crate::catalog::queries;
use crate::error::CatalogError;
use crate::projects;

#[derive(Debug, Clone)]
pub struct DeletedImage {
    pub image_id: i64,
    pub filepath: String,
}

/// Deletes an image and every reference to it: its tag links and its project
/// memberships, in one transaction. Legacy membership text still present is
/// adopted first so the scrub covers both encodings. The backing file is not
/// touched here; callers follow up with [`remove_backing_file`] after commit.
pub fn delete_image(conn: &mut Connection, image_id: i64) -> Result<DeletedImage, CatalogError> {
    let record = queries::find_image_by_id(conn, image_id)?
        .ok_or_else(|| CatalogError::NotFound(format!("image {image_id}")))?;

    let tx = conn.transaction()?;

    projects::adopt_legacy_memberships(&tx)?;
    tx.execute(
        "DELETE FROM image_tags WHERE image_id = ?1",
        params![image_id],
    )?;
    tx.execute(
        "DELETE FROM project_images WHERE image_id = ?1",
        params![image_id],
    )?;
    tx.execute("DELETE FROM images WHERE id = ?1", params![image_id])?;

    tx.commit()?;

    Ok(DeletedImage {
        image_id,
        filepath: record.filepath,
    })
}

/// Best-effort removal of a deleted image's file. Runs after the database
/// transaction has committed; a missing file or a failed unlink is logged and
/// never propagated.
pub fn remove_backing_file(filepath: &str) {
    match fs::remove_file(filepath) {
        Ok(()) => {}
        Err(error) if error.kind() == ErrorKind::NotFound => {
            tracing::warn!(filepath, "backing file already missing on delete");
        }
        Err(error) => {
            tracing::warn!(filepath, %error, "failed to remove backing file");
        }
    }
}

pub fn delete_image_and_file(
    conn: &mut Connection,
    image_id: i64,
) -> Result<DeletedImage, CatalogError> {
    let deleted = delete_image(conn, image_id)?;
    remove_backing_file(&deleted.filepath);
    Ok(deleted)
}

#[derive(Debug, Clone)]
pub struct MissingFile {
    pub image_id: i64,
    pub filepath: String,
}

#[derive(Debug, Clone, Default)]
pub struct DriftReport {
    /// Files under the upload dir with no image row pointing at them.
    pub orphan_files: Vec<PathBuf>,
    /// Image rows whose backing file is gone.
    pub missing_files: Vec<MissingFile>,
}

/// Compares the upload directory against the image rows. The store and the
/// filesystem are not transactional together, so a crash mid-operation can
/// strand a file or a row; this finds both kinds of drift.
pub fn reconcile(conn: &Connection, upload_dir: &Path) -> Result<DriftReport, CatalogError> {
    let mut report = DriftReport::default();
    let mut known = HashSet::new();

    for record in queries::list_images(conn)? {
        let path = Path::new(&record.filepath);
        match path.canonicalize() {
            Ok(canonical) => {
                known.insert(canonical);
            }
            Err(_) => report.missing_files.push(MissingFile {
                image_id: record.id,
                filepath: record.filepath,
            }),
        }
    }

    for entry in WalkDir::new(upload_dir).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }

        let canonical = entry.path().canonicalize().map_err(|error| {
            CatalogError::Io(format!(
                "failed to canonicalize {:?}: {error}",
                entry.path()
            ))
        })?;

        if !known.contains(&canonical) {
            report.orphan_files.push(entry.path().to_path_buf());
        }
    }

    Ok(report)
}

/// Removes orphan files found by [`reconcile`]. Failures are logged and
/// skipped; returns how many files were actually removed.
pub fn remove_orphans(orphans: &[PathBuf]) -> usize {
    let mut removed = 0;

    for path in orphans {
        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "failed to remove orphan file");
            }
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::migrations::MIGRATIONS;
    use crate::catalog::models::ImageMetadata;
    use crate::catalog::queries::insert_image;
    use crate::tags::{link_tags, tags_for};
    use rusqlite::Connection;
    use tempfile::TempDir;

    fn setup_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory sqlite should open");
        for migration in MIGRATIONS {
            conn.execute_batch(migration)
                .expect("schema should be created");
        }
        conn
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn row_counts(conn: &Connection) -> (i64, i64, i64) {
        let images = conn
            .query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))
            .expect("query should succeed");
        let links = conn
            .query_row("SELECT COUNT(*) FROM image_tags", [], |row| row.get(0))
            .expect("query should succeed");
        let members = conn
            .query_row("SELECT COUNT(*) FROM project_images", [], |row| row.get(0))
            .expect("query should succeed");
        (images, links, members)
    }

    #[test]
    fn delete_scrubs_tags_and_both_membership_encodings() {
        let conn = &mut setup_conn();

        let keep = insert_image(conn, "uploads/keep.jpg", &ImageMetadata::default(), None)
            .expect("insert should succeed");
        let doomed = insert_image(conn, "uploads/doomed.jpg", &ImageMetadata::default(), None)
            .expect("insert should succeed");
        link_tags(conn, doomed, &names(&["silk", "red"])).expect("link should succeed");
        link_tags(conn, keep, &names(&["silk"])).expect("link should succeed");

        conn.execute(
            "INSERT INTO projects (name, image_ids) VALUES ('json', ?1), ('csv', ?2)",
            params![format!("[{keep},{doomed}]"), format!("{doomed},{keep}")],
        )
        .expect("seed projects should insert");

        let deleted = delete_image(conn, doomed).expect("delete should succeed");
        assert_eq!(deleted.filepath, "uploads/doomed.jpg");

        for project_id in [1i64, 2] {
            let members = projects::membership(conn, project_id).expect("query should succeed");
            assert_eq!(members, vec![keep], "project {project_id}");
        }

        assert!(tags_for(conn, doomed)
            .expect("query should succeed")
            .is_empty());
        assert_eq!(tags_for(conn, keep).expect("query should succeed"), names(&["silk"]));
    }

    #[test]
    fn deleting_unknown_image_is_not_found_with_zero_writes() {
        let conn = &mut setup_conn();

        let image_id = insert_image(conn, "uploads/a.jpg", &ImageMetadata::default(), None)
            .expect("insert should succeed");
        link_tags(conn, image_id, &names(&["silk"])).expect("link should succeed");
        conn.execute(
            "INSERT INTO projects (name, image_ids) VALUES ('p', ?1)",
            params![format!("[{image_id}]")],
        )
        .expect("seed project should insert");
        projects::adopt_legacy_memberships(conn).expect("adoption should succeed");

        let before = row_counts(conn);
        let error = delete_image(conn, 9999).expect_err("unknown id should fail");

        assert!(error.is_not_found());
        assert_eq!(row_counts(conn), before);
    }

    #[test]
    fn backing_file_is_removed_after_commit_and_absence_is_tolerated() {
        let conn = &mut setup_conn();
        let dir = TempDir::new().expect("tempdir should be created");

        let on_disk = dir.path().join("real.jpg");
        fs::write(&on_disk, b"bytes").expect("file should be written");
        let with_file = insert_image(
            conn,
            &on_disk.to_string_lossy(),
            &ImageMetadata::default(),
            None,
        )
        .expect("insert should succeed");

        let phantom = dir.path().join("phantom.jpg");
        let without_file = insert_image(
            conn,
            &phantom.to_string_lossy(),
            &ImageMetadata::default(),
            None,
        )
        .expect("insert should succeed");

        delete_image_and_file(conn, with_file).expect("delete should succeed");
        assert!(!on_disk.exists());

        // Missing file must not fail the committed deletion.
        delete_image_and_file(conn, without_file).expect("delete should succeed");
        let (images, _, _) = row_counts(conn);
        assert_eq!(images, 0);
    }

    #[test]
    fn reconcile_reports_orphans_and_missing_files() {
        let conn = setup_conn();
        let dir = TempDir::new().expect("tempdir should be created");

        let tracked = dir.path().join("tracked.jpg");
        fs::write(&tracked, b"bytes").expect("file should be written");
        insert_image(
            &conn,
            &tracked.to_string_lossy(),
            &ImageMetadata::default(),
            None,
        )
        .expect("insert should succeed");

        let gone = insert_image(&conn, "uploads/gone.jpg", &ImageMetadata::default(), None)
            .expect("insert should succeed");

        let stray = dir.path().join("stray.jpg");
        fs::write(&stray, b"bytes").expect("file should be written");

        let report = reconcile(&conn, dir.path()).expect("reconcile should succeed");

        assert_eq!(report.orphan_files, vec![stray.clone()]);
        assert_eq!(report.missing_files.len(), 1);
        assert_eq!(report.missing_files[0].image_id, gone);

        let removed = remove_orphans(&report.orphan_files);
        assert_eq!(removed, 1);
        assert!(!stray.exists());
    }
}
