use rusqlite::{params, Connection};

use crate::catalog::models::{EmailRecord, ProjectRecord};
use crate::catalog::queries;
use crate::error::CatalogError;

/// Tolerant parser for the legacy membership text. Tries the JSON-array form
/// first; otherwise strips stray brackets, splits on commas, and keeps the
/// tokens that parse as integers. Never fails.
pub fn parse_membership(raw: &str) -> Vec<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        if let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(trimmed) {
            return values.iter().filter_map(|value| value.as_i64()).collect();
        }
    }

    trimmed
        .trim_matches(|character| character == '[' || character == ']')
        .split(',')
        .filter_map(|token| token.trim().parse::<i64>().ok())
        .collect()
}

/// Moves any remaining legacy `image_ids` text into the membership table and
/// discards it. Unparseable tokens and references to images that no longer
/// exist are dropped. Returns the number of projects adopted.
pub fn adopt_legacy_memberships(conn: &Connection) -> Result<usize, CatalogError> {
    let legacy: Vec<(i64, String)> = {
        let mut stmt =
            conn.prepare("SELECT id, image_ids FROM projects WHERE image_ids IS NOT NULL")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<_, rusqlite::Error>>()?
    };

    for (project_id, raw) in &legacy {
        let members = parse_membership(raw);
        replace_membership(conn, *project_id, &members)?;
        conn.execute(
            "UPDATE projects SET image_ids = NULL WHERE id = ?1",
            params![project_id],
        )?;
    }

    Ok(legacy.len())
}

fn replace_membership(
    conn: &Connection,
    project_id: i64,
    image_ids: &[i64],
) -> Result<(), CatalogError> {
    conn.execute(
        "DELETE FROM project_images WHERE project_id = ?1",
        params![project_id],
    )?;

    let mut position = 0i64;
    for image_id in image_ids {
        if !queries::image_exists(conn, *image_id)? {
            tracing::debug!(project_id, image_id, "dropping dangling membership reference");
            continue;
        }

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO project_images (project_id, image_id, position)
             VALUES (?1, ?2, ?3)",
            params![project_id, image_id, position],
        )?;
        if inserted == 1 {
            position += 1;
        }
    }

    Ok(())
}

pub fn create_project(
    conn: &mut Connection,
    name: &str,
    image_ids: &[i64],
    ownership: Option<&str>,
) -> Result<ProjectRecord, CatalogError> {
    if name.trim().is_empty() {
        return Err(CatalogError::InvalidInput(
            "project name must not be empty".to_string(),
        ));
    }

    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO projects (name, ownership) VALUES (?1, ?2)",
        params![name.trim(), ownership],
    )?;
    let project_id = tx.last_insert_rowid();

    replace_membership(&tx, project_id, image_ids)?;
    let record = load_project(&tx, project_id)?
        .ok_or_else(|| CatalogError::Persistence("created project vanished".to_string()))?;

    tx.commit()?;
    Ok(record)
}

pub fn list_projects(conn: &Connection) -> Result<Vec<ProjectRecord>, CatalogError> {
    let headers: Vec<(i64, String, Option<String>, String, Option<String>)> = {
        let mut stmt = conn.prepare(
            "SELECT id, name, image_ids, created_at, ownership
             FROM projects
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ))
        })?;
        rows.collect::<Result<_, rusqlite::Error>>()?
    };

    let mut projects = Vec::with_capacity(headers.len());
    for (id, name, legacy_text, created_at, ownership) in headers {
        // A not-yet-adopted row still normalizes through the tolerant parser.
        let image_ids = match legacy_text {
            Some(raw) => parse_membership(&raw),
            None => membership(conn, id)?,
        };

        projects.push(ProjectRecord {
            id,
            name,
            image_ids,
            created_at,
            ownership,
        });
    }

    Ok(projects)
}

pub fn membership(conn: &Connection, project_id: i64) -> Result<Vec<i64>, CatalogError> {
    let mut stmt = conn.prepare(
        "SELECT image_id FROM project_images WHERE project_id = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map(params![project_id], |row| row.get(0))?;
    let ids: Result<Vec<i64>, rusqlite::Error> = rows.collect();
    Ok(ids?)
}

pub fn delete_project(conn: &Connection, project_id: i64) -> Result<(), CatalogError> {
    conn.execute(
        "DELETE FROM project_images WHERE project_id = ?1",
        params![project_id],
    )?;
    let removed = conn.execute("DELETE FROM projects WHERE id = ?1", params![project_id])?;

    if removed == 0 {
        return Err(CatalogError::NotFound(format!("project {project_id}")));
    }

    Ok(())
}

fn load_project(conn: &Connection, project_id: i64) -> Result<Option<ProjectRecord>, CatalogError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, created_at, ownership FROM projects WHERE id = ?1",
    )?;
    let mut rows = stmt.query(params![project_id])?;

    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    let record = ProjectRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        image_ids: Vec::new(),
        created_at: row.get(2)?,
        ownership: row.get(3)?,
    };

    let image_ids = membership(conn, record.id)?;
    Ok(Some(ProjectRecord { image_ids, ..record }))
}

// Sharing history. The core only appends and reads; composing and sending the
// email itself lives outside.

pub fn record_email(
    conn: &Connection,
    project_id: i64,
    recipient_email: &str,
    sender_message: Option<&str>,
    success: bool,
) -> Result<i64, CatalogError> {
    conn.execute(
        "INSERT INTO email_history (project_id, recipient_email, sender_message, success)
         VALUES (?1, ?2, ?3, ?4)",
        params![project_id, recipient_email, sender_message, success as i64],
    )?;

    Ok(conn.last_insert_rowid())
}

pub fn email_history(conn: &Connection, project_id: i64) -> Result<Vec<EmailRecord>, CatalogError> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, recipient_email, sender_message, sent_at, success
         FROM email_history
         WHERE project_id = ?1
         ORDER BY sent_at DESC, id DESC",
    )?;

    let rows = stmt.query_map(params![project_id], |row| {
        Ok(EmailRecord {
            id: row.get(0)?,
            project_id: row.get(1)?,
            recipient_email: row.get(2)?,
            sender_message: row.get(3)?,
            sent_at: row.get(4)?,
            success: row.get::<_, i64>(5)? != 0,
        })
    })?;

    let history: Result<Vec<EmailRecord>, rusqlite::Error> = rows.collect();
    Ok(history?)
}
