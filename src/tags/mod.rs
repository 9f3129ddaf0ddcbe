use rusqlite::{params, Connection};

use crate::catalog::models::TagUsage;
use crate::catalog::queries;
use crate::error::CatalogError;

/// Get-or-create a tag row and return its id. Safe to call repeatedly with
/// the same name.
pub fn ensure_tag(conn: &Connection, name: &str) -> Result<i64, CatalogError> {
    conn.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", params![name])?;

    let tag_id: i64 = conn.query_row(
        "SELECT id FROM tags WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;

    Ok(tag_id)
}

/// Links every name to the image, creating tags as needed. Duplicate names in
/// the input collapse to a single association.
pub fn link_tags(conn: &Connection, image_id: i64, names: &[String]) -> Result<(), CatalogError> {
    for name in names {
        let tag_id = ensure_tag(conn, name)?;
        conn.execute(
            "INSERT OR IGNORE INTO image_tags (image_id, tag_id) VALUES (?1, ?2)",
            params![image_id, tag_id],
        )?;
    }

    Ok(())
}

/// Swaps the image's tag set for the given names in one transaction. A
/// failure partway through leaves the original set untouched. Names are
/// trimmed and blank entries skipped.
pub fn replace_tags(
    conn: &mut Connection,
    image_id: i64,
    names: &[String],
) -> Result<Vec<String>, CatalogError> {
    if !queries::image_exists(conn, image_id)? {
        return Err(CatalogError::NotFound(format!("image {image_id}")));
    }

    let tx = conn.transaction()?;

    tx.execute(
        "DELETE FROM image_tags WHERE image_id = ?1",
        params![image_id],
    )?;

    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            continue;
        }

        let tag_id = ensure_tag(&tx, trimmed)?;
        tx.execute(
            "INSERT OR IGNORE INTO image_tags (image_id, tag_id) VALUES (?1, ?2)",
            params![image_id, tag_id],
        )?;
    }

    let current = tags_for(&tx, image_id)?;
    tx.commit()?;

    Ok(current)
}

pub fn tags_for(conn: &Connection, image_id: i64) -> Result<Vec<String>, CatalogError> {
    let mut stmt = conn.prepare(
        "SELECT t.name FROM tags t
         JOIN image_tags it ON t.id = it.tag_id
         WHERE it.image_id = ?1
         ORDER BY t.name",
    )?;

    let rows = stmt.query_map(params![image_id], |row| row.get(0))?;
    let names: Result<Vec<String>, rusqlite::Error> = rows.collect();
    Ok(names?)
}

/// Every distinct tag with its usage count, most used first. The optional
/// query filters case-insensitively on any substring of the name.
pub fn list_tags(conn: &Connection, query: Option<&str>) -> Result<Vec<TagUsage>, CatalogError> {
    let mut usages = Vec::new();

    if let Some(query) = query {
        let mut stmt = conn.prepare(
            "SELECT t.name, COUNT(it.image_id) AS usage_count
             FROM tags t
             LEFT JOIN image_tags it ON t.id = it.tag_id
             WHERE LOWER(t.name) LIKE '%' || LOWER(?1) || '%'
             GROUP BY t.id, t.name
             ORDER BY usage_count DESC, t.name ASC",
        )?;
        let rows = stmt.query_map(params![query], |row| {
            Ok(TagUsage {
                name: row.get(0)?,
                usage_count: row.get(1)?,
            })
        })?;
        for usage in rows {
            usages.push(usage?);
        }
    } else {
        let mut stmt = conn.prepare(
            "SELECT t.name, COUNT(it.image_id) AS usage_count
             FROM tags t
             LEFT JOIN image_tags it ON t.id = it.tag_id
             GROUP BY t.id, t.name
             ORDER BY usage_count DESC, t.name ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(TagUsage {
                name: row.get(0)?,
                usage_count: row.get(1)?,
            })
        })?;
        for usage in rows {
            usages.push(usage?);
        }
    }

    Ok(usages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::migrations::MIGRATIONS;
    use crate::catalog::models::ImageMetadata;
    use crate::catalog::queries::insert_image;
    use rusqlite::Connection;

    fn setup_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory sqlite should open");
        for migration in MIGRATIONS {
            conn.execute_batch(migration)
                .expect("schema should be created");
        }
        conn
    }

    fn seed_image(conn: &Connection, filepath: &str) -> i64 {
        insert_image(conn, filepath, &ImageMetadata::default(), None)
            .expect("image insert should succeed")
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn ensure_tag_is_idempotent() {
        let conn = setup_conn();

        let first = ensure_tag(&conn, "velvet").expect("first call should succeed");
        let second = ensure_tag(&conn, "velvet").expect("second call should succeed");

        assert_eq!(first, second);

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))
            .expect("query should succeed");
        assert_eq!(rows, 1);
    }

    #[test]
    fn tag_names_are_case_sensitive_as_stored() {
        let conn = setup_conn();

        let lower = ensure_tag(&conn, "silk").expect("insert should succeed");
        let upper = ensure_tag(&conn, "Silk").expect("insert should succeed");

        assert_ne!(lower, upper);
    }

    #[test]
    fn link_tags_tolerates_duplicate_names() {
        let conn = setup_conn();
        let image_id = seed_image(&conn, "uploads/a.jpg");

        link_tags(&conn, image_id, &names(&["red", "red", "silk"])).expect("link should succeed");

        let linked = tags_for(&conn, image_id).expect("query should succeed");
        assert_eq!(linked, names(&["red", "silk"]));
    }

    #[test]
    fn replace_tags_with_empty_list_clears_the_image() {
        let conn = &mut setup_conn();
        let image_id = seed_image(conn, "uploads/a.jpg");
        link_tags(conn, image_id, &names(&["red", "silk"])).expect("link should succeed");

        let current = replace_tags(conn, image_id, &[]).expect("replace should succeed");

        assert!(current.is_empty());
        assert!(tags_for(conn, image_id)
            .expect("query should succeed")
            .is_empty());
    }

    #[test]
    fn replace_tags_collapses_duplicates_and_trims() {
        let conn = &mut setup_conn();
        let image_id = seed_image(conn, "uploads/a.jpg");

        let current = replace_tags(conn, image_id, &names(&["blue", " blue ", "", "  "]))
            .expect("replace should succeed");

        assert_eq!(current, names(&["blue"]));

        let associations: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM image_tags WHERE image_id = ?1",
                [image_id],
                |row| row.get(0),
            )
            .expect("query should succeed");
        assert_eq!(associations, 1);
    }

    #[test]
    fn replace_tags_for_unknown_image_is_not_found() {
        let conn = &mut setup_conn();
        let error = replace_tags(conn, 404, &names(&["red"])).expect_err("should fail");
        assert!(error.is_not_found());
    }

    #[test]
    fn list_tags_orders_by_usage_then_name() {
        let conn = setup_conn();
        let first = seed_image(&conn, "uploads/a.jpg");
        let second = seed_image(&conn, "uploads/b.jpg");

        link_tags(&conn, first, &names(&["silk", "red"])).expect("link should succeed");
        link_tags(&conn, second, &names(&["silk"])).expect("link should succeed");
        ensure_tag(&conn, "unused").expect("insert should succeed");

        let usages = list_tags(&conn, None).expect("query should succeed");
        let summary: Vec<(String, i64)> = usages
            .into_iter()
            .map(|usage| (usage.name, usage.usage_count))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("silk".to_string(), 2),
                ("red".to_string(), 1),
                ("unused".to_string(), 0),
            ]
        );
    }

    #[test]
    fn list_tags_filters_by_case_insensitive_substring() {
        let conn = setup_conn();
        let image_id = seed_image(&conn, "uploads/a.jpg");
        link_tags(&conn, image_id, &names(&["Velvet", "cotton", "velour"]))
            .expect("link should succeed");

        let usages = list_tags(&conn, Some("VEL")).expect("query should succeed");
        let found: Vec<String> = usages.into_iter().map(|usage| usage.name).collect();

        assert_eq!(found, names(&["Velvet", "velour"]));
    }
}
