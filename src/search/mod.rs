use rusqlite::types::ToSql;
use rusqlite::{params_from_iter, Connection};

use crate::catalog::models::ImageRecord;
use crate::catalog::queries::{self, IMAGE_COLUMNS_QUALIFIED};
use crate::error::CatalogError;
use crate::tags::tags_for;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// At least one of the requested tags (`OR` on the wire).
    #[default]
    Any,
    /// Every requested tag (`AND` on the wire).
    All,
}

impl MatchMode {
    /// Wire tokens compare case-insensitively; anything that is not `AND`
    /// falls back to `Any`, matching the default mode.
    pub fn parse(token: &str) -> Self {
        if token.trim().eq_ignore_ascii_case("and") {
            Self::All
        } else {
            Self::Any
        }
    }
}

/// A typed tag filter that always compiles to a parameterized query; tag
/// names are never interpolated into the SQL text.
#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    pub names: Vec<String>,
    pub mode: MatchMode,
}

impl TagFilter {
    pub fn new(names: Vec<String>, mode: MatchMode) -> Self {
        Self { names, mode }
    }

    /// Builds a filter from the wire form: a comma-separated tag list (blank
    /// entries dropped) and a mode token.
    pub fn from_query(tags: &str, mode: &str) -> Self {
        let names = tags
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(names, MatchMode::parse(mode))
    }

    fn placeholders(&self) -> String {
        vec!["?"; self.names.len()].join(",")
    }
}

/// An image hit with its full current tag list attached.
#[derive(Debug, Clone, Serialize)]
pub struct ImageHit {
    #[serde(flatten)]
    pub record: ImageRecord,
    pub tags: Vec<String>,
}

/// Runs the boolean tag search. An empty filter returns every image. Results
/// come back in ascending id order; each hit carries all of its tags, not
/// just the matching ones.
pub fn search_images(conn: &Connection, filter: &TagFilter) -> Result<Vec<ImageHit>, CatalogError> {
    let records = if filter.names.is_empty() {
        queries::list_images(conn)?
    } else {
        matching_records(conn, filter)?
    };

    let mut hits = Vec::with_capacity(records.len());
    for record in records {
        let tags = tags_for(conn, record.id)?;
        hits.push(ImageHit { record, tags });
    }

    Ok(hits)
}

fn matching_records(
    conn: &Connection,
    filter: &TagFilter,
) -> Result<Vec<ImageRecord>, CatalogError> {
    let placeholders = filter.placeholders();
    let requested = filter.names.len() as i64;

    let sql = match filter.mode {
        MatchMode::Any => format!(
            "SELECT DISTINCT {IMAGE_COLUMNS_QUALIFIED} FROM images i
             JOIN image_tags it ON i.id = it.image_id
             JOIN tags t ON it.tag_id = t.id
             WHERE t.name IN ({placeholders})
             ORDER BY i.id"
        ),
        MatchMode::All => format!(
            "SELECT {IMAGE_COLUMNS_QUALIFIED} FROM images i
             JOIN image_tags it ON i.id = it.image_id
             JOIN tags t ON it.tag_id = t.id
             WHERE t.name IN ({placeholders})
             GROUP BY i.id
             HAVING COUNT(DISTINCT t.name) = ?
             ORDER BY i.id"
        ),
    };

    let mut params: Vec<&dyn ToSql> = filter
        .names
        .iter()
        .map(|name| name as &dyn ToSql)
        .collect();
    if filter.mode == MatchMode::All {
        params.push(&requested);
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params), queries::map_image_row)?;
    let records: Result<Vec<ImageRecord>, rusqlite::Error> = rows.collect();
    Ok(records?)
}
