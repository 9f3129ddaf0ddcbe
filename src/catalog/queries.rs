use rusqlite::{params, Connection, Result, Row};

use crate::catalog::models::{ImageMetadata, ImageRecord};

pub const IMAGE_COLUMNS: &str = "id, filepath, book, page, \"row\", \"column\", type, material, \
     width, length, remark, brand, color, created_at, ownership";

// Same list qualified with the alias used by the search joins.
pub const IMAGE_COLUMNS_QUALIFIED: &str =
    "i.id, i.filepath, i.book, i.page, i.\"row\", i.\"column\", i.type, i.material, \
     i.width, i.length, i.remark, i.brand, i.color, i.created_at, i.ownership";

pub fn map_image_row(row: &Row<'_>) -> Result<ImageRecord> {
    Ok(ImageRecord {
        id: row.get(0)?,
        filepath: row.get(1)?,
        book: row.get(2)?,
        page: row.get(3)?,
        row: row.get(4)?,
        column: row.get(5)?,
        kind: row.get(6)?,
        material: row.get(7)?,
        width: row.get(8)?,
        length: row.get(9)?,
        remark: row.get(10)?,
        brand: row.get(11)?,
        color: row.get(12)?,
        created_at: row.get(13)?,
        ownership: row.get(14)?,
    })
}

pub fn insert_image(
    conn: &Connection,
    filepath: &str,
    metadata: &ImageMetadata,
    ownership: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO images
         (filepath, book, page, \"row\", \"column\", type, material, width, length, remark, brand, color, ownership)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            filepath,
            metadata.book,
            metadata.page,
            metadata.row,
            metadata.column,
            metadata.kind,
            metadata.material,
            metadata.width,
            metadata.length,
            metadata.remark,
            metadata.brand,
            metadata.color,
            ownership,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

pub fn list_images(conn: &Connection) -> Result<Vec<ImageRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {IMAGE_COLUMNS} FROM images ORDER BY id"
    ))?;
    let rows = stmt.query_map([], map_image_row)?;
    rows.collect()
}

pub fn find_image_by_id(conn: &Connection, image_id: i64) -> Result<Option<ImageRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {IMAGE_COLUMNS} FROM images WHERE id = ?1"
    ))?;

    let mut rows = stmt.query(params![image_id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(map_image_row(row)?));
    }

    Ok(None)
}

pub fn image_exists(conn: &Connection, image_id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM images WHERE id = ?1",
        params![image_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
