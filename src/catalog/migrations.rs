// Every batch is idempotent; CatalogDb::initialize applies all of them on
// every startup. "row" and "column" are quoted because SQLite reserves both.
pub const MIGRATIONS: &[&str] = &[
    "
    CREATE TABLE IF NOT EXISTS images (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        filepath TEXT NOT NULL UNIQUE,
        book TEXT,
        page TEXT,
        \"row\" TEXT,
        \"column\" TEXT,
        type TEXT,
        material TEXT,
        width TEXT,
        length TEXT,
        remark TEXT,
        brand TEXT,
        color TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        ownership TEXT
    );

    CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS image_tags (
        image_id INTEGER NOT NULL,
        tag_id INTEGER NOT NULL,
        PRIMARY KEY (image_id, tag_id),
        FOREIGN KEY (image_id) REFERENCES images (id) ON DELETE CASCADE,
        FOREIGN KEY (tag_id) REFERENCES tags (id) ON DELETE CASCADE
    );
    ",
    "
    CREATE TABLE IF NOT EXISTS projects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        image_ids TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        ownership TEXT
    );

    CREATE TABLE IF NOT EXISTS project_images (
        project_id INTEGER NOT NULL,
        image_id INTEGER NOT NULL,
        position INTEGER NOT NULL,
        PRIMARY KEY (project_id, image_id),
        FOREIGN KEY (project_id) REFERENCES projects (id) ON DELETE CASCADE,
        FOREIGN KEY (image_id) REFERENCES images (id) ON DELETE CASCADE
    );
    ",
    // project_id is a weak reference on purpose: history outlives projects.
    "
    CREATE TABLE IF NOT EXISTS email_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL,
        recipient_email TEXT NOT NULL,
        sender_message TEXT,
        sent_at TEXT NOT NULL DEFAULT (datetime('now')),
        success INTEGER NOT NULL DEFAULT 1
    );
    ",
];
