//! Schema bootstrap, safe to run on every start.

use log::info;
use sqlx::PgPool;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS media_folders (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        parent_id UUID REFERENCES media_folders(id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    // NULL parents are distinct in a plain UNIQUE, so roots get their own index.
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS media_folders_sibling_name
        ON media_folders (parent_id, name) WHERE parent_id IS NOT NULL
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS media_folders_root_name
        ON media_folders (name) WHERE parent_id IS NULL
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS media_assets (
        id UUID PRIMARY KEY,
        display_name TEXT NOT NULL,
        stored_name TEXT NOT NULL,
        mime_type TEXT NOT NULL,
        size_bytes BIGINT NOT NULL,
        relative_path TEXT NOT NULL,
        content_hash TEXT NOT NULL UNIQUE,
        caption TEXT,
        folder_id UUID REFERENCES media_folders(id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    // Insertion order; breaks created_at ties when listing newest first.
    "ALTER TABLE media_assets ADD COLUMN IF NOT EXISTS seq BIGINT GENERATED ALWAYS AS IDENTITY",
    "CREATE INDEX IF NOT EXISTS media_assets_folder_id ON media_assets (folder_id)",
    "CREATE INDEX IF NOT EXISTS media_folders_parent_id ON media_folders (parent_id)",
];

pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Media schema is up to date");
    Ok(())
}
