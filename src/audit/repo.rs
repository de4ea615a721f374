use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::audit::repo_types::{AuditEntry, NewEntry};

/// Hard cap on rows returned by the viewer; no further pagination.
pub const RECENT_LIMIT: i64 = 300;

/// Append one row. The table is append-only; nothing here updates or
/// deletes.
pub async fn insert(db: &SqlitePool, entry: &NewEntry<'_>) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (user_id, username, action, endpoint, method, path, meta, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.user_id)
    .bind(entry.username)
    .bind(entry.action)
    .bind(entry.endpoint)
    .bind(entry.method)
    .bind(entry.path)
    .bind(entry.meta)
    .bind(OffsetDateTime::now_utc())
    .execute(db)
    .await?;
    Ok(())
}

/// Newest-first slice of the trail, capped at [`RECENT_LIMIT`]. An optional
/// term is matched as a case-insensitive substring against username, action,
/// endpoint, or path.
pub async fn recent(db: &SqlitePool, term: Option<&str>) -> anyhow::Result<Vec<AuditEntry>> {
    let rows = match term.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => {
            let like = format!("%{}%", t);
            sqlx::query_as::<_, AuditEntry>(
                r#"
                SELECT id, user_id, username, action, endpoint, method, path, meta, created_at
                FROM audit_logs
                WHERE username LIKE ? OR action LIKE ? OR endpoint LIKE ? OR path LIKE ?
                ORDER BY id DESC
                LIMIT ?
                "#,
            )
            .bind(&like)
            .bind(&like)
            .bind(&like)
            .bind(&like)
            .bind(RECENT_LIMIT)
            .fetch_all(db)
            .await?
        }
        None => {
            sqlx::query_as::<_, AuditEntry>(
                r#"
                SELECT id, user_id, username, action, endpoint, method, path, meta, created_at
                FROM audit_logs
                ORDER BY id DESC
                LIMIT ?
                "#,
            )
            .bind(RECENT_LIMIT)
            .fetch_all(db)
            .await?
        }
    };
    Ok(rows)
}
