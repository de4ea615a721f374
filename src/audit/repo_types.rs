use sqlx::FromRow;
use time::OffsetDateTime;

/// One immutable audit row. `user_id`/`username` are a point-in-time
/// snapshot; rows stay meaningful after the user is deleted.
#[derive(Debug, Clone, FromRow)]
pub struct AuditEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub action: String,
    pub endpoint: Option<String>,
    pub method: Option<String>,
    pub path: Option<String>,
    pub meta: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Row to append; id and created_at are assigned at write time.
#[derive(Debug)]
pub struct NewEntry<'a> {
    pub user_id: Option<i64>,
    pub username: Option<&'a str>,
    pub action: &'a str,
    pub endpoint: Option<&'a str>,
    pub method: &'a str,
    pub path: &'a str,
    pub meta: Option<&'a str>,
}
