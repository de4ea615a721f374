use sqlx::SqlitePool;
use tracing::warn;

use crate::access::RequestContext;
use crate::audit::repo;
use crate::audit::repo_types::NewEntry;

/// Append one audit row. A failed write is logged and swallowed so the
/// triggering request always proceeds.
pub async fn record(
    db: &SqlitePool,
    actor: Option<(i64, &str)>,
    endpoint: Option<&str>,
    method: &str,
    path: &str,
    action: &str,
    meta: Option<&str>,
) {
    let entry = NewEntry {
        user_id: actor.map(|(id, _)| id),
        username: actor.map(|(_, name)| name),
        action,
        endpoint,
        method,
        path,
        meta,
    };
    if let Err(e) = repo::insert(db, &entry).await {
        warn!(error = %e, action, path, "audit write failed; request continues");
    }
}

/// [`record`] with the actor and request fields taken from the request
/// context.
pub async fn record_ctx(db: &SqlitePool, ctx: &RequestContext, action: &str, meta: Option<&str>) {
    record(
        db,
        ctx.user.as_ref().map(|u| (u.sub, u.username.as_str())),
        ctx.endpoint,
        &ctx.method,
        &ctx.path,
        action,
        meta,
    )
    .await;
}
