use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::access::RequestContext;
use crate::audit::recorder;
use crate::state::AppState;

/// Asset delivery is not audited.
fn is_asset(path: &str) -> bool {
    path.starts_with("/static/") || path == "/favicon.ico"
}

/// Records a `view` row for every GET made by an authenticated session,
/// before the handler runs. POSTs and asset requests never produce a row.
pub async fn record_views(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(ctx) = request.extensions().get::<RequestContext>().cloned() {
        if ctx.user.is_some() && ctx.method == "GET" && !is_asset(&ctx.path) {
            recorder::record_ctx(&state.db, &ctx, "view", None).await;
        }
    }
    next.run(request).await
}
