use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::{Extension, Router};
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use tracing::error;

use crate::access::RequestContext;
use crate::audit::repo;
use crate::audit::repo_types::AuditEntry;
use crate::pages::layout::{escape_html, render};
use crate::state::AppState;

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/movimientos", get(admin_movimientos))
}

#[derive(Debug, Deserialize)]
pub struct MovimientosQuery {
    #[serde(default)]
    pub q: String,
}

fn viewer_body(rows: &[AuditEntry], q: &str) -> String {
    let rendered: String = rows
        .iter()
        .map(|row| {
            let cell = |v: &Option<String>| escape_html(v.as_deref().unwrap_or(""));
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                row.id,
                row.created_at.format(&Rfc3339).unwrap_or_default(),
                cell(&row.username),
                escape_html(&row.action),
                cell(&row.endpoint),
                cell(&row.method),
                cell(&row.path),
                cell(&row.meta),
            )
        })
        .collect();

    format!(
        r#"<h1>Movimientos</h1>
<form method="get">
  <input type="text" name="q" value="{q}" placeholder="filtrar">
  <button type="submit">Buscar</button>
</form>
<table>
  <tr><th>Id</th><th>Fecha</th><th>Usuario</th><th>Acción</th><th>Endpoint</th><th>Método</th><th>Ruta</th><th>Detalle</th></tr>
  {rendered}
</table>"#,
        q = escape_html(q),
        rendered = rendered,
    )
}

/// Read-only view of the trail: newest first, capped, optionally filtered.
pub async fn admin_movimientos(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<MovimientosQuery>,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, String)> {
    let term = query.q.trim();
    let rows = repo::recent(&state.db, (!term.is_empty()).then_some(term))
        .await
        .map_err(|e| {
            error!(error = %e, "failed to load audit rows");
            (StatusCode::INTERNAL_SERVER_ERROR, "error interno".into())
        })?;
    Ok(render(
        &ctx,
        &headers,
        "Movimientos",
        &viewer_body(&rows, term),
    ))
}
