//! Role gating for every page, driven by one policy table.
//!
//! An outer middleware resolves the session cookie once into a
//! [`RequestContext`] request extension; the guard middleware then checks the
//! table entry for the requested path. Handlers never re-check roles.

use axum::extract::{FromRef, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use crate::auth::claims::Claims;
use crate::auth::session::{self, SessionKeys};
use crate::flash::{self, Level};
use crate::state::AppState;
use crate::users::repo_types::Role;

const ANY: &[Role] = &[Role::Admin, Role::Captura, Role::Lectura];
const CAPTURA: &[Role] = &[Role::Admin, Role::Captura];
const ADMIN: &[Role] = &[Role::Admin];

pub struct PagePolicy {
    pub path: &'static str,
    pub endpoint: &'static str,
    pub title: &'static str,
    pub allowed: &'static [Role],
}

/// Every gated page with its allowed role set. The nav and the guard both
/// read this table.
#[rustfmt::skip]
pub const PAGES: &[PagePolicy] = &[
    PagePolicy { path: "/", endpoint: "index", title: "Inicio", allowed: ANY },
    PagePolicy { path: "/parque", endpoint: "parque", title: "Parque", allowed: ANY },
    PagePolicy { path: "/peticiones", endpoint: "peticiones", title: "Peticiones", allowed: CAPTURA },
    PagePolicy { path: "/vales", endpoint: "vales", title: "Vales", allowed: CAPTURA },
    PagePolicy { path: "/seguimiento", endpoint: "seguimiento", title: "Seguimiento", allowed: ANY },
    PagePolicy { path: "/copiar", endpoint: "copiar", title: "Copiar", allowed: ADMIN },
    PagePolicy { path: "/admin/usuarios", endpoint: "admin_usuarios", title: "Usuarios", allowed: ADMIN },
    PagePolicy { path: "/admin/movimientos", endpoint: "admin_movimientos", title: "Movimientos", allowed: ADMIN },
];

pub fn policy_for(path: &str) -> Option<&'static PagePolicy> {
    PAGES.iter().find(|p| p.path == path)
}

/// Endpoint name recorded in the audit trail for a given path.
pub fn endpoint_name(path: &str) -> Option<&'static str> {
    if let Some(policy) = policy_for(path) {
        return Some(policy.endpoint);
    }
    match path {
        "/login" => Some("login"),
        "/logout" => Some("logout"),
        _ => None,
    }
}

/// Per-request values threaded to the guard, the audit recorder, and the
/// handlers.
#[derive(Clone)]
pub struct RequestContext {
    pub user: Option<Claims>,
    pub endpoint: Option<&'static str>,
    pub method: String,
    pub path: String,
}

/// Resolves the session cookie (if any) and stores the request context as an
/// extension. Runs on every request, before auditing and gating.
pub async fn attach_context(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let keys = SessionKeys::from_ref(&state);
    let user = session::token_from_headers(request.headers())
        .and_then(|token| keys.verify(&token).ok());

    let path = request.uri().path().to_string();
    let ctx = RequestContext {
        user,
        endpoint: endpoint_name(&path),
        method: request.method().to_string(),
        path,
    };
    request.extensions_mut().insert(ctx);
    next.run(request).await
}

/// Blocks gated pages before any handler side effect: unauthenticated
/// requests bounce to the login form with the target preserved, wrong-role
/// sessions bounce home with a flash.
pub async fn guard(request: Request, next: Next) -> Response {
    let Some(policy) = policy_for(request.uri().path()) else {
        return next.run(request).await;
    };

    let user = request
        .extensions()
        .get::<RequestContext>()
        .and_then(|ctx| ctx.user.clone());

    match user {
        None => Redirect::to(&format!("/login?next={}", policy.path)).into_response(),
        Some(claims) if !policy.allowed.contains(&claims.role) => {
            let mut response = Redirect::to("/").into_response();
            flash::append(
                response.headers_mut(),
                &flash::set_cookie(
                    Level::Error,
                    "No tienes permisos para acceder a esta sección.",
                ),
            );
            response
        }
        Some(_) => next.run(request).await,
    }
}
