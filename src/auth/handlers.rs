use axum::extract::{FromRef, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Extension, Form, Router};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::access::RequestContext;
use crate::audit::recorder;
use crate::auth::password::verify_password;
use crate::auth::session::{self, SessionKeys};
use crate::flash::{self, Level};
use crate::pages::layout::escape_html;
use crate::state::AppState;
use crate::users::repo;
use crate::users::repo_types::User;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Validate a username/password pair against the user store. Unknown
/// usernames and wrong passwords are indistinguishable to the caller.
pub async fn authenticate(
    db: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<User, AuthError> {
    let user = repo::find_by_username(db, username)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    if verify_password(password, &user.password_hash)? {
        Ok(user)
    } else {
        Err(AuthError::InvalidCredentials)
    }
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_form).post(login))
        .route("/logout", get(logout))
}

#[derive(Debug, Deserialize)]
pub struct NextParam {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn login_page(next: Option<&str>, notice: Option<(Level, &str)>) -> String {
    let action = match next.filter(|n| !n.is_empty()) {
        Some(next) => format!("/login?next={}", escape_html(next)),
        None => "/login".to_string(),
    };
    let notice = notice
        .map(|(level, text)| {
            format!(
                r#"<p class="flash flash-{}">{}</p>"#,
                level.as_str(),
                escape_html(text)
            )
        })
        .unwrap_or_default();
    format!(
        r#"<!doctype html>
<html lang="es">
  <head>
    <meta charset="utf-8">
    <title>Acceso · Intranet</title>
    <style>
      body {{ font-family: sans-serif; margin: 2rem; }}
      .flash-error {{ color: #a00; }}
      .flash-info {{ color: #046; }}
      label {{ display: block; margin-top: .5rem; }}
    </style>
  </head>
  <body>
    <h1>Acceso</h1>
    {notice}
    <form method="post" action="{action}">
      <label>Usuario <input type="text" name="username" autofocus></label>
      <label>Contraseña <input type="password" name="password"></label>
      <button type="submit">Entrar</button>
    </form>
  </body>
</html>"#
    )
}

pub async fn login_form(Query(query): Query<NextParam>, headers: HeaderMap) -> Response {
    let pending = flash::take(&headers);
    let notice = pending
        .as_ref()
        .map(|(level, message)| (*level, message.as_str()));
    let mut response = Html(login_page(query.next.as_deref(), notice)).into_response();
    if pending.is_some() {
        flash::append(response.headers_mut(), &flash::clear_cookie());
    }
    response
}

pub async fn login(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<NextParam>,
    Form(form): Form<LoginForm>,
) -> Response {
    let username = form.username.trim();

    match authenticate(&state.db, username, &form.password).await {
        Ok(user) => {
            let keys = SessionKeys::from_ref(&state);
            let token = match keys.sign(&user) {
                Ok(t) => t,
                Err(e) => {
                    error!(error = %e, "failed to sign session");
                    return (StatusCode::INTERNAL_SERVER_ERROR, "error interno").into_response();
                }
            };

            recorder::record(
                &state.db,
                Some((user.id, &user.username)),
                ctx.endpoint,
                &ctx.method,
                &ctx.path,
                "login_ok",
                None,
            )
            .await;

            let dest = query
                .next
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "/".into());
            info!(user_id = user.id, username = %user.username, "login ok");
            let mut response = Redirect::to(&dest).into_response();
            flash::append(
                response.headers_mut(),
                &session::session_cookie(&token, keys.ttl),
            );
            response
        }
        Err(AuthError::InvalidCredentials) => {
            warn!(username = %username, "login rejected");
            Html(login_page(
                query.next.as_deref(),
                Some((Level::Error, "Credenciales inválidas.")),
            ))
            .into_response()
        }
        Err(AuthError::Internal(e)) => {
            error!(error = %e, "login failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "error interno").into_response()
        }
    }
}

/// Destroys the session unconditionally; never fails, even without one.
pub async fn logout(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Response {
    recorder::record_ctx(&state.db, &ctx, "logout", None).await;

    let mut response = Redirect::to("/login").into_response();
    flash::append(response.headers_mut(), &session::clear_session_cookie());
    flash::append(
        response.headers_mut(),
        &flash::set_cookie(Level::Info, "Sesión cerrada."),
    );
    response
}
