//! Admin console: the only place user rows are created, changed, or deleted.
//! Every branch, success or guarded failure, answers with a redirect back to
//! the console and a flash message.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Extension, Form, Router};
use tracing::{error, info};

use crate::access::RequestContext;
use crate::audit::recorder;
use crate::auth::extractors::CurrentUser;
use crate::auth::password::hash_password;
use crate::flash::{self, Level};
use crate::pages::layout::{escape_html, render};
use crate::state::AppState;
use crate::users::dto::AdminForm;
use crate::users::repo::{self, CreateError};
use crate::users::repo_types::{Role, User};

pub fn admin_routes() -> Router<AppState> {
    Router::new().route(
        "/admin/usuarios",
        get(admin_usuarios).post(admin_usuarios_submit),
    )
}

fn internal(e: impl std::fmt::Display) -> (StatusCode, String) {
    error!(error = %e, "admin console storage error");
    (StatusCode::INTERNAL_SERVER_ERROR, "error interno".into())
}

fn role_options(selected: Option<Role>) -> String {
    Role::ALL
        .iter()
        .map(|role| {
            format!(
                r#"<option value="{v}"{sel}>{v}</option>"#,
                v = role.as_str(),
                sel = if Some(*role) == selected { " selected" } else { "" }
            )
        })
        .collect()
}

fn console_body(users: &[User]) -> String {
    let rows: String = users
        .iter()
        .map(|u| {
            let name = escape_html(&u.username);
            format!(
                r#"<tr>
  <td>{id}</td>
  <td>{name}</td>
  <td>
    <form method="post">
      <input type="hidden" name="action" value="update_role">
      <input type="hidden" name="user_id" value="{id}">
      <select name="role">{roles}</select>
      <button type="submit">Cambiar rol</button>
    </form>
  </td>
  <td>
    <form method="post">
      <input type="hidden" name="action" value="reset_pwd">
      <input type="hidden" name="user_id" value="{id}">
      <input type="password" name="newpwd" placeholder="nueva contraseña">
      <button type="submit">Restablecer</button>
    </form>
  </td>
  <td>
    <form method="post">
      <input type="hidden" name="action" value="delete">
      <input type="hidden" name="user_id" value="{id}">
      <button type="submit">Eliminar</button>
    </form>
  </td>
</tr>"#,
                id = u.id,
                name = name,
                roles = role_options(Some(u.role)),
            )
        })
        .collect();

    format!(
        r#"<h1>Usuarios</h1>
<form method="post">
  <input type="hidden" name="action" value="create">
  <input type="text" name="username" placeholder="usuario">
  <input type="password" name="password" placeholder="contraseña">
  <select name="role">{roles}</select>
  <button type="submit">Crear</button>
</form>
<table>
  <tr><th>Id</th><th>Usuario</th><th>Rol</th><th>Contraseña</th><th></th></tr>
  {rows}
</table>"#,
        roles = role_options(Some(Role::Lectura)),
        rows = rows,
    )
}

pub async fn admin_usuarios(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, String)> {
    let users = repo::list(&state.db).await.map_err(internal)?;
    Ok(render(&ctx, &headers, "Usuarios", &console_body(&users)))
}

pub async fn admin_usuarios_submit(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<AdminForm>,
) -> Result<Response, (StatusCode, String)> {
    let (level, message) = match form.action.as_str() {
        "create" => create_user(&state, &ctx, &form).await?,
        "update_role" => update_role(&state, &ctx, &form).await?,
        "reset_pwd" => reset_password(&state, &ctx, &form).await?,
        "delete" => delete_user(&state, &ctx, claims.sub, &form).await?,
        _ => (Level::Error, "Datos inválidos.".to_string()),
    };

    let mut response = Redirect::to("/admin/usuarios").into_response();
    flash::append(response.headers_mut(), &flash::set_cookie(level, &message));
    Ok(response)
}

async fn create_user(
    state: &AppState,
    ctx: &RequestContext,
    form: &AdminForm,
) -> Result<(Level, String), (StatusCode, String)> {
    let username = form.username.trim();
    let Some(role) = Role::parse(&form.role) else {
        return Ok((Level::Error, "Datos inválidos.".into()));
    };
    if username.is_empty() || form.password.is_empty() {
        return Ok((Level::Error, "Datos inválidos.".into()));
    }

    let hash = hash_password(&form.password).map_err(internal)?;
    match repo::create(&state.db, username, &hash, role).await {
        Ok(user) => {
            recorder::record_ctx(&state.db, ctx, "user_create", Some(&user.username)).await;
            info!(user_id = user.id, username = %user.username, role = role.as_str(), "user created");
            Ok((
                Level::Success,
                format!("Usuario '{}' creado.", user.username),
            ))
        }
        Err(CreateError::Duplicate(_)) => Ok((Level::Error, "Ese usuario ya existe.".into())),
        Err(CreateError::Db(e)) => Err(internal(e)),
    }
}

async fn update_role(
    state: &AppState,
    ctx: &RequestContext,
    form: &AdminForm,
) -> Result<(Level, String), (StatusCode, String)> {
    let (Ok(user_id), Some(role)) = (form.user_id.parse::<i64>(), Role::parse(&form.role)) else {
        return Ok((Level::Error, "Datos inválidos.".into()));
    };
    if repo::find_by_id(&state.db, user_id)
        .await
        .map_err(internal)?
        .is_none()
    {
        return Ok((Level::Error, "Datos inválidos.".into()));
    }

    repo::update_role(&state.db, user_id, role)
        .await
        .map_err(internal)?;
    let meta = format!("{} -> {}", user_id, role.as_str());
    recorder::record_ctx(&state.db, ctx, "user_role_change", Some(&meta)).await;
    info!(user_id, role = role.as_str(), "role updated");
    Ok((Level::Success, "Rol actualizado.".into()))
}

async fn reset_password(
    state: &AppState,
    ctx: &RequestContext,
    form: &AdminForm,
) -> Result<(Level, String), (StatusCode, String)> {
    let Ok(user_id) = form.user_id.parse::<i64>() else {
        return Ok((Level::Error, "Datos inválidos.".into()));
    };
    if form.newpwd.is_empty() {
        return Ok((Level::Error, "Datos inválidos.".into()));
    }
    if repo::find_by_id(&state.db, user_id)
        .await
        .map_err(internal)?
        .is_none()
    {
        return Ok((Level::Error, "Datos inválidos.".into()));
    }

    let hash = hash_password(&form.newpwd).map_err(internal)?;
    repo::update_password(&state.db, user_id, &hash)
        .await
        .map_err(internal)?;
    recorder::record_ctx(&state.db, ctx, "user_pwd_reset", Some(&user_id.to_string())).await;
    info!(user_id, "password reset");
    Ok((Level::Success, "Contraseña actualizada.".into()))
}

async fn delete_user(
    state: &AppState,
    ctx: &RequestContext,
    session_user_id: i64,
    form: &AdminForm,
) -> Result<(Level, String), (StatusCode, String)> {
    let Ok(user_id) = form.user_id.parse::<i64>() else {
        return Ok((Level::Error, "Datos inválidos.".into()));
    };
    if user_id == session_user_id {
        return Ok((
            Level::Error,
            "No puedes eliminar tu propio usuario.".into(),
        ));
    }

    repo::delete(&state.db, user_id).await.map_err(internal)?;
    recorder::record_ctx(&state.db, ctx, "user_delete", Some(&user_id.to_string())).await;
    info!(user_id, "user deleted");
    Ok((Level::Success, "Usuario eliminado.".into()))
}
