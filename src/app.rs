use std::net::SocketAddr;

use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{access, audit, auth, pages, users};

/// Assemble the full router. Request flow: trace → resolve session into the
/// request context → implicit view auditing → role guard → handler.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(pages::router())
        .merge(users::router())
        .merge(audit::router())
        .layer(middleware::from_fn(access::guard))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            audit::middleware::record_views,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            access::attach_context,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let status = res.status();
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
        .with_state(state)
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRef;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::audit::repo as audit_repo;
    use crate::audit::repo_types::AuditEntry;
    use crate::auth::session::SessionKeys;
    use crate::users::repo as users_repo;
    use crate::users::repo_types::Role;

    async fn test_app() -> (Router, AppState) {
        let state = AppState::fake().await;
        users::seed::ensure_seed_users(&state.db).await.unwrap();
        (build_app(state.clone()), state)
    }

    fn get(path: &str, session: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(path);
        if let Some(cookie) = session {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_form(path: &str, session: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = session {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn location(res: &axum::http::Response<Body>) -> &str {
        res.headers()
            .get(header::LOCATION)
            .expect("Location header")
            .to_str()
            .unwrap()
    }

    fn set_cookies(res: &axum::http::Response<Body>) -> Vec<String> {
        res.headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    /// Log in through the real handler and return the session Cookie value.
    async fn login(app: &Router, username: &str, password: &str) -> String {
        let res = app
            .clone()
            .oneshot(post_form(
                "/login",
                None,
                &format!("username={username}&password={password}"),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER, "login should succeed");
        set_cookies(&res)
            .iter()
            .find(|c| c.starts_with("intranet_session="))
            .expect("session cookie")
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    async fn rows(state: &AppState) -> Vec<AuditEntry> {
        audit_repo::recent(&state.db, None).await.unwrap()
    }

    async fn body_string(res: axum::http::Response<Body>) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn unauthenticated_requests_redirect_to_login_preserving_the_target() {
        let (app, state) = test_app().await;

        for path in ["/", "/parque", "/vales", "/copiar", "/admin/usuarios"] {
            let res = app.clone().oneshot(get(path, None)).await.unwrap();
            assert_eq!(res.status(), StatusCode::SEE_OTHER, "{path}");
            assert_eq!(location(&res), format!("/login?next={path}"));
        }
        assert!(rows(&state).await.is_empty());
    }

    #[tokio::test]
    async fn login_establishes_the_session_and_records_one_row() {
        let (app, state) = test_app().await;

        let cookie = login(&app, "admin", "Admin123!").await;
        let token = cookie.strip_prefix("intranet_session=").unwrap();
        let claims = SessionKeys::from_ref(&state).verify(token).expect("valid session");

        let admin = users_repo::find_by_username(&state.db, "admin")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claims.sub, admin.id);
        assert_eq!(claims.username, "admin");
        assert_eq!(claims.role, Role::Admin);

        let all = rows(&state).await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].action, "login_ok");
        assert_eq!(all[0].username.as_deref(), Some("admin"));
        assert_eq!(all[0].method.as_deref(), Some("POST"));
        assert_eq!(all[0].path.as_deref(), Some("/login"));
    }

    #[tokio::test]
    async fn failed_login_renders_the_form_and_records_nothing() {
        let (app, state) = test_app().await;

        for body in ["username=admin&password=wrong", "username=ghost&password=x"] {
            let res = app.clone().oneshot(post_form("/login", None, body)).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK);
            assert!(set_cookies(&res)
                .iter()
                .all(|c| !c.starts_with("intranet_session=")));
            let html = body_string(res).await;
            assert!(html.contains("Credenciales inválidas."));
        }
        assert!(rows(&state).await.is_empty());
    }

    #[tokio::test]
    async fn login_redirects_to_the_next_target() {
        let (app, _state) = test_app().await;

        let res = app
            .clone()
            .oneshot(post_form(
                "/login?next=/seguimiento",
                None,
                "username=captura&password=Captura123!",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/seguimiento");
    }

    #[tokio::test]
    async fn each_authenticated_get_appends_exactly_one_view_row() {
        let (app, state) = test_app().await;
        let cookie = login(&app, "lectura", "Lectura123!").await;

        let res = app.clone().oneshot(get("/", Some(&cookie))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let views: Vec<AuditEntry> = rows(&state)
            .await
            .into_iter()
            .filter(|r| r.action == "view")
            .collect();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].endpoint.as_deref(), Some("index"));
        assert_eq!(views[0].method.as_deref(), Some("GET"));
        assert_eq!(views[0].path.as_deref(), Some("/"));
        assert_eq!(views[0].username.as_deref(), Some("lectura"));
    }

    #[tokio::test]
    async fn wrong_role_bounces_home_with_a_flash() {
        let (app, _state) = test_app().await;
        let cookie = login(&app, "lectura", "Lectura123!").await;

        for path in ["/vales", "/peticiones", "/copiar", "/admin/usuarios"] {
            let res = app.clone().oneshot(get(path, Some(&cookie))).await.unwrap();
            assert_eq!(res.status(), StatusCode::SEE_OTHER, "{path}");
            assert_eq!(location(&res), "/");
            assert!(
                set_cookies(&res)
                    .iter()
                    .any(|c| c.starts_with("intranet_flash=")),
                "{path} should flash"
            );
        }
    }

    #[tokio::test]
    async fn admin_creates_a_user_and_the_trail_reads_newest_first() {
        let (app, state) = test_app().await;
        let cookie = login(&app, "admin", "Admin123!").await;

        let res = app
            .clone()
            .oneshot(get("/admin/usuarios", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = app
            .clone()
            .oneshot(post_form(
                "/admin/usuarios",
                Some(&cookie),
                "action=create&username=bob&password=s3creta&role=lectura",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/admin/usuarios");

        let bob = users_repo::find_by_username(&state.db, "bob")
            .await
            .unwrap()
            .expect("bob created");
        assert_eq!(bob.role, Role::Lectura);
        assert_ne!(bob.password_hash, "s3creta");

        let all = rows(&state).await;
        let actions: Vec<&str> = all.iter().map(|r| r.action.as_str()).collect();
        assert_eq!(actions, vec!["user_create", "view", "login_ok"]);
        assert_eq!(all[0].meta.as_deref(), Some("bob"));
        assert_eq!(all[0].method.as_deref(), Some("POST"));
        assert_eq!(all[1].path.as_deref(), Some("/admin/usuarios"));
    }

    #[tokio::test]
    async fn duplicate_create_leaves_the_store_unchanged() {
        let (app, state) = test_app().await;
        let cookie = login(&app, "admin", "Admin123!").await;

        let res = app
            .clone()
            .oneshot(post_form(
                "/admin/usuarios",
                Some(&cookie),
                "action=create&username=captura&password=x&role=admin",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);

        assert_eq!(users_repo::count(&state.db).await.unwrap(), 3);
        let kept = users_repo::find_by_username(&state.db, "captura")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept.role, Role::Captura);
        assert!(rows(&state).await.iter().all(|r| r.action != "user_create"));
    }

    #[tokio::test]
    async fn invalid_admin_input_performs_no_write() {
        let (app, state) = test_app().await;
        let cookie = login(&app, "admin", "Admin123!").await;

        for body in [
            "action=create&username=&password=x&role=lectura",
            "action=create&username=x&password=&role=lectura",
            "action=create&username=x&password=x&role=root",
            "action=update_role&user_id=zzz&role=admin",
            "action=reset_pwd&user_id=1&newpwd=",
            "action=unknown",
        ] {
            let res = app
                .clone()
                .oneshot(post_form("/admin/usuarios", Some(&cookie), body))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::SEE_OTHER, "{body}");
            assert_eq!(location(&res), "/admin/usuarios");
        }
        assert_eq!(users_repo::count(&state.db).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn self_delete_is_rejected() {
        let (app, state) = test_app().await;
        let cookie = login(&app, "admin", "Admin123!").await;
        let admin = users_repo::find_by_username(&state.db, "admin")
            .await
            .unwrap()
            .unwrap();

        let res = app
            .clone()
            .oneshot(post_form(
                "/admin/usuarios",
                Some(&cookie),
                &format!("action=delete&user_id={}", admin.id),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);

        assert!(users_repo::find_by_id(&state.db, admin.id)
            .await
            .unwrap()
            .is_some());
        assert!(rows(&state).await.iter().all(|r| r.action != "user_delete"));
    }

    #[tokio::test]
    async fn role_change_and_delete_are_audited_with_meta() {
        let (app, state) = test_app().await;
        let cookie = login(&app, "admin", "Admin123!").await;
        let lectura = users_repo::find_by_username(&state.db, "lectura")
            .await
            .unwrap()
            .unwrap();

        app.clone()
            .oneshot(post_form(
                "/admin/usuarios",
                Some(&cookie),
                &format!("action=update_role&user_id={}&role=captura", lectura.id),
            ))
            .await
            .unwrap();
        let reloaded = users_repo::find_by_id(&state.db, lectura.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.role, Role::Captura);

        app.clone()
            .oneshot(post_form(
                "/admin/usuarios",
                Some(&cookie),
                &format!("action=delete&user_id={}", lectura.id),
            ))
            .await
            .unwrap();
        assert!(users_repo::find_by_id(&state.db, lectura.id)
            .await
            .unwrap()
            .is_none());

        let all = rows(&state).await;
        assert_eq!(all[0].action, "user_delete");
        assert_eq!(all[0].meta.as_deref(), Some(lectura.id.to_string().as_str()));
        assert_eq!(all[1].action, "user_role_change");
        assert_eq!(
            all[1].meta.as_deref(),
            Some(format!("{} -> captura", lectura.id).as_str())
        );
        // the deleted user's audit rows keep their snapshot
        assert!(all.iter().any(|r| r.username.as_deref() == Some("admin")));
    }

    #[tokio::test]
    async fn movimientos_is_admin_only_and_filters() {
        let (app, state) = test_app().await;

        let cookie = login(&app, "captura", "Captura123!").await;
        let res = app
            .clone()
            .oneshot(get("/admin/movimientos", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/");

        let cookie = login(&app, "admin", "Admin123!").await;
        app.clone().oneshot(get("/parque", Some(&cookie))).await.unwrap();
        let res = app
            .clone()
            .oneshot(get("/admin/movimientos?q=parque", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let html = body_string(res).await;
        assert!(html.contains("/parque"));
        assert!(!html.contains("login_ok"));

        let filtered = audit_repo::recent(&state.db, Some("parque")).await.unwrap();
        assert!(filtered.iter().all(|r| r.path.as_deref() == Some("/parque")));
    }

    #[tokio::test]
    async fn logout_clears_the_session_and_is_audited() {
        let (app, state) = test_app().await;
        let cookie = login(&app, "admin", "Admin123!").await;

        let res = app.clone().oneshot(get("/logout", Some(&cookie))).await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/login");
        assert!(set_cookies(&res)
            .iter()
            .any(|c| c.starts_with("intranet_session=;") && c.contains("Max-Age=0")));

        let logout_rows: Vec<AuditEntry> = rows(&state)
            .await
            .into_iter()
            .filter(|r| r.action == "logout")
            .collect();
        assert_eq!(logout_rows.len(), 1);
        assert_eq!(logout_rows[0].username.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn flash_is_shown_once_and_then_cleared() {
        let (app, _state) = test_app().await;
        let cookie = login(&app, "lectura", "Lectura123!").await;

        let res = app.clone().oneshot(get("/vales", Some(&cookie))).await.unwrap();
        let flash_cookie = set_cookies(&res)
            .iter()
            .find(|c| c.starts_with("intranet_flash="))
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();

        let res = app
            .clone()
            .oneshot(get("/", Some(&format!("{}; {}", cookie, flash_cookie))))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        // the page clears the flash for the next request
        assert!(set_cookies(&res)
            .iter()
            .any(|c| c.starts_with("intranet_flash=;") && c.contains("Max-Age=0")));
        let html = body_string(res).await;
        assert!(html.contains("No tienes permisos"));
    }
}
