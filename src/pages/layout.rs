//! Minimal server-rendered layout shared by every page. The pages carry no
//! logic; only the nav and the flash slot depend on request state.

use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Response};

use crate::access::{RequestContext, PAGES};
use crate::auth::claims::Claims;
use crate::flash::{self, Level};

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Nav links for the pages this session's role may open.
fn nav(user: &Claims) -> String {
    let links = PAGES
        .iter()
        .filter(|p| p.allowed.contains(&user.role))
        .map(|p| format!(r#"<a href="{}">{}</a>"#, p.path, p.title))
        .collect::<Vec<_>>()
        .join("\n      ");
    format!(
        r#"<nav>
      {links}
      <span class="session">{} ({}) · <a href="/logout">Salir</a></span>
    </nav>"#,
        escape_html(&user.username),
        user.role.as_str()
    )
}

fn flash_block(flash: Option<&(Level, String)>) -> String {
    match flash {
        Some((level, message)) => format!(
            r#"<p class="flash flash-{}">{}</p>"#,
            level.as_str(),
            escape_html(message)
        ),
        None => String::new(),
    }
}

pub fn layout(
    title: &str,
    user: Option<&Claims>,
    flash: Option<&(Level, String)>,
    body: &str,
) -> String {
    let nav = user.map(nav).unwrap_or_default();
    format!(
        r#"<!doctype html>
<html lang="es">
  <head>
    <meta charset="utf-8">
    <title>{title} · Intranet</title>
    <style>
      body {{ font-family: sans-serif; margin: 2rem; }}
      nav a {{ margin-right: .5rem; }}
      nav .session {{ float: right; }}
      .flash-error {{ color: #a00; }}
      .flash-success {{ color: #070; }}
      .flash-info {{ color: #046; }}
      table {{ border-collapse: collapse; }}
      td, th {{ border: 1px solid #bbb; padding: .25rem .5rem; }}
    </style>
  </head>
  <body>
    {nav}
    {flash}
    {body}
  </body>
</html>"#,
        title = escape_html(title),
        nav = nav,
        flash = flash_block(flash),
        body = body,
    )
}

/// Full page response; also clears a pending flash once rendered.
pub fn render(ctx: &RequestContext, headers: &HeaderMap, title: &str, body: &str) -> Response {
    let pending = flash::take(headers);
    let html = layout(title, ctx.user.as_ref(), pending.as_ref(), body);
    let mut response = Html(html).into_response();
    if pending.is_some() {
        flash::append(response.headers_mut(), &flash::clear_cookie());
    }
    response
}
