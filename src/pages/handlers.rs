//! The business pages themselves are inert server-rendered content; access
//! control and audit happen in the middleware stack before these run.

use axum::http::HeaderMap;
use axum::response::Response;
use axum::Extension;

use crate::access::RequestContext;
use crate::pages::layout::render;

pub async fn index(Extension(ctx): Extension<RequestContext>, headers: HeaderMap) -> Response {
    render(
        &ctx,
        &headers,
        "Inicio",
        "<h1>Inicio</h1>\n<p>Bienvenido al panel interno.</p>",
    )
}

pub async fn parque(Extension(ctx): Extension<RequestContext>, headers: HeaderMap) -> Response {
    render(
        &ctx,
        &headers,
        "Parque",
        "<h1>Parque</h1>\n<p>Consulta del parque.</p>",
    )
}

pub async fn peticiones(Extension(ctx): Extension<RequestContext>, headers: HeaderMap) -> Response {
    render(
        &ctx,
        &headers,
        "Peticiones",
        "<h1>Peticiones</h1>\n<p>Gestión de peticiones.</p>",
    )
}

pub async fn vales(Extension(ctx): Extension<RequestContext>, headers: HeaderMap) -> Response {
    render(
        &ctx,
        &headers,
        "Vales",
        "<h1>Vales</h1>\n<p>Gestión de vales.</p>",
    )
}

pub async fn seguimiento(Extension(ctx): Extension<RequestContext>, headers: HeaderMap) -> Response {
    render(
        &ctx,
        &headers,
        "Seguimiento",
        "<h1>Seguimiento</h1>\n<p>Seguimiento de expedientes.</p>",
    )
}

pub async fn copiar(Extension(ctx): Extension<RequestContext>, headers: HeaderMap) -> Response {
    render(
        &ctx,
        &headers,
        "Copiar",
        "<h1>Copiar</h1>\n<p>Copia de expedientes.</p>",
    )
}
