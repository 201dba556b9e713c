use askama::Template;
use axum::{
    extract::Path,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Extension,
};
use tracing::error;

use crate::middleware::IssuedCsrfToken;

/// Shell page for each sub-application; the client app mounts into `#app`.
///
/// `path` is the route below the sub-application root, without a leading slash.
#[derive(Template)]
#[template(
    source = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="csrf-token" content="{{ csrf_token }}">
<title>{{ title }}</title>
</head>
<body data-app="{{ app }}" data-path="{{ path }}">
<div id="app"></div>
</body>
</html>"#,
    ext = "html"
)]
pub struct AppShellTemplate {
    pub app: &'static str,
    pub title: &'static str,
    pub path: String,
    pub csrf_token: String,
}

fn render(template: AppShellTemplate) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            error!("Failed to render {} shell: {}", template.app, err);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

pub async fn landing_page(Extension(token): Extension<IssuedCsrfToken>) -> Response {
    render(AppShellTemplate {
        app: "landing",
        title: "bltnm",
        path: String::new(),
        csrf_token: token.0,
    })
}

pub async fn shop_index(Extension(token): Extension<IssuedCsrfToken>) -> Response {
    render(AppShellTemplate {
        app: "shop",
        title: "bltnm shop",
        path: String::new(),
        csrf_token: token.0,
    })
}

pub async fn shop_page(
    Extension(token): Extension<IssuedCsrfToken>,
    Path(path): Path<String>,
) -> Response {
    render(AppShellTemplate {
        app: "shop",
        title: "bltnm shop",
        path,
        csrf_token: token.0,
    })
}

pub async fn dashboard_index(Extension(token): Extension<IssuedCsrfToken>) -> Response {
    render(AppShellTemplate {
        app: "dashboard",
        title: "bltnm dashboard",
        path: String::new(),
        csrf_token: token.0,
    })
}

pub async fn dashboard_page(
    Extension(token): Extension<IssuedCsrfToken>,
    Path(path): Path<String>,
) -> Response {
    render(AppShellTemplate {
        app: "dashboard",
        title: "bltnm dashboard",
        path,
        csrf_token: token.0,
    })
}
