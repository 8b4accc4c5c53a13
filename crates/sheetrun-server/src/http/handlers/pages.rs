//! HTML pages: module list and per-module upload form.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
};

use crate::registry::Module;
use crate::state::AppState;

const STYLE: &str = r#"
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 20px; background: #f5f5f5; }
        h1 { color: #333; }
        .card { background: white; box-shadow: 0 1px 3px rgba(0,0,0,0.1); padding: 16px; margin-bottom: 12px; max-width: 720px; }
        label { display: block; margin: 10px 0 4px; font-weight: 600; color: #555; }
        small { color: #888; }
        a { color: #0066cc; text-decoration: none; }
        a:hover { text-decoration: underline; }
        pre { background: #1e1e1e; color: #ddd; padding: 12px; max-height: 360px; overflow: auto; }
        .muted { color: #888; }
"#;

/// Landing page listing every module.
pub async fn landing_page(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut cards = String::new();
    for module in state.modules.iter() {
        let status = if module.is_processable() {
            format!("{} input files", module.spec.roles.len())
        } else {
            "not available yet".to_string()
        };
        cards.push_str(&format!(
            r#"<div class="card"><a href="/{name}"><strong>{title}</strong></a><br><small>{status}</small></div>"#,
            name = module.spec.name,
            title = escape(&module.spec.title),
            status = status,
        ));
    }

    if cards.is_empty() {
        cards = r#"<p class="muted">No modules configured</p>"#.to_string();
    }

    let body = format!("<h1>SheetRun</h1>\n    {}", cards);
    html(StatusCode::OK, "SheetRun", &body)
}

/// Upload form of one module.
pub async fn module_page(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.modules.get(&name) {
        Some(module) => html(StatusCode::OK, &module.spec.title, &module_form(module)),
        None => html(
            StatusCode::NOT_FOUND,
            "Not found",
            &format!(
                r#"<h1>Unknown module</h1><p>No module called <code>{}</code>. <a href="/">Back</a></p>"#,
                escape(&name)
            ),
        ),
    }
}

fn module_form(module: &Module) -> String {
    let title = escape(&module.spec.title);
    if !module.is_processable() {
        return format!(
            r#"<h1>{title}</h1><p class="muted">This module is not available yet.</p><p><a href="/">Back</a></p>"#
        );
    }

    let mut inputs = String::new();
    for role in &module.spec.roles {
        inputs.push_str(&format!(
            r#"<label for="{field}">{label} <small>({file})</small></label>
            <input id="{field}" type="file" name="{field}" accept=".{ext}" required>
            "#,
            field = escape(&role.field),
            label = escape(&role.label),
            file = escape(&role.file_name),
            ext = escape(role.extension()),
        ));
    }

    format!(
        r#"<h1>{title} <a href="/" style="font-size:14px;margin-left:20px;">Back</a></h1>
    <form id="upload" class="card" enctype="multipart/form-data">
        {inputs}
        <p><button type="submit">Process</button></p>
    </form>
    <div class="card">
        <p id="status" class="muted">Waiting for files.</p>
        <pre id="logs"></pre>
    </div>
    <script>
        document.getElementById('upload').addEventListener('submit', async (event) => {{
            event.preventDefault();
            const status = document.getElementById('status');
            const logs = document.getElementById('logs');
            status.textContent = 'Processing...';
            logs.textContent = '';
            try {{
                const response = await fetch('/{name}/process', {{ method: 'POST', body: new FormData(event.target) }});
                const data = await response.json();
                logs.textContent = (data.logs || []).join('\n');
                if (data.success) {{
                    status.innerHTML = '';
                    const link = document.createElement('a');
                    link.href = data.download_url;
                    link.textContent = 'Download result';
                    status.appendChild(link);
                }} else {{
                    status.textContent = 'Error: ' + data.error;
                }}
            }} catch (err) {{
                status.textContent = 'Request failed: ' + err;
            }}
        }});
    </script>"#,
        name = module.spec.name,
    )
}

fn html(status: StatusCode, title: &str, body: &str) -> impl IntoResponse {
    let page = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>{}</title>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <link rel="stylesheet" href="/static/style.css">
    <style>{}</style>
</head>
<body>
    {}
</body>
</html>"#,
        escape(title),
        STYLE,
        body
    );

    (status, [(header::CONTENT_TYPE, "text/html; charset=utf-8")], page)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
