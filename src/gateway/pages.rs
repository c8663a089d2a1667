//! Server-rendered HTML pages.
//!
//! - `GET /` landing page
//! - `GET /auth.html` login and registration forms (talk to the JSON API)
//! - `GET /api.html` API console, only for logged-in users

use super::gate;
use super::AppState;
use axum::{
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
};

/// GET /
pub async fn handle_index() -> Html<String> {
    Html(render_index())
}

/// GET /auth.html
pub async fn handle_auth_page() -> Html<String> {
    Html(render_auth_page())
}

/// GET /api.html: redirects to the login page without a live session.
pub async fn handle_api_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match gate::require_page_session(&state, &headers) {
        Ok(username) => Html(render_api_page(&username)).into_response(),
        Err(redirect) => redirect,
    }
}

// ── HTML Templates ────────────────────────────────────────────────────

fn base_style() -> &'static str {
    r#"
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body {
        font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        background: #f5f5f5; color: #333;
        display: flex; justify-content: center; align-items: center;
        min-height: 100vh; padding: 20px;
    }
    .card {
        background: #fff; border-radius: 16px; padding: 32px;
        max-width: 420px; width: 100%; box-shadow: 0 4px 24px rgba(0,0,0,0.08);
    }
    .logo { text-align: center; margin-bottom: 24px; }
    .logo h1 { font-size: 28px; color: #1a1a2e; }
    .logo p { font-size: 14px; color: #666; margin-top: 4px; }
    .form-group { margin-bottom: 16px; }
    .form-group label { display: block; font-size: 14px; font-weight: 500; margin-bottom: 6px; color: #444; }
    .form-group input {
        width: 100%; padding: 12px 14px; border: 1.5px solid #ddd;
        border-radius: 10px; font-size: 16px; outline: none;
    }
    .form-group input:focus { border-color: #4a6cf7; }
    .hint { font-size: 12px; color: #888; margin-top: 4px; min-height: 14px; }
    .btn {
        width: 100%; padding: 14px; border: none; border-radius: 10px;
        font-size: 16px; font-weight: 600; cursor: pointer; display: block;
        text-align: center; text-decoration: none;
    }
    .btn-primary { background: #4a6cf7; color: #fff; }
    .btn-primary:hover { background: #3b5de7; }
    .btn-secondary { background: #e8e8e8; color: #333; margin-top: 8px; }
    .btn-secondary:hover { background: #ddd; }
    .status { padding: 10px 14px; border-radius: 8px; font-size: 13px; margin-bottom: 16px; display: none; }
    .status.error { display: block; background: #fff0f0; color: #d32f2f; }
    .status.ok { display: block; background: #f0fff4; color: #2e7d32; }
    .tabs { display: flex; gap: 8px; margin-bottom: 16px; }
    .tabs button { flex: 1; }
    .hidden { display: none; }
    pre {
        background: #1a1a2e; color: #e0e0e0; padding: 12px; border-radius: 8px;
        font-size: 12px; white-space: pre-wrap; word-break: break-all; margin-top: 12px;
    }
    "#
}

fn render_index() -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en"><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
<title>authgate</title>
<style>{style}</style>
</head><body>
<div class="card">
  <div class="logo"><h1>authgate</h1><p>Session cookie authentication demo</p></div>
  <div id="who" class="status"></div>
  <a class="btn btn-primary" href="/api.html">Open API console</a>
  <a class="btn btn-secondary" href="/auth.html">Login / Sign up</a>
</div>
<script>
fetch('/me').then(r => r.json()).then(me => {{
  const el = document.getElementById('who');
  el.className = 'status ok';
  el.textContent = me.logged ? ('Logged in as ' + me.username) : 'Not logged in';
}});
</script>
</body></html>"#,
        style = base_style(),
    )
}

fn render_auth_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en"><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
<title>authgate - Login</title>
<style>{style}</style>
</head><body>
<div class="card">
  <div class="logo"><h1>authgate</h1><p>Login or create an account</p></div>
  <div class="tabs">
    <button class="btn btn-primary" id="tab-login">Login</button>
    <button class="btn btn-secondary" id="tab-register">Sign Up</button>
  </div>
  <div id="status" class="status"></div>
  <form id="login-form">
    <div class="form-group">
      <label>Username</label>
      <input type="text" name="username" required autocomplete="username">
    </div>
    <div class="form-group">
      <label>Password</label>
      <input type="password" name="password" required autocomplete="current-password">
    </div>
    <button type="submit" class="btn btn-primary">Login</button>
  </form>
  <form id="register-form" class="hidden">
    <div class="form-group">
      <label>Username</label>
      <input type="text" name="username" id="reg-username" required autocomplete="username">
      <div class="hint" id="username-hint"></div>
    </div>
    <div class="form-group">
      <label>Email</label>
      <input type="email" name="email" required autocomplete="email">
    </div>
    <div class="form-group">
      <label>Password</label>
      <input type="password" name="password" required autocomplete="new-password" maxlength="72">
    </div>
    <button type="submit" class="btn btn-primary">Create Account</button>
  </form>
</div>
<script>
const statusEl = document.getElementById('status');
function show(ok, text) {{ statusEl.className = 'status ' + (ok ? 'ok' : 'error'); statusEl.textContent = text; }}
function post(path, form) {{
  return fetch(path, {{ method: 'POST', body: new URLSearchParams(new FormData(form)) }})
    .then(r => r.json());
}}
document.getElementById('tab-login').onclick = () => {{
  document.getElementById('login-form').classList.remove('hidden');
  document.getElementById('register-form').classList.add('hidden');
}};
document.getElementById('tab-register').onclick = () => {{
  document.getElementById('register-form').classList.remove('hidden');
  document.getElementById('login-form').classList.add('hidden');
}};
document.getElementById('login-form').onsubmit = e => {{
  e.preventDefault();
  post('/login', e.target).then(res => {{
    if (res.success) {{ window.location = '/api.html'; }} else {{ show(false, res.error); }}
  }});
}};
document.getElementById('register-form').onsubmit = e => {{
  e.preventDefault();
  post('/register', e.target).then(res => show(res.success, res.success ? res.message : res.error));
}};
document.getElementById('reg-username').onblur = e => {{
  if (!e.target.value) return;
  fetch('/check-username?username=' + encodeURIComponent(e.target.value))
    .then(r => r.json())
    .then(res => {{ document.getElementById('username-hint').textContent = res.message || res.error; }});
}};
</script>
</body></html>"#,
        style = base_style(),
    )
}

fn render_api_page(username: &str) -> String {
    let username = escape_html(username);
    format!(
        r#"<!DOCTYPE html>
<html lang="en"><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
<title>authgate - API console</title>
<style>{style}</style>
</head><body>
<div class="card">
  <div class="logo"><h1>API console</h1><p>Logged in as <strong>{username}</strong></p></div>
  <button class="btn btn-primary" id="hello">GET /hello</button>
  <div class="form-group" style="margin-top:16px">
    <label>Password to hash</label>
    <input type="text" id="plain" maxlength="72">
  </div>
  <button class="btn btn-secondary" id="hash">GET /hash</button>
  <button class="btn btn-secondary" id="logout">Logout</button>
  <pre id="out">Responses appear here.</pre>
</div>
<script>
const out = document.getElementById('out');
function call(path) {{
  fetch(path).then(r => r.text()).then(t => {{ out.textContent = t; }});
}}
document.getElementById('hello').onclick = () => call('/hello');
document.getElementById('hash').onclick = () =>
  call('/hash?password=' + encodeURIComponent(document.getElementById('plain').value));
document.getElementById('logout').onclick = () =>
  fetch('/logout').then(() => {{ window.location = '/auth.html'; }});
</script>
</body></html>"#,
        style = base_style(),
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
