use axum::{
    extract::{Request, State},
    http::{header, uri::PathAndQuery, Method},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::flash::Flash;
use crate::db::{SessionRepo, UserRepo};
use crate::server::{redirect_with_cookies, AppState};

pub const SESSION_COOKIE: &str = "session";
pub const LOGIN_PATH: &str = "/auth/login";
pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to access this page.";

/// The logged-in user, attached to the request by `session_middleware`.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: i64,
    pub username: String,
    pub token: String,
}

pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(token) = state.cookies.read(req.headers(), SESSION_COOKIE) {
        if let Some(user) = load_session_user(&state, token).await {
            req.extensions_mut().insert(user);
        }
    }

    next.run(req).await
}

async fn load_session_user(state: &AppState, token: String) -> Option<SessionUser> {
    let session = match state.db.get_session(&token).await {
        Ok(session) => session,
        Err(e) => {
            debug!("Ignoring session cookie: {}", e);
            return None;
        }
    };

    let user = match state.db.get_user_by_id(session.user_id).await {
        Ok(user) => user,
        Err(e) => {
            warn!("Session for unknown user {}: {}", session.user_id, e);
            return None;
        }
    };

    if let Err(e) = state.db.touch_session(&token).await {
        warn!("Failed to touch session: {}", e);
    }

    Some(SessionUser {
        user_id: user.id,
        username: user.username,
        token,
    })
}

/// Redirects anonymous requests to the login page.
pub async fn require_login(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if get_session_user(&req).is_some() {
        return next.run(req).await;
    }

    let location = match login_return_path(&req) {
        Some(next_path) => format!("{}?next={}", LOGIN_PATH, urlencoding::encode(&next_path)),
        None => LOGIN_PATH.to_string(),
    };

    let flash = Flash::from_headers(&state.cookies, req.headers()).info(LOGIN_REQUIRED_MESSAGE);
    redirect_with_cookies(&location, [flash.cookie(&state.cookies)])
}

/// Where to send the user once they have logged in. Only pages that can be
/// fetched with GET qualify; for form posts that is the page holding the form.
fn login_return_path(req: &Request) -> Option<String> {
    if req.method() == Method::GET || req.method() == Method::HEAD {
        return req.uri().path_and_query().map(|pq| pq.as_str().to_string());
    }

    req.headers()
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<axum::http::Uri>().ok())
        .and_then(|uri| uri.path_and_query().map(|pq| pq.as_str().to_string()))
        .filter(|path| is_local_path(path))
}

pub fn get_session_user<B>(req: &axum::http::Request<B>) -> Option<SessionUser> {
    req.extensions().get::<SessionUser>().cloned()
}

fn is_local_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && path.is_ascii()
        && !path.chars().any(|c| c.is_ascii_control())
        && path.parse::<PathAndQuery>().is_ok()
}

/// Only local absolute paths that are valid in a `Location` header are
/// accepted as post-login targets.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if is_local_path(path) => path,
        _ => "/",
    }
}
