use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Form,
};
use serde::Deserialize;
use tracing::{info, warn};

use super::flash::Flash;
use super::password::{authenticate, create_user, AuthError};
use super::session::{safe_next, SessionUser, LOGIN_PATH, SESSION_COOKIE};
use crate::db::{DbError, Session, SessionRepo};
use crate::server::{internal_error, redirect_with_cookies, AppState};

pub const LOGIN_SUCCESS_MESSAGE: &str = "Logged in successfully.";
pub const LOGIN_FAILED_MESSAGE: &str = "Invalid username or password.";
pub const LOGOUT_MESSAGE: &str = "You have been logged out.";
pub const REGISTERED_MESSAGE: &str = "Registration successful. Please log in.";
pub const USERNAME_TAKEN_MESSAGE: &str = "Username already taken.";

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
}

/// Render `template` with the pending flash messages, consuming them.
pub(crate) fn render_page(
    state: &AppState,
    headers: &HeaderMap,
    user: Option<&SessionUser>,
    template: &str,
    extra: impl FnOnce(&mut tera::Context),
) -> Result<Response, StatusCode> {
    let flash = Flash::from_headers(&state.cookies, headers);
    let mut ctx = state
        .views
        .page_context(user, flash.messages(), state.config.registration);
    extra(&mut ctx);

    let html = state.views.render(template, &ctx).map_err(internal_error)?;
    let mut response = html.into_response();
    if !flash.is_empty() {
        response.headers_mut().append(
            axum::http::header::SET_COOKIE,
            state.cookies.remove_cookie(super::flash::FLASH_COOKIE),
        );
    }
    Ok(response)
}

pub async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    user: Option<Extension<SessionUser>>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    let next = safe_next(query.next.as_deref()).to_string();
    render_page(&state, &headers, user.as_deref(), "login.html", |ctx| {
        ctx.insert("next", &next);
    })
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, StatusCode> {
    let flash = Flash::from_headers(&state.cookies, &headers);

    let user = match authenticate(state.db.as_ref(), &form.username, &form.password).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            info!("Failed login for {}", form.username.trim());
            let flash = flash.error(LOGIN_FAILED_MESSAGE);
            return Ok(redirect_with_cookies(LOGIN_PATH, [flash.cookie(&state.cookies)]));
        }
        Err(e) => return Err(internal_error(e)),
    };

    let session = Session::new(user.id);
    state
        .db
        .create_session(&session)
        .await
        .map_err(internal_error)?;
    info!("User {} (id {}) logged in", user.username, user.id);

    let flash = flash.success(LOGIN_SUCCESS_MESSAGE);
    Ok(redirect_with_cookies(
        safe_next(form.next.as_deref()),
        [
            state.cookies.set_cookie(SESSION_COOKIE, &session.token),
            flash.cookie(&state.cookies),
        ],
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    user: Option<Extension<SessionUser>>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    if let Some(Extension(user)) = user {
        state
            .db
            .delete_session(&user.token)
            .await
            .map_err(internal_error)?;
        info!("User {} logged out", user.username);
    }

    let flash = Flash::from_headers(&state.cookies, &headers).info(LOGOUT_MESSAGE);
    Ok(redirect_with_cookies(
        LOGIN_PATH,
        [
            state.cookies.remove_cookie(SESSION_COOKIE),
            flash.cookie(&state.cookies),
        ],
    ))
}

pub async fn register_page(
    State(state): State<AppState>,
    user: Option<Extension<SessionUser>>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    if !state.config.registration {
        return Err(StatusCode::NOT_FOUND);
    }
    render_page(&state, &headers, user.as_deref(), "register.html", |_| {})
}

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<RegisterForm>,
) -> Result<Response, StatusCode> {
    if !state.config.registration {
        return Err(StatusCode::NOT_FOUND);
    }

    let flash = Flash::from_headers(&state.cookies, &headers);
    let cost = state.config.password_cost();

    let flash = match create_user(state.db.as_ref(), &form.username, &form.password, cost).await {
        Ok(_) => {
            let flash = flash.success(REGISTERED_MESSAGE);
            return Ok(redirect_with_cookies(LOGIN_PATH, [flash.cookie(&state.cookies)]));
        }
        Err(AuthError::Database(DbError::AlreadyExists(_))) => flash.error(USERNAME_TAKEN_MESSAGE),
        Err(AuthError::InvalidInput(msg)) => {
            warn!("Rejected registration: {}", msg);
            flash.error("Username and password are required.")
        }
        Err(e) => return Err(internal_error(e)),
    };

    Ok(redirect_with_cookies("/auth/register", [flash.cookie(&state.cookies)]))
}
