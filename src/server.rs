use std::fmt::Display;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::auth::{self, SessionUser, SignedCookies};
use crate::catalog::MovieCatalog;
use crate::config::Config;
use crate::db::{Category, SqliteRepository, UserMovieRepo};
use crate::lists;
use crate::views::Views;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<SqliteRepository>,
    pub catalog: Arc<dyn MovieCatalog>,
    pub cookies: Arc<SignedCookies>,
    pub views: Arc<Views>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Arc<SqliteRepository>,
        catalog: Arc<dyn MovieCatalog>,
        secret_key: &str,
        views: Views,
    ) -> Self {
        let cookies = SignedCookies::new(secret_key, config.has_tls());
        Self {
            config: Arc::new(config),
            db,
            catalog,
            cookies: Arc::new(cookies),
            views: Arc::new(views),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/watchlist", get(lists::get_watchlist))
        .route("/watchlist/add/:movie_id", post(lists::add_to_watchlist))
        .route("/watchlist/remove/:movie_id", post(lists::remove_from_watchlist))
        .route("/favorites", get(lists::get_favorites))
        .route("/favorites/add/:movie_id", post(lists::add_to_favorites))
        .route("/favorites/remove/:movie_id", post(lists::remove_from_favorites))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_login,
        ));

    let auth_routes = Router::new()
        .route("/auth/login", get(auth::login_page).post(auth::login))
        .route("/auth/logout", get(auth::logout))
        .route("/auth/register", get(auth::register_page).post(auth::register));

    Router::new()
        .route("/", get(index_handler))
        .route("/robots.txt", get(robots_txt_handler))
        .merge(auth_routes)
        .merge(protected_routes)
        .fallback(fallback_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    auth::session_middleware,
                ))
                .layer(axum::middleware::from_fn(crate::middleware::log_request)),
        )
        .with_state(state)
}

async fn index_handler(
    State(state): State<AppState>,
    user: Option<Extension<SessionUser>>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    let user = user.map(|Extension(u)| u);

    let mut counts = (0, 0);
    if let Some(ref u) = user {
        counts.0 = state
            .db
            .count_user_movies(u.user_id, Category::Watchlist)
            .await
            .map_err(internal_error)?;
        counts.1 = state
            .db
            .count_user_movies(u.user_id, Category::Favorites)
            .await
            .map_err(internal_error)?;
    }

    auth::handlers::render_page(&state, &headers, user.as_ref(), "index.html", |ctx| {
        ctx.insert("watchlist_count", &counts.0);
        ctx.insert("favorites_count", &counts.1);
    })
}

async fn robots_txt_handler() -> &'static str {
    "User-agent: *\nDisallow: /\n"
}

async fn fallback_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Log an unexpected failure and turn it into a 500.
pub(crate) fn internal_error<E: Display>(err: E) -> StatusCode {
    error!("{}", err);
    StatusCode::INTERNAL_SERVER_ERROR
}

/// 303 redirect, so the browser follows a POST with a GET.
pub fn see_other(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::SEE_OTHER, [(header::LOCATION, value)]).into_response(),
        Err(e) => {
            warn!("Refusing redirect to {:?}: {}", location, e);
            Redirect::to("/").into_response()
        }
    }
}

pub fn redirect_with_cookies<I>(location: &str, cookies: I) -> Response
where
    I: IntoIterator<Item = HeaderValue>,
{
    let mut response = see_other(location);
    for cookie in cookies {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}
