use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::Response,
    Extension,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::handlers::render_page;
use crate::auth::{Flash, SessionUser};
use crate::catalog::MovieInfo;
use crate::db::{Category, UserMovieRepo};
use crate::server::{internal_error, redirect_with_cookies, AppState};

#[derive(Debug, Serialize)]
struct MovieEntry {
    movie_id: i64,
    title: Option<String>,
    year: Option<i32>,
    overview: Option<String>,
    poster_url: Option<String>,
    added: Option<String>,
}

pub fn added_message(category: Category) -> String {
    format!("Movie added to {}.", category)
}

pub fn removed_message(category: Category) -> String {
    format!("Movie removed from {}.", category)
}

/// Catalog ids are non-negative integers; anything else is not a route.
fn parse_movie_id(raw: &str) -> Result<i64, StatusCode> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id >= 0)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Path of the page that sent the request, falling back to the list page.
pub(crate) fn redirect_target(headers: &HeaderMap, category: Category) -> String {
    headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Uri>().ok())
        .and_then(|uri| {
            let pq = uri.path_and_query()?;
            if pq.path().starts_with('/') && !pq.path().starts_with("//") {
                Some(pq.as_str().to_string())
            } else {
                None
            }
        })
        .unwrap_or_else(|| category.list_path().to_string())
}

async fn add_movie(
    state: AppState,
    user: SessionUser,
    headers: HeaderMap,
    raw_movie_id: String,
    category: Category,
) -> Result<Response, StatusCode> {
    let movie_id = parse_movie_id(&raw_movie_id)?;

    let inserted = state
        .db
        .add_user_movie(user.user_id, movie_id, category)
        .await
        .map_err(internal_error)?;
    if !inserted {
        debug!("Movie {} already in {} of user {}", movie_id, category, user.user_id);
    }

    let flash = Flash::from_headers(&state.cookies, &headers).success(added_message(category));
    Ok(redirect_with_cookies(
        &redirect_target(&headers, category),
        [flash.cookie(&state.cookies)],
    ))
}

async fn remove_movie(
    state: AppState,
    user: SessionUser,
    headers: HeaderMap,
    raw_movie_id: String,
    category: Category,
) -> Result<Response, StatusCode> {
    let movie_id = parse_movie_id(&raw_movie_id)?;

    let removed = state
        .db
        .remove_user_movie(user.user_id, movie_id, category)
        .await
        .map_err(internal_error)?;
    if !removed {
        debug!("Movie {} was not in {} of user {}", movie_id, category, user.user_id);
    }

    let flash = Flash::from_headers(&state.cookies, &headers).success(removed_message(category));
    Ok(redirect_with_cookies(
        &redirect_target(&headers, category),
        [flash.cookie(&state.cookies)],
    ))
}

async fn lookup_movie(state: &AppState, movie_id: i64) -> Option<MovieInfo> {
    match state.catalog.lookup(movie_id).await {
        Ok(info) => info,
        Err(e) => {
            warn!("Catalog lookup for movie {} failed: {}", movie_id, e);
            None
        }
    }
}

async fn show_list(
    state: AppState,
    user: SessionUser,
    headers: HeaderMap,
    category: Category,
) -> Result<Response, StatusCode> {
    let rows = state
        .db
        .list_user_movies(user.user_id, category)
        .await
        .map_err(internal_error)?;

    let mut movies = Vec::with_capacity(rows.len());
    for row in rows {
        let info = lookup_movie(&state, row.movie_id).await;
        movies.push(MovieEntry {
            movie_id: row.movie_id,
            title: info.as_ref().map(|i| i.title.clone()),
            year: info.as_ref().and_then(|i| i.year),
            overview: info.as_ref().and_then(|i| i.overview.clone()),
            poster_url: info.as_ref().and_then(MovieInfo::poster_url),
            added: row.added.map(|t| t.format("%Y-%m-%d").to_string()),
        });
    }

    let other = match category {
        Category::Watchlist => Category::Favorites,
        Category::Favorites => Category::Watchlist,
    };

    render_page(&state, &headers, Some(&user), "movies.html", |ctx| {
        ctx.insert("title", category.title());
        ctx.insert("category", category.as_str());
        ctx.insert("other_category", other.as_str());
        ctx.insert("movies", &movies);
    })
}

pub async fn add_to_watchlist(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(movie_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    add_movie(state, user, headers, movie_id, Category::Watchlist).await
}

pub async fn remove_from_watchlist(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(movie_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    remove_movie(state, user, headers, movie_id, Category::Watchlist).await
}

pub async fn get_watchlist(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    show_list(state, user, headers, Category::Watchlist).await
}

pub async fn add_to_favorites(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(movie_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    add_movie(state, user, headers, movie_id, Category::Favorites).await
}

pub async fn remove_from_favorites(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(movie_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    remove_movie(state, user, headers, movie_id, Category::Favorites).await
}

pub async fn get_favorites(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    show_list(state, user, headers, Category::Favorites).await
}
