use axum::response::Html;
use serde::Serialize;
use tera::{Context, Tera};

use crate::auth::{FlashMessage, SessionUser};

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("register.html", include_str!("../templates/register.html")),
    ("movies.html", include_str!("../templates/movies.html")),
];

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("Template error: {0}")]
    Tera(#[from] tera::Error),
}

#[derive(Debug, Serialize)]
struct UserContext<'a> {
    id: i64,
    username: &'a str,
}

/// HTML templates compiled into the binary.
pub struct Views {
    tera: Tera,
}

impl Views {
    pub fn new() -> Result<Self, ViewError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.to_vec())?;
        Ok(Self { tera })
    }

    /// Context with the values every page reads from `base.html`.
    pub fn page_context(
        &self,
        user: Option<&SessionUser>,
        flashes: &[FlashMessage],
        registration: bool,
    ) -> Context {
        let mut ctx = Context::new();
        ctx.insert(
            "user",
            &user.map(|u| UserContext {
                id: u.user_id,
                username: &u.username,
            }),
        );
        ctx.insert("flashes", flashes);
        ctx.insert("registration", &registration);
        ctx
    }

    pub fn render(&self, name: &str, ctx: &Context) -> Result<Html<String>, ViewError> {
        Ok(Html(self.tera.render(name, ctx)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::FlashLevel;

    #[test]
    fn test_render_anonymous_index() {
        let views = Views::new().unwrap();
        let ctx = views.page_context(None, &[], true);
        let html = views.render("index.html", &ctx).unwrap().0;
        assert!(html.contains("href=\"/auth/login\""));
        assert!(html.contains("href=\"/auth/register\""));
    }

    #[test]
    fn test_flash_is_escaped() {
        let views = Views::new().unwrap();
        let flashes = vec![FlashMessage {
            level: FlashLevel::Error,
            text: "<script>".to_string(),
        }];
        let mut ctx = views.page_context(None, &flashes, false);
        ctx.insert("next", "/");
        let html = views.render("login.html", &ctx).unwrap().0;
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("flash-error"));
        assert!(!html.contains("/auth/register"));
    }

    #[test]
    fn test_render_movie_list() {
        let views = Views::new().unwrap();
        let user = SessionUser {
            user_id: 7,
            username: "frank".to_string(),
            token: "t".to_string(),
        };
        let mut ctx = views.page_context(Some(&user), &[], true);
        ctx.insert("title", "Watchlist");
        ctx.insert("category", "watchlist");
        ctx.insert("other_category", "favorites");
        ctx.insert(
            "movies",
            &vec![serde_json::json!({"movie_id": 550, "title": "Fight Club", "year": 1999})],
        );
        let html = views.render("movies.html", &ctx).unwrap().0;
        assert!(html.contains("Fight Club (1999)"));
        assert!(html.contains("/watchlist/remove/550"));
        assert!(html.contains("/favorites/add/550"));
        assert!(html.contains("Logged in as frank"));
    }
}
