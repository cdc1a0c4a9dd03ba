use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub created: Option<String>,
}

/// A user that has not been stored yet. `password` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Category {
    Watchlist,
    Favorites,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Watchlist, Category::Favorites];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Watchlist => "watchlist",
            Category::Favorites => "favorites",
        }
    }

    /// Path of the list page for this category.
    pub fn list_path(&self) -> &'static str {
        match self {
            Category::Watchlist => "/watchlist",
            Category::Favorites => "/favorites",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Category::Watchlist => "Watchlist",
            Category::Favorites => "Favorites",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "watchlist" => Ok(Category::Watchlist),
            "favorites" => Ok(Category::Favorites),
            other => Err(DbError::NotFound(format!("Unknown category: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMovie {
    pub user_id: i64,
    pub movie_id: i64,
    pub category: Category,
    pub added: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub created: Option<DateTime<Utc>>,
    pub lastused: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(user_id: i64) -> Self {
        let now = Utc::now();
        Self {
            token: uuid::Uuid::new_v4().simple().to_string(),
            user_id,
            created: Some(now),
            lastused: Some(now),
        }
    }
}

pub(crate) fn parse_timestamp(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert!("queue".parse::<Category>().is_err());
        assert!("Watchlist".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_paths() {
        assert_eq!(Category::Watchlist.list_path(), "/watchlist");
        assert_eq!(Category::Favorites.list_path(), "/favorites");
        assert_eq!(Category::Favorites.to_string(), "favorites");
    }

    #[test]
    fn test_new_session_tokens_are_unique() {
        let a = Session::new(1);
        let b = Session::new(1);
        assert_ne!(a.token, b.token);
        assert_eq!(a.token.len(), 32);
        assert!(a.token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp(Some("2024-05-01T12:00:00+02:00".to_string())).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-05-01T10:00:00+00:00");
        assert!(parse_timestamp(Some("yesterday".to_string())).is_none());
        assert!(parse_timestamp(None).is_none());
    }
}
