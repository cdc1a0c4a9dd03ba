use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use super::model::*;
use super::repo::*;

type UserMovieRow = (i64, i64, Category, Option<String>);
type SessionRow = (String, i64, Option<String>, Option<String>);

const SESSION_CACHE_IDLE_SECS: i64 = 3600;

pub struct SqliteRepository {
    pool: SqlitePool,
    session_cache: Arc<RwLock<HashMap<String, Session>>>,
}

fn is_memory_db(db_path: &str) -> bool {
    matches!(
        db_path,
        ":memory:" | "sqlite::memory:" | "sqlite://:memory:"
    )
}

impl SqliteRepository {
    pub async fn new(db_path: &str) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(db_path)?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database lives and dies with its connection, so keep
        // exactly one open for the lifetime of the pool.
        let pool_options = if is_memory_db(db_path) {
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;

        let repo = Self {
            pool,
            session_cache: Arc::new(RwLock::new(HashMap::new())),
        };

        repo.init_schema().await?;

        info!("Database initialized at {}", db_path);

        Ok(repo)
    }

    async fn init_schema(&self) -> DbResult<()> {
        let schema = include_str!("schema.sql");
        sqlx::raw_sql(schema).execute(&self.pool).await?;
        Ok(())
    }

    pub fn start_background_tasks(self: Arc<Self>) {
        let repo_clone = Arc::clone(&self);
        tokio::spawn(async move {
            repo_clone.session_flush_loop().await;
        });
    }

    async fn session_flush_loop(&self) {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            if let Err(e) = self.flush_session_cache().await {
                error!("Failed to flush session cache: {}", e);
            }
        }
    }

    /// Write the cached `lastused` times back to the sessions table and drop
    /// entries that are gone from the table or have been idle for a while.
    pub async fn flush_session_cache(&self) -> DbResult<()> {
        let snapshot: Vec<Session> = self.session_cache.read().await.values().cloned().collect();
        let idle_cutoff = Utc::now() - chrono::Duration::seconds(SESSION_CACHE_IDLE_SECS);

        let mut evict = Vec::new();
        for session in &snapshot {
            let result = sqlx::query("UPDATE sessions SET lastused = ? WHERE token = ?")
                .bind(session.lastused.as_ref().map(|dt| dt.to_rfc3339()))
                .bind(&session.token)
                .execute(&self.pool)
                .await?;
            let idle = session.lastused.map_or(true, |t| t < idle_cutoff);
            if result.rows_affected() == 0 || idle {
                evict.push((session.token.clone(), session.lastused));
            }
        }

        if !evict.is_empty() {
            let mut cache = self.session_cache.write().await;
            for (token, lastused) in &evict {
                // Entries touched since the snapshot stay cached.
                if cache.get(token).map_or(false, |s| s.lastused == *lastused) {
                    cache.remove(token);
                }
            }
        }

        debug!(
            "Flushed {} cached sessions, evicted {}",
            snapshot.len(),
            evict.len()
        );
        Ok(())
    }
}

fn user_movie_from_row(row: UserMovieRow) -> UserMovie {
    UserMovie {
        user_id: row.0,
        movie_id: row.1,
        category: row.2,
        added: parse_timestamp(row.3),
    }
}

fn session_from_row(row: SessionRow) -> Session {
    Session {
        token: row.0,
        user_id: row.1,
        created: parse_timestamp(row.2),
        lastused: parse_timestamp(row.3),
    }
}

#[async_trait]
impl UserRepo for SqliteRepository {
    async fn get_user(&self, username: &str) -> DbResult<User> {
        sqlx::query_as::<_, User>("SELECT id, username, password, created FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => DbError::NotFound(format!("User not found: {}", username)),
                _ => DbError::Sqlx(e),
            })
    }

    async fn get_user_by_id(&self, id: i64) -> DbResult<User> {
        sqlx::query_as::<_, User>("SELECT id, username, password, created FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => DbError::NotFound(format!("User not found: {}", id)),
                _ => DbError::Sqlx(e),
            })
    }

    async fn create_user(&self, user: &NewUser) -> DbResult<User> {
        let created = Utc::now().to_rfc3339();
        let result = sqlx::query("INSERT INTO users (username, password, created) VALUES (?, ?, ?)")
            .bind(&user.username)
            .bind(&user.password)
            .bind(&created)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    DbError::AlreadyExists(format!("User already exists: {}", user.username))
                }
                _ => DbError::Sqlx(e),
            })?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: user.username.clone(),
            password: user.password.clone(),
            created: Some(created),
        })
    }
}

#[async_trait]
impl UserMovieRepo for SqliteRepository {
    async fn add_user_movie(&self, user_id: i64, movie_id: i64, category: Category) -> DbResult<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO user_movies (user_id, movie_id, category, added)
             VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(movie_id)
        .bind(category)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_user_movie(&self, user_id: i64, movie_id: i64, category: Category) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM user_movies WHERE user_id = ? AND movie_id = ? AND category = ?")
            .bind(user_id)
            .bind(movie_id)
            .bind(category)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_user_movie(&self, user_id: i64, movie_id: i64, category: Category) -> DbResult<UserMovie> {
        let row = sqlx::query_as::<_, UserMovieRow>(
            "SELECT user_id, movie_id, category, added FROM user_movies
             WHERE user_id = ? AND movie_id = ? AND category = ?",
        )
        .bind(user_id)
        .bind(movie_id)
        .bind(category)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DbError::NotFound(format!(
                "UserMovie not found: {}/{}/{}",
                user_id, movie_id, category
            )),
            _ => DbError::Sqlx(e),
        })?;

        Ok(user_movie_from_row(row))
    }

    async fn list_user_movies(&self, user_id: i64, category: Category) -> DbResult<Vec<UserMovie>> {
        let rows = sqlx::query_as::<_, UserMovieRow>(
            "SELECT user_id, movie_id, category, added FROM user_movies
             WHERE user_id = ? AND category = ? ORDER BY id",
        )
        .bind(user_id)
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(user_movie_from_row).collect())
    }

    async fn count_user_movies(&self, user_id: i64, category: Category) -> DbResult<i64> {
        let (count,) = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM user_movies WHERE user_id = ? AND category = ?",
        )
        .bind(user_id)
        .bind(category)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[async_trait]
impl SessionRepo for SqliteRepository {
    async fn get_session(&self, token: &str) -> DbResult<Session> {
        {
            let cache = self.session_cache.read().await;
            if let Some(s) = cache.get(token) {
                return Ok(s.clone());
            }
        }

        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT token, user_id, created, lastused FROM sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DbError::NotFound("Session not found".to_string()),
            _ => DbError::Sqlx(e),
        })?;

        let session = session_from_row(row);

        let mut cache = self.session_cache.write().await;
        cache.insert(token.to_string(), session.clone());

        Ok(session)
    }

    async fn list_sessions_by_user(&self, user_id: i64) -> DbResult<Vec<Session>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            "SELECT token, user_id, created, lastused FROM sessions WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(session_from_row).collect())
    }

    async fn create_session(&self, session: &Session) -> DbResult<()> {
        sqlx::query("INSERT INTO sessions (token, user_id, created, lastused) VALUES (?, ?, ?, ?)")
            .bind(&session.token)
            .bind(session.user_id)
            .bind(session.created.as_ref().map(|dt| dt.to_rfc3339()))
            .bind(session.lastused.as_ref().map(|dt| dt.to_rfc3339()))
            .execute(&self.pool)
            .await?;

        let mut cache = self.session_cache.write().await;
        cache.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn touch_session(&self, token: &str) -> DbResult<()> {
        let mut cache = self.session_cache.write().await;
        if let Some(session) = cache.get_mut(token) {
            session.lastused = Some(Utc::now());
        }
        Ok(())
    }

    async fn delete_session(&self, token: &str) -> DbResult<()> {
        {
            let mut cache = self.session_cache.write().await;
            cache.remove(token);
        }

        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
