use async_trait::async_trait;

use super::model::*;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_user(&self, username: &str) -> DbResult<User>;
    async fn get_user_by_id(&self, id: i64) -> DbResult<User>;
    /// Fails with `DbError::AlreadyExists` when the username is taken.
    async fn create_user(&self, user: &NewUser) -> DbResult<User>;
}

#[async_trait]
pub trait UserMovieRepo: Send + Sync {
    /// Returns false when the entry was already present.
    async fn add_user_movie(&self, user_id: i64, movie_id: i64, category: Category) -> DbResult<bool>;
    /// Returns false when there was nothing to remove.
    async fn remove_user_movie(&self, user_id: i64, movie_id: i64, category: Category) -> DbResult<bool>;
    async fn get_user_movie(&self, user_id: i64, movie_id: i64, category: Category) -> DbResult<UserMovie>;
    async fn list_user_movies(&self, user_id: i64, category: Category) -> DbResult<Vec<UserMovie>>;
    async fn count_user_movies(&self, user_id: i64, category: Category) -> DbResult<i64>;
}

#[async_trait]
pub trait SessionRepo: Send + Sync {
    async fn get_session(&self, token: &str) -> DbResult<Session>;
    async fn list_sessions_by_user(&self, user_id: i64) -> DbResult<Vec<Session>>;
    async fn create_session(&self, session: &Session) -> DbResult<()>;
    async fn touch_session(&self, token: &str) -> DbResult<()>;
    async fn delete_session(&self, token: &str) -> DbResult<()>;
}
