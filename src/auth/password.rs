use tracing::info;

use crate::db::{DbError, NewUser, User, UserRepo};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("Password task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_string();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hash = hash.to_string();
    let ok = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
    Ok(ok)
}

/// Hash `password` and store a new user. The username is trimmed.
pub async fn create_user<R>(db: &R, username: &str, password: &str, cost: u32) -> Result<User, AuthError>
where
    R: UserRepo + ?Sized,
{
    let username = username.trim();
    if username.is_empty() {
        return Err(AuthError::InvalidInput("username is empty".to_string()));
    }
    if password.is_empty() {
        return Err(AuthError::InvalidInput("password is empty".to_string()));
    }

    let new_user = NewUser {
        username: username.to_string(),
        password: hash_password(password, cost).await?,
    };
    let user = db.create_user(&new_user).await?;
    info!("Created user {} (id {})", user.username, user.id);
    Ok(user)
}

/// The user with these credentials, or `None` if the username or password is wrong.
pub async fn authenticate<R>(db: &R, username: &str, password: &str) -> Result<Option<User>, AuthError>
where
    R: UserRepo + ?Sized,
{
    let user = match db.get_user(username.trim()).await {
        Ok(user) => user,
        Err(DbError::NotFound(_)) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if verify_password(password, &user.password).await? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}
