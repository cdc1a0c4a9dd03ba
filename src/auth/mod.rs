pub mod cookie;
pub mod flash;
pub mod handlers;
pub mod password;
pub mod session;

pub use cookie::SignedCookies;
pub use flash::{Flash, FlashLevel, FlashMessage};
pub use handlers::*;
pub use password::{authenticate, create_user, AuthError};
pub use session::*;
