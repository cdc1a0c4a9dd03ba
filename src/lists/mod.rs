//! Watchlist and favorites pages.

pub mod handlers;

pub use handlers::*;
