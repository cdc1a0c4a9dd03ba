#![allow(dead_code)]

use axum::http::StatusCode;
use axum_test::{TestResponse, TestServer};
use watchlist_server::auth::{create_user, SESSION_COOKIE};
use watchlist_server::config::Config;
use watchlist_server::db::User;
use watchlist_server::server::{build_router, AppState};

pub const TEST_USERNAME: &str = "testuser";
pub const TEST_PASSWORD: &str = "testpassword";

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub user: User,
}

/// Fresh in-memory application with one registered user.
pub async fn spawn_app() -> TestApp {
    let state = watchlist_server::build_state(Config::testing())
        .await
        .expect("build state");
    spawn_app_with_state(state).await
}

pub async fn spawn_app_with_state(state: AppState) -> TestApp {
    let user = create_user(
        state.db.as_ref(),
        TEST_USERNAME,
        TEST_PASSWORD,
        state.config.password_cost(),
    )
    .await
    .expect("create test user");

    let server = TestServer::builder()
        .save_cookies()
        .build(build_router(state.clone()))
        .expect("build test server");

    TestApp {
        server,
        state,
        user,
    }
}

impl TestApp {
    pub async fn login(&self) -> TestResponse {
        self.server
            .post("/auth/login")
            .form(&[("username", TEST_USERNAME), ("password", TEST_PASSWORD)])
            .await
    }

    /// GET the `Location` of a redirect, like a browser would.
    pub async fn follow(&self, response: &TestResponse) -> TestResponse {
        let location = response.header("location");
        let location = location.to_str().expect("ascii location").to_string();
        self.server.get(&location).await
    }

    /// POST `path`, then follow the redirect.
    pub async fn post_and_follow(&self, path: &str) -> TestResponse {
        let response = self.server.post(path).await;
        response.assert_status(StatusCode::SEE_OTHER);
        self.follow(&response).await
    }
}

/// Session token inside a signed `session` cookie from a login response.
pub fn session_token(response: &TestResponse) -> String {
    let cookie = response.cookie(SESSION_COOKIE);
    cookie
        .value()
        .split('.')
        .next()
        .expect("signed cookie")
        .to_string()
}
