use axum::{extract::Request, middleware::Next, response::Response};
use tracing::info;

use crate::auth::get_session_user;

pub async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let user_id = get_session_user(&req).map(|u| u.user_id);

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let content_length = response
        .headers()
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    info!(
        method = %method,
        url = %uri,
        status = status,
        length = content_length,
        user_id = ?user_id,
        "HTTP request"
    );

    response
}
