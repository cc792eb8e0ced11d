use axum::http::StatusCode;

// axum handler for the bare root, undocumented on purpose
pub async fn root() -> StatusCode {
    StatusCode::OK
}
