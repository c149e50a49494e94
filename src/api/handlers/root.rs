use axum::response::IntoResponse;

// axum handler for the undocumented root route
pub async fn root() -> impl IntoResponse {
    "📈"
}
