use axum::response::IntoResponse;

/// Undocumented index route; returns the service identity.
pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"))
}
