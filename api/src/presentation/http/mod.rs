use axum::Router;

use crate::bootstrap::app_context::AppContext;

pub mod auth;
pub mod error;
pub mod health;
pub mod installations;
pub mod snippets;
pub mod webhooks;

/// Every HTTP route, mounted under `/api`.
pub fn api_router(ctx: AppContext) -> Router {
    Router::new()
        .nest("/api", health::routes(ctx.clone()))
        .nest("/api", installations::routes(ctx.clone()))
        .nest("/api", webhooks::routes(ctx.clone()))
        .nest("/api", snippets::routes(ctx))
}
