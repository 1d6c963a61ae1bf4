use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::application::dto::installations::{InstallationView, SnippetFileView};
use crate::application::errors::InstallationError;
use crate::application::use_cases::snippets::import_from_repository::{
    ImportSnippetsFromRepository, SnippetImportRequest,
};
use crate::application::use_cases::snippets::list_snippets::ListSnippets;
use crate::bootstrap::app_context::AppContext;
use crate::presentation::http::auth::{Bearer, require_admin};
use crate::presentation::http::error::ApiError;

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/snippets", get(list_snippets))
        .route("/snippets/import", post(import_snippets))
        .with_state(ctx)
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ImportSnippetsBody {
    #[serde(default)]
    pub installation_id: Option<String>,
    #[serde(default)]
    pub repository_url: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportSnippetsResponse {
    pub success: bool,
    pub message: String,
    pub installation: InstallationView,
    pub files: Vec<String>,
    pub removed: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SnippetListResponse {
    pub items: Vec<SnippetFileView>,
}

#[utoipa::path(
    post,
    path = "/api/snippets/import",
    tag = "Snippets",
    request_body = ImportSnippetsBody,
    responses(
        (status = 200, body = ImportSnippetsResponse),
        (status = 400, body = crate::presentation::http::error::ErrorBody),
        (status = 502, body = crate::presentation::http::error::ErrorBody)
    )
)]
pub async fn import_snippets(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Json(body): Json<ImportSnippetsBody>,
) -> Result<Json<ImportSnippetsResponse>, ApiError> {
    require_admin(&ctx.cfg, bearer)?;
    let contents = ctx.repository_content();
    let storage = ctx.snippet_storage();
    let outcome = ImportSnippetsFromRepository {
        resolver: ctx.resolver(),
        contents: contents.as_ref(),
        storage: storage.as_ref(),
        registry: ctx.registry(),
        max_depth: ctx.cfg.snippet_max_depth,
    }
    .execute(SnippetImportRequest {
        installation_id: body.installation_id.as_deref().filter(|id| !id.trim().is_empty()),
        repository_url: &body.repository_url,
        branch: body.branch.as_deref().unwrap_or_default(),
        access_token: body.access_token.as_deref().unwrap_or_default(),
        name: body.name.as_deref(),
    })
    .await?;

    let webhook_url = ctx.cfg.webhook_url(&outcome.record.id);
    Ok(Json(ImportSnippetsResponse {
        success: true,
        message: outcome.message,
        installation: InstallationView::from_record(&outcome.record, webhook_url),
        files: outcome.files,
        removed: outcome.removed,
    }))
}

#[utoipa::path(
    get,
    path = "/api/snippets",
    tag = "Snippets",
    responses((status = 200, body = SnippetListResponse))
)]
pub async fn list_snippets(
    State(ctx): State<AppContext>,
    bearer: Bearer,
) -> Result<Json<SnippetListResponse>, ApiError> {
    require_admin(&ctx.cfg, bearer)?;
    let storage = ctx.snippet_storage();
    let items = ListSnippets {
        storage: storage.as_ref(),
    }
    .execute()
    .await
    .map_err(|e| ApiError::from(InstallationError::FilesystemPermission(e)))?;
    Ok(Json(SnippetListResponse {
        items: items.into_iter().map(SnippetFileView::from).collect(),
    }))
}
