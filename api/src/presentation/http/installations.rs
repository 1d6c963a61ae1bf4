use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, patch},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::application::dto::installations::InstallationView;
use crate::application::errors::InstallationError;
use crate::application::use_cases::installations::install_from_repository::{
    InstallFromRepository, InstallRequest,
};
use crate::application::use_cases::installations::list::ListInstallations;
use crate::application::use_cases::installations::uninstall::UninstallInstallation;
use crate::application::use_cases::installations::update_settings::{
    SettingsUpdate, UpdateInstallationSettings,
};
use crate::bootstrap::app_context::AppContext;
use crate::domain::installations::{InstallationRecord, PackageKind};
use crate::presentation::http::auth::{Bearer, require_admin};
use crate::presentation::http::error::ApiError;

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/installations", get(list_installations).post(install))
        .route("/installations/:id", delete(uninstall))
        .route("/installations/:id/settings", patch(update_settings))
        .with_state(ctx)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InstallationListResponse {
    pub packages: Vec<InstallationView>,
    pub snippets: Vec<InstallationView>,
    pub active_theme: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InstallBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub repository_url: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InstallResponse {
    pub success: bool,
    pub message: String,
    pub installation: InstallationView,
    pub path: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSettingsBody {
    #[serde(default)]
    pub webhook_secret: Option<String>,
    #[serde(default)]
    pub regenerate_secret: bool,
    #[serde(default)]
    pub name: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/installations",
    tag = "Installations",
    responses((status = 200, body = InstallationListResponse))
)]
pub async fn list_installations(
    State(ctx): State<AppContext>,
    bearer: Bearer,
) -> Result<Json<InstallationListResponse>, ApiError> {
    require_admin(&ctx.cfg, bearer)?;
    let listing = ListInstallations {
        registry: ctx.registry(),
    }
    .execute()
    .await?;

    let view = |records: Vec<InstallationRecord>| -> Vec<InstallationView> {
        records
            .iter()
            .map(|r| InstallationView::from_record(r, ctx.cfg.webhook_url(&r.id)))
            .collect()
    };
    Ok(Json(InstallationListResponse {
        packages: view(listing.packages),
        snippets: view(listing.snippets),
        active_theme: listing.active_theme,
    }))
}

#[utoipa::path(
    post,
    path = "/api/installations",
    tag = "Installations",
    request_body = InstallBody,
    responses(
        (status = 200, body = InstallResponse),
        (status = 400, body = crate::presentation::http::error::ErrorBody),
        (status = 502, body = crate::presentation::http::error::ErrorBody)
    )
)]
pub async fn install(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Json(body): Json<InstallBody>,
) -> Result<Json<InstallResponse>, ApiError> {
    require_admin(&ctx.cfg, bearer)?;
    let kind: PackageKind = body
        .kind
        .parse()
        .map_err(|e: String| ApiError::from(InstallationError::InvalidRequest(e)))?;

    let fetcher = ctx.package_fetcher();
    let installer = ctx.package_installer();
    let outcome = InstallFromRepository {
        resolver: ctx.resolver(),
        fetcher: fetcher.as_ref(),
        installer: installer.as_ref(),
        registry: ctx.registry(),
    }
    .execute(InstallRequest {
        kind,
        repository_url: &body.repository_url,
        branch: body.branch.as_deref().unwrap_or_default(),
        access_token: body.access_token.as_deref().unwrap_or_default(),
    })
    .await?;

    let webhook_url = ctx.cfg.webhook_url(&outcome.record.id);
    Ok(Json(InstallResponse {
        success: true,
        message: outcome.message,
        installation: InstallationView::from_record(&outcome.record, webhook_url),
        path: outcome.path.display().to_string(),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/installations/{id}",
    tag = "Installations",
    params(("id" = String, Path, description = "Installation ID")),
    responses(
        (status = 200, body = MessageResponse),
        (status = 404, body = crate::presentation::http::error::ErrorBody),
        (status = 409, body = crate::presentation::http::error::ErrorBody)
    )
)]
pub async fn uninstall(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_admin(&ctx.cfg, bearer)?;
    let installer = ctx.package_installer();
    let snippets = ctx.snippet_storage();
    let message = UninstallInstallation {
        installer: installer.as_ref(),
        snippets: snippets.as_ref(),
        registry: ctx.registry(),
    }
    .execute(&id)
    .await?;
    Ok(Json(MessageResponse {
        success: true,
        message,
    }))
}

#[utoipa::path(
    patch,
    path = "/api/installations/{id}/settings",
    tag = "Installations",
    params(("id" = String, Path, description = "Installation ID")),
    request_body = UpdateSettingsBody,
    responses(
        (status = 200, body = InstallationView),
        (status = 404, body = crate::presentation::http::error::ErrorBody)
    )
)]
pub async fn update_settings(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<String>,
    Json(body): Json<UpdateSettingsBody>,
) -> Result<Json<InstallationView>, ApiError> {
    require_admin(&ctx.cfg, bearer)?;
    let record = UpdateInstallationSettings {
        registry: ctx.registry(),
    }
    .execute(
        &id,
        SettingsUpdate {
            webhook_secret: body.webhook_secret,
            regenerate_secret: body.regenerate_secret,
            name: body.name,
        },
    )
    .await?;
    let webhook_url = ctx.cfg.webhook_url(&record.id);
    Ok(Json(InstallationView::from_record(&record, webhook_url)))
}
