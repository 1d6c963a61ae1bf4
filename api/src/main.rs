use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::MatchedPath;
use dotenvy::dotenv;
use tower_http::trace::TraceLayer;
use tracing::info;

use flygit::application::ports::option_store::OptionStore;
use flygit::application::repository::RepositoryResolver;
use flygit::bootstrap::app_context::{AppContext, AppServices};
use flygit::bootstrap::config::{Config, RegistryBackend};
use flygit::infrastructure::github::ReqwestGithubContentApi;
use flygit::infrastructure::packages::{FilesystemPackageInstaller, ReqwestPackageFetcher};
use flygit::infrastructure::storage::{FileOptionStore, FilesystemSnippetStorage};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
        paths(
            flygit::presentation::http::health::health,
            flygit::presentation::http::installations::list_installations,
            flygit::presentation::http::installations::install,
            flygit::presentation::http::installations::uninstall,
            flygit::presentation::http::installations::update_settings,
            flygit::presentation::http::webhooks::receive_webhook,
            flygit::presentation::http::snippets::import_snippets,
            flygit::presentation::http::snippets::list_snippets,
        ),
        components(schemas(
            flygit::application::dto::installations::InstallationView,
            flygit::application::dto::installations::SnippetFileView,
            flygit::presentation::http::error::ErrorBody,
            flygit::presentation::http::health::HealthResp,
            flygit::presentation::http::installations::InstallationListResponse,
            flygit::presentation::http::installations::InstallBody,
            flygit::presentation::http::installations::InstallResponse,
            flygit::presentation::http::installations::MessageResponse,
            flygit::presentation::http::installations::UpdateSettingsBody,
            flygit::presentation::http::webhooks::WebhookResponse,
            flygit::presentation::http::snippets::ImportSnippetsBody,
            flygit::presentation::http::snippets::ImportSnippetsResponse,
            flygit::presentation::http::snippets::SnippetListResponse,
        )),
        tags(
            (name = "Installations", description = "Theme and plugin installations"),
            (name = "Snippets", description = "Snippet imports"),
            (name = "Webhooks", description = "Repository re-sync webhooks"),
            (name = "Health", description = "System health checks")
        )
    )]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "flygit=debug,axum=info,tower_http=info".into()),
        )
        .init();

    let cfg = Config::from_env()?;
    info!(
        port = cfg.api_port,
        plugins_dir = %cfg.plugins_dir.display(),
        themes_dir = %cfg.themes_dir.display(),
        snippets_dir = %cfg.snippets_dir.display(),
        "Starting FlyGit"
    );

    let option_store: Arc<dyn OptionStore> = match &cfg.registry_backend {
        RegistryBackend::Postgres { database_url } => {
            let pool = flygit::infrastructure::db::connect_pool(database_url).await?;
            flygit::infrastructure::db::migrate(&pool).await?;
            tracing::info!("registry_backend_postgres");
            Arc::new(
                flygit::infrastructure::db::repositories::option_store_sqlx::SqlxOptionStore::new(
                    pool,
                ),
            )
        }
        RegistryBackend::File { path } => {
            tracing::info!(path = %path.display(), "registry_backend_file");
            Arc::new(FileOptionStore::new(path.clone()))
        }
    };

    for dir in [&cfg.plugins_dir, &cfg.themes_dir, &cfg.snippets_dir] {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            tracing::warn!(error = ?e, dir = %dir.display(), "Failed to create directory");
        }
    }

    let services = AppServices::new(
        option_store,
        Arc::new(ReqwestPackageFetcher::new(cfg.http_timeout)?),
        Arc::new(FilesystemPackageInstaller::new(
            cfg.plugins_dir.clone(),
            cfg.themes_dir.clone(),
        )),
        Arc::new(ReqwestGithubContentApi::new(
            &cfg.github_api_base,
            cfg.http_timeout,
        )?),
        Arc::new(FilesystemSnippetStorage::new(cfg.snippets_dir.clone())),
        RepositoryResolver::new(&cfg.github_api_base),
    );
    let ctx = AppContext::new(cfg.clone(), services);

    let app = flygit::presentation::http::api_router(ctx)
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &http::Request<_>| {
                let method = req.method().clone();
                let uri = req.uri().clone();
                let matched = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|p| p.as_str().to_string())
                    .unwrap_or_default();
                tracing::info_span!("http", %method, %uri, matched_path = %matched)
            }),
        );

    let api_addr = SocketAddr::from(([0, 0, 0, 0], cfg.api_port));
    info!(%api_addr, "HTTP API listening");
    let listener = tokio::net::TcpListener::bind(api_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = ?e, "shutdown_signal_failed");
            }
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
