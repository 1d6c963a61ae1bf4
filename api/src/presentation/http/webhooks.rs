use std::collections::HashMap;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, header::CONTENT_TYPE},
    routing::post,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::use_cases::webhooks::handle_webhook::{
    HandleWebhook, RepositoryOverrides, WebhookDelivery,
};
use crate::application::webhook_auth::{
    GITLAB_TOKEN_HEADER, HUB_SIGNATURE_256_HEADER, HUB_SIGNATURE_HEADER, SECRET_HEADER,
    WebhookCredentials,
};
use crate::bootstrap::app_context::AppContext;
use crate::presentation::http::error::ApiError;

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/installations/:id/webhook", post(receive_webhook))
        .with_state(ctx)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
}

/// Flattens a JSON object or urlencoded form into string parameters.
/// Anything else yields no parameters; the raw body is still used for
/// signature checks.
fn body_params(headers: &HeaderMap, body: &[u8]) -> HashMap<String, String> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.contains("json") || body.first() == Some(&b'{') {
        return match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(serde_json::Value::Object(map)) => map
                .into_iter()
                .filter_map(|(k, v)| match v {
                    serde_json::Value::String(s) => Some((k, s)),
                    _ => None,
                })
                .collect(),
            _ => HashMap::new(),
        };
    }

    if content_type.starts_with("application/x-www-form-urlencoded") {
        return url::form_urlencoded::parse(body).into_owned().collect();
    }
    HashMap::new()
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Body parameters win over query parameters.
fn param(body: &HashMap<String, String>, query: &HashMap<String, String>, key: &str) -> Option<String> {
    let lookup = |params: &HashMap<String, String>| {
        params
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    lookup(body).or_else(|| lookup(query))
}

#[utoipa::path(
    post,
    path = "/api/installations/{id}/webhook",
    tag = "Webhooks",
    params(
        ("id" = String, Path, description = "Installation ID"),
        ("secret" = Option<String>, Query, description = "Webhook secret"),
        ("repository_url" = Option<String>, Query, description = "Repository URL override"),
        ("branch" = Option<String>, Query, description = "Branch override"),
        ("access_token" = Option<String>, Query, description = "Access token override")
    ),
    responses(
        (status = 200, body = WebhookResponse),
        (status = 400, body = crate::presentation::http::error::ErrorBody),
        (status = 403, body = crate::presentation::http::error::ErrorBody),
        (status = 404, body = crate::presentation::http::error::ErrorBody),
        (status = 500, body = crate::presentation::http::error::ErrorBody)
    )
)]
pub async fn receive_webhook(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let params = body_params(&headers, &body);
    let credentials = WebhookCredentials {
        secret_header: header_value(&headers, SECRET_HEADER),
        secret_field: param(&params, &query, "secret"),
        hub_signature_256: header_value(&headers, HUB_SIGNATURE_256_HEADER),
        hub_signature: header_value(&headers, HUB_SIGNATURE_HEADER),
        gitlab_token: header_value(&headers, GITLAB_TOKEN_HEADER),
        raw_body: body.to_vec(),
    };
    let overrides = RepositoryOverrides {
        repository_url: param(&params, &query, "repository_url"),
        branch: param(&params, &query, "branch"),
        access_token: param(&params, &query, "access_token"),
    };

    let fetcher = ctx.package_fetcher();
    let installer = ctx.package_installer();
    let contents = ctx.repository_content();
    let storage = ctx.snippet_storage();
    let handler = HandleWebhook {
        resolver: ctx.resolver(),
        fetcher: fetcher.as_ref(),
        installer: installer.as_ref(),
        contents: contents.as_ref(),
        storage: storage.as_ref(),
        registry: ctx.registry(),
        snippet_max_depth: ctx.cfg.snippet_max_depth,
    };

    match handler
        .execute(WebhookDelivery {
            installation_id: id,
            credentials,
            overrides,
        })
        .await
    {
        Ok(message) => Ok(Json(WebhookResponse {
            success: true,
            message,
        })),
        Err(err) => {
            tracing::warn!(code = err.code(), error = %err, "webhook_rejected");
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(content_type: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        h
    }

    #[test]
    fn json_body_keeps_string_fields() {
        let params = body_params(
            &headers("application/json"),
            br#"{"branch":"develop","ref":"refs/heads/develop","commits":[1]}"#,
        );
        assert_eq!(params.get("branch").map(String::as_str), Some("develop"));
        assert!(!params.contains_key("commits"));
    }

    #[test]
    fn form_body_is_decoded() {
        let params = body_params(
            &headers("application/x-www-form-urlencoded; charset=utf-8"),
            b"secret=a+b%21&repository_url=https%3A%2F%2Fgithub.com%2Facme%2Fsite",
        );
        assert_eq!(params.get("secret").map(String::as_str), Some("a b!"));
        assert_eq!(
            params.get("repository_url").map(String::as_str),
            Some("https://github.com/acme/site")
        );

        let params = body_params(
            &headers("application/x-www-form-urlencoded"),
            b"access_token=a%2Bb+c&branch=feature%2Fx&name=caf%C3%A9&flag",
        );
        assert_eq!(params.get("access_token").map(String::as_str), Some("a+b c"));
        assert_eq!(params.get("branch").map(String::as_str), Some("feature/x"));
        assert_eq!(params.get("name").map(String::as_str), Some("café"));
        assert_eq!(params.get("flag").map(String::as_str), Some(""));
    }

    #[test]
    fn body_wins_over_query_unless_blank() {
        let body = HashMap::from([("branch".to_string(), "  ".to_string())]);
        let query = HashMap::from([
            ("branch".to_string(), "main".to_string()),
            ("secret".to_string(), "q".to_string()),
        ]);
        assert_eq!(param(&body, &query, "branch").as_deref(), Some("main"));
        assert_eq!(param(&body, &query, "secret").as_deref(), Some("q"));

        let body = HashMap::from([("secret".to_string(), "b".to_string())]);
        assert_eq!(param(&body, &query, "secret").as_deref(), Some("b"));
    }

    #[test]
    fn unknown_content_type_yields_no_params() {
        assert!(body_params(&headers("text/plain"), b"secret=x").is_empty());
    }
}
