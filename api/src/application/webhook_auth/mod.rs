use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distributions::Alphanumeric;
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

pub const SECRET_HEADER: &str = "x-flygit-secret";
pub const HUB_SIGNATURE_256_HEADER: &str = "x-hub-signature-256";
pub const HUB_SIGNATURE_HEADER: &str = "x-hub-signature";
pub const GITLAB_TOKEN_HEADER: &str = "x-gitlab-token";

const GENERATED_SECRET_LEN: usize = 32;

/// Credentials an inbound webhook request may carry.
#[derive(Debug, Clone, Default)]
pub struct WebhookCredentials {
    pub secret_header: Option<String>,
    /// `secret` query or form field.
    pub secret_field: Option<String>,
    pub hub_signature_256: Option<String>,
    pub hub_signature: Option<String>,
    pub gitlab_token: Option<String>,
    pub raw_body: Vec<u8>,
}

/// Checks the request against the stored secret. Any matching scheme wins.
///
/// An empty stored secret means no secret was configured and every request
/// is accepted.
pub fn is_authenticated(stored_secret: &str, credentials: &WebhookCredentials) -> bool {
    if stored_secret.is_empty() {
        tracing::debug!("webhook_secret_not_configured");
        return true;
    }

    let provided = non_empty(&credentials.secret_header).or(non_empty(&credentials.secret_field));
    if let Some(provided) = provided {
        if constant_time_eq(stored_secret, provided) {
            return true;
        }
    }

    let body = credentials.raw_body.as_slice();
    if !body.is_empty() {
        if let Some(signature) = non_empty(&credentials.hub_signature_256) {
            if let Some(expected) = sha256_signature(stored_secret, body) {
                if constant_time_eq(&expected, signature) {
                    return true;
                }
            }
        }

        if let Some(signature) = non_empty(&credentials.hub_signature) {
            if let Some(expected) = sha1_signature(stored_secret, body) {
                if constant_time_eq(&expected, signature) {
                    return true;
                }
            }
        }
    }

    if let Some(token) = non_empty(&credentials.gitlab_token) {
        if constant_time_eq(stored_secret, token) {
            return true;
        }
    }

    false
}

/// `sha256=<hex>` as sent in `X-Hub-Signature-256`.
pub fn sha256_signature(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

/// `sha1=<hex>` as sent in `X-Hub-Signature`.
pub fn sha1_signature(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(format!("sha1={}", hex::encode(mac.finalize().into_bytes())))
}

pub fn generate_webhook_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_SECRET_LEN)
        .map(char::from)
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn constant_time_eq(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_body(body: &[u8]) -> WebhookCredentials {
        WebhookCredentials {
            raw_body: body.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_secret_always_authenticates() {
        assert!(is_authenticated("", &WebhookCredentials::default()));
        let creds = WebhookCredentials {
            secret_header: Some("whatever".into()),
            hub_signature_256: Some("sha256=00".into()),
            ..with_body(b"payload")
        };
        assert!(is_authenticated("", &creds));
    }

    #[test]
    fn missing_credentials_fail() {
        assert!(!is_authenticated("s", &with_body(b"b")));
    }

    #[test]
    fn direct_secret_header_matches() {
        let creds = WebhookCredentials {
            secret_header: Some("topsecret".into()),
            ..Default::default()
        };
        assert!(is_authenticated("topsecret", &creds));
        assert!(!is_authenticated("other", &creds));
    }

    #[test]
    fn secret_field_used_when_header_absent() {
        let creds = WebhookCredentials {
            secret_header: Some(String::new()),
            secret_field: Some("topsecret".into()),
            ..Default::default()
        };
        assert!(is_authenticated("topsecret", &creds));
    }

    #[test]
    fn github_sha256_signature_matches() {
        let signature = sha256_signature("s", b"b").unwrap();
        let creds = WebhookCredentials {
            hub_signature_256: Some(signature.clone()),
            ..with_body(b"b")
        };
        assert!(is_authenticated("s", &creds));

        let altered_body = WebhookCredentials {
            hub_signature_256: Some(signature),
            ..with_body(b"b2")
        };
        assert!(!is_authenticated("s", &altered_body));

        let altered_sig = WebhookCredentials {
            hub_signature_256: Some(sha256_signature("s", b"x").unwrap()),
            ..with_body(b"b")
        };
        assert!(!is_authenticated("s", &altered_sig));
    }

    #[test]
    fn github_sha256_signature_known_vector() {
        // Widely published HMAC-SHA256 example.
        let signature = sha256_signature("key", b"The quick brown fox jumps over the lazy dog");
        assert_eq!(
            signature.as_deref(),
            Some("sha256=f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8")
        );
    }

    #[test]
    fn github_sha1_signature_matches() {
        let signature = sha1_signature("s", b"payload").unwrap();
        assert!(signature.starts_with("sha1="));
        let creds = WebhookCredentials {
            hub_signature: Some(signature),
            ..with_body(b"payload")
        };
        assert!(is_authenticated("s", &creds));
        assert!(!is_authenticated("t", &creds));
    }

    #[test]
    fn signatures_ignored_for_empty_body() {
        let creds = WebhookCredentials {
            hub_signature_256: sha256_signature("s", b""),
            ..with_body(b"")
        };
        assert!(!is_authenticated("s", &creds));
    }

    #[test]
    fn gitlab_token_matches() {
        let creds = WebhookCredentials {
            gitlab_token: Some("glsecret".into()),
            ..Default::default()
        };
        assert!(is_authenticated("glsecret", &creds));
        assert!(!is_authenticated("glsecret2", &creds));
    }

    #[test]
    fn wrong_direct_secret_still_allows_signature() {
        let creds = WebhookCredentials {
            secret_header: Some("wrong".into()),
            hub_signature_256: sha256_signature("s", b"body"),
            ..with_body(b"body")
        };
        assert!(is_authenticated("s", &creds));
    }

    #[test]
    fn generated_secret_is_alphanumeric() {
        let secret = generate_webhook_secret();
        assert_eq!(secret.len(), 32);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(secret, generate_webhook_secret());
    }
}
