use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use barker_api::api::{AUTH_CHALLENGE, UNAUTHORIZED_BODY};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::Arc;

/// The base64 encoded shared secret every request must present.
#[derive(Debug, Clone)]
pub struct Credential(Arc<str>);

impl Credential {
    /// `None` for an empty secret, which disables authentication.
    pub fn new(secret: &str) -> Option<Self> {
        (!secret.is_empty()).then(|| Self(STANDARD.encode(secret).into()))
    }

    /// Compares the second whitespace separated token of the header, the scheme is not checked.
    pub fn matches(&self, authorization: Option<&HeaderValue>) -> bool {
        authorization
            .and_then(|value| {
                value
                    .as_bytes()
                    .split(u8::is_ascii_whitespace)
                    .filter(|token| !token.is_empty())
                    .nth(1)
            })
            .is_some_and(|token| token == self.0.as_bytes())
    }
}

/// Middleware rejecting requests without the configured credential.
pub async fn require_credential(
    State(credential): State<Credential>,
    request: Request,
    next: Next,
) -> Response {
    if credential.matches(request.headers().get(header::AUTHORIZATION)) {
        next.run(request).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, AUTH_CHALLENGE)],
            UNAUTHORIZED_BODY,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{SharedRegistry, TaskRegistry};
    use crate::routes::routes;
    use axum::body::Body;
    use tower::ServiceExt;

    fn header(value: &'static str) -> HeaderValue {
        HeaderValue::from_static(value)
    }

    #[test]
    fn empty_secret_disables_auth() {
        assert!(Credential::new("").is_none());
    }

    #[test]
    fn second_token_is_compared() {
        let credential = Credential::new("secret").unwrap();
        // base64("secret") == "c2VjcmV0"
        assert!(credential.matches(Some(&header("Basic c2VjcmV0"))));
        assert!(credential.matches(Some(&header("Bearer   c2VjcmV0"))));
        assert!(credential.matches(Some(&header("Basic c2VjcmV0 trailing"))));
        assert!(!credential.matches(Some(&header("Basic c2VjcmV0Cg=="))));
        assert!(!credential.matches(Some(&header("Basic secret"))));
        assert!(!credential.matches(Some(&header("c2VjcmV0"))));
        assert!(!credential.matches(Some(&header(""))));
        assert!(!credential.matches(None));
    }

    async fn status(
        router: &axum::Router,
        authorization: Option<&'static str>,
    ) -> (StatusCode, Option<HeaderValue>) {
        let mut request = axum::http::Request::builder().uri("/nonexistent");
        if let Some(authorization) = authorization {
            request = request.header(header::AUTHORIZATION, authorization);
        }
        let response = router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        (
            response.status(),
            response.headers().get(header::WWW_AUTHENTICATE).cloned(),
        )
    }

    #[tokio::test]
    async fn router_is_guarded() {
        let registry = TaskRegistry::from_json("tasks.json", "{}").unwrap();
        let router = routes(SharedRegistry::new(registry), Credential::new("secret"));

        let (status_code, challenge) = status(&router, None).await;
        assert_eq!(status_code, StatusCode::UNAUTHORIZED);
        assert_eq!(challenge.unwrap(), r#"Basic realm="user""#);

        assert_eq!(status(&router, Some("Basic")).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(&router, Some("Basic d3Jvbmc=")).await.0,
            StatusCode::UNAUTHORIZED
        );
        // Routed normally, so the unknown task is reported.
        assert_eq!(
            status(&router, Some("Basic c2VjcmV0")).await,
            (StatusCode::NOT_FOUND, None)
        );
    }

    #[tokio::test]
    async fn no_credential_is_open() {
        let registry = TaskRegistry::from_json("tasks.json", "{}").unwrap();
        let router = routes(SharedRegistry::new(registry), None);
        assert_eq!(status(&router, None).await.0, StatusCode::NOT_FOUND);
    }
}
