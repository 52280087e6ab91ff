use crate::auth::{self, Credential};
use crate::executor;
use crate::registry::{fatal, SharedRegistry};
use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{middleware, Router};
use barker_api::api::{
    collect_payload, METHOD_NOT_ALLOWED_BODY, NOT_FOUND_BODY, OK_BODY, RELOAD_PATH,
    TASK_FAILED_BODY,
};

/// Larger form bodies are not parsed, the task still runs with the query fields.
const MAX_FORM_BYTES: usize = 10 << 20;

#[derive(Clone)]
struct AppState {
    registry: SharedRegistry,
}

/// Every path is routed by [`route`], optionally behind the credential check.
pub fn routes(registry: SharedRegistry, credential: Option<Credential>) -> Router {
    let router = Router::new()
        .fallback(route)
        .with_state(AppState { registry });
    match credential {
        Some(credential) => router.layer(middleware::from_fn_with_state(
            credential,
            auth::require_credential,
        )),
        None => router,
    }
}

/// The body is only read for url-encoded requests to payload tasks.
async fn route(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let Ok(path) = urlencoding::decode(parts.uri.path()) else {
        return (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response();
    };
    let name = path.trim_matches('/');

    if name == RELOAD_PATH {
        log::info!("reloading tasks");
        if let Err(e) = state.registry.reload().await {
            fatal(&e);
        }
        return OK_BODY.into_response();
    }

    let Some(task) = state.registry.snapshot().get(name) else {
        log::debug!(task = name; "no such task");
        return (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response();
    };
    if !task.allows(parts.method.as_str()) {
        log::debug!(task = name, method = parts.method.as_str(); "method not allowed");
        return (StatusCode::METHOD_NOT_ALLOWED, METHOD_NOT_ALLOWED_BODY).into_response();
    }

    let payload = if task.accepts_payload {
        let form = if has_form_body(&parts.method, &parts.headers) {
            axum::body::to_bytes(body, MAX_FORM_BYTES)
                .await
                .unwrap_or_else(|e| {
                    log::debug!(task = name; "form body not parsed: {e}");
                    Bytes::new()
                })
        } else {
            Bytes::new()
        };
        match form_payload(&parts.uri, &form) {
            Ok(payload) => payload,
            Err(e) => {
                log::error!(task = name; "failed to serialize payload: {e}");
                return (StatusCode::BAD_GATEWAY, TASK_FAILED_BODY).into_response();
            }
        }
    } else {
        Vec::new()
    };

    if executor::run(&task, &payload).await.is_success() {
        OK_BODY.into_response()
    } else {
        (StatusCode::BAD_GATEWAY, TASK_FAILED_BODY).into_response()
    }
}

/// Serializes the form fields of `form` and the query as a json object of string arrays.
///
/// Body values come before query values. Fields that cannot be decoded are
/// skipped, a bad form never keeps the task from running.
pub fn form_payload(uri: &Uri, form: &[u8]) -> Result<Vec<u8>, serde_json::Error> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    match serde_urlencoded::from_bytes::<Vec<(String, String)>>(form) {
        Ok(fields) => pairs.extend(fields),
        Err(e) => log::debug!("ignoring form body: {e}"),
    }
    if let Some(query) = uri.query() {
        match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
            Ok(fields) => pairs.extend(fields),
            Err(e) => log::debug!("ignoring query: {e}"),
        }
    }
    serde_json::to_vec(&collect_payload(pairs))
}

/// Like a regular html form parser, only url-encoded `POST`, `PUT` and `PATCH` bodies count.
fn has_form_body(method: &Method, headers: &HeaderMap) -> bool {
    if !matches!(*method, Method::POST | Method::PUT | Method::PATCH) {
        return false;
    }
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| {
            mime.trim()
                .eq_ignore_ascii_case("application/x-www-form-urlencoded")
        })
}
