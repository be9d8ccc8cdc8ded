use http_body_util::BodyExt;
use hyper::{
    Method, Request, Response, StatusCode,
    body::Incoming,
    header::{CONTENT_TYPE, HeaderValue},
};
use serde::Deserialize;
use std::sync::Arc;
use url::form_urlencoded;

use crate::domains::sessions::service::SessionManager;
use crate::errors::WerkError;

/// HTTP JSON surface over the session use cases. The routes mirror the tool
/// surface: create, list, remove, plus the reconciliation scan.
pub async fn handle_request(
    req: Request<Incoming>,
    manager: Arc<SessionManager>,
) -> Result<Response<String>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match (&method, path.as_str()) {
        (&Method::POST, "/api/sessions") => create_session(req, &manager).await,
        (&Method::GET, "/api/sessions") => list_sessions(&manager).await,
        (&Method::DELETE, path) if path.starts_with("/api/sessions/") => {
            let name = extract_session_name(path);
            let force = parse_force_param(req.uri().query().unwrap_or(""));
            remove_session(&manager, &name, force).await
        }
        (&Method::GET, "/api/reconcile") => reconcile(&manager).await,
        _ => Ok(not_found_response()),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionBody {
    session_id: String,
}

async fn create_session(
    req: Request<Incoming>,
    manager: &SessionManager,
) -> Result<Response<String>, hyper::Error> {
    let body = req.into_body().collect().await?.to_bytes();
    let payload: CreateSessionBody = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            return Ok(json_error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid request body: {e}"),
            ));
        }
    };

    match manager.create_session(&payload.session_id).await {
        Ok(created) => match serde_json::to_string(&created) {
            Ok(json) => Ok(json_response(StatusCode::CREATED, json)),
            Err(e) => Ok(json_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialize session: {e}"),
            )),
        },
        Err(err) => Ok(werk_error_response(&err)),
    }
}

async fn list_sessions(manager: &SessionManager) -> Result<Response<String>, hyper::Error> {
    match manager.list_sessions().await {
        Ok(sessions) => {
            let body = serde_json::json!({ "sessions": sessions });
            Ok(json_response(StatusCode::OK, body.to_string()))
        }
        Err(err) => Ok(werk_error_response(&err)),
    }
}

async fn remove_session(
    manager: &SessionManager,
    name: &str,
    force: bool,
) -> Result<Response<String>, hyper::Error> {
    match manager.remove_session(name, force).await {
        Ok(outcome) => match serde_json::to_string(&outcome) {
            Ok(json) => Ok(json_response(StatusCode::OK, json)),
            Err(e) => Ok(json_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialize removal outcome: {e}"),
            )),
        },
        Err(err) => Ok(werk_error_response(&err)),
    }
}

async fn reconcile(manager: &SessionManager) -> Result<Response<String>, hyper::Error> {
    match manager.reconcile().await {
        Ok(report) => match serde_json::to_string(&report) {
            Ok(json) => Ok(json_response(StatusCode::OK, json)),
            Err(e) => Ok(json_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialize reconcile report: {e}"),
            )),
        },
        Err(err) => Ok(werk_error_response(&err)),
    }
}

fn extract_session_name(path: &str) -> String {
    let prefix = "/api/sessions/";
    let name = &path[prefix.len()..];
    urlencoding::decode(name)
        .unwrap_or(std::borrow::Cow::Borrowed(name))
        .to_string()
}

fn parse_force_param(query: &str) -> bool {
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key == "force" {
            return matches!(value.as_ref(), "1" | "true" | "yes");
        }
    }
    false
}

fn status_for(err: &WerkError) -> StatusCode {
    match err {
        WerkError::InvalidSessionId { .. } | WerkError::InvalidInput { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        WerkError::SessionNotFound { .. } => StatusCode::NOT_FOUND,
        WerkError::SessionAlreadyExists { .. } | WerkError::BranchAlreadyExists { .. } => {
            StatusCode::CONFLICT
        }
        WerkError::OperationCancelled { .. } => StatusCode::REQUEST_TIMEOUT,
        WerkError::GitOperationFailed { .. } | WerkError::LedgerOperationFailed { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn werk_error_response(err: &WerkError) -> Response<String> {
    let body = serde_json::json!({ "error": err, "message": err.to_string() }).to_string();
    json_response(status_for(err), body)
}

fn json_response(status: StatusCode, json: String) -> Response<String> {
    let mut response = Response::new(json);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn json_error_response(status: StatusCode, message: String) -> Response<String> {
    let body = serde_json::json!({ "error": message }).to_string();
    json_response(status, body)
}

fn not_found_response() -> Response<String> {
    let mut response = Response::new("Not Found".to_string());
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}
