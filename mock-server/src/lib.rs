//! In-process stand-in for the registrar API.
//!
//! Issues JWT-shaped tokens on login, honours them on protected routes,
//! answers refreshes with a configurable status, and logs every request so
//! tests can assert on the exact sequence a client produced.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const LOGIN: &str = "registrar-user";
pub const PASSWORD: &str = "correct-horse";
pub const FORM_NAME: &str = "F-2041";

/// Behaviour knobs for the mock.
#[derive(Clone, Debug)]
pub struct MockConfig {
    pub login: String,
    pub password: String,
    /// Lifetime reported for issued tokens, in seconds.
    pub expires_in: u64,
    /// Status returned by `GET /auth/refresh`.
    pub refresh_status: u16,
    pub form_name: Option<String>,
    pub balance: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            login: LOGIN.to_string(),
            password: PASSWORD.to_string(),
            expires_in: 3600,
            refresh_status: 200,
            form_name: Some(FORM_NAME.to_string()),
            balance: "1520.50".to_string(),
        }
    }
}

/// One request as seen by the mock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
struct Ledger {
    requests: Vec<RecordedRequest>,
    tokens: Vec<String>,
}

/// Shared mock state. Clones share the same config and ledger.
#[derive(Clone, Default)]
pub struct MockRegistrar {
    config: Arc<RwLock<MockConfig>>,
    ledger: Arc<RwLock<Ledger>>,
}

impl MockRegistrar {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            ledger: Arc::new(RwLock::new(Ledger::default())),
        }
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.ledger.read().await.requests.clone()
    }

    /// For callers outside the runtime (blocking test threads).
    pub fn requests_blocking(&self) -> Vec<RecordedRequest> {
        self.ledger.blocking_read().requests.clone()
    }

    pub fn issued_tokens_blocking(&self) -> Vec<String> {
        self.ledger.blocking_read().tokens.clone()
    }

    pub fn set_refresh_status_blocking(&self, status: u16) {
        self.config.blocking_write().refresh_status = status;
    }

    pub fn set_expires_in_blocking(&self, secs: u64) {
        self.config.blocking_write().expires_in = secs;
    }

    async fn record(&self, method: &Method, uri: &Uri, headers: &HeaderMap, body: &str) {
        let request = RecordedRequest {
            method: method.to_string(),
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            authorization: headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body: (!body.is_empty()).then(|| serde_json::from_str(body).unwrap_or(Value::Null)),
        };
        tracing::debug!(method = %request.method, path = %request.path, "mock request");
        self.ledger.write().await.requests.push(request);
    }

    async fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(token) = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
        else {
            return false;
        };
        self.ledger.read().await.tokens.iter().any(|t| t == token)
    }

    async fn issue_token(&self) -> String {
        let token = format!(
            "eyJhbGciOiJIUzI1NiJ9.{}.{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        );
        self.ledger.write().await.tokens.push(token.clone());
        token
    }
}

pub fn app() -> Router {
    app_with(MockRegistrar::default())
}

pub fn app_with(registrar: MockRegistrar) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", get(refresh))
        .route("/my-account", get(my_account))
        .route("/order/checkDomainDas", post(echo))
        .route("/order/checkDomainName", get(echo))
        .route("/order/listRegistrants", get(echo))
        .route("/order/submit", post(submit_order))
        .route("/reg/contacts", get(echo).post(echo))
        .route("/domains/{domain}", get(domain_info))
        .route("/invoices/{id}", get(echo).put(echo))
        .route("/services/service", get(echo))
        .route("/_test/html", get(html_error))
        .route("/_test/flat-error", get(flat_error))
        .with_state(registrar)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, registrar: MockRegistrar) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(registrar)).await
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"message": "Unauthorized", "code": 401}})),
    )
        .into_response()
}

async fn login(
    State(registrar): State<MockRegistrar>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    registrar.record(&method, &uri, &headers, &body).await;
    let input: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    let config = registrar.config.read().await.clone();

    if input["login"] != config.login.as_str() || input["password"] != config.password.as_str() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"data": {"error": "Invalid login or password", "code": 1001}})),
        )
            .into_response();
    }

    let token = registrar.issue_token().await;
    let mut data = json!({
        "token": token,
        "expires_in": config.expires_in,
        "credit_account_info": {"balance_base": config.balance},
    });
    if let Some(form_name) = config.form_name {
        data["form_name"] = json!(form_name);
    }
    Json(json!({"data": data})).into_response()
}

async fn refresh(
    State(registrar): State<MockRegistrar>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    registrar.record(&method, &uri, &headers, &body).await;
    if !registrar.authorized(&headers).await {
        return unauthorized();
    }
    let config = registrar.config.read().await.clone();
    let status = StatusCode::from_u16(config.refresh_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status != StatusCode::OK {
        return (status, Json(json!({"message": "Token refresh unavailable"}))).into_response();
    }
    let token = registrar.issue_token().await;
    Json(json!({"token": token, "expires_in": config.expires_in})).into_response()
}

async fn my_account(
    State(registrar): State<MockRegistrar>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    registrar.record(&method, &uri, &headers, &body).await;
    if !registrar.authorized(&headers).await {
        return unauthorized();
    }
    let login = registrar.config.read().await.login.clone();
    Json(json!({"data": {"login": login, "restrictions": []}})).into_response()
}

/// Reflects the request back so tests can see what arrived.
async fn echo(
    State(registrar): State<MockRegistrar>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    registrar.record(&method, &uri, &headers, &body).await;
    if !registrar.authorized(&headers).await {
        return unauthorized();
    }
    let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    Json(json!({"data": {
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "body": body,
    }}))
    .into_response()
}

async fn submit_order(
    State(registrar): State<MockRegistrar>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    registrar.record(&method, &uri, &headers, &body).await;
    if !registrar.authorized(&headers).await {
        return unauthorized();
    }
    let order: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    if order.get("order").is_none() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"data": {"error": "Order has no items", "code": 1301}})),
        )
            .into_response();
    }
    Json(json!({"data": {"order_id": 5001, "received": order}})).into_response()
}

async fn domain_info(
    State(registrar): State<MockRegistrar>,
    Path(domain): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    registrar.record(&method, &uri, &headers, &body).await;
    if !registrar.authorized(&headers).await {
        return unauthorized();
    }
    if domain == "missing.cz" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"message": "Domain not found", "code": 1261}})),
        )
            .into_response();
    }
    Json(json!({"data": {"name": domain, "status": "active"}})).into_response()
}

async fn html_error(
    State(registrar): State<MockRegistrar>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    registrar.record(&method, &uri, &headers, &body).await;
    (StatusCode::BAD_GATEWAY, "<html>Bad Gateway</html>").into_response()
}

async fn flat_error(
    State(registrar): State<MockRegistrar>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    registrar.record(&method, &uri, &headers, &body).await;
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({"message": "Invalid characters used in cz nic id", "code": 1222})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_reports_an_hour_long_token() {
        let config = MockConfig::default();
        assert_eq!(config.expires_in, 3600);
        assert_eq!(config.refresh_status, 200);
        assert_eq!(config.form_name.as_deref(), Some(FORM_NAME));
    }

    #[test]
    fn recorded_request_roundtrips_through_json() {
        let request = RecordedRequest {
            method: "GET".to_string(),
            path: "/order/listRegistrants".to_string(),
            query: Some("tld=cz".to_string()),
            authorization: None,
            body: None,
        };
        let back: RecordedRequest =
            serde_json::from_str(&serde_json::to_string(&request).unwrap()).unwrap();
        assert_eq!(back, request);
    }

    #[tokio::test]
    async fn issued_tokens_are_jwt_shaped_and_accepted() {
        let registrar = MockRegistrar::default();
        let token = registrar.issue_token().await;
        assert_eq!(token.split('.').count(), 3);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
        assert!(registrar.authorized(&headers).await);

        headers.insert(header::AUTHORIZATION, "Bearer a.b.c".parse().unwrap());
        assert!(!registrar.authorized(&headers).await);
    }
}
