use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode as AxumStatus},
    routing::{get, post},
    Json, Router,
};
use reqwest::StatusCode;
use serde_json::{json, Value};

use adminhub_api::app::{build_app, AppServices};
use adminhub_audit::{AuditRecord, AuditRecorder, AuditStore, AuditStoreError, InMemoryAuditStore};
use adminhub_auth::{
    IdentityError, IdentityProvider, RoleCache, RoleResolver, Session, StaticIdentityProvider,
};
use adminhub_core::{ApiKeyId, CallerId};
use adminhub_infra::{HttpIdentityProvider, RestAuditStore};
use adminhub_rpc::{HttpTransport, RawResponse, RemoteInvoker, ScriptedTransport};

const ROLE_PROC: &str = "admin-api";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Dashboard wired to in-memory collaborators.
struct Dashboard {
    srv: TestServer,
    identity: Arc<StaticIdentityProvider>,
    platform: Arc<ScriptedTransport>,
    audit: Arc<InMemoryAuditStore>,
}

impl Dashboard {
    async fn spawn() -> Self {
        Self::spawn_with_store(None).await
    }

    async fn spawn_with_store(store: Option<Arc<dyn AuditStore>>) -> Self {
        let identity = Arc::new(StaticIdentityProvider::new());
        let platform = Arc::new(ScriptedTransport::new());
        let audit = Arc::new(InMemoryAuditStore::new());
        let store = store.unwrap_or_else(|| audit.clone() as Arc<dyn AuditStore>);

        let resolver = RoleResolver::new(
            RemoteInvoker::new(platform.clone()),
            Arc::new(RoleCache::default()),
        );
        let services = AppServices::new(identity.clone(), Arc::new(resolver), AuditRecorder::new(store));

        Self {
            srv: TestServer::spawn(build_app(services)).await,
            identity,
            platform,
            audit,
        }
    }

    /// Register a signed-in caller whose role fetch answers `role`.
    fn sign_in(&self, token: &str, role: Value) -> CallerId {
        let caller = CallerId::new();
        self.identity.insert(token, caller);
        self.platform
            .respond(ROLE_PROC, RawResponse::success(json!({ "role": role })));
        caller
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

fn location(res: &reqwest::Response) -> &str {
    res.headers()
        .get(reqwest::header::LOCATION)
        .expect("redirect carries a location")
        .to_str()
        .unwrap()
}

async fn audit_rows_eventually(store: &InMemoryAuditStore, count: usize) -> Vec<AuditRecord> {
    // Audit writes are fire-and-forget; poll briefly until they land.
    for _ in 0..50 {
        let rows = store.records();
        if rows.len() >= count {
            return rows;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {count} audit rows, found {}", store.len());
}

#[tokio::test]
async fn health_is_public() {
    let dash = Dashboard::spawn().await;
    let res = client().get(dash.srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn signed_out_caller_is_sent_to_sign_in_with_return_location() {
    let dash = Dashboard::spawn().await;

    let res = client().get(dash.srv.url("/projects/42")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/auth?redirect=%2Fprojects%2F42");
    assert_eq!(dash.platform.call_count(ROLE_PROC), 0);

    let res = client()
        .get(dash.srv.url("/auth?redirect=%2Fprojects%2F42"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["redirect"], "/projects/42");
}

#[tokio::test]
async fn unknown_token_is_treated_as_signed_out() {
    let dash = Dashboard::spawn().await;

    let res = client()
        .get(dash.srv.url("/admin"))
        .bearer_auth("forged")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/auth?redirect=%2Fadmin");
    assert_eq!(dash.platform.call_count(ROLE_PROC), 0);
}

#[tokio::test]
async fn session_gate_admits_signed_in_caller_without_role_fetch() {
    let dash = Dashboard::spawn().await;
    let caller = dash.sign_in("t-user", json!("user"));

    let res = client()
        .get(dash.srv.url("/projects/42"))
        .bearer_auth("t-user")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["project_id"], "42");
    assert_eq!(body["caller_id"], caller.to_string());
    assert_eq!(dash.platform.call_count(ROLE_PROC), 0);
}

#[tokio::test]
async fn moderator_is_redirected_away_from_admin_view() {
    let dash = Dashboard::spawn().await;
    dash.sign_in("t-mod", json!("moderator"));

    let res = client()
        .get(dash.srv.url("/admin"))
        .bearer_auth("t-mod")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/");

    let res = client()
        .get(dash.srv.url("/moderation"))
        .bearer_auth("t-mod")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_is_allowed_and_role_is_cached() {
    let dash = Dashboard::spawn().await;
    dash.sign_in("t-admin", json!("admin"));
    let http = client();

    for _ in 0..3 {
        let res = http
            .get(dash.srv.url("/admin"))
            .bearer_auth("t-admin")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["role"], "admin");
    }

    let res = http
        .get(dash.srv.url("/owner"))
        .bearer_auth("t-admin")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    assert_eq!(dash.platform.call_count(ROLE_PROC), 1);
    let calls = dash.platform.calls();
    let call = &calls[0];
    assert_eq!(call.payload, json!({ "action": "get_my_role" }));
    assert_eq!(call.credential.as_deref(), Some("t-admin"));
}

#[tokio::test]
async fn me_role_reports_level_and_flags() {
    let dash = Dashboard::spawn().await;
    dash.sign_in("t-owner", json!("owner"));

    let res = client()
        .get(dash.srv.url("/me/role"))
        .bearer_auth("t-owner")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["role"], "owner");
    assert_eq!(body["level"], 1);
    assert_eq!(body["is_admin"], true);
    assert_eq!(body["is_owner"], true);
    assert_eq!(body["is_loading"], false);
}

#[tokio::test]
async fn unrecognized_role_is_least_privileged() {
    let dash = Dashboard::spawn().await;
    dash.sign_in("t-odd", json!("superuser"));
    let http = client();

    let res = http
        .get(dash.srv.url("/moderation"))
        .bearer_auth("t-odd")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/");

    let body: Value = http
        .get(dash.srv.url("/me/role"))
        .bearer_auth("t-odd")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["role"], "superuser");
    assert_eq!(body["level"], 99);
    assert_eq!(body["is_admin"], false);
}

#[tokio::test]
async fn role_fetch_error_surfaces_as_bad_gateway_and_is_audited() {
    let dash = Dashboard::spawn().await;
    dash.identity.insert("t-quota", CallerId::new());
    dash.platform.respond(
        ROLE_PROC,
        RawResponse::success(json!({ "error": { "message": "Quota exceeded" } })),
    );
    let http = client();

    let res = http
        .get(dash.srv.url("/admin"))
        .bearer_auth("t-quota")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Quota exceeded");

    let res = http
        .get(dash.srv.url("/me/role"))
        .bearer_auth("t-quota")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    let rows = audit_rows_eventually(&dash.audit, 2).await;
    let row = rows.iter().find(|r| r.action == "GET /admin").unwrap();
    assert!(!row.success);
    assert_eq!(row.status_code, 502);
    assert_eq!(row.error_code.as_deref(), Some("upstream_error"));
    assert_eq!(row.error_message.as_deref(), Some("Quota exceeded"));
}

#[tokio::test]
async fn focus_revalidates_only_stale_roles() {
    let dash = Dashboard::spawn().await;
    dash.sign_in("t-focus", json!("moderator"));
    let http = client();

    for _ in 0..2 {
        let res = http
            .post(dash.srv.url("/me/focus"))
            .bearer_auth("t-focus")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["role"], "moderator");
    }

    // First focus fetched; the second found a fresh entry.
    assert_eq!(dash.platform.call_count(ROLE_PROC), 1);
}

#[tokio::test]
async fn every_protected_request_is_audited() {
    let dash = Dashboard::spawn().await;
    let caller = dash.sign_in("t-audit", json!("admin"));
    let key = ApiKeyId::new();

    let res = client()
        .get(dash.srv.url("/admin"))
        .bearer_auth("t-audit")
        .header("x-api-key-id", key.to_string())
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client().get(dash.srv.url("/owner")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let rows = audit_rows_eventually(&dash.audit, 2).await;

    let admin = rows.iter().find(|r| r.action == "GET /admin").unwrap();
    assert_eq!(admin.user_id, Some(*caller.as_uuid()));
    assert_eq!(admin.api_key_id, Some(*key.as_uuid()));
    assert_eq!(admin.ip_address.as_deref(), Some("203.0.113.7"));
    assert!(admin.success);
    assert_eq!(admin.status_code, 200);
    assert_eq!(admin.error_code, None);
    assert!(admin.duration_ms.is_some());

    let anonymous = rows.iter().find(|r| r.action == "GET /owner").unwrap();
    assert_eq!(anonymous.user_id, None);
    assert_eq!(anonymous.ip_address.as_deref(), Some("127.0.0.1"));
    assert_eq!(anonymous.status_code, 303);
    assert!(anonymous.success);
}

#[tokio::test]
async fn public_routes_are_not_audited() {
    let dash = Dashboard::spawn().await;
    client().get(dash.srv.url("/health")).send().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(dash.audit.is_empty());
}

struct BrokenStore;

#[async_trait]
impl AuditStore for BrokenStore {
    fn name(&self) -> &str {
        "broken"
    }

    async fn insert(&self, _record: AuditRecord) -> Result<(), AuditStoreError> {
        Err(AuditStoreError::Transient("connection refused".into()))
    }
}

#[tokio::test]
async fn failing_audit_store_never_affects_the_response() {
    let dash = Dashboard::spawn_with_store(Some(Arc::new(BrokenStore))).await;
    dash.sign_in("t-admin", json!("admin"));

    let res = client()
        .get(dash.srv.url("/admin"))
        .bearer_auth("t-admin")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

struct DownIdentityProvider;

#[async_trait]
impl IdentityProvider for DownIdentityProvider {
    async fn session_for(&self, _access_token: &str) -> Result<Option<Session>, IdentityError> {
        Err(IdentityError::Unavailable("connection refused".into()))
    }
}

#[tokio::test]
async fn identity_provider_outage_is_bad_gateway() {
    let resolver = RoleResolver::new(
        RemoteInvoker::new(Arc::new(ScriptedTransport::new())),
        Arc::new(RoleCache::default()),
    );
    let services = AppServices::new(
        Arc::new(DownIdentityProvider),
        Arc::new(resolver),
        AuditRecorder::new(Arc::new(InMemoryAuditStore::new())),
    );
    let srv = TestServer::spawn(build_app(services)).await;

    let res = client()
        .get(srv.url("/"))
        .bearer_auth("anything")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "identity_unavailable");

    // No token means no provider call at all.
    let res = client().get(srv.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
}

// ─────────────────────────────────────────────────────────────────────────────
// Fake hosted platform (auth, functions and REST endpoints)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct FakePlatform {
    caller: CallerId,
    rows: Arc<Mutex<Vec<Value>>>,
    role_headers: Arc<Mutex<Vec<(String, String)>>>,
}

async fn fake_user(State(platform): State<FakePlatform>, headers: HeaderMap) -> (AxumStatus, Json<Value>) {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if bearer != "Bearer live-token" {
        return (AxumStatus::UNAUTHORIZED, Json(json!({ "message": "invalid JWT" })));
    }
    (AxumStatus::OK, Json(json!({ "id": platform.caller.to_string() })))
}

async fn fake_role(State(platform): State<FakePlatform>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    platform
        .role_headers
        .lock()
        .unwrap()
        .push((header("apikey"), header("authorization")));
    assert_eq!(body, json!({ "action": "get_my_role" }));
    Json(json!({ "role": "admin" }))
}

async fn fake_insert(State(platform): State<FakePlatform>, Json(row): Json<Value>) -> AxumStatus {
    platform.rows.lock().unwrap().push(row);
    AxumStatus::CREATED
}

#[tokio::test]
async fn platform_backed_adapters_work_end_to_end() {
    let platform = FakePlatform {
        caller: CallerId::new(),
        rows: Arc::new(Mutex::new(Vec::new())),
        role_headers: Arc::new(Mutex::new(Vec::new())),
    };
    let fake = Router::new()
        .route("/auth/v1/user", get(fake_user))
        .route("/functions/v1/admin-api", post(fake_role))
        .route("/rest/v1/api_logs", post(fake_insert))
        .with_state(platform.clone());
    let fake_srv = TestServer::spawn(fake).await;

    let resolver = RoleResolver::new(
        RemoteInvoker::new(Arc::new(HttpTransport::new(&fake_srv.base_url, "anon-key"))),
        Arc::new(RoleCache::default()),
    );
    let services = AppServices::new(
        Arc::new(HttpIdentityProvider::new(&fake_srv.base_url, "anon-key")),
        Arc::new(resolver),
        AuditRecorder::new(Arc::new(RestAuditStore::new(&fake_srv.base_url, "anon-key"))),
    );
    let srv = TestServer::spawn(build_app(services)).await;
    let http = client();

    let res = http
        .get(srv.url("/admin"))
        .bearer_auth("live-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = http
        .get(srv.url("/admin"))
        .bearer_auth("expired-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let headers = platform.role_headers.lock().unwrap().clone();
    assert_eq!(headers, vec![("anon-key".to_string(), "Bearer live-token".to_string())]);

    let mut rows = Vec::new();
    for _ in 0..50 {
        rows = platform.rows.lock().unwrap().clone();
        if rows.len() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(rows.len(), 2);

    let allowed = rows.iter().find(|r| r["status_code"] == 200).unwrap();
    assert_eq!(allowed["user_id"], platform.caller.to_string());
    assert_eq!(allowed["action"], "GET /admin");
    // Absent optionals are sent as explicit nulls.
    assert!(allowed.as_object().unwrap().contains_key("api_key_id"));
    assert_eq!(allowed["api_key_id"], Value::Null);

    let denied = rows.iter().find(|r| r["status_code"] == 303).unwrap();
    assert_eq!(denied["user_id"], Value::Null);
}
