//! Session flow integration tests
//!
//! These tests run the full request pipeline against a scripted in-process
//! HTTP backend: bearer attachment, auth-endpoint exemption, the
//! single-refresh-then-retry flow, and terminal session expiry.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use uuid::Uuid;

use docportal_client::auth::AccessClaims;
use docportal_client::error::ApiError;
use docportal_client::guards::auth_guard;
use docportal_client::models::Role;
use docportal_client::{Config, MemoryTokenStore, PortalClient, TokenStore};

// ============================================================================
// Scripted backend
// ============================================================================

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    authorization: Option<String>,
    body: String,
}

type Handler = Arc<dyn Fn(&Recorded) -> (u16, String) + Send + Sync>;

struct MockBackend {
    base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockBackend {
    async fn start(handler: Handler) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests: Arc<Mutex<Vec<Recorded>>> = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let recorded = recorded.clone();
                let handler = handler.clone();
                tokio::spawn(async move {
                    let Some(request) = read_request(&mut socket).await else {
                        return;
                    };
                    let (status, body) = handler(&request);
                    recorded.lock().unwrap().push(request);
                    let response = format!(
                        "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        status,
                        reason(status),
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        MockBackend {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<Recorded> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let request_line = lines.next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut authorization = None;
    let mut content_length = 0usize;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "authorization" => authorization = Some(value.trim().to_string()),
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                _ => {}
            }
        }
    }

    let mut body_bytes = buf[header_end + 4..].to_vec();
    while body_bytes.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body_bytes.extend_from_slice(&chunk[..n]);
    }

    Some(Recorded {
        method,
        path,
        authorization,
        body: String::from_utf8_lossy(&body_bytes).to_string(),
    })
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}

fn make_access_token(user_id: Uuid, roles: Vec<&str>) -> String {
    let now = Utc::now().timestamp();
    let claims = AccessClaims {
        sub: user_id.to_string(),
        email: "doctorant@univ.example".to_string(),
        first_name: "Awa".to_string(),
        last_name: "Ndiaye".to_string(),
        roles: roles.into_iter().map(String::from).collect(),
        iat: now,
        exp: now + 900,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"backend-secret"),
    )
    .unwrap()
}

fn token_pair_body(access: &str, refresh: &str) -> String {
    format!(r#"{{"accessToken":"{}","refreshToken":"{}"}}"#, access, refresh)
}

fn profile_body() -> String {
    format!(
        r#"{{"id":"{}","email":"doctorant@univ.example","firstName":"Awa","lastName":"Ndiaye","roles":["DOCTORANT"]}}"#,
        Uuid::new_v4()
    )
}

fn client_for(backend: &MockBackend) -> (PortalClient, Arc<MemoryTokenStore>) {
    let store = Arc::new(MemoryTokenStore::new());
    let client = PortalClient::new(
        Config::for_base_url(&backend.base_url),
        store.clone() as Arc<dyn TokenStore>,
    )
    .unwrap();
    (client, store)
}

// ============================================================================
// Bearer attachment and exemption
// ============================================================================

#[tokio::test]
async fn bearer_token_attached_to_protected_requests() {
    init_tracing();
    let backend = MockBackend::start(Arc::new(|req: &Recorded| {
        match req.path.as_str() {
            "/users/profile" => (200, profile_body()),
            _ => (404, String::new()),
        }
    }))
    .await;

    let (client, store) = client_for(&backend);
    store.set("access-1", "refresh-1").unwrap();

    client.profile().await.unwrap();

    let recorded = backend.requests_to("/users/profile");
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].method, "GET");
    assert_eq!(
        recorded[0].authorization.as_deref(),
        Some("Bearer access-1")
    );
}

#[tokio::test]
async fn login_carries_no_authorization_and_persists_the_pair() {
    init_tracing();
    let user_id = Uuid::new_v4();
    let access = make_access_token(user_id, vec!["DOCTORANT"]);
    let pair = token_pair_body(&access, "refresh-1");

    let backend = MockBackend::start(Arc::new(move |req: &Recorded| {
        match req.path.as_str() {
            "/auth/login" => (200, pair.clone()),
            _ => (404, String::new()),
        }
    }))
    .await;

    let (client, store) = client_for(&backend);
    // Even with a stale pair lying around, login goes out bare.
    store.set("stale-access", "stale-refresh").unwrap();

    let user = client.login("doctorant@univ.example", "secret123").await.unwrap();
    assert_eq!(user.id, user_id);
    assert_eq!(user.roles, vec![Role::Doctorant]);

    let recorded = backend.requests_to("/auth/login");
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].authorization, None);
    assert!(recorded[0].body.contains("doctorant@univ.example"));

    // The store holds exactly the issued pair, and the guard now passes.
    assert_eq!(store.access_token().unwrap().as_deref(), Some(access.as_str()));
    assert_eq!(store.refresh_token().unwrap().as_deref(), Some("refresh-1"));
    assert!(auth_guard(store.as_ref(), "/dashboard").is_allowed());
}

#[tokio::test]
async fn login_rejection_surfaces_directly_without_refresh() {
    init_tracing();
    let backend = MockBackend::start(Arc::new(|req: &Recorded| {
        match req.path.as_str() {
            "/auth/login" => (
                401,
                r#"{"error":{"code":"UNAUTHORIZED","message":"identifiants invalides"}}"#
                    .to_string(),
            ),
            _ => (404, String::new()),
        }
    }))
    .await;

    let (client, store) = client_for(&backend);

    let err = client
        .login("doctorant@univ.example", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));

    assert!(backend.requests_to("/auth/refresh").is_empty());
    assert!(store.access_token().unwrap().is_none());
}

// ============================================================================
// Refresh flow
// ============================================================================

#[tokio::test]
async fn expired_access_token_is_refreshed_and_request_retried_once() {
    init_tracing();
    let backend = MockBackend::start(Arc::new(|req: &Recorded| {
        match req.path.as_str() {
            "/auth/refresh" => (200, token_pair_body("access-2", "refresh-2")),
            "/users/profile" => {
                if req.authorization.as_deref() == Some("Bearer access-2") {
                    (200, profile_body())
                } else {
                    (401, String::new())
                }
            }
            _ => (404, String::new()),
        }
    }))
    .await;

    let (client, store) = client_for(&backend);
    store.set("access-1", "refresh-1").unwrap();

    // The caller sees no interruption.
    client.profile().await.unwrap();

    let refreshes = backend.requests_to("/auth/refresh");
    assert_eq!(refreshes.len(), 1);
    assert_eq!(refreshes[0].authorization, None);
    assert!(refreshes[0].body.contains(r#""refreshToken":"refresh-1""#));

    let calls = backend.requests_to("/users/profile");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].authorization.as_deref(), Some("Bearer access-1"));
    assert_eq!(calls[1].authorization.as_deref(), Some("Bearer access-2"));

    // The pair was replaced atomically.
    assert_eq!(store.access_token().unwrap().as_deref(), Some("access-2"));
    assert_eq!(store.refresh_token().unwrap().as_deref(), Some("refresh-2"));
}

#[tokio::test]
async fn rejected_refresh_token_clears_session_and_redirects() {
    init_tracing();
    let backend = MockBackend::start(Arc::new(|req: &Recorded| {
        match req.path.as_str() {
            "/auth/refresh" => (
                401,
                r#"{"error":{"code":"UNAUTHORIZED","message":"refresh token invalide"}}"#
                    .to_string(),
            ),
            "/users/profile" => (401, String::new()),
            _ => (404, String::new()),
        }
    }))
    .await;

    let (client, store) = client_for(&backend);
    store.set("access-1", "refresh-1").unwrap();

    let err = client.profile().await.unwrap_err();
    match err {
        ApiError::SessionExpired { redirect } => {
            assert_eq!(redirect, "/login?expired=true");
        }
        other => panic!("expected session expiry, got {:?}", other),
    }

    // Exactly one refresh attempt, then the session is gone for good.
    assert_eq!(backend.requests_to("/auth/refresh").len(), 1);
    assert!(store.access_token().unwrap().is_none());
    assert!(store.refresh_token().unwrap().is_none());
    assert!(!auth_guard(store.as_ref(), "/dashboard").is_allowed());
}

#[tokio::test]
async fn refresh_server_error_clears_session() {
    init_tracing();
    let backend = MockBackend::start(Arc::new(|req: &Recorded| {
        match req.path.as_str() {
            "/auth/refresh" => (
                500,
                r#"{"error":{"code":"INTERNAL_ERROR","message":"boom"}}"#.to_string(),
            ),
            "/users/profile" => (401, String::new()),
            _ => (404, String::new()),
        }
    }))
    .await;

    let (client, store) = client_for(&backend);
    store.set("access-1", "refresh-1").unwrap();

    // Refresh failure is terminal whatever the status: the session is gone.
    let err = client.profile().await.unwrap_err();
    assert!(err.is_session_expired());

    assert_eq!(backend.requests_to("/auth/refresh").len(), 1);
    assert!(store.access_token().unwrap().is_none());
    assert!(store.refresh_token().unwrap().is_none());
}

#[tokio::test]
async fn second_rejection_after_refresh_clears_session() {
    init_tracing();
    let backend = MockBackend::start(Arc::new(|req: &Recorded| {
        match req.path.as_str() {
            "/auth/refresh" => (200, token_pair_body("access-2", "refresh-2")),
            // The backend rejects even the rotated token.
            "/users/profile" => (401, String::new()),
            _ => (404, String::new()),
        }
    }))
    .await;

    let (client, store) = client_for(&backend);
    store.set("access-1", "refresh-1").unwrap();

    let err = client.profile().await.unwrap_err();
    assert!(err.is_session_expired());

    // Retried exactly once, refreshed exactly once, no loop.
    assert_eq!(backend.requests_to("/users/profile").len(), 2);
    assert_eq!(backend.requests_to("/auth/refresh").len(), 1);
    assert!(store.access_token().unwrap().is_none());
}

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() {
    init_tracing();
    let backend = MockBackend::start(Arc::new(|req: &Recorded| {
        match req.path.as_str() {
            "/auth/refresh" => (200, token_pair_body("access-2", "refresh-2")),
            "/users/profile" => {
                if req.authorization.as_deref() == Some("Bearer access-2") {
                    (200, profile_body())
                } else {
                    (401, String::new())
                }
            }
            _ => (404, String::new()),
        }
    }))
    .await;

    let (client, store) = client_for(&backend);
    store.set("access-1", "refresh-1").unwrap();

    let (a, b) = tokio::join!(client.profile(), client.profile());
    a.unwrap();
    b.unwrap();

    // Both callers recovered through a single refresh round trip.
    assert_eq!(backend.requests_to("/auth/refresh").len(), 1);
}

// ============================================================================
// Non-401 errors
// ============================================================================

#[tokio::test]
async fn non_unauthorized_errors_are_classified_and_not_retried() {
    init_tracing();
    let backend = MockBackend::start(Arc::new(|req: &Recorded| {
        match req.path.as_str() {
            "/users/profile" => (
                500,
                r#"{"error":{"code":"INTERNAL_ERROR","message":"boom"}}"#.to_string(),
            ),
            _ => (404, String::new()),
        }
    }))
    .await;

    let (client, store) = client_for(&backend);
    store.set("access-1", "refresh-1").unwrap();

    let err = client.profile().await.unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 500, .. }));

    assert_eq!(backend.requests_to("/users/profile").len(), 1);
    assert!(backend.requests_to("/auth/refresh").is_empty());
    // A server error never invalidates the session.
    assert_eq!(store.access_token().unwrap().as_deref(), Some("access-1"));
}

#[tokio::test]
async fn register_conflict_is_surfaced() {
    init_tracing();
    let backend = MockBackend::start(Arc::new(|req: &Recorded| {
        match req.path.as_str() {
            "/auth/register" => (
                409,
                r#"{"error":{"code":"CONFLICT","message":"email deja utilise"}}"#.to_string(),
            ),
            _ => (404, String::new()),
        }
    }))
    .await;

    let (client, _store) = client_for(&backend);

    let req = docportal_client::models::RegisterRequest {
        email: "doctorant@univ.example".to_string(),
        password: "longenough1".to_string(),
        first_name: "Awa".to_string(),
        last_name: "Ndiaye".to_string(),
        registration_number: None,
    };
    let err = client.register(&req).await.unwrap_err();
    match err {
        ApiError::Conflict(msg) => assert_eq!(msg, "email deja utilise"),
        other => panic!("expected conflict, got {:?}", other),
    }
}
