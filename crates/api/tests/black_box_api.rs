use chrono::{Duration as ChronoDuration, Utc};
use expensegate_auth::{SessionClaims, TokenId};
use expensegate_core::Username;
use expensegate_infra::AppConfig;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod (in-memory stores, demo data), on an ephemeral port.
        let config = AppConfig::from_lookup(|var| match var {
            "JWT_SECRET" => Some(JWT_SECRET.to_string()),
            "SEED_DEMO_DATA" => Some("true".to_string()),
            _ => None,
        })
        .expect("test config");
        let app = expensegate_api::app::build_app(&config)
            .await
            .expect("failed to build app");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, username: &str) -> String {
        let res = self
            .client
            .post(self.url("/login"))
            .json(&json!({ "username": username, "password": "password" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["token_type"], "bearer");
        body["access_token"].as_str().unwrap().to_string()
    }

    async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        let res = self.client.get(self.url(path)).bearer_auth(token).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(sub: Option<&str>, issued_at: chrono::DateTime<Utc>) -> String {
    let claims = SessionClaims {
        sub: sub.map(Username::new),
        issued_at,
        expires_at: issued_at + ChronoDuration::minutes(30),
        jti: TokenId::new(),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn office_supplies() -> Value {
    json!({
        "title": "Office Supplies",
        "description": "Printer paper and toner for the team.",
        "amount": 75.50,
    })
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Not authenticated");

    let res = srv.client.get(srv.url("/expenses/me")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn public_endpoints_need_no_token() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["store"], "in_memory");
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let srv = TestServer::spawn().await;

    for (username, password) in [("patson", "wrong"), ("wronguser", "wrongpassword")] {
        let res = srv
            .client
            .post(srv.url("/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["message"], "Incorrect username or password");
    }
}

#[tokio::test]
async fn identity_is_derived_from_token() {
    let srv = TestServer::spawn().await;
    let token = srv.login("patson").await;

    let (status, body) = srv.get("/whoami", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "patson");
    assert_eq!(body["user_id"], "UID01");
    assert_eq!(body["is_approver"], true);
}

#[tokio::test]
async fn logout_revokes_only_the_presented_token() {
    let srv = TestServer::spawn().await;
    let first = srv.login("jane_doe").await;
    let second = srv.login("jane_doe").await;
    assert_ne!(first, second);

    let (status, body) = srv.post("/logout", &first, Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "jane_doe");

    let (status, body) = srv.get("/whoami", &first).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token or token blacklisted");

    let (status, body) = srv.post("/logout", &first, Value::Null).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token or user is already logged out!");

    let (status, _) = srv.get("/whoami", &second).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn invalid_tokens_ask_to_re_authenticate() {
    let srv = TestServer::spawn().await;

    let expired = mint_jwt(Some("patson"), Utc::now() - ChronoDuration::hours(1));
    let (status, body) = srv.get("/whoami", &expired).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid token, please re-authenticate:")
    );

    let (status, _) = srv.get("/whoami", "garbage").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let anonymous = mint_jwt(None, Utc::now());
    let (status, _) = srv.get("/whoami", &anonymous).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let ghost = mint_jwt(Some("ghost"), Utc::now());
    let (status, body) = srv.get("/whoami", &ghost).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn expense_lifecycle_reject_then_accept_fails() {
    let srv = TestServer::spawn().await;
    let john = srv.login("john_smith").await;
    let patson = srv.login("patson").await;

    let (status, created) = srv.post("/expenses", &john, office_supplies()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "draft");
    assert_eq!(created["creator_id"], "UID03");
    assert_eq!(created["approver_id"], "UID01");
    assert_eq!(created["amount"], 75.5);
    // Five demo expenses precede it.
    assert_eq!(created["expense_id"], "EID06");
    let id = created["expense_id"].as_str().unwrap().to_string();

    let (status, submitted) = srv.post(&format!("/expenses/submit/{id}"), &john, Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submitted["status"], "submitted");

    let (status, rejected) = srv
        .post(
            &format!("/expenses/reject/{id}"),
            &patson,
            json!({ "rejection_reason": "Missing receipt from airline." }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["status"], "rejected");
    assert_eq!(rejected["rejection_reason"], "Missing receipt from airline.");
    assert!(rejected["rejected_at"].is_string());

    let (status, body) = srv.post(&format!("/expenses/approve/{id}"), &patson, Value::Null).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Expense not found or not permitted");
}

#[tokio::test]
async fn create_enforces_validation_bounds() {
    let srv = TestServer::spawn().await;
    let john = srv.login("john_smith").await;

    let mut body = office_supplies();
    body["title"] = json!("ab");
    let (status, err) = srv.post("/expenses", &john, body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["error"], "validation_error");
    assert_eq!(err["field"], "title");

    let mut body = office_supplies();
    body["amount"] = json!(0);
    let (status, err) = srv.post("/expenses", &john, body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["field"], "amount");

    let (status, err) = srv.post("/expenses", &john, json!({ "title": "Lunch" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["error"], "validation_error");
}

#[tokio::test]
async fn foreign_and_missing_expenses_look_the_same() {
    let srv = TestServer::spawn().await;
    let jane = srv.login("jane_doe").await;

    // EID03 belongs to john_smith.
    let (foreign_status, foreign) = srv.get("/expenses/me/EID03", &jane).await;
    let (missing_status, missing) = srv.get("/expenses/me/EID99", &jane).await;
    assert_eq!(foreign_status, StatusCode::NOT_FOUND);
    assert_eq!(foreign, missing);
    assert_eq!(missing_status, StatusCode::NOT_FOUND);

    let (status, _) = srv.post("/expenses/submit/EID03", &jane, Value::Null).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn approval_queue_requires_the_approver_flag() {
    let srv = TestServer::spawn().await;
    let jane = srv.login("jane_doe").await;
    let patson = srv.login("patson").await;

    let (status, body) = srv.get("/expenses/approvals/me", &jane).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User is not an approver!");

    let (status, body) = srv.get("/expenses/approvals/me", &patson).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["expense_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["EID02", "EID03", "EID05"]);

    let (status, body) = srv.get("/expenses/approvals/me/EID02", &patson).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");
}

#[tokio::test]
async fn creator_deletes_draft_once() {
    let srv = TestServer::spawn().await;
    let john = srv.login("john_smith").await;

    let res = srv
        .client
        .delete(srv.url("/expenses/delete/EID03"))
        .bearer_auth(&john)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["expense_id"], "EID03");

    let res = srv
        .client
        .delete(srv.url("/expenses/delete/EID03"))
        .bearer_auth(&john)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Accepted expenses are terminal.
    let res = srv
        .client
        .delete(srv.url("/expenses/delete/EID02"))
        .bearer_auth(&john)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
