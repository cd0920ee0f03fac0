use std::sync::{Arc, Mutex};
use std::time::Duration;

use opalview_api_client::ApiClient;
use opalview_core::testing;
use opalview_core::Credentials;
use opalview_session::login::{
    DELEGATED_LOGIN_FAILED, LOGIN_FAILED, LOGIN_NEEDED, NOT_LOGGED_IN,
};
use opalview_session::{
    CredentialSlot, LoginOptions, LoginSession, MemorySlot, SessionEvent, SessionPhase,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    session: LoginSession,
    slot: Arc<MemorySlot>,
    opened: Arc<Mutex<Vec<String>>>,
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

fn harness(server: &MockServer, creds: Credentials) -> Harness {
    let slot = Arc::new(MemorySlot::default());
    let opened = Arc::new(Mutex::new(Vec::new()));
    let events = Arc::new(Mutex::new(Vec::new()));

    let api = ApiClient::new(Duration::from_secs(5))
        .unwrap()
        .with_endpoint_override(&server.uri());
    let sink = opened.clone();
    let session = LoginSession::new(
        api,
        slot.clone(),
        move |url: &str| sink.lock().unwrap().push(url.to_string()),
        LoginOptions {
            poll_interval: Duration::from_millis(10),
            ..LoginOptions::default()
        },
        creds,
    );
    let sink = events.clone();
    session.subscribe(move |e| sink.lock().unwrap().push(e.clone()));

    Harness {
        session,
        slot,
        opened,
        events,
    }
}

fn stored(slot: &MemorySlot) -> Credentials {
    Credentials::restore(&slot.load().expect("slot written"))
}

fn phases(events: &[SessionEvent]) -> Vec<SessionPhase> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::PhaseChanged { phase, .. } => Some(*phase),
            SessionEvent::CredentialsChanged(_) => None,
        })
        .collect()
}

async fn mount_user(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/meta"))
        .and(header("authorization", format!("Bearer 101 {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"currentUser": {"id": "2001", "name": "Ada Analyst"}}
        })))
        .mount(server)
        .await;
}

async fn mount_rejecting_meta(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/meta"))
        .respond_with(ResponseTemplate::new(401))
        .with_priority(10)
        .mount(server)
        .await;
}

async fn mount_delegated_start(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/login/delegated"))
        .and(body_partial_json(json!({
            "userEmail": "analyst@example.com",
            "integration": "observe-tool-abdaf0",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "url": "https://101.observe.test/approve/xyz",
            "serverToken": "srv-1",
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn empty_record_needs_login() {
    let server = MockServer::start().await;
    let h = harness(&server, Credentials::default());

    assert_eq!(h.session.bootstrap().await, SessionPhase::Unconfigured);
    assert_eq!(h.session.error().as_deref(), Some(LOGIN_NEEDED));
    assert_eq!(stored(&h.slot), Credentials::default());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn valid_token_authenticates_directly() {
    let server = MockServer::start().await;
    mount_user(&server, "good").await;
    let h = harness(&server, testing::credentials_with_token("good"));

    assert_eq!(h.session.bootstrap().await, SessionPhase::Authenticated);
    assert_eq!(h.session.error(), None);

    let creds = h.session.credentials();
    assert!(creds.is_authenticated());
    assert_eq!(creds.user, Some(testing::user()));
    assert_eq!(stored(&h.slot), creds);
    assert!(h.opened.lock().unwrap().is_empty());
    assert_eq!(
        phases(&h.events.lock().unwrap()),
        [SessionPhase::Pending, SessionPhase::Authenticated]
    );
}

#[tokio::test]
async fn verify_accepts_a_valid_token() {
    let server = MockServer::start().await;
    mount_user(&server, "good").await;
    let h = harness(&server, testing::credentials_with_token("good"));

    assert_eq!(h.session.verify().await, SessionPhase::Authenticated);
    assert_eq!(h.session.credentials().user, Some(testing::user()));
}

#[tokio::test]
async fn verify_never_starts_a_delegated_login() {
    let server = MockServer::start().await;
    mount_rejecting_meta(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/login/delegated"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    let h = harness(&server, testing::credentials_with_token("stale"));

    assert_eq!(h.session.verify().await, SessionPhase::Unconfigured);
    assert_eq!(h.session.error().as_deref(), Some(NOT_LOGGED_IN));
    assert_eq!(h.session.credentials().token, "stale");
    assert!(h.opened.lock().unwrap().is_empty());

    let h = harness(&server, testing::credentials());
    assert_eq!(h.session.verify().await, SessionPhase::Unconfigured);
    assert_eq!(h.session.error().as_deref(), Some(NOT_LOGGED_IN));

    let h = harness(&server, Credentials::default());
    assert_eq!(h.session.verify().await, SessionPhase::Unconfigured);
    assert_eq!(h.session.error().as_deref(), Some(LOGIN_NEEDED));
}

#[tokio::test]
async fn invalid_token_starts_delegated_login() {
    let server = MockServer::start().await;
    mount_rejecting_meta(&server).await;
    mount_delegated_start(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/login/delegated/srv-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"settled": false})))
        .mount(&server)
        .await;
    let h = harness(&server, testing::credentials_with_token("stale"));

    let res = tokio::time::timeout(Duration::from_millis(200), h.session.bootstrap()).await;
    assert!(res.is_err(), "polling should still be running");

    assert_eq!(h.session.phase(), SessionPhase::Pending);
    assert!(h.session.credentials().token.is_empty());
    assert!(stored(&h.slot).token.is_empty());
    assert_eq!(
        *h.opened.lock().unwrap(),
        ["https://101.observe.test/approve/xyz"]
    );
}

#[tokio::test]
async fn accepted_delegated_login_reaches_authenticated() {
    let server = MockServer::start().await;
    mount_delegated_start(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/login/delegated/srv-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"settled": false})))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/login/delegated/srv-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"settled": true, "accessKey": "k"})),
        )
        .mount(&server)
        .await;
    mount_user(&server, "k").await;
    let h = harness(&server, testing::credentials());

    assert_eq!(h.session.bootstrap().await, SessionPhase::Authenticated);

    let creds = h.session.credentials();
    assert_eq!(creds.token, "k");
    assert!(creds.is_authenticated());
    assert_eq!(stored(&h.slot).token, "k");
    assert_eq!(h.opened.lock().unwrap().len(), 1);

    let polls = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/v1/login/delegated/srv-1")
        .count();
    assert_eq!(polls, 3);
}

#[tokio::test]
async fn rejected_delegated_login_reports_server_message() {
    let server = MockServer::start().await;
    mount_delegated_start(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/login/delegated/srv-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"settled": true, "message": "Request was denied"})),
        )
        .mount(&server)
        .await;
    let h = harness(&server, testing::credentials());

    assert_eq!(h.session.bootstrap().await, SessionPhase::Unconfigured);
    assert_eq!(h.session.error().as_deref(), Some("Request was denied"));
}

#[tokio::test]
async fn expired_delegated_login_without_message() {
    let server = MockServer::start().await;
    mount_delegated_start(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/login/delegated/srv-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"settled": true})))
        .mount(&server)
        .await;
    let h = harness(&server, testing::credentials());

    assert_eq!(h.session.bootstrap().await, SessionPhase::Unconfigured);
    assert_eq!(h.session.error().as_deref(), Some(LOGIN_FAILED));
}

#[tokio::test]
async fn handshake_without_url_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/login/delegated"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": false, "message": "Unknown email"})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/login/delegated"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": false})))
        .mount(&server)
        .await;
    let h = harness(&server, testing::credentials());

    assert_eq!(h.session.bootstrap().await, SessionPhase::Unconfigured);
    assert_eq!(h.session.error().as_deref(), Some("Unknown email"));

    assert_eq!(h.session.bootstrap().await, SessionPhase::Unconfigured);
    assert_eq!(h.session.error().as_deref(), Some(DELEGATED_LOGIN_FAILED));
    assert!(h.opened.lock().unwrap().is_empty());
}

#[tokio::test]
async fn handshake_without_server_token_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/login/delegated"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true, "url": "https://101.observe.test/approve/xyz"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "not found"})))
        .expect(0)
        .mount(&server)
        .await;
    let h = harness(&server, testing::credentials());

    let phase = tokio::time::timeout(Duration::from_secs(2), h.session.bootstrap())
        .await
        .expect("bootstrap settles without polling");
    assert_eq!(phase, SessionPhase::Unconfigured);
    assert_eq!(h.session.error().as_deref(), Some(DELEGATED_LOGIN_FAILED));
    assert!(h.opened.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_poll_response_is_surfaced() {
    let server = MockServer::start().await;
    mount_delegated_start(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/login/delegated/srv-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;
    let h = harness(&server, testing::credentials());

    assert_eq!(h.session.bootstrap().await, SessionPhase::Unconfigured);
    let error = h.session.error().unwrap();
    assert!(error.contains("Malformed response"), "{error}");
}

#[tokio::test]
async fn logout_after_login() {
    let server = MockServer::start().await;
    mount_user(&server, "good").await;
    let h = harness(&server, testing::credentials_with_token("good"));
    h.session.bootstrap().await;

    h.session.logout().unwrap();
    assert_eq!(h.session.phase(), SessionPhase::Unconfigured);
    assert_eq!(h.session.error().as_deref(), Some("Logged Out"));
    let creds = stored(&h.slot);
    assert!(!creds.is_addressable());
    assert!(!creds.is_authenticated());
}

#[tokio::test]
async fn restore_reads_the_slot() {
    let server = MockServer::start().await;
    let api = ApiClient::new(Duration::from_secs(5))
        .unwrap()
        .with_endpoint_override(&server.uri());
    let slot = MemorySlot::new(Some(
        r#"{"customer":"101","site":"observe.test","email":"analyst@example.com","token":"t"}"#
            .to_string(),
    ));
    let session = LoginSession::restore(api.clone(), slot, |_: &str| {}, LoginOptions::default());
    assert!(session.credentials().has_token());

    let garbage = MemorySlot::new(Some("{{{".to_string()));
    let session = LoginSession::restore(api, garbage, |_: &str| {}, LoginOptions::default());
    assert_eq!(session.credentials(), Credentials::default());
}
