//! Session and request lifecycle against the live mock registrar.
//!
//! # Design
//! Starts the mock server on a random port, then drives `WebglobeClient`
//! with the real `UreqTransport` over HTTP. Time is controlled through a
//! shared `MockClock`, so refresh and re-login paths run without sleeping.

use std::time::Duration;

use mock_server::{MockConfig, MockRegistrar, FORM_NAME, LOGIN, PASSWORD};
use serde_json::json;
use webglobe_core::{
    ClientConfig, Contact, Credentials, Error, HttpMethod, MockClock, Order, OrderType, Payload,
    ServiceFilter, SessionState, WebglobeClient,
};

/// Serve `registrar` on a random local port; returns the base URL.
fn spawn_server(registrar: MockRegistrar) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with(listener, registrar).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn connect(base_url: &str, clock: &MockClock) -> WebglobeClient {
    WebglobeClient::builder(ClientConfig::new(base_url), Credentials::new(LOGIN, PASSWORD))
        .clock(clock.clone())
        .connect()
        .unwrap()
}

fn paths(registrar: &MockRegistrar) -> Vec<String> {
    registrar.requests_blocking().into_iter().map(|r| r.path).collect()
}

#[test]
fn login_stores_token_form_name_and_balance() {
    let registrar = MockRegistrar::default();
    let base = spawn_server(registrar.clone());
    let client = connect(&base, &MockClock::new());

    assert_eq!(client.session().state(), SessionState::Authenticated);
    assert!(client.session().bearer().is_some());
    assert_eq!(client.session().form_name(), Some(&json!(FORM_NAME)));
    assert_eq!(client.balance().as_deref(), Some("1520.50"));
    assert_eq!(client.return_code(), Some(200));

    let log = registrar.requests_blocking();
    assert_eq!(log[0].method, "POST");
    assert_eq!(log[0].body, Some(json!({"login": LOGIN, "password": PASSWORD})));
    assert!(log[0].authorization.is_none());
}

#[test]
fn wrong_password_surfaces_api_error() {
    let base = spawn_server(MockRegistrar::default());
    let err = WebglobeClient::builder(ClientConfig::new(&base), Credentials::new(LOGIN, "wrong"))
        .connect()
        .unwrap_err();

    match err {
        Error::Api { status, code, message } => {
            assert_eq!(status, 401);
            assert_eq!(code, Some(json!(1001)));
            assert_eq!(message, "Invalid login or password");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[test]
fn get_requests_carry_form_name_and_bearer() {
    let registrar = MockRegistrar::default();
    let base = spawn_server(registrar.clone());
    let mut client = connect(&base, &MockClock::new());

    client.list_of_registrants("cz").unwrap();
    assert_eq!(client.response()["data"]["method"], "GET");
    assert_eq!(
        client.response()["data"]["query"],
        format!("tld=cz&form_name={FORM_NAME}")
    );

    let token = client.session().token().to_string();
    let log = registrar.requests_blocking();
    let last = log.last().unwrap();
    assert_eq!(last.authorization.as_deref(), Some(format!("Bearer {token}").as_str()));
    assert!(last.body.is_none());
}

#[test]
fn contacts_list_keeps_the_existing_query() {
    let registrar = MockRegistrar::default();
    let base = spawn_server(registrar.clone());
    let mut client = connect(&base, &MockClock::new());

    client.contacts_list(3).unwrap();
    let log = registrar.requests_blocking();
    let last = log.last().unwrap();
    assert_eq!(last.path, "/reg/contacts");
    assert_eq!(last.query.as_deref(), Some("page=3&from=&form_name=F-2041"));
}

#[test]
fn expired_token_triggers_a_new_login() {
    let registrar = MockRegistrar::default();
    let base = spawn_server(registrar.clone());
    let clock = MockClock::new();
    let mut client = connect(&base, &clock);
    let first = client.session().token().to_string();

    clock.advance(Duration::from_secs(3601));
    client.my_account().unwrap();

    assert_ne!(client.session().token(), first);
    assert_eq!(paths(&registrar), ["/auth/login", "/auth/login", "/my-account"]);
    assert_eq!(client.response()["data"]["login"], LOGIN);
}

#[test]
fn token_inside_refresh_window_is_refreshed() {
    let registrar = MockRegistrar::default();
    let base = spawn_server(registrar.clone());
    let clock = MockClock::new();
    let mut client = connect(&base, &clock);
    let first = client.session().token().to_string();

    clock.advance(Duration::from_secs(3100));
    client.my_account().unwrap();

    assert_ne!(client.session().token(), first);
    assert_eq!(client.session().state(), SessionState::Authenticated);
    assert_eq!(paths(&registrar), ["/auth/login", "/auth/refresh", "/my-account"]);
    assert_eq!(registrar.issued_tokens_blocking().len(), 2);
}

#[test]
fn failed_refresh_keeps_the_current_token() {
    let registrar = MockRegistrar::new(MockConfig {
        refresh_status: 500,
        ..MockConfig::default()
    });
    let base = spawn_server(registrar.clone());
    let clock = MockClock::new();
    let mut client = connect(&base, &clock);
    let first = client.session().token().to_string();

    clock.advance(Duration::from_secs(3100));
    client.my_account().unwrap();

    assert_eq!(client.session().token(), first);
    assert_eq!(client.return_code(), Some(200));
    assert_eq!(paths(&registrar), ["/auth/login", "/auth/refresh", "/my-account"]);
}

#[test]
fn refresh_recovers_once_the_service_does() {
    let registrar = MockRegistrar::new(MockConfig {
        refresh_status: 503,
        ..MockConfig::default()
    });
    let base = spawn_server(registrar.clone());
    let clock = MockClock::new();
    let mut client = connect(&base, &clock);
    let first = client.session().token().to_string();

    clock.advance(Duration::from_secs(3100));
    client.my_account().unwrap();
    assert_eq!(client.session().token(), first);

    registrar.set_refresh_status_blocking(200);
    client.my_account().unwrap();
    assert_ne!(client.session().token(), first);
}

#[test]
fn api_error_exposes_status_and_code() {
    let base = spawn_server(MockRegistrar::default());
    let mut client = connect(&base, &MockClock::new());

    let err = client.domain_info_by_name("missing.cz").unwrap_err();
    assert!(err.is_api_error());
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "API error (404): Domain not found");
    assert_eq!(client.return_code(), Some(404));
    assert_eq!(client.error_code(), Some(&json!(1261)));

    // The next successful call clears the previous error code.
    client.domain_info_by_name("example.cz").unwrap();
    assert_eq!(client.return_code(), Some(200));
    assert_eq!(client.error_code(), None);
    assert_eq!(client.response()["data"]["name"], "example.cz");
}

#[test]
fn flat_error_body_is_extracted() {
    let base = spawn_server(MockRegistrar::default());
    let mut client = connect(&base, &MockClock::new());

    let err = client
        .dispatch(HttpMethod::Get, "/_test/flat-error", Payload::new())
        .unwrap_err();
    assert_eq!(err.code(), Some(&json!(1222)));
    assert_eq!(err.status(), Some(422));
}

#[test]
fn non_json_body_is_a_decode_error() {
    let base = spawn_server(MockRegistrar::default());
    let mut client = connect(&base, &MockClock::new());

    let err = client
        .dispatch(HttpMethod::Get, "/_test/html", Payload::new())
        .unwrap_err();
    match err {
        Error::Decode { message, body } => {
            assert!(message.contains("content-type text/plain"), "{message}");
            assert_eq!(body, "<html>Bad Gateway</html>");
        }
        other => panic!("expected Decode error, got {other:?}"),
    }
    assert_eq!(client.return_code(), Some(502));
}

#[test]
fn registration_order_is_submitted_as_json() {
    let registrar = MockRegistrar::default();
    let base = spawn_server(registrar.clone());
    let mut client = connect(&base, &MockClock::new());

    let order = Order::from_type(OrderType::Registration)
        .with_domain_name("example.cz")
        .with_id_registrant(17);
    client.order(&order).unwrap();

    assert_eq!(client.response()["data"]["order_id"], 5001);
    let received = &client.response()["data"]["received"];
    assert_eq!(received["currency"], "CZK");
    assert_eq!(received["order"]["items"][0]["name"], "example.cz");
    assert_eq!(received["order"]["default_regdata"]["IDregistrant"], 17);
    assert_eq!(received["form_name"], FORM_NAME);
}

#[test]
fn renew_order_has_no_body_and_is_rejected() {
    let base = spawn_server(MockRegistrar::default());
    let mut client = connect(&base, &MockClock::new());

    let order = Order::new("renew").unwrap();
    let err = client.order(&order).unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert_eq!(client.error_code(), Some(&json!(1301)));
}

#[test]
fn contact_create_strips_the_fragment() {
    let registrar = MockRegistrar::default();
    let base = spawn_server(registrar.clone());
    let mut client = connect(&base, &MockClock::new());

    let contact = Contact::new()
        .with_email("jan@example.cz")
        .with_country("CZ");
    client.contact_create(&contact).unwrap();

    let log = registrar.requests_blocking();
    let last = log.last().unwrap();
    assert_eq!(last.method, "POST");
    assert_eq!(last.path, "/reg/contacts");
    assert_eq!(
        last.body,
        Some(json!({
            "action": "create",
            "contact_data": {"country": "CZ", "email": "jan@example.cz"},
            "form_name": FORM_NAME,
        }))
    );
}

#[test]
fn invoice_payment_is_a_put_with_json_body() {
    let base = spawn_server(MockRegistrar::default());
    let mut client = connect(&base, &MockClock::new());

    client.invoice_pay_by_credit(77).unwrap();
    assert_eq!(client.response()["data"]["method"], "PUT");
    assert_eq!(
        client.response()["data"]["body"],
        json!({"use_credit": true, "form_name": FORM_NAME})
    );
}

#[test]
fn services_list_sends_filter_as_query() {
    let registrar = MockRegistrar::default();
    let base = spawn_server(registrar.clone());
    let mut client = connect(&base, &MockClock::new());

    let filter = ServiceFilter {
        domain: Some("example.cz".to_string()),
        page: Some(4),
        ..ServiceFilter::default()
    };
    client.services_list(&filter).unwrap();

    let log = registrar.requests_blocking();
    assert_eq!(
        log.last().unwrap().query.as_deref(),
        Some("page=1&domain=example.cz&form_name=F-2041")
    );
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let err = WebglobeClient::builder(
        ClientConfig::new("http://127.0.0.1:9"),
        Credentials::new(LOGIN, PASSWORD),
    )
    .connect()
    .unwrap_err();

    assert!(matches!(err, Error::Transport(_) | Error::DeadlineExceeded));
}
