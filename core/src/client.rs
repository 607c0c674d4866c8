//! Request pipeline and session orchestration for the registrar API.
//!
//! # Design
//! `WebglobeClient` owns one `Session`, one `Transport` and the result of
//! the most recent exchange. Every operation is command-style: it returns
//! `Ok(())` or an error, and the decoded body, HTTP status and extracted
//! error code are read back through accessors. All operations take
//! `&mut self`, so a client is driven from one call site at a time; share
//! it across threads only behind your own lock.
//!
//! A dispatch runs in three steps: settle the token (`ensure_valid_token`,
//! which may log in again or refresh), build an `HttpRequest` with
//! `build_request`, and interpret the `HttpResponse` in `record`. Login and
//! refresh go through the same `dispatch`; the session's in-progress state
//! turns their own token check into a no-op.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::clock::{Clock, SystemClock};
use crate::config::{ClientConfig, Credentials};
use crate::endpoints::{Endpoint, ServiceFilter};
use crate::error::{Error, Result};
use crate::extract::ErrorDetails;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::payloads::{Contact, Order};
use crate::query;
use crate::session::{Session, SessionState, TokenAction};
use crate::Payload;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Outcome of the most recent exchange.
///
/// Cleared before each exchange, so it never shows a previous call's data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LastExchange {
    /// `None` when no response was received.
    pub status: Option<u16>,
    /// Extracted only for status >= 400.
    pub error_code: Option<Value>,
    /// `Null` until a body has been decoded.
    pub body: Value,
}

impl LastExchange {
    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Wires configuration, credentials, transport and clock into a client.
pub struct ClientBuilder {
    config: ClientConfig,
    credentials: Credentials,
    transport: Option<Box<dyn Transport>>,
    clock: Option<Arc<dyn Clock>>,
}

impl ClientBuilder {
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Build the client without logging in. The first request will.
    pub fn build(self) -> WebglobeClient {
        let transport = self
            .transport
            .unwrap_or_else(|| Box::new(UreqTransport::new(&self.config)));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let session = Session::new(self.credentials, clock, self.config.refresh_window);
        WebglobeClient {
            config: self.config,
            transport,
            session,
            last: LastExchange::default(),
        }
    }

    /// Build the client and log in.
    ///
    /// # Errors
    /// Any dispatch error from the login exchange, or
    /// `Error::UnexpectedResponse` if the login body lacks a token.
    pub fn connect(self) -> Result<WebglobeClient> {
        let mut client = self.build();
        client.authenticate()?;
        Ok(client)
    }
}

/// Blocking client for the Webglobe registrar REST API.
pub struct WebglobeClient {
    config: ClientConfig,
    transport: Box<dyn Transport>,
    session: Session,
    last: LastExchange,
}

impl WebglobeClient {
    /// Connect to `api_url` and log in with `login` / `password`.
    pub fn new(api_url: &str, login: &str, password: &str) -> Result<Self> {
        Self::builder(ClientConfig::new(api_url), Credentials::new(login, password)).connect()
    }

    /// Connect using `WEBGLOBE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::builder(ClientConfig::from_env()?, Credentials::from_env()?).connect()
    }

    pub fn builder(config: ClientConfig, credentials: Credentials) -> ClientBuilder {
        ClientBuilder {
            config,
            credentials,
            transport: None,
            clock: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn last_exchange(&self) -> &LastExchange {
        &self.last
    }

    /// Decoded body of the last exchange.
    pub fn response(&self) -> &Value {
        &self.last.body
    }

    /// HTTP status of the last exchange.
    pub fn return_code(&self) -> Option<u16> {
        self.last.status
    }

    /// Error code of the last exchange, when its status was >= 400.
    pub fn error_code(&self) -> Option<&Value> {
        self.last.error_code.as_ref()
    }

    /// Account balance as reported at login (no request is made).
    pub fn balance(&self) -> Option<String> {
        self.session.balance()
    }

    /// Log in with the stored credentials, replacing the current token.
    ///
    /// On failure the session keeps whatever token it held before.
    #[instrument(skip(self), fields(login = %self.session.credentials().login()))]
    pub fn authenticate(&mut self) -> Result<()> {
        let previous = self.session.begin(SessionState::Authenticating);
        let payload = self.session.credentials().to_payload();

        let outcome = self
            .dispatch(HttpMethod::Post, LOGIN_PATH, payload)
            .and_then(|()| self.session.complete_login(&self.last.body));

        match outcome {
            Ok(()) => {
                info!("authenticated");
                Ok(())
            }
            Err(err) => {
                self.session.abort(previous);
                Err(err)
            }
        }
    }

    /// Bring the token up to date before a request.
    ///
    /// Logs in again once the token has expired and refreshes it inside
    /// the refresh window. Does nothing while a login or refresh is
    /// already running.
    pub fn ensure_valid_token(&mut self) -> Result<()> {
        match self.session.token_action() {
            TokenAction::Skip | TokenAction::Fresh => Ok(()),
            TokenAction::Reauthenticate => {
                debug!("token expired, logging in again");
                self.authenticate()
            }
            TokenAction::Refresh => {
                self.refresh();
                Ok(())
            }
        }
    }

    /// Swap the token for a fresh one. Failures keep the current token,
    /// which stays usable until it expires and forces a new login.
    fn refresh(&mut self) {
        let previous = self.session.begin(SessionState::Refreshing);
        let outcome = self.dispatch(HttpMethod::Get, REFRESH_PATH, Payload::new());

        let applied = match outcome {
            Ok(()) if self.last.status == Some(200) => self.session.complete_refresh(&self.last.body),
            Ok(()) => Err(Error::UnexpectedResponse(format!(
                "refresh returned status {:?}",
                self.last.status
            ))),
            Err(err) => Err(err),
        };

        match applied {
            Ok(()) => debug!("token refreshed"),
            Err(err) => {
                warn!(error = %err, "token refresh failed, keeping current token");
                self.session.abort(previous);
            }
        }
    }

    /// Send `payload` to `path` with `method`.
    ///
    /// GET payloads become the query string; other verbs send them as a
    /// JSON body (`{}` when empty). The outcome is available through
    /// `response`, `return_code` and `error_code` afterwards.
    ///
    /// # Errors
    /// - `Error::Transport` / `Error::DeadlineExceeded` if no response arrived
    /// - `Error::Decode` if the body is not JSON
    /// - `Error::Api` for status >= 400
    #[instrument(skip(self, payload), fields(method = %method, path = %path))]
    pub fn dispatch(&mut self, method: HttpMethod, path: &str, payload: Payload) -> Result<()> {
        self.last.clear();
        self.ensure_valid_token()?;

        let request = self.build_request(method, path, payload)?;
        // A login or refresh above may have recorded its own result.
        self.last.clear();
        let response = self.transport.execute(&request)?;
        self.record(response)
    }

    /// Dispatch a declared endpoint.
    pub fn call(&mut self, endpoint: Endpoint<'_>) -> Result<()> {
        self.dispatch(endpoint.method(), &endpoint.path(), endpoint.payload())
    }

    /// Build the request `dispatch` would send, without sending it.
    pub fn build_request(&self, method: HttpMethod, path: &str, mut payload: Payload) -> Result<HttpRequest> {
        if let Some(form_name) = self.session.form_name() {
            payload.insert("form_name".to_string(), form_name.clone());
        }

        let mut url = Url::parse(&format!("{}{}", self.config.base_url, path))
            .map_err(|e| Error::Config(format!("invalid request URL for {path}: {e}")))?;
        // Fragments are part of some documented paths but never sent.
        url.set_fragment(None);

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(bearer) = self.session.bearer() {
            headers.push(("Authorization".to_string(), bearer));
        }

        let body = if method.has_body() {
            let json = Value::Object(payload).to_string();
            headers.push(("Content-Length".to_string(), json.len().to_string()));
            Some(json)
        } else {
            query::append_query(&mut url, &payload);
            None
        };

        Ok(HttpRequest {
            method,
            url: url.into(),
            headers,
            body,
        })
    }

    /// Store the response as the last exchange and classify it.
    fn record(&mut self, response: HttpResponse) -> Result<()> {
        self.last.status = Some(response.status);

        let body: Value = serde_json::from_str(&response.body).map_err(|e| Error::Decode {
            message: match response.header("content-type") {
                Some(content_type) => format!("{e} (content-type {content_type})"),
                None => e.to_string(),
            },
            body: response.body.clone(),
        })?;
        self.last.body = body;

        if response.status >= 400 {
            let details = ErrorDetails::from_body(&self.last.body);
            self.last.error_code = details.code.clone();
            debug!(status = response.status, message = %details.message, "API error");
            return Err(Error::Api {
                status: response.status,
                code: details.code,
                message: details.message,
            });
        }

        debug!(status = response.status, "exchange complete");
        Ok(())
    }

    pub fn my_account(&mut self) -> Result<()> {
        self.call(Endpoint::MyAccount)
    }

    pub fn check_domain_das(&mut self, domain: &str) -> Result<()> {
        self.call(Endpoint::CheckDomainDas { domain })
    }

    pub fn check_domain(&mut self, name: &str, tld: &str, with_price: bool) -> Result<()> {
        self.call(Endpoint::CheckDomain {
            name,
            tld,
            with_price,
        })
    }

    pub fn list_all_tld(&mut self) -> Result<()> {
        self.call(Endpoint::ListAllTld)
    }

    /// Registry errors 1221-1224 flag a malformed handle, 1234 a failed
    /// registry lookup.
    pub fn check_available_nic_id(&mut self, tld: &str, nic_id: &str) -> Result<()> {
        self.call(Endpoint::CheckAvailableNicId { tld, nic_id })
    }

    pub fn list_of_registrants(&mut self, tld: &str) -> Result<()> {
        self.call(Endpoint::ListOfRegistrants { tld })
    }

    pub fn contact_create(&mut self, contact: &Contact) -> Result<()> {
        self.call(Endpoint::ContactCreate(contact))
    }

    pub fn contacts_list(&mut self, page: u32) -> Result<()> {
        self.call(Endpoint::ContactsList { page })
    }

    pub fn contact_detail_by_id(&mut self, contact_id: u64) -> Result<()> {
        self.call(Endpoint::ContactDetail { contact_id })
    }

    pub fn contact_create_info(&mut self, tld: &str) -> Result<()> {
        self.call(Endpoint::ContactCreateInfo { tld })
    }

    pub fn domain_info_by_name(&mut self, domain: &str) -> Result<()> {
        self.call(Endpoint::DomainInfoByName { domain })
    }

    pub fn domain_contacts(&mut self, domain_id: u64) -> Result<()> {
        self.call(Endpoint::DomainContacts { domain_id })
    }

    pub fn domain_registration_info(&mut self, domain_id: u64) -> Result<()> {
        self.call(Endpoint::DomainRegistrationInfo { domain_id })
    }

    pub fn order(&mut self, order: &Order) -> Result<()> {
        self.call(Endpoint::SubmitOrder(order))
    }

    pub fn detail_order_by_id(&mut self, order_id: u64) -> Result<()> {
        self.call(Endpoint::OrderDetail { order_id })
    }

    pub fn dns_nsset_list(&mut self) -> Result<()> {
        self.call(Endpoint::DnsNssetList)
    }

    pub fn dns_nsset_show_by_id(&mut self, group_id: u64) -> Result<()> {
        self.call(Endpoint::DnsNssetShow { group_id })
    }

    pub fn nameservers_info(&mut self, domain_id: u64) -> Result<()> {
        self.call(Endpoint::NameserversInfo { domain_id })
    }

    pub fn nameservers_group_list(&mut self, domain_id: u64) -> Result<()> {
        self.call(Endpoint::NameserversGroupList { domain_id })
    }

    pub fn nameservers_group_show(&mut self, domain_id: u64, group_id: u64) -> Result<()> {
        self.call(Endpoint::NameserversGroupShow {
            domain_id,
            group_id,
        })
    }

    pub fn list_all_domains(&mut self) -> Result<()> {
        self.call(Endpoint::ListAllDomains)
    }

    pub fn send_auth_code(&mut self, domain_id: u64) -> Result<()> {
        self.call(Endpoint::SendAuthCode { domain_id })
    }

    pub fn invoice_detail_by_id(&mut self, invoice_id: u64) -> Result<()> {
        self.call(Endpoint::InvoiceDetail { invoice_id })
    }

    pub fn invoice_pay_by_credit(&mut self, invoice_id: u64) -> Result<()> {
        self.call(Endpoint::InvoicePayByCredit { invoice_id })
    }

    pub fn services_list(&mut self, filter: &ServiceFilter) -> Result<()> {
        self.call(Endpoint::ServicesList(filter))
    }

    /// e.g. `{"automated_billing": 0}`
    pub fn service_update_by_id(&mut self, service_id: u64, payload: &Payload) -> Result<()> {
        self.call(Endpoint::ServiceUpdate {
            service_id,
            payload,
        })
    }
}

impl std::fmt::Debug for WebglobeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebglobeClient")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}
