//! Blocking client for the Webglobe registrar REST API.
//!
//! # Overview
//! `WebglobeClient` logs in with an account's credentials, keeps the JWT it
//! receives fresh (refreshing it shortly before expiry and logging in again
//! once it has lapsed), and maps the registrar's operations onto four HTTP
//! verbs. Failures surface as a single `Error` type; the decoded body,
//! status and error code of every exchange stay readable afterwards.
//!
//! # Design
//! - `session` decides what the token needs; `client` performs it.
//! - `http` keeps requests and responses as plain data behind the
//!   `Transport` trait, with a `ureq` implementation by default.
//! - `extract` normalizes the three error envelopes the service uses.
//! - `endpoints` is a declarative table of every operation; `payloads`
//!   builds the two complex request bodies.

pub mod client;
pub mod clock;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod extract;
pub mod http;
pub mod payloads;
pub mod query;
pub mod session;

/// A JSON object sent as a query string or request body.
pub type Payload = serde_json::Map<String, serde_json::Value>;

pub use client::{ClientBuilder, LastExchange, WebglobeClient};
pub use clock::{Clock, MockClock, SystemClock};
pub use config::{ClientConfig, Credentials};
pub use endpoints::{Endpoint, ServiceFilter};
pub use error::{Error, Result};
pub use extract::ErrorDetails;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use payloads::{Contact, Order, OrderType};
pub use session::{Session, SessionState, TokenAction};
