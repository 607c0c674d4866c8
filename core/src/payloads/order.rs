//! Domain order payload for `POST /order/submit`.
//!
//! Only `registration` orders have a known body layout. The other order
//! types are accepted at construction but serialize to an empty object;
//! their schema is not guessed here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::Error;
use crate::Payload;

pub const ORDER_CURRENCY: &str = "CZK";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Registration,
    Transfer,
    Server,
    Extra,
    Renew,
}

impl OrderType {
    pub const ALL: [OrderType; 5] = [
        OrderType::Registration,
        OrderType::Transfer,
        OrderType::Server,
        OrderType::Extra,
        OrderType::Renew,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderType::Registration => "registration",
            OrderType::Transfer => "transfer",
            OrderType::Server => "server",
            OrderType::Extra => "extra",
            OrderType::Renew => "renew",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::Config(format!("unknown order type {s:?}")))
    }
}

/// How the order is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentType {
    /// From prepaid account credit.
    Credit,
    /// By bank transfer.
    Transaction,
}

impl PaymentType {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentType::Credit => "credit",
            PaymentType::Transaction => "transaction",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    order_type: OrderType,
    payment_type: PaymentType,
    domain_name: String,
    /// Months.
    period: u32,
    pack: String,
    dns_type: String,
    nsset_id: Option<Value>,
    group_id: Option<Value>,
    id_registrant: Option<Value>,
    id_registrant_admin: Option<Value>,
}

impl Order {
    /// # Errors
    /// `Error::Config` if `order_type` is not one of `registration`,
    /// `transfer`, `server`, `extra`, `renew`.
    pub fn new(order_type: &str) -> Result<Self, Error> {
        Ok(Self::from_type(order_type.parse()?))
    }

    pub fn from_type(order_type: OrderType) -> Self {
        Self {
            order_type,
            payment_type: PaymentType::Credit,
            domain_name: String::new(),
            period: 12,
            pack: "registration".to_string(),
            dns_type: "G".to_string(),
            nsset_id: None,
            group_id: None,
            id_registrant: None,
            id_registrant_admin: None,
        }
    }

    pub fn with_payment_type(mut self, payment_type: PaymentType) -> Self {
        self.payment_type = payment_type;
        self
    }

    /// Fully qualified domain name.
    pub fn with_domain_name(mut self, domain: impl Into<String>) -> Self {
        self.domain_name = domain.into();
        self
    }

    pub fn with_period(mut self, months: u32) -> Self {
        self.period = months;
        self
    }

    pub fn with_pack(mut self, pack: impl Into<String>) -> Self {
        self.pack = pack.into();
        self
    }

    /// Value of `default_dnsdata.type`. Registrations always send `G`
    /// (DNS group) unless this is called; anything else is passed through
    /// unchecked for the registrar to accept or reject.
    pub fn with_dns_type(mut self, dns_type: impl Into<String>) -> Self {
        self.dns_type = dns_type.into();
        self
    }

    /// NSSET handle (`NSSET:...`), .cz domains only.
    pub fn with_nsset_id(mut self, nsset_id: impl Into<Value>) -> Self {
        self.nsset_id = Some(nsset_id.into());
        self
    }

    pub fn with_group_id(mut self, group_id: impl Into<Value>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Registrar-side id of the domain holder contact.
    pub fn with_id_registrant(mut self, id: impl Into<Value>) -> Self {
        self.id_registrant = Some(id.into());
        self
    }

    /// Registrar-side id of the admin contact.
    pub fn with_id_registrant_admin(mut self, id: impl Into<Value>) -> Self {
        self.id_registrant_admin = Some(id.into());
        self
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn payment_type(&self) -> PaymentType {
        self.payment_type
    }

    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn pack(&self) -> &str {
        &self.pack
    }

    pub fn dns_type(&self) -> &str {
        &self.dns_type
    }

    pub fn nsset_id(&self) -> Option<&Value> {
        self.nsset_id.as_ref()
    }

    pub fn group_id(&self) -> Option<&Value> {
        self.group_id.as_ref()
    }

    pub fn id_registrant(&self) -> Option<&Value> {
        self.id_registrant.as_ref()
    }

    pub fn id_registrant_admin(&self) -> Option<&Value> {
        self.id_registrant_admin.as_ref()
    }

    pub fn to_payload(&self) -> Payload {
        match self.order_type {
            OrderType::Registration => self.registration_payload(),
            // TODO: add a renew body once the service documents its item layout.
            _ => Map::new(),
        }
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.to_payload()).to_string()
    }

    fn registration_payload(&self) -> Payload {
        let body = json!({
            "currency": ORDER_CURRENCY,
            "order": {
                "payment_type": self.payment_type.as_str(),
                "items": [{
                    "name": self.domain_name,
                    "pack": self.pack,
                    "period": self.period,
                    "type": self.order_type.as_str(),
                }],
                "default_regdata": {
                    "IDregistrant": self.id_registrant,
                    "type": "REGISTRANT",
                },
                "default_regcontacts": [{
                    "IDregistrant": self.id_registrant_admin,
                    "type": "ADMIN",
                }],
                "default_dnsdata": {
                    "type": self.dns_type,
                    "nsset_id": self.nsset_id,
                    "group_id": self.group_id,
                },
            },
        });
        match body {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}
