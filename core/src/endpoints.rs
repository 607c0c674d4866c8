//! Declarative endpoint table.
//!
//! Every public registrar operation is one `Endpoint` variant that resolves
//! to a verb, a service-relative path and a payload. `WebglobeClient::call`
//! dispatches any of them; the named client methods are thin wrappers.

use serde_json::{json, Map, Value};

use crate::http::HttpMethod;
use crate::payloads::{Contact, Order};
use crate::Payload;

/// Currency used for price lookups.
pub const PRICE_CURRENCY: &str = "CZK";

/// Filter for `GET /services/service`. Empty fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceFilter {
    pub domain: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub package: Option<String>,
}

impl ServiceFilter {
    fn to_payload(&self) -> Payload {
        let domain = self.domain.as_deref().filter(|d| !d.is_empty());
        // A domain lookup is never paginated.
        let page = if domain.is_some() { Some(1) } else { self.page.or(Some(1)) };

        let mut payload = Map::new();
        if let Some(page) = page.filter(|p| *p > 0) {
            payload.insert("page".to_string(), json!(page));
        }
        if let Some(per_page) = self.per_page.filter(|p| *p > 0) {
            payload.insert("per_page".to_string(), json!(per_page));
        }
        if let Some(domain) = domain {
            payload.insert("domain".to_string(), json!(domain));
        }
        if let Some(package) = self.package.as_deref().filter(|p| !p.is_empty()) {
            payload.insert("package".to_string(), json!(package));
        }
        payload
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint<'a> {
    /// Restrictions of the logged-in account.
    MyAccount,
    /// Fast registry availability check.
    CheckDomainDas { domain: &'a str },
    /// Detailed availability and internal status check.
    CheckDomain {
        name: &'a str,
        tld: &'a str,
        with_price: bool,
    },
    ListAllTld,
    /// Whether a registrant handle is free at the .cz / .sk registry.
    CheckAvailableNicId { tld: &'a str, nic_id: &'a str },
    ListOfRegistrants { tld: &'a str },
    ContactCreate(&'a Contact),
    ContactsList { page: u32 },
    ContactDetail { contact_id: u64 },
    ContactCreateInfo { tld: &'a str },
    DomainInfoByName { domain: &'a str },
    DomainContacts { domain_id: u64 },
    /// Live registry lookup; rate limited to 20 requests per minute per IP.
    DomainRegistrationInfo { domain_id: u64 },
    SubmitOrder(&'a Order),
    OrderDetail { order_id: u64 },
    DnsNssetList,
    DnsNssetShow { group_id: u64 },
    NameserversInfo { domain_id: u64 },
    NameserversGroupList { domain_id: u64 },
    NameserversGroupShow { domain_id: u64, group_id: u64 },
    ListAllDomains,
    /// Mail the transfer-out auth code to the domain owner.
    SendAuthCode { domain_id: u64 },
    InvoiceDetail { invoice_id: u64 },
    InvoicePayByCredit { invoice_id: u64 },
    ServicesList(&'a ServiceFilter),
    ServiceUpdate { service_id: u64, payload: &'a Payload },
}

impl Endpoint<'_> {
    pub fn method(&self) -> HttpMethod {
        match self {
            Endpoint::CheckDomainDas { .. }
            | Endpoint::CheckAvailableNicId { .. }
            | Endpoint::ContactCreate(_)
            | Endpoint::SubmitOrder(_)
            | Endpoint::SendAuthCode { .. } => HttpMethod::Post,
            Endpoint::InvoicePayByCredit { .. } | Endpoint::ServiceUpdate { .. } => HttpMethod::Put,
            _ => HttpMethod::Get,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Endpoint::MyAccount => "/my-account".to_string(),
            Endpoint::CheckDomainDas { .. } => "/order/checkDomainDas".to_string(),
            Endpoint::CheckDomain { .. } => "/order/checkDomainName".to_string(),
            Endpoint::ListAllTld => "/order/listTld".to_string(),
            Endpoint::CheckAvailableNicId { .. } => "/reg/contacts/checkAvailableNicId".to_string(),
            Endpoint::ListOfRegistrants { .. } => "/order/listRegistrants".to_string(),
            Endpoint::ContactCreate(_) => "/reg/contacts#create".to_string(),
            Endpoint::ContactsList { page } => format!("/reg/contacts?page={page}&from="),
            Endpoint::ContactDetail { contact_id } => format!("/reg/contacts/{contact_id}"),
            Endpoint::ContactCreateInfo { tld } => format!("/reg/contacts/create?{tld}"),
            Endpoint::DomainInfoByName { domain } => format!("/domains/{domain}"),
            Endpoint::DomainContacts { domain_id } => format!("/domain/{domain_id}/list-contacts"),
            Endpoint::DomainRegistrationInfo { domain_id } => format!("/domain/{domain_id}/reg-info"),
            Endpoint::SubmitOrder(_) => "/order/submit".to_string(),
            Endpoint::OrderDetail { order_id } => format!("/order/detailOrder/{order_id}"),
            Endpoint::DnsNssetList => "/dns-nsset".to_string(),
            Endpoint::DnsNssetShow { group_id } => format!("/dns-nsset/{group_id}"),
            Endpoint::NameserversInfo { domain_id } => format!("/{domain_id}/dns-set"),
            Endpoint::NameserversGroupList { domain_id } => format!("/{domain_id}/dns-group"),
            Endpoint::NameserversGroupShow {
                domain_id,
                group_id,
            } => format!("/{domain_id}/dns-group/{group_id}"),
            Endpoint::ListAllDomains => "/domains?full=true".to_string(),
            Endpoint::SendAuthCode { domain_id } => format!("/{domain_id}/auth-info"),
            Endpoint::InvoiceDetail { invoice_id } | Endpoint::InvoicePayByCredit { invoice_id } => {
                format!("/invoices/{invoice_id}")
            }
            Endpoint::ServicesList(_) => "/services/service".to_string(),
            Endpoint::ServiceUpdate { service_id, .. } => format!("/services/service/{service_id}"),
        }
    }

    pub fn payload(&self) -> Payload {
        let value = match self {
            Endpoint::CheckDomainDas { domain } => json!({"domain": domain}),
            Endpoint::CheckDomain {
                name,
                tld,
                with_price,
            } => json!({
                "domain_name": name,
                "toplevel": tld,
                "with_price": with_price,
                "currency": PRICE_CURRENCY,
            }),
            Endpoint::ListAllTld => json!({
                "apply_discounts": true,
                "with_price": true,
                "currency": PRICE_CURRENCY,
            }),
            Endpoint::CheckAvailableNicId { tld, nic_id } => json!({"tld": tld, "nic_id": nic_id}),
            Endpoint::ListOfRegistrants { tld } => json!({"tld": tld}),
            Endpoint::ContactCreate(contact) => return contact.to_payload(),
            Endpoint::SubmitOrder(order) => return order.to_payload(),
            Endpoint::InvoicePayByCredit { .. } => json!({"use_credit": true}),
            Endpoint::ServicesList(filter) => return filter.to_payload(),
            Endpoint::ServiceUpdate { payload, .. } => return (*payload).clone(),
            _ => return Map::new(),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_follow_the_api_reference() {
        assert_eq!(Endpoint::MyAccount.method(), HttpMethod::Get);
        assert_eq!(Endpoint::CheckDomainDas { domain: "a.cz" }.method(), HttpMethod::Post);
        assert_eq!(Endpoint::SendAuthCode { domain_id: 1 }.method(), HttpMethod::Post);
        assert_eq!(Endpoint::InvoiceDetail { invoice_id: 1 }.method(), HttpMethod::Get);
        assert_eq!(Endpoint::InvoicePayByCredit { invoice_id: 1 }.method(), HttpMethod::Put);
    }

    #[test]
    fn paths_interpolate_identifiers() {
        assert_eq!(
            Endpoint::NameserversGroupShow {
                domain_id: 10,
                group_id: 20
            }
            .path(),
            "/10/dns-group/20"
        );
        assert_eq!(Endpoint::ContactsList { page: 3 }.path(), "/reg/contacts?page=3&from=");
        assert_eq!(Endpoint::ContactCreateInfo { tld: "sk" }.path(), "/reg/contacts/create?sk");
        assert_eq!(Endpoint::DomainInfoByName { domain: "example.cz" }.path(), "/domains/example.cz");
    }

    #[test]
    fn check_domain_payload() {
        let payload = Endpoint::CheckDomain {
            name: "example",
            tld: "cz",
            with_price: false,
        }
        .payload();
        assert_eq!(
            Value::Object(payload),
            json!({"domain_name": "example", "toplevel": "cz", "with_price": false, "currency": "CZK"})
        );
    }

    #[test]
    fn services_filter_drops_empty_fields() {
        let filter = ServiceFilter::default();
        assert_eq!(Value::Object(Endpoint::ServicesList(&filter).payload()), json!({"page": 1}));

        let filter = ServiceFilter {
            page: Some(4),
            per_page: Some(50),
            package: Some(String::new()),
            ..ServiceFilter::default()
        };
        assert_eq!(
            Value::Object(Endpoint::ServicesList(&filter).payload()),
            json!({"page": 4, "per_page": 50})
        );
    }

    #[test]
    fn services_filter_with_domain_forces_first_page() {
        let filter = ServiceFilter {
            domain: Some("example.cz".to_string()),
            page: Some(9),
            ..ServiceFilter::default()
        };
        assert_eq!(
            Value::Object(Endpoint::ServicesList(&filter).payload()),
            json!({"page": 1, "domain": "example.cz"})
        );
    }

    #[test]
    fn builder_payloads_pass_through() {
        let contact = Contact::new().with_email("x@example.cz");
        assert_eq!(Endpoint::ContactCreate(&contact).payload(), contact.to_payload());

        let update = json!({"automated_billing": 0});
        let update = update.as_object().unwrap();
        let endpoint = Endpoint::ServiceUpdate {
            service_id: 5,
            payload: update,
        };
        assert_eq!(endpoint.method(), HttpMethod::Put);
        assert_eq!(&endpoint.payload(), update);
    }
}
