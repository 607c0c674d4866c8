//! Registration contact payload for `POST /reg/contacts`.
//!
//! Serializes as `{"action": .., "contact_data": {..}}` where
//! `contact_data` holds only the fields that were set to a non-empty value.
//! Fields left unset fall back to the registrar's defaults (contact type
//! `REGISTRANT`, legal form `FO`).

use serde_json::{Map, Value};

use crate::Payload;

pub const DEFAULT_ACTION: &str = "create";

/// Legal form of the contact holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegalForm {
    /// Natural person ("FO").
    NaturalPerson,
    /// Limited liability company ("SRO").
    LimitedCompany,
    /// Joint stock company ("AS").
    JointStock,
}

impl LegalForm {
    pub fn as_str(self) -> &'static str {
        match self {
            LegalForm::NaturalPerson => "FO",
            LegalForm::LimitedCompany => "SRO",
            LegalForm::JointStock => "AS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Contact {
    action: Option<String>,
    single_tld: Option<String>,
    contact_type: Option<String>,
    legal_form: Option<String>,
    street: Option<String>,
    town: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    contact_name: Option<String>,
    lang: Option<String>,
    disclose: Vec<Value>,
    company_id: Option<String>,
    tax_id: Option<String>,
    vat_id: Option<String>,
    statutory_representative: Option<String>,
    company: Option<String>,
}

macro_rules! string_setters {
    ($($(#[$doc:meta])* $setter:ident => $field:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $setter(mut self, value: impl Into<String>) -> Self {
                self.$field = Some(value.into());
                self
            }
        )*
    };
}

impl Contact {
    pub fn new() -> Self {
        Self::default()
    }

    string_setters! {
        /// Defaults to `create`.
        with_action => action;
        with_single_tld => single_tld;
        /// `REGISTRANT`, or `ADMIN` (EU only).
        with_type => contact_type;
        with_street => street;
        with_town => town;
        with_postcode => postcode;
        /// ISO 3166-1 alpha-2 country code.
        with_country => country;
        with_email => email;
        /// EPP style, e.g. `+420.193729382`.
        with_phone => phone;
        with_contact_name => contact_name;
        /// ISO 639-1 language code.
        with_lang => lang;
        /// Required unless the holder is a natural person.
        with_company_id => company_id;
        with_tax_id => tax_id;
        with_vat_id => vat_id;
        /// Person representing an organization.
        with_statutory_representative => statutory_representative;
        /// Required unless the holder is a natural person.
        with_company => company;
    }

    pub fn with_legal_form(mut self, form: LegalForm) -> Self {
        self.legal_form = Some(form.as_str().to_string());
        self
    }

    /// Disclosure flags passed through to the registry unchanged.
    pub fn with_disclose(mut self, disclose: Vec<Value>) -> Self {
        self.disclose = disclose;
        self
    }

    pub fn action(&self) -> &str {
        self.action.as_deref().unwrap_or(DEFAULT_ACTION)
    }

    pub fn to_payload(&self) -> Payload {
        let mut data = Map::new();
        let strings = [
            ("single_tld", &self.single_tld),
            ("type", &self.contact_type),
            ("legal_form", &self.legal_form),
            ("street", &self.street),
            ("town", &self.town),
            ("postcode", &self.postcode),
            ("country", &self.country),
            ("email", &self.email),
            ("phone", &self.phone),
            ("contact_name", &self.contact_name),
            ("lang", &self.lang),
        ];
        for (key, value) in strings {
            insert_non_empty(&mut data, key, value);
        }
        if !self.disclose.is_empty() {
            data.insert("disclose".to_string(), Value::Array(self.disclose.clone()));
        }
        let company = [
            ("company_id", &self.company_id),
            ("tax_id", &self.tax_id),
            ("vat_id", &self.vat_id),
            ("statutory_representative", &self.statutory_representative),
            ("company", &self.company),
        ];
        for (key, value) in company {
            insert_non_empty(&mut data, key, value);
        }

        let mut payload = Map::new();
        payload.insert("action".to_string(), Value::String(self.action().to_string()));
        payload.insert("contact_data".to_string(), Value::Object(data));
        payload
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.to_payload()).to_string()
    }
}

fn insert_non_empty(map: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
        map.insert(key.to_string(), Value::String(v.to_string()));
    }
}
