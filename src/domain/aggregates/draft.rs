//! Order draft: one point-of-sale tab

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use crate::domain::aggregates::line_items::LineItems;
use crate::domain::aggregates::order::{OrderSource, PaymentMethod, SubmissionState};
use crate::domain::aggregates::product::ProductRef;
use crate::domain::value_objects::DraftId;
use crate::{Result, StorefrontError};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CustomerInfo {
    #[validate(custom = "not_blank")]
    pub name: String,
    #[validate(custom = "not_blank")]
    pub phone: String,
    #[validate(email)]
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Existing customer record this order is linked to.
    #[serde(default)]
    pub customer_id: Option<String>,
}

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() { return Err(ValidationError::new("blank")); }
    Ok(())
}

impl CustomerInfo {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self { name: name.into(), phone: phone.into(), ..Self::default() }
    }

    /// Required before any order is submitted.
    pub fn check(&self) -> Result<()> {
        let Err(errors) = self.validate() else { return Ok(()) };
        let mut fields: Vec<&str> = errors.field_errors().into_keys().collect();
        fields.sort_unstable();
        let messages: Vec<&str> = fields.into_iter().map(|field| match field {
            "name" => "Customer name is required",
            "phone" => "Customer phone is required",
            "email" => "Customer email is invalid",
            _ => "Customer details are invalid",
        }).collect();
        Err(StorefrontError::Validation(messages.join("; ")))
    }
}

/// Customer row returned by the customer lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Transient lookup results shown in a draft.
///
/// Generations increase on every search started (or cleared) so a slow
/// response can be recognised as stale.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SearchResults {
    pub products: Vec<ProductRef>,
    pub customers: Vec<CustomerRecord>,
    #[serde(skip)]
    pub(crate) product_generation: u64,
    #[serde(skip)]
    pub(crate) customer_generation: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftDefaults {
    pub payment_method: PaymentMethod,
    pub source: OrderSource,
}

/// Partial update for the active draft. Empty strings clear optional fields.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DraftPatch {
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub customer_id: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub source: Option<OrderSource>,
    pub note: Option<String>,
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderDraft {
    id: DraftId,
    customer: CustomerInfo,
    payment_method: PaymentMethod,
    source: OrderSource,
    note: Option<String>,
    items: LineItems,
    total: Decimal,
    search: SearchResults,
    status: SubmissionState,
    created_at: DateTime<Utc>,
}

impl OrderDraft {
    pub fn new(defaults: DraftDefaults) -> Self {
        Self {
            id: DraftId::generate(), customer: CustomerInfo::default(), payment_method: defaults.payment_method,
            source: defaults.source, note: None, items: LineItems::new(), total: Decimal::ZERO,
            search: SearchResults::default(), status: SubmissionState::Open, created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> DraftId { self.id }
    pub fn customer(&self) -> &CustomerInfo { &self.customer }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn source(&self) -> OrderSource { self.source }
    pub fn note(&self) -> Option<&str> { self.note.as_deref() }
    pub fn items(&self) -> &LineItems { &self.items }
    pub fn total(&self) -> Decimal { self.total }
    pub fn search(&self) -> &SearchResults { &self.search }
    pub fn status(&self) -> SubmissionState { self.status }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    pub fn apply(&mut self, patch: DraftPatch) {
        if let Some(name) = patch.customer_name { self.customer.name = name; }
        if let Some(phone) = patch.phone { self.customer.phone = phone; }
        if let Some(email) = patch.email { self.customer.email = non_blank(email); }
        if let Some(address) = patch.address { self.customer.address = non_blank(address); }
        if let Some(customer_id) = patch.customer_id { self.customer.customer_id = non_blank(customer_id); }
        if let Some(method) = patch.payment_method { self.payment_method = method; }
        if let Some(source) = patch.source { self.source = source; }
        if let Some(note) = patch.note { self.note = non_blank(note); }
    }

    /// Copies a customer search hit into the draft and links its id.
    pub fn link_customer(&mut self, record: &CustomerRecord) {
        self.customer = CustomerInfo {
            name: record.name.clone(), phone: record.phone.clone().unwrap_or_default(), email: record.email.clone(),
            address: record.address.clone(), customer_id: Some(record.id.clone()),
        };
    }

    pub fn validate(&self) -> Result<()> {
        self.customer.check()?;
        if self.items.is_empty() { return Err(StorefrontError::Validation("Order has no items".into())); }
        Ok(())
    }

    /// Line mutations go through here so the cached total stays in step.
    pub(crate) fn edit_items<T>(&mut self, f: impl FnOnce(&mut LineItems) -> T) -> T {
        let out = f(&mut self.items);
        self.total = self.items.total();
        out
    }

    pub(crate) fn search_mut(&mut self) -> &mut SearchResults { &mut self.search }
    pub(crate) fn set_status(&mut self, status: SubmissionState) { self.status = status; }
}
