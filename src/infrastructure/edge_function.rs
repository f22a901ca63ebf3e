//! Order placement through a remote HTTP function
//!
//! Used by the shopper storefront where the database procedure is not
//! reachable directly. The function answers `{"orderId": ..}` on success and
//! `{"error": ..}` otherwise.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use crate::domain::aggregates::{CheckoutPayload, OrderSource, PaymentMethod, PlacedOrder};
use crate::ports::OrderPlacement;
use crate::{Result, StorefrontError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProfile {
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// Request body sent to the order function.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteOrderBody {
    pub profile: RemoteProfile,
    pub items: Vec<RemoteItem>,
    pub payment_method: PaymentMethod,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub source: OrderSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
}

impl From<&CheckoutPayload> for RemoteOrderBody {
    fn from(p: &CheckoutPayload) -> Self {
        Self {
            profile: RemoteProfile {
                name: p.customer.name.clone(), phone: p.customer.phone.clone(),
                email: p.customer.email.clone(), address: p.customer.address.clone(),
            },
            items: p.items.iter().map(|i| RemoteItem {
                product_id: i.product_id.to_string(), product_name: i.product_name.clone(), quantity: i.quantity, price: i.unit_price,
            }).collect(),
            payment_method: p.payment_method,
            total: p.total.amount(),
            source: p.source,
            note: p.note.clone(),
            actor_id: p.actor_id.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RemoteError { error: String }

#[derive(Debug, Clone)]
pub struct EdgeFunctionOrders {
    client: reqwest::Client,
    url: String,
    key: Option<String>,
}

impl EdgeFunctionOrders {
    pub fn new(url: impl Into<String>, key: Option<String>) -> Self {
        Self { client: reqwest::Client::new(), url: url.into(), key }
    }
}

#[async_trait]
impl OrderPlacement for EdgeFunctionOrders {
    async fn place_order(&self, payload: &CheckoutPayload) -> Result<PlacedOrder> {
        let mut request = self.client.post(&self.url).json(&RemoteOrderBody::from(payload));
        if let Some(key) = &self.key { request = request.bearer_auth(key); }
        let response = request.send().await.map_err(|e| StorefrontError::Business(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<RemoteError>(&text).map(|e| e.error).unwrap_or_else(|_| format!("Order service returned {status}"));
            warn!(%status, error = %message, "order function rejected order");
            return Err(StorefrontError::Business(message));
        }

        let placed: PlacedOrder = response.json().await.map_err(|e| StorefrontError::Business(e.to_string()))?;
        info!(order_id = %placed.order_id, "order function placed order");
        Ok(placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::LineItems;
    use crate::test_support::{customer, product};

    #[test]
    fn test_body_uses_camel_case_and_floats() {
        let mut items = LineItems::new();
        items.add_or_increment(&product("p1", 50000, 5), 3).unwrap();
        let payload = CheckoutPayload::build(&customer(), &items, PaymentMethod::Cod, OrderSource::Website, None, "VND")
            .unwrap().with_actor("u-1");

        let body = serde_json::to_value(RemoteOrderBody::from(&payload)).unwrap();

        assert_eq!(body, serde_json::json!({
            "profile": { "name": "Nguyen Van A", "phone": "0900000000" },
            "items": [{ "productId": "p1", "productName": "Product p1", "quantity": 3, "price": 50000.0 }],
            "paymentMethod": "cod",
            "total": 150000.0,
            "source": "website",
            "actorId": "u-1",
        }));
    }
}
