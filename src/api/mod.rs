//! HTTP host for one device session
//!
//! Every mutation goes through the session mutex. Lookups and order
//! placement release it while the external call is in flight.

mod cart;
mod drafts;

use std::sync::Arc;
use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use tokio::sync::Mutex;
use crate::domain::aggregates::QuantityChange;
use crate::ports::{CatalogLookup, CustomerLookup};
use crate::services::{CheckoutPipeline, PosSession};
use crate::StorefrontError;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<PosSession>>,
    pub catalog: Arc<dyn CatalogLookup>,
    pub customers: Arc<dyn CustomerLookup>,
    pub cart_checkout: Arc<CheckoutPipeline>,
    pub pos_checkout: Arc<CheckoutPipeline>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "opensase-storefront"})) }))
        .route("/api/v1/cart", get(cart::show).delete(cart::clear))
        .route("/api/v1/cart/items", post(cart::add))
        .route("/api/v1/cart/items/:product_id", put(cart::set_quantity).delete(cart::remove))
        .route("/api/v1/cart/items/:product_id/increment", post(cart::increment))
        .route("/api/v1/cart/items/:product_id/decrement", post(cart::decrement))
        .route("/api/v1/cart/selection", post(cart::select_all).delete(cart::deselect_all))
        .route("/api/v1/cart/selection/:product_id", post(cart::select).delete(cart::deselect))
        .route("/api/v1/cart/checkout", post(cart::checkout))
        .route("/api/v1/drafts", get(drafts::list).post(drafts::create))
        .route("/api/v1/drafts/:id", delete(drafts::close))
        .route("/api/v1/drafts/:id/activate", post(drafts::activate))
        .route("/api/v1/drafts/active", get(drafts::show_active).patch(drafts::update_active))
        .route("/api/v1/drafts/active/items", post(drafts::add_product))
        .route("/api/v1/drafts/active/items/:line_id", put(drafts::set_quantity).delete(drafts::remove_line))
        .route("/api/v1/drafts/active/products/:product_id", post(drafts::add_search_result))
        .route("/api/v1/drafts/active/products/:product_id/increment", post(drafts::increment))
        .route("/api/v1/drafts/active/products/:product_id/decrement", post(drafts::decrement))
        .route("/api/v1/drafts/active/search/products", get(drafts::search_products))
        .route("/api/v1/drafts/active/search/customers", get(drafts::search_customers))
        .route("/api/v1/drafts/active/customer/:customer_id", post(drafts::select_customer))
        .route("/api/v1/drafts/active/checkout", post(drafts::checkout))
        .with_state(state)
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Serialize)]
pub struct QuantityView {
    pub quantity: u32,
    pub clamped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested: Option<u32>,
}

impl From<QuantityChange> for QuantityView {
    fn from(change: QuantityChange) -> Self {
        match change {
            QuantityChange::Clamped { requested, applied } => Self { quantity: applied, clamped: true, requested: Some(requested) },
            other => Self { quantity: other.quantity(), clamped: false, requested: None },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchView<T> {
    /// A newer search or a closed draft superseded this one.
    pub stale: bool,
    pub results: Vec<T>,
}

/// Error body: `{"error": message}`.
#[derive(Debug)]
pub struct ApiError(pub StorefrontError);

impl From<StorefrontError> for ApiError {
    fn from(err: StorefrontError) -> Self { Self(err) }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            StorefrontError::OutOfStock { .. } | StorefrontError::InsufficientStock { .. } | StorefrontError::Business(_) => StatusCode::CONFLICT,
            StorefrontError::InvalidQuantity | StorefrontError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            StorefrontError::LineNotFound(_) | StorefrontError::DraftNotFound(_) => StatusCode::NOT_FOUND,
            StorefrontError::Unauthenticated => StatusCode::UNAUTHORIZED,
            StorefrontError::Forbidden(_) => StatusCode::FORBIDDEN,
            StorefrontError::Query(_) => StatusCode::BAD_GATEWAY,
            StorefrontError::Storage(_) | StorefrontError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self { Self(StorefrontError::Validation(rejection.body_text())) }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// `Json` extractor whose rejections use the `{"error": ..}` body.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use rust_decimal::Decimal;
    use tower::ServiceExt;
    use crate::domain::aggregates::{DraftDefaults, PlacedOrder};
    use crate::infrastructure::MemoryStore;
    use crate::ports::{MockCatalogLookup, MockCustomerLookup, MockIdentityProvider, MockOrderPlacement, Role, User};
    use crate::services::{CartSession, DraftManager, Notifier};
    use crate::test_support::{product, recording_notifier};

    struct Harness {
        catalog: MockCatalogLookup,
        customers: MockCustomerLookup,
        orders: MockOrderPlacement,
        role: Role,
    }

    impl Harness {
        fn new() -> Self {
            Self { catalog: MockCatalogLookup::new(), customers: MockCustomerLookup::new(), orders: MockOrderPlacement::new(), role: Role::Staff }
        }

        fn build(self) -> (Router, Arc<Mutex<PosSession>>) {
            let (notifier, _) = recording_notifier();
            let session = Arc::new(Mutex::new(PosSession {
                cart: CartSession::load(Arc::new(MemoryStore::default()), "cart", notifier.clone()),
                drafts: DraftManager::new(DraftDefaults::default(), notifier.clone()),
            }));
            let role = self.role;
            let mut identity = MockIdentityProvider::new();
            identity.expect_current_user().returning(|| Ok(Some(User { id: "staff-1".into(), email: None })));
            identity.expect_role().returning(move |_| Ok(role));
            let identity: Arc<MockIdentityProvider> = Arc::new(identity);
            let orders = Arc::new(self.orders);
            let pipeline = |n: Notifier| Arc::new(CheckoutPipeline::new(orders.clone(), identity.clone(), n, "VND"));
            let state = AppState {
                session: session.clone(),
                catalog: Arc::new(self.catalog),
                customers: Arc::new(self.customers),
                cart_checkout: pipeline(notifier.clone()),
                pos_checkout: pipeline(notifier),
            };
            (router(state), session)
        }
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => { request = request.header("content-type", "application/json"); Body::from(json.to_string()) }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { serde_json::Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    fn product_json(id: &str, price: i64, stock: u32) -> serde_json::Value {
        serde_json::to_value(product(id, price, stock)).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = Harness::new().build();
        let (status, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_cart_add_clamps_and_reports() {
        let (app, session) = Harness::new().build();
        let (status, body) = call(&app, Method::POST, "/api/v1/cart/items", Some(serde_json::json!({ "product": product_json("p1", 50000, 3), "quantity": 5 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["quantity"], 3);
        assert_eq!(body["clamped"], true);

        let (status, body) = call(&app, Method::POST, "/api/v1/cart/items", Some(serde_json::json!({ "product": product_json("p1", 50000, 3), "quantity": 1 }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Only 3 of Product p1 in stock (requested 4)");
        assert_eq!(session.lock().await.cart.cart().unit_count(), 3);
    }

    #[tokio::test]
    async fn test_cart_view_reports_selected_total() {
        let (app, _) = Harness::new().build();
        call(&app, Method::POST, "/api/v1/cart/items", Some(serde_json::json!({ "product": product_json("p1", 50000, 9), "quantity": 2 }))).await;
        call(&app, Method::POST, "/api/v1/cart/items", Some(serde_json::json!({ "product": product_json("p2", 15000, 9), "quantity": 1 }))).await;
        let (status, _) = call(&app, Method::POST, "/api/v1/cart/selection/p2", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = call(&app, Method::GET, "/api/v1/cart", None).await;
        assert_eq!(body["items"].as_array().unwrap().len(), 2);
        assert_eq!(body["selected"], serde_json::json!(["p2"]));
        assert_eq!(body["total"], "115000");
        assert_eq!(body["selected_total"], "15000");
    }

    #[tokio::test]
    async fn test_unknown_line_is_not_found() {
        let (app, _) = Harness::new().build();
        let (status, _) = call(&app, Method::PUT, "/api/v1/cart/items/nope", Some(serde_json::json!({ "quantity": 2 }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cart_checkout_without_selection_is_rejected() {
        let mut harness = Harness::new();
        harness.orders.expect_place_order().never();
        let (app, _) = harness.build();
        call(&app, Method::POST, "/api/v1/cart/items", Some(serde_json::json!({ "product": product_json("p1", 50000, 9), "quantity": 2 }))).await;

        let checkout = serde_json::json!({ "customer": { "name": "Nguyen Van A", "phone": "0900000000" } });
        let (status, body) = call(&app, Method::POST, "/api/v1/cart/checkout", Some(checkout)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Order has no items");
    }

    #[tokio::test]
    async fn test_draft_search_add_and_checkout() {
        let mut harness = Harness::new();
        harness.catalog.expect_search_products()
            .withf(|term, limit| term == "ao" && *limit == 10)
            .times(1)
            .returning(|_, _| Ok(vec![product("p1", 50000, 4)]));
        harness.orders.expect_place_order()
            .withf(|p| p.total.amount() == Decimal::new(100000, 0) && p.actor_id.as_deref() == Some("staff-1"))
            .times(1)
            .returning(|_| Ok(PlacedOrder { order_id: "o-42".into() }));
        let (app, session) = harness.build();

        let (status, body) = call(&app, Method::GET, "/api/v1/drafts/active/search/products?q=ao", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stale"], false);
        assert_eq!(body["results"][0]["id"], "p1");

        let (status, _) = call(&app, Method::POST, "/api/v1/drafts/active/products/p1", Some(serde_json::json!({ "quantity": 2 }))).await;
        assert_eq!(status, StatusCode::OK);
        let patch = serde_json::json!({ "customer_name": "Nguyen Van A", "phone": "0900000000" });
        let (status, _) = call(&app, Method::PATCH, "/api/v1/drafts/active", Some(patch)).await;
        assert_eq!(status, StatusCode::OK);

        let submitted = session.lock().await.drafts.active_id();
        let (status, body) = call(&app, Method::POST, "/api/v1/drafts/active/checkout", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["order_id"], "o-42");
        let session = session.lock().await;
        assert!(session.drafts.get(submitted).is_none());
        assert_eq!(session.drafts.len(), 1);
    }

    #[tokio::test]
    async fn test_draft_checkout_needs_staff_role() {
        let mut harness = Harness::new();
        harness.role = Role::User;
        harness.orders.expect_place_order().never();
        let (app, session) = harness.build();
        {
            let mut s = session.lock().await;
            s.drafts.add_product(&product("p1", 50000, 4), 1).unwrap();
        }
        let patch = serde_json::json!({ "customer_name": "Nguyen Van A", "phone": "0900000000" });
        call(&app, Method::PATCH, "/api/v1/drafts/active", Some(patch)).await;

        let (status, _) = call(&app, Method::POST, "/api/v1/drafts/active/checkout", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(session.lock().await.drafts.active().items().len(), 1);
    }

    #[tokio::test]
    async fn test_draft_tabs_lifecycle() {
        let (app, _) = Harness::new().build();
        let (status, created) = call(&app, Method::POST, "/api/v1/drafts", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, list) = call(&app, Method::GET, "/api/v1/drafts", None).await;
        assert_eq!(list["drafts"].as_array().unwrap().len(), 2);
        assert_eq!(list["active"], created["id"]);

        let id = created["id"].as_str().unwrap().to_string();
        let (status, _) = call(&app, Method::DELETE, &format!("/api/v1/drafts/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, Method::DELETE, &format!("/api/v1/drafts/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_body_uses_error_shape() {
        let (app, _) = Harness::new().build();
        let (status, body) = call(&app, Method::POST, "/api/v1/cart/items", Some(serde_json::json!({ "quantity": 1 }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("product"));

        let request = Request::builder().method(Method::PATCH).uri("/api/v1/drafts/active")
            .header("content-type", "application/json").body(Body::from("{not json")).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].is_string());
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(ApiError(StorefrontError::Business("Het hang".into())).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError(StorefrontError::Unauthenticated).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError(StorefrontError::Query("timeout".into())).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError(StorefrontError::InvalidQuantity).status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
