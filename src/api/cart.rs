use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::api::{ApiResult, AppState, JsonBody, QuantityView};
use crate::domain::aggregates::{LineItem, PlacedOrder, ProductRef, SubmissionState};
use crate::domain::value_objects::ProductId;
use crate::services::CartCheckout;

#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<LineItem>,
    pub selected: Vec<ProductId>,
    pub unit_count: u32,
    pub total: Decimal,
    pub selected_total: Decimal,
    /// False once local storage has failed; the cart then lives in memory.
    pub durable: bool,
    pub checkout: SubmissionState,
}

#[derive(Debug, Deserialize)]
pub struct AddItem {
    pub product: ProductRef,
    #[serde(default = "one")]
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct SetQuantity { pub quantity: u32 }

fn one() -> u32 { 1 }

pub async fn show(State(s): State<AppState>) -> Json<CartView> {
    let session = s.session.lock().await;
    let cart = &session.cart;
    Json(CartView {
        items: cart.cart().items().iter().cloned().collect(),
        selected: cart.cart().selection().iter().cloned().collect(),
        unit_count: cart.cart().unit_count(),
        total: cart.cart().total(),
        selected_total: cart.selected_total(),
        durable: cart.is_durable(),
        checkout: cart.checkout_state(),
    })
}

pub async fn add(State(s): State<AppState>, JsonBody(r): JsonBody<AddItem>) -> ApiResult<Json<QuantityView>> {
    let change = s.session.lock().await.cart.add(&r.product, r.quantity)?;
    Ok(Json(change.into()))
}

pub async fn set_quantity(State(s): State<AppState>, Path(id): Path<String>, JsonBody(r): JsonBody<SetQuantity>) -> ApiResult<Json<QuantityView>> {
    let change = s.session.lock().await.cart.set_quantity(&ProductId::new(id), r.quantity)?;
    Ok(Json(change.into()))
}

pub async fn increment(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<QuantityView>> {
    let change = s.session.lock().await.cart.increment(&ProductId::new(id))?;
    Ok(Json(change.into()))
}

pub async fn decrement(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<QuantityView>> {
    let change = s.session.lock().await.cart.decrement(&ProductId::new(id))?;
    Ok(Json(change.into()))
}

pub async fn remove(State(s): State<AppState>, Path(id): Path<String>) -> StatusCode {
    match s.session.lock().await.cart.remove(&ProductId::new(id)) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

pub async fn clear(State(s): State<AppState>) -> StatusCode {
    s.session.lock().await.cart.clear();
    StatusCode::NO_CONTENT
}

pub async fn select(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    s.session.lock().await.cart.select(&ProductId::new(id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn deselect(State(s): State<AppState>, Path(id): Path<String>) -> StatusCode {
    s.session.lock().await.cart.deselect(&ProductId::new(id));
    StatusCode::NO_CONTENT
}

pub async fn select_all(State(s): State<AppState>) -> StatusCode {
    s.session.lock().await.cart.select_all();
    StatusCode::NO_CONTENT
}

pub async fn deselect_all(State(s): State<AppState>) -> StatusCode {
    s.session.lock().await.cart.deselect_all();
    StatusCode::NO_CONTENT
}

pub async fn checkout(State(s): State<AppState>, JsonBody(r): JsonBody<CartCheckout>) -> ApiResult<(StatusCode, Json<PlacedOrder>)> {
    let pending = s.cart_checkout.prepare_cart(&mut s.session.lock().await.cart, r)?;
    let outcome = s.cart_checkout.place(&pending).await;
    let order = s.cart_checkout.complete_cart(&mut s.session.lock().await.cart, &pending, outcome)?;
    Ok((StatusCode::CREATED, Json(order)))
}
