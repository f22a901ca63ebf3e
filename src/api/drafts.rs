use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::api::{ApiResult, AppState, JsonBody, QuantityView, SearchView};
use crate::domain::aggregates::{CustomerRecord, DraftPatch, OrderDraft, PlacedOrder, ProductRef};
use crate::domain::value_objects::{DraftId, LineId, ProductId};

#[derive(Debug, Serialize)]
pub struct DraftsView { pub active: DraftId, pub drafts: Vec<OrderDraft> }

#[derive(Debug, Serialize)]
pub struct Created { pub id: DraftId }

#[derive(Debug, Deserialize)]
pub struct AddProduct {
    pub product: ProductRef,
    #[serde(default = "one")]
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct Quantity {
    #[serde(default = "one")]
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams { #[serde(default)] pub q: String }

fn one() -> u32 { 1 }

pub async fn list(State(s): State<AppState>) -> Json<DraftsView> {
    let session = s.session.lock().await;
    Json(DraftsView { active: session.drafts.active_id(), drafts: session.drafts.drafts().to_vec() })
}

pub async fn create(State(s): State<AppState>) -> (StatusCode, Json<Created>) {
    let id = s.session.lock().await.drafts.create_draft();
    (StatusCode::CREATED, Json(Created { id }))
}

pub async fn close(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    s.session.lock().await.drafts.close_draft(DraftId::from(id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn activate(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    s.session.lock().await.drafts.set_active(DraftId::from(id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn show_active(State(s): State<AppState>) -> Json<OrderDraft> {
    Json(s.session.lock().await.drafts.active().clone())
}

pub async fn update_active(State(s): State<AppState>, JsonBody(patch): JsonBody<DraftPatch>) -> Json<OrderDraft> {
    let mut session = s.session.lock().await;
    session.drafts.update_active(patch);
    Json(session.drafts.active().clone())
}

pub async fn add_product(State(s): State<AppState>, JsonBody(r): JsonBody<AddProduct>) -> ApiResult<Json<QuantityView>> {
    let change = s.session.lock().await.drafts.add_product(&r.product, r.quantity)?;
    Ok(Json(change.into()))
}

pub async fn add_search_result(State(s): State<AppState>, Path(id): Path<String>, JsonBody(r): JsonBody<Quantity>) -> ApiResult<Json<QuantityView>> {
    let change = s.session.lock().await.drafts.add_search_result(&ProductId::new(id), r.quantity)?;
    Ok(Json(change.into()))
}

pub async fn set_quantity(State(s): State<AppState>, Path(id): Path<Uuid>, JsonBody(r): JsonBody<Quantity>) -> ApiResult<Json<QuantityView>> {
    let change = s.session.lock().await.drafts.set_quantity(LineId::from(id), r.quantity)?;
    Ok(Json(change.into()))
}

pub async fn increment(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<QuantityView>> {
    let change = s.session.lock().await.drafts.increment(&ProductId::new(id))?;
    Ok(Json(change.into()))
}

pub async fn decrement(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<QuantityView>> {
    let change = s.session.lock().await.drafts.decrement(&ProductId::new(id))?;
    Ok(Json(change.into()))
}

pub async fn remove_line(State(s): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    if s.session.lock().await.drafts.remove_line(LineId::from(id)) { StatusCode::NO_CONTENT } else { StatusCode::NOT_FOUND }
}

pub async fn search_products(State(s): State<AppState>, Query(p): Query<SearchParams>) -> ApiResult<Json<SearchView<ProductRef>>> {
    let (ticket, limit) = {
        let mut session = s.session.lock().await;
        (session.drafts.begin_product_search(&p.q), session.drafts.search_limit())
    };
    let Some(ticket) = ticket else { return Ok(Json(SearchView { stale: false, results: Vec::new() })) };
    let outcome = s.catalog.search_products(&ticket.term, limit).await;

    let mut session = s.session.lock().await;
    let applied = session.drafts.finish_product_search(&ticket, outcome)?;
    let results = match applied {
        Some(_) => session.drafts.get(ticket.draft_id).map(|d| d.search().products.clone()).unwrap_or_default(),
        None => Vec::new(),
    };
    Ok(Json(SearchView { stale: applied.is_none(), results }))
}

pub async fn search_customers(State(s): State<AppState>, Query(p): Query<SearchParams>) -> ApiResult<Json<SearchView<CustomerRecord>>> {
    let (ticket, limit) = {
        let mut session = s.session.lock().await;
        (session.drafts.begin_customer_search(&p.q), session.drafts.search_limit())
    };
    let Some(ticket) = ticket else { return Ok(Json(SearchView { stale: false, results: Vec::new() })) };
    let outcome = s.customers.search_customers(&ticket.term, limit).await;

    let mut session = s.session.lock().await;
    let applied = session.drafts.finish_customer_search(&ticket, outcome)?;
    let results = match applied {
        Some(_) => session.drafts.get(ticket.draft_id).map(|d| d.search().customers.clone()).unwrap_or_default(),
        None => Vec::new(),
    };
    Ok(Json(SearchView { stale: applied.is_none(), results }))
}

pub async fn select_customer(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<OrderDraft>> {
    let mut session = s.session.lock().await;
    session.drafts.select_customer(&id)?;
    Ok(Json(session.drafts.active().clone()))
}

pub async fn checkout(State(s): State<AppState>) -> ApiResult<(StatusCode, Json<PlacedOrder>)> {
    let pending = s.pos_checkout.prepare_draft(&mut s.session.lock().await.drafts)?;
    let outcome = s.pos_checkout.place(&pending).await;
    let order = s.pos_checkout.complete_draft(&mut s.session.lock().await.drafts, &pending, outcome)?;
    Ok((StatusCode::CREATED, Json(order)))
}
