//! PostgreSQL adapters: catalog and customer search, staff identity and the
//! `create_order` stored procedure

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::{debug, warn};
use uuid::Uuid;
use crate::domain::aggregates::{CheckoutPayload, CustomerRecord, PlacedOrder, ProductRef};
use crate::domain::value_objects::{ProductId, Sku};
use crate::ports::{CatalogLookup, CustomerLookup, IdentityProvider, OrderPlacement, Role, User};
use crate::{Result, StorefrontError};

const SEARCH_PRODUCTS_SQL: &str = "SELECT id::text AS id, name, price, stock, images, sku FROM products \
    WHERE status = 'active' AND (name ILIKE $1 OR sku ILIKE $1) ORDER BY name LIMIT $2";
const SEARCH_CUSTOMERS_SQL: &str = "SELECT id::text AS id, name, phone, email, address FROM customers \
    WHERE name ILIKE $1 OR phone ILIKE $1 OR email ILIKE $1 ORDER BY name LIMIT $2";
const CURRENT_USER_SQL: &str = "SELECT id::text AS id, email FROM profiles WHERE id = $1";
const ROLE_SQL: &str = "SELECT role FROM profiles WHERE id = $1::uuid";
const CREATE_ORDER_SQL: &str = "SELECT create_order($1, $2::uuid, $3, $4, $5, $6, $7::uuid)::text";

fn query_error(e: sqlx::Error) -> StorefrontError { StorefrontError::Query(e.to_string()) }

fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

fn limit_param(limit: usize) -> i64 { i64::try_from(limit).unwrap_or(i64::MAX) }

#[derive(Debug, FromRow)]
struct ProductRow { id: String, name: String, price: Decimal, stock: i32, images: Vec<String>, sku: Option<String> }

impl From<ProductRow> for ProductRef {
    fn from(row: ProductRow) -> Self {
        ProductRef {
            id: ProductId::new(row.id), name: row.name, unit_price: row.price,
            stock: u32::try_from(row.stock).unwrap_or(0),
            image: row.images.into_iter().next(),
            sku: row.sku.and_then(|s| Sku::new(s).ok()),
        }
    }
}

#[derive(Debug, FromRow)]
struct CustomerRow { id: String, name: String, phone: Option<String>, email: Option<String>, address: Option<String> }

impl From<CustomerRow> for CustomerRecord {
    fn from(r: CustomerRow) -> Self { CustomerRecord { id: r.id, name: r.name, phone: r.phone, email: r.email, address: r.address } }
}

/// Catalog and customer lookups against the storefront tables.
#[derive(Debug, Clone)]
pub struct PgCatalog { pool: PgPool }

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl CatalogLookup for PgCatalog {
    async fn search_products(&self, term: &str, limit: usize) -> Result<Vec<ProductRef>> {
        let rows = sqlx::query_as::<_, ProductRow>(SEARCH_PRODUCTS_SQL)
            .bind(like_pattern(term)).bind(limit_param(limit))
            .fetch_all(&self.pool).await.map_err(query_error)?;
        debug!(term, hits = rows.len(), "product search");
        Ok(rows.into_iter().map(ProductRef::from).collect())
    }
}

#[async_trait]
impl CustomerLookup for PgCatalog {
    async fn search_customers(&self, term: &str, limit: usize) -> Result<Vec<CustomerRecord>> {
        let rows = sqlx::query_as::<_, CustomerRow>(SEARCH_CUSTOMERS_SQL)
            .bind(like_pattern(term)).bind(limit_param(limit))
            .fetch_all(&self.pool).await.map_err(query_error)?;
        debug!(term, hits = rows.len(), "customer search");
        Ok(rows.into_iter().map(CustomerRecord::from).collect())
    }
}

/// Identity of the account signed in on this terminal.
#[derive(Debug, Clone)]
pub struct PgIdentity { pool: PgPool, operator_id: Option<Uuid> }

impl PgIdentity {
    pub fn new(pool: PgPool, operator_id: Option<Uuid>) -> Self { Self { pool, operator_id } }
}

#[async_trait]
impl IdentityProvider for PgIdentity {
    async fn current_user(&self) -> Result<Option<User>> {
        let Some(operator) = self.operator_id else { return Ok(None) };
        let row: Option<(String, Option<String>)> = sqlx::query_as(CURRENT_USER_SQL)
            .bind(operator).fetch_optional(&self.pool).await.map_err(query_error)?;
        Ok(row.map(|(id, email)| User { id, email }))
    }

    async fn role(&self, user_id: &str) -> Result<Role> {
        let row: Option<(String,)> = sqlx::query_as(ROLE_SQL)
            .bind(user_id).fetch_optional(&self.pool).await.map_err(query_error)?;
        let (role,) = row.ok_or(StorefrontError::Unauthenticated)?;
        Ok(role.parse().unwrap_or_else(|e| { warn!(user_id, error = %e, "unrecognised role, treating as user"); Role::User }))
    }
}

/// Arguments of `create_order`, shaped from a checkout payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcedureArgs {
    pub customer: serde_json::Value,
    pub selected_customer_id: Option<String>,
    pub items: serde_json::Value,
    pub payment_method: String,
    pub total: Decimal,
    pub source: String,
    pub creator_id: Option<String>,
}

#[derive(Serialize)]
struct ProcedureItem<'a> {
    product_id: &'a str,
    quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    price: Decimal,
    product_name: &'a str,
}

impl ProcedureArgs {
    pub fn from_payload(payload: &CheckoutPayload) -> Result<Self> {
        let c = &payload.customer;
        let customer = serde_json::json!({ "name": c.name, "phone": c.phone, "email": c.email, "address": c.address, "note": payload.note });
        let items: Vec<ProcedureItem<'_>> = payload.items.iter().map(|i| ProcedureItem {
            product_id: i.product_id.as_str(), quantity: i.quantity, price: i.unit_price, product_name: &i.product_name,
        }).collect();
        Ok(Self {
            customer,
            selected_customer_id: c.customer_id.clone(),
            items: serde_json::to_value(items)?,
            payment_method: enum_tag(&payload.payment_method)?,
            total: payload.total.amount(),
            source: enum_tag(&payload.source)?,
            creator_id: payload.actor_id.clone(),
        })
    }
}

fn enum_tag<T: Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

/// Stored-procedure order placement: stock decrement and order insert happen
/// in one database transaction.
#[derive(Debug, Clone)]
pub struct PgOrderProcedure { pool: PgPool }

impl PgOrderProcedure {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl OrderPlacement for PgOrderProcedure {
    async fn place_order(&self, payload: &CheckoutPayload) -> Result<PlacedOrder> {
        let args = ProcedureArgs::from_payload(payload)?;
        let (order_id,): (String,) = sqlx::query_as(CREATE_ORDER_SQL)
            .bind(args.customer).bind(args.selected_customer_id).bind(args.items).bind(args.payment_method)
            .bind(args.total).bind(args.source).bind(args.creator_id)
            .fetch_one(&self.pool).await
            .map_err(|e| match e {
                sqlx::Error::Database(db) => StorefrontError::Business(db.message().to_string()),
                other => StorefrontError::Business(other.to_string()),
            })?;
        Ok(PlacedOrder { order_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{LineItems, OrderSource, PaymentMethod};
    use crate::test_support::{customer, product};

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_product_row_conversion() {
        let row = ProductRow { id: "p1".into(), name: "Ao".into(), price: Decimal::new(50000, 0), stock: -2, images: vec!["a.jpg".into(), "b.jpg".into()], sku: Some("ao-1".into()) };
        let p = ProductRef::from(row);
        assert_eq!(p.stock, 0);
        assert_eq!(p.image.as_deref(), Some("a.jpg"));
        assert_eq!(p.sku.unwrap().as_str(), "AO-1");
    }

    #[test]
    fn test_procedure_args_shape() {
        let mut items = LineItems::new();
        items.add_or_increment(&product("p1", 50000, 5), 2).unwrap();
        let mut info = customer();
        info.customer_id = Some("6f1c".into());
        let payload = CheckoutPayload::build(&info, &items, PaymentMethod::BankTransfer, OrderSource::InStore, Some("giao sau".into()), "VND")
            .unwrap().with_actor("staff-1");

        let args = ProcedureArgs::from_payload(&payload).unwrap();

        assert_eq!(args.payment_method, "bank_transfer");
        assert_eq!(args.source, "in_store");
        assert_eq!(args.total, Decimal::new(100000, 0));
        assert_eq!(args.selected_customer_id.as_deref(), Some("6f1c"));
        assert_eq!(args.creator_id.as_deref(), Some("staff-1"));
        assert_eq!(args.customer["note"], "giao sau");
        assert_eq!(args.items, serde_json::json!([{ "product_id": "p1", "quantity": 2, "price": 50000.0, "product_name": "Product p1" }]));
    }
}
