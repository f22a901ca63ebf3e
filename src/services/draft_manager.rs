//! Order-draft (tab) manager for the point-of-sale screen
//!
//! Staff can compose several orders at once, one per tab. Exactly one draft
//! is active and every edit goes to it; the other drafts are never touched.
//! The list of open drafts is never empty: closing the last one opens a
//! fresh draft in its place.
//!
//! Lookups are split into [`DraftManager::begin_product_search`] and
//! [`DraftManager::finish_product_search`] so a host can release its lock
//! while the catalog is queried. Each started search bumps a per-draft
//! generation; a response carrying an older generation is dropped.

use tracing::{debug, info};
use crate::domain::aggregates::{
    CustomerRecord, DraftDefaults, DraftPatch, OrderDraft, ProductRef, QuantityChange, SubmissionState,
};
use crate::domain::events::{DomainEvent, DraftEvent, Notification};
use crate::domain::value_objects::{DraftId, LineId, ProductId};
use crate::ports::{CatalogLookup, CustomerLookup};
use crate::services::Notifier;
use crate::{Result, StorefrontError};

pub const DEFAULT_SEARCH_LIMIT: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchKind { Products, Customers }

/// An in-flight lookup for one draft.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchTicket {
    pub draft_id: DraftId,
    pub kind: SearchKind,
    pub term: String,
    generation: u64,
}

#[derive(Debug)]
pub struct DraftManager {
    drafts: Vec<OrderDraft>,
    /// Index into `drafts`; always in bounds because `drafts` is never empty.
    active: usize,
    defaults: DraftDefaults,
    search_limit: usize,
    notifier: Notifier,
}

impl DraftManager {
    pub fn new(defaults: DraftDefaults, notifier: Notifier) -> Self {
        let first = OrderDraft::new(defaults);
        info!(draft_id = %first.id(), "opened first order draft");
        Self { drafts: vec![first], active: 0, defaults, search_limit: DEFAULT_SEARCH_LIMIT, notifier }
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self { self.search_limit = limit.max(1); self }

    pub fn drafts(&self) -> &[OrderDraft] { &self.drafts }
    pub fn len(&self) -> usize { self.drafts.len() }
    pub fn is_empty(&self) -> bool { self.drafts.is_empty() }
    pub fn active(&self) -> &OrderDraft { &self.drafts[self.active] }
    pub fn active_id(&self) -> DraftId { self.active().id() }
    pub fn search_limit(&self) -> usize { self.search_limit }
    pub fn get(&self, id: DraftId) -> Option<&OrderDraft> { self.drafts.iter().find(|d| d.id() == id) }

    // -------------------------------------------------------------------------
    // Tab lifecycle
    // -------------------------------------------------------------------------

    pub fn create_draft(&mut self) -> DraftId { self.create_draft_with(self.defaults) }

    pub fn create_draft_with(&mut self, defaults: DraftDefaults) -> DraftId {
        let draft = OrderDraft::new(defaults);
        let id = draft.id();
        self.drafts.push(draft);
        self.active = self.drafts.len() - 1;
        info!(draft_id = %id, open = self.drafts.len(), "order draft created");
        self.notifier.publish(DomainEvent::Draft(DraftEvent::Created { draft_id: id }));
        id
    }

    pub fn close_draft(&mut self, id: DraftId) -> Result<()> {
        let Some(idx) = self.position(id) else { return self.fail(StorefrontError::DraftNotFound(id)) };
        self.drafts.remove(idx);
        info!(draft_id = %id, open = self.drafts.len(), "order draft closed");
        self.notifier.publish(DomainEvent::Draft(DraftEvent::Closed { draft_id: id }));

        if self.drafts.is_empty() {
            self.create_draft();
        } else if idx == self.active {
            self.activate_index(0);
        } else if idx < self.active {
            self.active -= 1;
        }
        Ok(())
    }

    pub fn set_active(&mut self, id: DraftId) -> Result<()> {
        let Some(idx) = self.position(id) else { return self.fail(StorefrontError::DraftNotFound(id)) };
        self.activate_index(idx);
        Ok(())
    }

    pub fn update_active(&mut self, patch: DraftPatch) {
        let draft = self.active_mut();
        draft.apply(patch);
        let id = draft.id();
        debug!(draft_id = %id, "order draft updated");
        self.notifier.publish(DomainEvent::Draft(DraftEvent::Updated { draft_id: id }));
    }

    // -------------------------------------------------------------------------
    // Line items of the active draft
    // -------------------------------------------------------------------------

    pub fn add_product(&mut self, product: &ProductRef, quantity: u32) -> Result<QuantityChange> {
        let result = self.active_mut().edit_items(|items| items.add_or_increment(product, quantity));
        let change = self.settle(result)?;
        self.announce(&product.name, change, "Added");
        Ok(change)
    }

    /// Adds a product from the active draft's latest product search.
    pub fn add_search_result(&mut self, product_id: &ProductId, quantity: u32) -> Result<QuantityChange> {
        let hit = self.active().search().products.iter().find(|p| &p.id == product_id).cloned();
        let Some(product) = hit else { return self.fail(StorefrontError::LineNotFound(product_id.to_string())) };
        self.add_product(&product, quantity)
    }

    pub fn set_quantity(&mut self, line_id: LineId, quantity: u32) -> Result<QuantityChange> {
        let result = self.active_mut().edit_items(|items| items.set_quantity(line_id, quantity));
        let change = self.settle(result)?;
        let name = self.active().items().get(line_id).map(|l| l.product_name.clone()).unwrap_or_default();
        self.announce(&name, change, "Quantity updated");
        Ok(change)
    }

    pub fn increment(&mut self, product_id: &ProductId) -> Result<QuantityChange> {
        let result = self.active_mut().edit_items(|items| items.increment(product_id));
        let change = self.settle(result)?;
        self.announce(&self.line_name(product_id), change, "Quantity updated");
        Ok(change)
    }

    /// A line already at 1 is left alone and nothing is announced.
    pub fn decrement(&mut self, product_id: &ProductId) -> Result<QuantityChange> {
        let result = self.active_mut().edit_items(|items| items.decrement(product_id));
        let change = self.settle(result)?;
        if let QuantityChange::Set(_) = change {
            self.announce(&self.line_name(product_id), change, "Quantity updated");
        }
        Ok(change)
    }

    pub fn remove_line(&mut self, line_id: LineId) -> bool {
        let removed = self.active_mut().edit_items(|items| items.remove(line_id));
        if let Some(line) = &removed {
            self.notifier.notify(Notification::success(format!("Removed {}", line.product_name)));
            self.publish_updated();
        }
        removed.is_some()
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    /// Starts a product lookup for the active draft. A blank term clears the
    /// results without querying and returns `None`.
    pub fn begin_product_search(&mut self, term: &str) -> Option<SearchTicket> { self.begin_search(SearchKind::Products, term) }
    pub fn begin_customer_search(&mut self, term: &str) -> Option<SearchTicket> { self.begin_search(SearchKind::Customers, term) }

    /// Applies a catalog response. Returns `Ok(None)` when the response is stale
    /// or its draft has been closed.
    pub fn finish_product_search(&mut self, ticket: &SearchTicket, outcome: Result<Vec<ProductRef>>) -> Result<Option<usize>> {
        let Some(draft) = self.current_for(ticket) else { return Ok(None) };
        match outcome {
            Ok(products) => { let n = products.len(); draft.search_mut().products = products; Ok(Some(n)) }
            Err(err) => {
                draft.search_mut().products.clear();
                self.fail(as_query_error(err))
            }
        }
    }

    pub fn finish_customer_search(&mut self, ticket: &SearchTicket, outcome: Result<Vec<CustomerRecord>>) -> Result<Option<usize>> {
        let Some(draft) = self.current_for(ticket) else { return Ok(None) };
        match outcome {
            Ok(customers) => { let n = customers.len(); draft.search_mut().customers = customers; Ok(Some(n)) }
            Err(err) => {
                draft.search_mut().customers.clear();
                self.fail(as_query_error(err))
            }
        }
    }

    pub async fn search_products(&mut self, catalog: &dyn CatalogLookup, term: &str) -> Result<Option<usize>> {
        let Some(ticket) = self.begin_product_search(term) else { return Ok(Some(0)) };
        let outcome = catalog.search_products(&ticket.term, self.search_limit).await;
        self.finish_product_search(&ticket, outcome)
    }

    pub async fn search_customers(&mut self, customers: &dyn CustomerLookup, term: &str) -> Result<Option<usize>> {
        let Some(ticket) = self.begin_customer_search(term) else { return Ok(Some(0)) };
        let outcome = customers.search_customers(&ticket.term, self.search_limit).await;
        self.finish_customer_search(&ticket, outcome)
    }

    /// Fills the active draft's customer from its latest customer search.
    pub fn select_customer(&mut self, customer_id: &str) -> Result<()> {
        let hit = self.active().search().customers.iter().find(|c| c.id == customer_id).cloned();
        let Some(record) = hit else { return self.fail(StorefrontError::Validation(format!("Customer {customer_id} is not in the search results"))) };
        self.active_mut().link_customer(&record);
        self.publish_updated();
        Ok(())
    }

    /// Drops cached lookup results of every draft, e.g. after the catalog changed.
    pub fn invalidate_search(&mut self, kind: SearchKind) {
        for draft in &mut self.drafts {
            let search = draft.search_mut();
            match kind {
                SearchKind::Products => { search.products.clear(); search.product_generation += 1; }
                SearchKind::Customers => { search.customers.clear(); search.customer_generation += 1; }
            }
        }
        debug!(?kind, "cached search results invalidated");
    }

    // -------------------------------------------------------------------------
    // Submission bookkeeping (driven by the checkout pipeline)
    // -------------------------------------------------------------------------

    pub(crate) fn mark(&mut self, id: DraftId, state: SubmissionState) -> bool {
        match self.drafts.iter_mut().find(|d| d.id() == id) {
            Some(draft) => { draft.set_status(state); true }
            None => false,
        }
    }

    // -------------------------------------------------------------------------

    fn active_mut(&mut self) -> &mut OrderDraft { &mut self.drafts[self.active] }

    fn position(&self, id: DraftId) -> Option<usize> { self.drafts.iter().position(|d| d.id() == id) }

    fn activate_index(&mut self, idx: usize) {
        self.active = idx;
        let id = self.active_id();
        debug!(draft_id = %id, "order draft activated");
        self.notifier.publish(DomainEvent::Draft(DraftEvent::Activated { draft_id: id }));
    }

    fn begin_search(&mut self, kind: SearchKind, term: &str) -> Option<SearchTicket> {
        let draft_id = self.active_id();
        let search = self.active_mut().search_mut();
        let generation = match kind {
            SearchKind::Products => { search.product_generation += 1; search.product_generation }
            SearchKind::Customers => { search.customer_generation += 1; search.customer_generation }
        };
        let term = term.trim();
        if term.is_empty() {
            match kind { SearchKind::Products => search.products.clear(), SearchKind::Customers => search.customers.clear() }
            return None;
        }
        Some(SearchTicket { draft_id, kind, term: term.to_string(), generation })
    }

    fn current_for(&mut self, ticket: &SearchTicket) -> Option<&mut OrderDraft> {
        let draft = self.drafts.iter_mut().find(|d| d.id() == ticket.draft_id)?;
        let current = match ticket.kind {
            SearchKind::Products => draft.search().product_generation,
            SearchKind::Customers => draft.search().customer_generation,
        };
        if current != ticket.generation {
            debug!(draft_id = %ticket.draft_id, term = %ticket.term, "discarding stale search response");
            return None;
        }
        Some(draft)
    }

    fn settle(&mut self, result: Result<QuantityChange>) -> Result<QuantityChange> {
        match result {
            Ok(change) => { self.publish_updated(); Ok(change) }
            Err(err) => self.fail(err),
        }
    }

    fn fail<T>(&self, err: StorefrontError) -> Result<T> {
        self.notifier.report(&err);
        Err(err)
    }

    fn announce(&self, name: &str, change: QuantityChange, verb: &str) {
        let notification = match change {
            QuantityChange::Clamped { requested, applied } if requested > applied => {
                Notification::warning(format!("Only {applied} of {name} in stock (requested {requested})"))
            }
            _ => Notification::success(format!("{verb}: {name}")),
        };
        self.notifier.notify(notification);
    }

    fn line_name(&self, product_id: &ProductId) -> String {
        self.active().items().find_product(product_id).map(|l| l.product_name.clone()).unwrap_or_else(|| product_id.to_string())
    }

    fn publish_updated(&self) {
        self.notifier.publish(DomainEvent::Draft(DraftEvent::Updated { draft_id: self.active_id() }));
    }
}

fn as_query_error(err: StorefrontError) -> StorefrontError {
    match err {
        StorefrontError::Query(_) => err,
        other => StorefrontError::Query(other.to_string()),
    }
}
