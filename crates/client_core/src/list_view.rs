//! Table state for the catalogue list and the controller that keeps it in
//! step with the server.
//!
//! Every list-affecting request (full load, search, sort) takes a sequence
//! number when it is issued. A response is applied only if its number is
//! still the latest one, so a slow early request can never overwrite the
//! result of a later one.
//!
//! Intents that hit the network come in two halves: a `begin_*` step that
//! records the intent and takes the sequence number, and a `complete*` step
//! that performs the request. Callers that must preserve command order run
//! the first half inline and only spawn the second.

use std::{collections::BTreeSet, sync::Arc};

use shared::{
    domain::{LanguageId, ProgrammingLanguage, SortDirection, SortKey},
    protocol::SearchSortRequest,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{AccessToken, ClientError, LanguagesApi};

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load programming languages";
pub const SEARCH_FAILED_MESSAGE: &str = "Failed to search programming languages";
pub const DELETE_FAILED_MESSAGE: &str = "Failed to delete programming language";
pub const BULK_DELETE_FAILED_MESSAGE: &str = "Failed to delete selected programming languages";

pub fn no_results_message(term: &str) -> String {
    format!("No results found for \"{term}\"")
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    Error(String),
}

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub items: Vec<ProgrammingLanguage>,
    pub search_term: String,
    pub sort_key: Option<SortKey>,
    pub sort_direction: SortDirection,
    pub selected: BTreeSet<LanguageId>,
    pub pending_single_delete: Option<ProgrammingLanguage>,
    pub pending_bulk_delete: bool,
    pub delete_in_flight: bool,
    pub delete_error: Option<String>,
    pub load_state: LoadState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectionPolicy {
    Clear,
    Intersect,
}

impl ViewState {
    pub fn contains(&self, id: LanguageId) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    pub fn item_ids(&self) -> BTreeSet<LanguageId> {
        self.items.iter().map(|item| item.id).collect()
    }

    /// The header checkbox: on only when every visible row is selected.
    pub fn all_selected(&self) -> bool {
        !self.items.is_empty() && self.selected == self.item_ids()
    }

    pub fn is_selected(&self, id: LanguageId) -> bool {
        self.selected.contains(&id)
    }

    pub fn sort_indicator(&self, column: SortKey) -> Option<SortDirection> {
        (self.sort_key == Some(column)).then_some(self.sort_direction)
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.load_state {
            LoadState::Error(message) => Some(message),
            _ => None,
        }
    }

    fn replace_items(&mut self, items: Vec<ProgrammingLanguage>, policy: SelectionPolicy) {
        self.items = items;
        match policy {
            SelectionPolicy::Clear => self.selected.clear(),
            SelectionPolicy::Intersect => self.prune_selection(),
        }
    }

    fn prune_selection(&mut self) {
        let ids = self.item_ids();
        self.selected.retain(|id| ids.contains(id));
    }

    fn fail_listing(&mut self, message: String) {
        self.replace_items(Vec::new(), SelectionPolicy::Clear);
        self.load_state = LoadState::Error(message);
    }

    fn remove_items(&mut self, removed: &BTreeSet<LanguageId>) {
        self.items.retain(|item| !removed.contains(&item.id));
        self.prune_selection();
    }

    pub(crate) fn toggle_select(&mut self, id: LanguageId) -> bool {
        if !self.contains(id) {
            return false;
        }
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
        true
    }

    pub(crate) fn toggle_select_all(&mut self) {
        if self.selected == self.item_ids() {
            self.selected.clear();
        } else {
            self.selected = self.item_ids();
        }
    }

    pub(crate) fn toggle_sort(&mut self, column: SortKey) {
        if self.sort_key == Some(column) {
            self.sort_direction = self.sort_direction.flipped();
        } else {
            self.sort_key = Some(column);
            self.sort_direction = SortDirection::Ascending;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Applied,
    /// A newer list request was issued before this one resolved.
    Superseded,
    /// Applied as a failure; the server rejected the access token.
    Unauthorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(usize),
    Failed,
    /// Failed because the server rejected the access token.
    Unauthorized,
    /// Nothing to confirm, a delete already running, or the record is gone.
    Skipped,
}

enum ListRequest {
    Load,
    Search(SearchSortRequest),
}

/// A list request whose intent is recorded and whose sequence number is taken.
#[must_use = "a pending query does nothing until completed"]
pub struct PendingQuery {
    seq: u64,
    request: ListRequest,
}

/// A confirmed delete that has marked the view as in flight.
#[must_use = "a pending delete leaves the view in flight until completed"]
pub enum PendingDelete {
    Single(LanguageId),
    Bulk(BTreeSet<LanguageId>),
}

fn delete_failure(err: &ClientError) -> DeleteOutcome {
    if err.is_auth() {
        DeleteOutcome::Unauthorized
    } else {
        DeleteOutcome::Failed
    }
}

fn failure_outcome(err: &ClientError) -> RequestOutcome {
    if err.is_auth() {
        RequestOutcome::Unauthorized
    } else {
        RequestOutcome::Applied
    }
}

struct ListViewInner {
    view: ViewState,
    latest_request: u64,
}

impl ListViewInner {
    fn begin_request(&mut self) -> u64 {
        self.latest_request += 1;
        self.view.load_state = LoadState::Loading;
        self.latest_request
    }

    fn is_latest(&self, seq: u64) -> bool {
        seq == self.latest_request
    }

    /// Records the filter intent and decides which endpoint serves it.
    fn plan_query(&mut self) -> PendingQuery {
        let request = if self.view.search_term.is_empty() && self.view.sort_key.is_none() {
            ListRequest::Load
        } else {
            ListRequest::Search(SearchSortRequest::new(
                self.view.search_term.clone(),
                self.view.sort_key,
                self.view.sort_direction,
            ))
        };
        PendingQuery {
            seq: self.begin_request(),
            request,
        }
    }
}

/// Owns the list [`ViewState`] for one mounted view.
///
/// The state lock is never held across a network call, so intents keep
/// flowing while requests are in flight.
pub struct ListViewController {
    api: Arc<dyn LanguagesApi>,
    token: AccessToken,
    inner: Mutex<ListViewInner>,
    events: broadcast::Sender<ViewState>,
}

impl ListViewController {
    pub fn new(api: Arc<dyn LanguagesApi>, token: AccessToken) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            api,
            token,
            inner: Mutex::new(ListViewInner {
                view: ViewState::default(),
                latest_request: 0,
            }),
            events,
        })
    }

    pub async fn snapshot(&self) -> ViewState {
        self.inner.lock().await.view.clone()
    }

    /// Receives a fresh [`ViewState`] after every mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<ViewState> {
        self.events.subscribe()
    }

    fn publish(&self, view: &ViewState) {
        let _ = self.events.send(view.clone());
    }

    pub async fn begin_load(&self) -> PendingQuery {
        let mut guard = self.inner.lock().await;
        let seq = guard.begin_request();
        self.publish(&guard.view);
        PendingQuery {
            seq,
            request: ListRequest::Load,
        }
    }

    pub async fn begin_search_and_sort(
        &self,
        term: impl Into<String>,
        key: Option<SortKey>,
        direction: SortDirection,
    ) -> PendingQuery {
        let mut guard = self.inner.lock().await;
        guard.view.search_term = term.into();
        guard.view.sort_key = key;
        guard.view.sort_direction = direction;
        let pending = guard.plan_query();
        self.publish(&guard.view);
        pending
    }

    pub async fn begin_search(&self, term: impl Into<String>) -> PendingQuery {
        let mut guard = self.inner.lock().await;
        guard.view.search_term = term.into();
        let pending = guard.plan_query();
        self.publish(&guard.view);
        pending
    }

    pub async fn begin_refresh(&self) -> PendingQuery {
        let mut guard = self.inner.lock().await;
        let pending = guard.plan_query();
        self.publish(&guard.view);
        pending
    }

    pub async fn begin_toggle_sort(&self, column: SortKey) -> PendingQuery {
        let mut guard = self.inner.lock().await;
        guard.view.toggle_sort(column);
        let pending = guard.plan_query();
        self.publish(&guard.view);
        pending
    }

    pub async fn load(&self) -> RequestOutcome {
        let pending = self.begin_load().await;
        self.complete(pending).await
    }

    pub async fn apply_search_and_sort(
        &self,
        term: impl Into<String>,
        key: Option<SortKey>,
        direction: SortDirection,
    ) -> RequestOutcome {
        let pending = self.begin_search_and_sort(term, key, direction).await;
        self.complete(pending).await
    }

    pub async fn set_search_term(&self, term: impl Into<String>) -> RequestOutcome {
        let pending = self.begin_search(term).await;
        self.complete(pending).await
    }

    /// Re-issues the current term and sort, e.g. after a record was saved elsewhere.
    pub async fn refresh(&self) -> RequestOutcome {
        let pending = self.begin_refresh().await;
        self.complete(pending).await
    }

    pub async fn toggle_sort(&self, column: SortKey) -> RequestOutcome {
        let pending = self.begin_toggle_sort(column).await;
        self.complete(pending).await
    }

    /// Sends the request and applies the response if it is still the latest.
    pub async fn complete(&self, pending: PendingQuery) -> RequestOutcome {
        let PendingQuery { seq, request } = pending;
        match request {
            ListRequest::Load => {
                let result = self.api.list_languages(&self.token).await;
                self.finish_load(seq, result).await
            }
            ListRequest::Search(request) => {
                let result = self.api.search_languages(&self.token, &request).await;
                self.finish_search(seq, &request.search_keyword, result)
                    .await
            }
        }
    }

    async fn finish_load(
        &self,
        seq: u64,
        result: Result<Vec<ProgrammingLanguage>, ClientError>,
    ) -> RequestOutcome {
        let mut guard = self.inner.lock().await;
        if !guard.is_latest(seq) {
            debug!(request_seq = seq, latest = guard.latest_request, "discarding stale list response");
            return RequestOutcome::Superseded;
        }
        let outcome = match result {
            Ok(items) => {
                info!(request_seq = seq, count = items.len(), "loaded programming languages");
                guard.view.replace_items(items, SelectionPolicy::Clear);
                guard.view.load_state = LoadState::Ready;
                RequestOutcome::Applied
            }
            Err(err) => {
                warn!(request_seq = seq, "list request failed: {err}");
                guard.view.fail_listing(LOAD_FAILED_MESSAGE.to_string());
                failure_outcome(&err)
            }
        };
        self.publish(&guard.view);
        outcome
    }

    async fn finish_search(
        &self,
        seq: u64,
        term: &str,
        result: Result<Vec<ProgrammingLanguage>, ClientError>,
    ) -> RequestOutcome {
        let mut guard = self.inner.lock().await;
        if !guard.is_latest(seq) {
            debug!(request_seq = seq, latest = guard.latest_request, "discarding stale search response");
            return RequestOutcome::Superseded;
        }
        let outcome = match result {
            Ok(items) if !items.is_empty() => {
                info!(request_seq = seq, count = items.len(), "search returned results");
                guard.view.replace_items(items, SelectionPolicy::Intersect);
                guard.view.load_state = LoadState::Ready;
                RequestOutcome::Applied
            }
            Ok(_) | Err(ClientError::NotFound) => {
                debug!(request_seq = seq, "search returned no results");
                guard.view.fail_listing(no_results_message(term));
                RequestOutcome::Applied
            }
            Err(err) => {
                warn!(request_seq = seq, "search request failed: {err}");
                guard.view.fail_listing(SEARCH_FAILED_MESSAGE.to_string());
                failure_outcome(&err)
            }
        };
        self.publish(&guard.view);
        outcome
    }

    pub async fn toggle_select(&self, id: LanguageId) -> bool {
        let mut guard = self.inner.lock().await;
        let changed = guard.view.toggle_select(id);
        if changed {
            self.publish(&guard.view);
        }
        changed
    }

    pub async fn toggle_select_all(&self) {
        let mut guard = self.inner.lock().await;
        guard.view.toggle_select_all();
        self.publish(&guard.view);
    }

    pub async fn request_delete(&self, record: ProgrammingLanguage) {
        let mut guard = self.inner.lock().await;
        guard.view.pending_single_delete = Some(record);
        guard.view.delete_error = None;
        self.publish(&guard.view);
    }

    pub async fn cancel_delete(&self) {
        let mut guard = self.inner.lock().await;
        guard.view.pending_single_delete = None;
        guard.view.delete_error = None;
        self.publish(&guard.view);
    }

    /// Marks the pending single delete as in flight, or `None` when there is
    /// nothing to send.
    pub async fn begin_confirm_delete(&self) -> Option<PendingDelete> {
        let mut guard = self.inner.lock().await;
        if guard.view.delete_in_flight {
            return None;
        }
        let record = guard.view.pending_single_delete.clone()?;
        if !guard.view.contains(record.id) {
            debug!(language_id = record.id.0, "pending record no longer listed; closing dialog");
            guard.view.pending_single_delete = None;
            guard.view.delete_error = None;
            self.publish(&guard.view);
            return None;
        }
        guard.view.delete_in_flight = true;
        self.publish(&guard.view);
        Some(PendingDelete::Single(record.id))
    }

    pub async fn confirm_delete(&self) -> DeleteOutcome {
        match self.begin_confirm_delete().await {
            Some(pending) => self.complete_delete(pending).await,
            None => DeleteOutcome::Skipped,
        }
    }

    pub async fn complete_delete(&self, pending: PendingDelete) -> DeleteOutcome {
        match pending {
            PendingDelete::Single(id) => {
                let result = self.api.delete_language(&self.token, id).await;
                self.finish_delete(id, result).await
            }
            PendingDelete::Bulk(ids) => {
                let id_list: Vec<LanguageId> = ids.iter().copied().collect();
                let result = self.api.delete_languages(&self.token, &id_list).await;
                self.finish_bulk_delete(ids, result).await
            }
        }
    }

    async fn finish_delete(&self, id: LanguageId, result: Result<(), ClientError>) -> DeleteOutcome {
        let mut guard = self.inner.lock().await;
        guard.view.delete_in_flight = false;
        let outcome = match result {
            Ok(()) => {
                info!(language_id = id.0, "deleted programming language");
                guard.view.remove_items(&BTreeSet::from([id]));
                if guard
                    .view
                    .pending_single_delete
                    .as_ref()
                    .is_some_and(|pending| pending.id == id)
                {
                    guard.view.pending_single_delete = None;
                }
                guard.view.delete_error = None;
                DeleteOutcome::Deleted(1)
            }
            Err(err) => {
                warn!(language_id = id.0, "delete failed: {err}");
                guard.view.delete_error = Some(DELETE_FAILED_MESSAGE.to_string());
                delete_failure(&err)
            }
        };
        self.publish(&guard.view);
        outcome
    }

    /// Opens the bulk dialog; refuses when nothing is selected.
    pub async fn request_bulk_delete(&self) -> bool {
        let mut guard = self.inner.lock().await;
        if guard.view.selected.is_empty() {
            return false;
        }
        guard.view.pending_bulk_delete = true;
        guard.view.delete_error = None;
        self.publish(&guard.view);
        true
    }

    pub async fn cancel_bulk_delete(&self) {
        let mut guard = self.inner.lock().await;
        guard.view.pending_bulk_delete = false;
        guard.view.delete_error = None;
        self.publish(&guard.view);
    }

    pub async fn begin_confirm_bulk_delete(&self) -> Option<PendingDelete> {
        let mut guard = self.inner.lock().await;
        if guard.view.delete_in_flight
            || !guard.view.pending_bulk_delete
            || guard.view.selected.is_empty()
        {
            return None;
        }
        guard.view.delete_in_flight = true;
        self.publish(&guard.view);
        Some(PendingDelete::Bulk(guard.view.selected.clone()))
    }

    pub async fn confirm_bulk_delete(&self) -> DeleteOutcome {
        match self.begin_confirm_bulk_delete().await {
            Some(pending) => self.complete_delete(pending).await,
            None => DeleteOutcome::Skipped,
        }
    }

    async fn finish_bulk_delete(
        &self,
        ids: BTreeSet<LanguageId>,
        result: Result<(), ClientError>,
    ) -> DeleteOutcome {
        let mut guard = self.inner.lock().await;
        guard.view.delete_in_flight = false;
        let outcome = match result {
            Ok(()) => {
                info!(count = ids.len(), "deleted selected programming languages");
                guard.view.remove_items(&ids);
                guard.view.selected.clear();
                guard.view.pending_bulk_delete = false;
                guard.view.delete_error = None;
                DeleteOutcome::Deleted(ids.len())
            }
            Err(err) => {
                warn!(count = ids.len(), "bulk delete failed: {err}");
                guard.view.delete_error = Some(BULK_DELETE_FAILED_MESSAGE.to_string());
                delete_failure(&err)
            }
        };
        self.publish(&guard.view);
        outcome
    }
}

#[cfg(test)]
#[path = "tests/list_view_tests.rs"]
mod tests;
