//! Generic list view-model.
//!
//! One [`ListView`] drives every CRUD screen. The entity-specific parts
//! (endpoints, filter predicates, labels) come from its [`Resource`].
//!
//! Mutations never touch the local snapshot. On success they push a notice
//! and refetch; on failure they push an error notice and leave the snapshot
//! as it was.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::confirm::{ConfirmTarget, PendingConfirmation};
use super::error::{CrudError, CrudResult};
use super::notice::{Notice, NoticeBoard};
use super::resource::Resource;
use super::state::LoadState;
use crate::api::{execute, fetch_list, ApiClient, ApiRequest};

/// Counters over the loaded snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
}

/// View-model for one entity list screen.
pub struct ListView<R: Resource> {
    api: Arc<dyn ApiClient>,
    items: Vec<R::Entity>,
    state: LoadState,
    mutating: bool,
    scope: Vec<(String, String)>,
    filter: R::Filter,
    search: String,
    selection: BTreeSet<u64>,
    pending: Option<PendingConfirmation>,
    notices: NoticeBoard,
    last_loaded: Option<DateTime<Utc>>,
}

impl<R: Resource> ListView<R> {
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self {
            api,
            items: Vec::new(),
            state: LoadState::Idle,
            mutating: false,
            scope: Vec::new(),
            filter: R::Filter::default(),
            search: String::new(),
            selection: BTreeSet::new(),
            pending: None,
            notices: NoticeBoard::new(),
            last_loaded: None,
        }
    }

    /// Restrict the server-side query. Takes effect on the next [`load`](Self::load).
    pub fn set_scope(&mut self, key: &str, value: impl Into<String>) -> CrudResult<()> {
        if !R::SCOPE_KEYS.contains(&key) {
            return Err(CrudError::InvalidScope {
                resource: R::NAME,
                key: key.to_string(),
            });
        }
        let value = value.into();
        match self.scope.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.scope.push((key.to_string(), value)),
        }
        Ok(())
    }

    pub fn clear_scope(&mut self) {
        self.scope.clear();
    }

    pub fn scope(&self) -> &[(String, String)] {
        &self.scope
    }

    /// Fetch the list. On failure the previous snapshot is kept.
    pub async fn load(&mut self) -> CrudResult<()> {
        self.state = LoadState::Loading;
        let request = ApiRequest::get(R::PATH).with_queries(self.scope.iter().cloned());

        match fetch_list::<R::Entity>(self.api.as_ref(), request).await {
            Ok(items) => {
                debug!(resource = R::NAME, count = items.len(), "List loaded");
                self.items = items;
                self.state = LoadState::Loaded;
                self.last_loaded = Some(Utc::now());
                let present: BTreeSet<u64> = self.items.iter().map(R::id).collect();
                self.selection.retain(|id| present.contains(id));
                Ok(())
            }
            Err(e) => {
                warn!(resource = R::NAME, error = %e, "List load failed");
                let message = e.user_message();
                self.state = LoadState::LoadError(message.clone());
                self.notices.error(message);
                Err(e.into())
            }
        }
    }

    pub fn load_state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_mutating(&self) -> bool {
        self.mutating
    }

    pub fn last_loaded(&self) -> Option<DateTime<Utc>> {
        self.last_loaded
    }

    /// Every entity in the last loaded snapshot.
    pub fn items(&self) -> &[R::Entity] {
        &self.items
    }

    pub fn get(&self, id: u64) -> Option<&R::Entity> {
        self.items.iter().find(|e| R::id(e) == id)
    }

    pub fn filter(&self) -> &R::Filter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: R::Filter) {
        self.filter = filter;
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
    }

    /// Entities passing the current filter and search, in snapshot order.
    pub fn visible(&self) -> Vec<&R::Entity> {
        let needle = self.search.trim().to_lowercase();
        self.items
            .iter()
            .filter(|e| R::matches(e, &self.filter))
            .filter(|e| needle.is_empty() || R::search_text(e).to_lowercase().contains(&needle))
            .collect()
    }

    pub fn stats(&self) -> ListStats {
        self.items.iter().fold(ListStats::default(), |mut stats, e| {
            stats.total += 1;
            match R::is_active(e) {
                Some(true) => stats.active += 1,
                Some(false) => stats.inactive += 1,
                None => {}
            }
            stats
        })
    }

    pub fn toggle_selected(&mut self, id: u64) -> bool {
        if !self.selection.remove(&id) {
            self.selection.insert(id);
            true
        } else {
            false
        }
    }

    pub fn select_all_visible(&mut self) {
        let ids: Vec<u64> = self.visible().into_iter().map(R::id).collect();
        self.selection.extend(ids);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selected(&self) -> Vec<u64> {
        self.selection.iter().copied().collect()
    }

    pub fn is_selected(&self, id: u64) -> bool {
        self.selection.contains(&id)
    }

    pub async fn create(&mut self, draft: &R::Draft) -> CrudResult<()> {
        let body = encode(draft)?;
        let request = ApiRequest::post(R::PATH, body);
        self.mutate(
            request,
            format!("{} {}", capitalize(R::NAME), R::CREATED_VERB),
        )
        .await
    }

    pub async fn update(&mut self, id: u64, draft: &R::Draft) -> CrudResult<()> {
        let body = encode(draft)?;
        let request = ApiRequest::new(R::update_method(), R::item_path(id)).with_body(body);
        self.mutate(request, format!("{} updated", capitalize(R::NAME)))
            .await
    }

    pub async fn toggle_status(&mut self, id: u64) -> CrudResult<()> {
        if !R::HAS_STATUS {
            return Err(CrudError::Unsupported {
                resource: R::NAME,
                operation: "status changes",
            });
        }
        self.mutate(R::toggle_status_request(id), "Status updated".to_string())
            .await
    }

    /// Send a resource-specific action, then refetch.
    pub async fn run_action(&mut self, request: ApiRequest, success: &str) -> CrudResult<()> {
        self.mutate(request, success.to_string()).await
    }

    /// Open a confirmation for deleting one entity.
    pub fn request_delete(&mut self, id: u64) -> CrudResult<&PendingConfirmation> {
        if !R::CAN_DELETE {
            return Err(CrudError::Unsupported {
                resource: R::NAME,
                operation: "delete",
            });
        }
        let prompt = match self.get(id) {
            Some(entity) => format!("Delete {} \"{}\"?", R::NAME, R::label(entity)),
            None => format!("Delete {} #{}?", R::NAME, id),
        };
        Ok(self.pending.insert(PendingConfirmation::new(
            ConfirmTarget::Single(id),
            prompt,
            R::delete_request(id),
        )))
    }

    /// Open a confirmation for deleting several entities at once.
    pub fn request_bulk_delete(&mut self, ids: Vec<u64>) -> CrudResult<&PendingConfirmation> {
        if ids.is_empty() {
            return Err(CrudError::NothingPending);
        }
        let commit = R::bulk_delete_request(&ids).ok_or(CrudError::Unsupported {
            resource: R::NAME,
            operation: "bulk delete",
        })?;
        let prompt = format!("Delete {} selected {} records?", ids.len(), R::NAME);
        Ok(self
            .pending
            .insert(PendingConfirmation::new(ConfirmTarget::Bulk(ids), prompt, commit)))
    }

    pub fn request_delete_selected(&mut self) -> CrudResult<&PendingConfirmation> {
        let ids = self.selected();
        self.request_bulk_delete(ids)
    }

    pub fn pending(&self) -> Option<&PendingConfirmation> {
        self.pending.as_ref()
    }

    /// Discard the pending confirmation. Returns whether one was open.
    pub fn cancel_confirmation(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Send the pending delete, then refetch.
    pub async fn confirm(&mut self) -> CrudResult<()> {
        let pending = self.pending.take().ok_or(CrudError::NothingPending)?;
        let success = match &pending.target {
            ConfirmTarget::Single(_) => format!("{} deleted", capitalize(R::NAME)),
            ConfirmTarget::Bulk(ids) => format!("{} records deleted", ids.len()),
        };
        let result = self.mutate(pending.commit, success).await;
        if result.is_ok() {
            for id in pending.target.ids() {
                self.selection.remove(&id);
            }
        }
        result
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.take()
    }

    async fn mutate(&mut self, request: ApiRequest, success: String) -> CrudResult<()> {
        if self.mutating {
            return Err(CrudError::Busy);
        }
        info!(
            resource = R::NAME,
            method = %request.method,
            path = %request.path,
            "Sending mutation"
        );

        self.mutating = true;
        let result = execute(self.api.as_ref(), request).await;
        self.mutating = false;

        match result {
            Ok(message) => {
                self.notices.success(message.unwrap_or(success));
                // The mutation itself succeeded; a failed refetch is already
                // reported through the load state and notices.
                let _ = self.load().await;
                Ok(())
            }
            Err(e) => {
                warn!(resource = R::NAME, error = %e, "Mutation failed");
                self.notices.error(e.user_message());
                Err(e.into())
            }
        }
    }
}

impl<R: Resource> std::fmt::Debug for ListView<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListView")
            .field("resource", &R::NAME)
            .field("items", &self.items.len())
            .field("state", &self.state)
            .field("mutating", &self.mutating)
            .finish_non_exhaustive()
    }
}

fn encode<T: serde::Serialize>(draft: &T) -> CrudResult<serde_json::Value> {
    serde_json::to_value(draft).map_err(|e| CrudError::Encode(e.to_string()))
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::wire::{Row, RowError};
    use crate::api::{ApiError, HttpMethod, MockApiClient};
    use crate::crud::resource::{status_label, unknown_filter_key, StatusFilter};
    use crate::crud::NoticeLevel;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, Deserialize)]
    #[serde(try_from = "serde_json::Value")]
    struct Tag {
        id: u64,
        name: String,
        status: bool,
    }

    impl TryFrom<serde_json::Value> for Tag {
        type Error = RowError;

        fn try_from(value: serde_json::Value) -> Result<Self, RowError> {
            let row = Row::new(&value)?;
            Ok(Self {
                id: row.id(&["id"])?,
                name: row.required_string(&["name"])?,
                status: row.flag(&["status"]),
            })
        }
    }

    #[derive(Debug, Serialize)]
    struct TagDraft {
        name: String,
    }

    struct Tags;

    impl Resource for Tags {
        type Entity = Tag;
        type Draft = TagDraft;
        type Filter = StatusFilter;

        const NAME: &'static str = "tag";
        const PATH: &'static str = "/admin/tags";
        const SCOPE_KEYS: &'static [&'static str] = &["group_id"];
        const COLUMNS: &'static [&'static str] = &["ID", "Name", "Status"];

        fn id(e: &Tag) -> u64 {
            e.id
        }

        fn label(e: &Tag) -> String {
            e.name.clone()
        }

        fn is_active(e: &Tag) -> Option<bool> {
            Some(e.status)
        }

        fn matches(e: &Tag, filter: &StatusFilter) -> bool {
            filter.matches(Some(e.status))
        }

        fn row(e: &Tag) -> Vec<String> {
            vec![e.id.to_string(), e.name.clone(), status_label(Some(e.status))]
        }

        fn set_filter_field(filter: &mut StatusFilter, key: &str, value: &str) -> CrudResult<()> {
            match key {
                "status" => *filter = StatusFilter::parse(value)?,
                _ => return Err(unknown_filter_key::<Self>(key)),
            }
            Ok(())
        }
    }

    fn tags() -> serde_json::Value {
        json!([
            {"id": 1, "name": "Airport", "status": 1},
            {"id": 2, "name": "Night", "status": 0},
            {"id": 3, "name": "Airport VIP", "status": "active"}
        ])
    }

    fn view(api: &Arc<MockApiClient>) -> ListView<Tags> {
        ListView::new(api.clone())
    }

    #[tokio::test]
    async fn test_load_and_derive() {
        let api = Arc::new(MockApiClient::new());
        api.respond_ok(HttpMethod::Get, "/admin/tags", tags());
        let mut list = view(&api);
        assert_eq!(list.load_state(), &LoadState::Idle);

        list.load().await.unwrap();

        assert_eq!(list.load_state(), &LoadState::Loaded);
        assert_eq!(list.items().len(), 3);
        assert_eq!(
            list.stats(),
            ListStats {
                total: 3,
                active: 2,
                inactive: 1
            }
        );

        list.set_search("airport");
        assert_eq!(list.visible().len(), 2);
        list.set_filter(StatusFilter::Inactive);
        assert!(list.visible().is_empty());
        list.set_search("");
        assert_eq!(list.visible().len(), 1);

        assert_eq!(api.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_load_error_keeps_snapshot() {
        let api = Arc::new(MockApiClient::new());
        api.respond_ok(HttpMethod::Get, "/admin/tags", tags());
        api.respond(
            HttpMethod::Get,
            "/admin/tags",
            Err(ApiError::Network("connection reset".to_string())),
        );
        let mut list = view(&api);
        list.load().await.unwrap();

        assert!(list.load().await.is_err());

        assert_eq!(list.items().len(), 3);
        assert!(list.load_state().error().is_some());
        assert_eq!(list.take_notices()[0].level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn test_scope_is_sent_and_validated() {
        let api = Arc::new(MockApiClient::new());
        api.respond_ok(HttpMethod::Get, "/admin/tags", json!([]));
        let mut list = view(&api);

        list.set_scope("group_id", "4").unwrap();
        assert!(matches!(
            list.set_scope("bogus", "1"),
            Err(CrudError::InvalidScope { .. })
        ));
        list.load().await.unwrap();

        assert_eq!(api.calls()[0].query_value("group_id"), Some("4"));
    }

    #[tokio::test]
    async fn test_create_refetches() {
        let api = Arc::new(MockApiClient::new());
        api.respond_ok(HttpMethod::Get, "/admin/tags", tags());
        api.respond_message(HttpMethod::Post, "/admin/tags", "Tag saved");
        let mut list = view(&api);

        list.create(&TagDraft {
            name: "Weekend".to_string(),
        })
        .await
        .unwrap();

        assert_eq!(api.call_count(HttpMethod::Post, "/admin/tags"), 1);
        assert_eq!(api.call_count(HttpMethod::Get, "/admin/tags"), 1);
        let post = &api.calls()[0];
        assert_eq!(post.body, Some(json!({"name": "Weekend"})));
        let notices = list.take_notices();
        assert_eq!(notices[0].message, "Tag saved");
        assert!(!list.is_mutating());
    }

    #[tokio::test]
    async fn test_failed_update_leaves_snapshot() {
        let api = Arc::new(MockApiClient::new());
        api.respond_ok(HttpMethod::Get, "/admin/tags", tags());
        api.respond(
            HttpMethod::Put,
            "/admin/tags/2",
            Ok(json!({"success": false, "message": "Name already taken"})),
        );
        let mut list = view(&api);
        list.load().await.unwrap();

        let result = list
            .update(
                2,
                &TagDraft {
                    name: "Airport".to_string(),
                },
            )
            .await;

        assert!(result.is_err());
        assert_eq!(api.call_count(HttpMethod::Get, "/admin/tags"), 1);
        assert_eq!(list.get(2).unwrap().name, "Night");
        assert_eq!(list.take_notices()[0].message, "Name already taken");
    }

    #[tokio::test]
    async fn test_toggle_status_uses_patch() {
        let api = Arc::new(MockApiClient::new());
        api.respond_ok(HttpMethod::Get, "/admin/tags", tags());
        api.respond_message(HttpMethod::Patch, "/admin/tags/2/toggle-status", "ok");
        let mut list = view(&api);

        list.toggle_status(2).await.unwrap();

        assert_eq!(
            api.call_count(HttpMethod::Patch, "/admin/tags/2/toggle-status"),
            1
        );
    }

    #[tokio::test]
    async fn test_bulk_delete_posts_ids() {
        let api = Arc::new(MockApiClient::new());
        api.respond_ok(HttpMethod::Get, "/admin/tags", tags());
        api.respond_message(HttpMethod::Post, "/admin/tags/bulk-delete", "Deleted");
        let mut list = view(&api);
        list.load().await.unwrap();

        list.set_search("airport");
        list.select_all_visible();
        assert_eq!(list.selected(), vec![1, 3]);

        let pending = list.request_delete_selected().unwrap();
        assert_eq!(pending.target, ConfirmTarget::Bulk(vec![1, 3]));
        list.confirm().await.unwrap();

        let bulk = api
            .calls()
            .into_iter()
            .find(|c| c.path == "/admin/tags/bulk-delete")
            .unwrap();
        assert_eq!(bulk.body, Some(json!({"ids": [1, 3]})));
        assert!(list.selected().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_delete_requires_ids() {
        let api = Arc::new(MockApiClient::new());
        let mut list = view(&api);
        assert_eq!(
            list.request_delete_selected().unwrap_err(),
            CrudError::NothingPending
        );
        assert_eq!(list.confirm().await.unwrap_err(), CrudError::NothingPending);
    }

    #[test]
    fn test_selection_toggle() {
        let api = Arc::new(MockApiClient::new());
        let mut list = view(&api);
        assert!(list.toggle_selected(4));
        assert!(list.is_selected(4));
        assert!(!list.toggle_selected(4));
        assert!(!list.is_selected(4));
    }

    #[test]
    fn test_filter_from_pairs() {
        assert_eq!(
            Tags::filter_from_pairs([("status", "active")]).unwrap(),
            StatusFilter::Active
        );
        assert!(Tags::filter_from_pairs([("colour", "red")]).is_err());
    }
}
