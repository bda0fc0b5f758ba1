//! Per-entity configuration of the generic list view-model.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use super::error::CrudError;
use crate::api::{ApiRequest, HttpMethod};

/// Everything [`ListView`](super::ListView) needs to know about one entity.
///
/// Implementations are unit structs; the trait only carries types, endpoint
/// layout and pure predicates.
pub trait Resource: Send + Sync + 'static {
    type Entity: DeserializeOwned + Clone + Debug + Send + Sync + 'static;
    type Draft: Serialize + Send + Sync;
    type Filter: Clone + Default + Debug + PartialEq + Send + Sync;

    /// Singular human name, e.g. "cancellation reason".
    const NAME: &'static str;

    /// Collection endpoint, e.g. `/admin/cancellation-reasons`.
    const PATH: &'static str;

    /// Server-side scope parameters the list endpoint accepts.
    const SCOPE_KEYS: &'static [&'static str] = &[];

    /// Column headings for tabular output.
    const COLUMNS: &'static [&'static str];

    /// Whether the entity has an active/inactive status that can be toggled.
    const HAS_STATUS: bool = true;

    /// Whether records can be deleted from the console.
    const CAN_DELETE: bool = true;

    /// Past-tense verb for a successful create, e.g. "sent" for notifications.
    const CREATED_VERB: &'static str = "created";

    fn id(entity: &Self::Entity) -> u64;

    /// Short display label used in prompts and notices.
    fn label(entity: &Self::Entity) -> String;

    /// Text the search box matches against.
    fn search_text(entity: &Self::Entity) -> String {
        Self::label(entity)
    }

    fn is_active(_entity: &Self::Entity) -> Option<bool> {
        None
    }

    fn matches(entity: &Self::Entity, filter: &Self::Filter) -> bool;

    /// One cell per entry of [`COLUMNS`](Self::COLUMNS).
    fn row(entity: &Self::Entity) -> Vec<String>;

    /// Set one filter field from `key=value` text.
    fn set_filter_field(filter: &mut Self::Filter, key: &str, value: &str) -> Result<(), CrudError>;

    fn filter_from_pairs<'a, I>(pairs: I) -> Result<Self::Filter, CrudError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut filter = Self::Filter::default();
        for (key, value) in pairs {
            Self::set_filter_field(&mut filter, key, value)?;
        }
        Ok(filter)
    }

    fn item_path(id: u64) -> String {
        format!("{}/{}", Self::PATH, id)
    }

    fn update_method() -> HttpMethod {
        HttpMethod::Put
    }

    fn delete_request(id: u64) -> ApiRequest {
        ApiRequest::new(HttpMethod::Delete, Self::item_path(id))
    }

    /// Bulk delete endpoint taking `{ids: [...]}`, if the resource has one.
    fn bulk_delete_path() -> Option<String> {
        Self::CAN_DELETE.then(|| format!("{}/bulk-delete", Self::PATH))
    }

    fn bulk_delete_request(ids: &[u64]) -> Option<ApiRequest> {
        Self::bulk_delete_path().map(|path| ApiRequest::post(path, json!({ "ids": ids })))
    }

    fn toggle_status_request(id: u64) -> ApiRequest {
        ApiRequest::new(
            HttpMethod::Patch,
            format!("{}/toggle-status", Self::item_path(id)),
        )
    }
}

/// Active/inactive filter shared by most resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl StatusFilter {
    pub fn matches(&self, active: Option<bool>) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => active == Some(true),
            StatusFilter::Inactive => active == Some(false),
        }
    }

    pub fn parse(value: &str) -> Result<Self, CrudError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" | "" => Ok(StatusFilter::All),
            "active" | "1" | "true" => Ok(StatusFilter::Active),
            "inactive" | "0" | "false" => Ok(StatusFilter::Inactive),
            other => Err(CrudError::InvalidFilter(format!(
                "unknown status '{}', expected all, active or inactive",
                other
            ))),
        }
    }
}

/// Render an optional status for table output.
pub fn status_label(active: Option<bool>) -> String {
    match active {
        Some(true) => "Active".to_string(),
        Some(false) => "Inactive".to_string(),
        None => "-".to_string(),
    }
}

/// Error for a filter key a resource does not know.
pub fn unknown_filter_key<R: Resource>(key: &str) -> CrudError {
    CrudError::InvalidFilter(format!("{} has no filter '{}'", R::NAME, key))
}
