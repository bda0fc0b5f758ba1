//! Top-level service categories (Economy, Comfort, Delivery, ...).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::wire::{Row, RowError};
use crate::crud::{status_label, unknown_filter_key, CrudError, Resource, StatusFilter};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct ServiceCategory {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub sort_order: Option<u64>,
    pub status: bool,
}

impl TryFrom<Value> for ServiceCategory {
    type Error = RowError;

    fn try_from(value: Value) -> Result<Self, RowError> {
        let row = Row::new(&value)?;
        Ok(Self {
            id: row.id(&["id"])?,
            name: row.required_string(&["name", "title"])?,
            description: row.opt_string(&["description"]),
            image: row.opt_string(&["image", "image_url"]),
            sort_order: row.opt_id(&["sort_order"]),
            status: row.flag(&["status", "is_active"]),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceCategoryDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<u64>,
    pub status: u8,
}

pub struct ServiceCategories;

impl Resource for ServiceCategories {
    type Entity = ServiceCategory;
    type Draft = ServiceCategoryDraft;
    type Filter = StatusFilter;

    const NAME: &'static str = "service category";
    const PATH: &'static str = "/admin/service-categories";
    const COLUMNS: &'static [&'static str] = &["ID", "Name", "Order", "Status"];

    fn id(e: &ServiceCategory) -> u64 {
        e.id
    }

    fn label(e: &ServiceCategory) -> String {
        e.name.clone()
    }

    fn search_text(e: &ServiceCategory) -> String {
        format!(
            "{} {}",
            e.name,
            e.description.as_deref().unwrap_or_default()
        )
    }

    fn is_active(e: &ServiceCategory) -> Option<bool> {
        Some(e.status)
    }

    fn matches(e: &ServiceCategory, filter: &StatusFilter) -> bool {
        filter.matches(Some(e.status))
    }

    fn row(e: &ServiceCategory) -> Vec<String> {
        vec![
            e.id.to_string(),
            e.name.clone(),
            e.sort_order.map(|o| o.to_string()).unwrap_or_default(),
            status_label(Some(e.status)),
        ]
    }

    fn set_filter_field(filter: &mut StatusFilter, key: &str, value: &str) -> Result<(), CrudError> {
        match key {
            "status" => *filter = StatusFilter::parse(value)?,
            _ => return Err(unknown_filter_key::<Self>(key)),
        }
        Ok(())
    }
}
