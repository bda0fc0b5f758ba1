//! Features advertised on a service category (AC, Wi-Fi, child seat, ...).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::wire::{Row, RowError};
use crate::crud::{status_label, unknown_filter_key, CrudError, Resource, StatusFilter};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct CategoryFeature {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub service_category_id: Option<u64>,
    pub service_category_name: Option<String>,
    pub status: bool,
}

impl TryFrom<Value> for CategoryFeature {
    type Error = RowError;

    fn try_from(value: Value) -> Result<Self, RowError> {
        let row = Row::new(&value)?;
        Ok(Self {
            id: row.id(&["id"])?,
            name: row.required_string(&["name", "title"])?,
            description: row.opt_string(&["description"]),
            icon: row.opt_string(&["icon"]),
            service_category_id: row.opt_id(&["service_category_id", "category_id"]),
            service_category_name: row.opt_string(&[
                "service_category_name",
                "category_name",
                "service_category",
            ]),
            status: row.flag(&["status", "is_active"]),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryFeatureDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub service_category_id: u64,
    pub status: u8,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryFeatureFilter {
    pub status: StatusFilter,
    pub service_category_id: Option<u64>,
}

pub struct CategoryFeatures;

impl Resource for CategoryFeatures {
    type Entity = CategoryFeature;
    type Draft = CategoryFeatureDraft;
    type Filter = CategoryFeatureFilter;

    const NAME: &'static str = "category feature";
    const PATH: &'static str = "/admin/category-features";
    const SCOPE_KEYS: &'static [&'static str] = &["service_category_id"];
    const COLUMNS: &'static [&'static str] = &["ID", "Feature", "Category", "Status"];

    fn id(e: &CategoryFeature) -> u64 {
        e.id
    }

    fn label(e: &CategoryFeature) -> String {
        e.name.clone()
    }

    fn search_text(e: &CategoryFeature) -> String {
        format!(
            "{} {}",
            e.name,
            e.description.as_deref().unwrap_or_default()
        )
    }

    fn is_active(e: &CategoryFeature) -> Option<bool> {
        Some(e.status)
    }

    fn matches(e: &CategoryFeature, filter: &CategoryFeatureFilter) -> bool {
        filter.status.matches(Some(e.status))
            && filter
                .service_category_id
                .map_or(true, |wanted| e.service_category_id == Some(wanted))
    }

    fn row(e: &CategoryFeature) -> Vec<String> {
        vec![
            e.id.to_string(),
            e.name.clone(),
            e.service_category_name
                .clone()
                .or_else(|| e.service_category_id.map(|id| format!("#{}", id)))
                .unwrap_or_else(|| "-".to_string()),
            status_label(Some(e.status)),
        ]
    }

    fn set_filter_field(
        filter: &mut CategoryFeatureFilter,
        key: &str,
        value: &str,
    ) -> Result<(), CrudError> {
        match key {
            "status" => filter.status = StatusFilter::parse(value)?,
            "service_category_id" | "category" => {
                let id = value.trim().parse().map_err(|_| {
                    CrudError::InvalidFilter(format!("'{}' is not a category id", value))
                })?;
                filter.service_category_id = Some(id);
            }
            _ => return Err(unknown_filter_key::<Self>(key)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_filter() {
        let feature: CategoryFeature = serde_json::from_value(json!({
            "id": 3, "name": "Air conditioning", "category_id": "2", "status": "1"
        }))
        .unwrap();

        let same = CategoryFeatures::filter_from_pairs([("category", "2")]).unwrap();
        let other = CategoryFeatures::filter_from_pairs([("category", "5")]).unwrap();
        assert!(CategoryFeatures::matches(&feature, &same));
        assert!(!CategoryFeatures::matches(&feature, &other));
        assert!(CategoryFeatures::filter_from_pairs([("category", "x")]).is_err());
        assert_eq!(CategoryFeatures::row(&feature)[2], "#2");
    }

    #[test]
    fn test_overlapping_spellings_decode() {
        let feature: CategoryFeature = serde_json::from_value(json!({
            "id": "8", "name": "Wi-Fi", "title": "Wi-Fi",
            "service_category_id": null, "category_id": "2",
            "category_name": "Comfort", "service_category": {"id": 2},
            "status": null, "is_active": 1
        }))
        .unwrap();
        assert_eq!(feature.id, 8);
        assert_eq!(feature.service_category_id, Some(2));
        assert_eq!(feature.service_category_name.as_deref(), Some("Comfort"));
        assert!(feature.status);
    }
}
