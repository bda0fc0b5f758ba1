//! Vehicle classes within a service category, with their fares.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::wire::{Row, RowError};
use crate::crud::{status_label, unknown_filter_key, CrudError, Resource, StatusFilter};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct VehicleCategory {
    pub id: u64,
    pub name: String,
    pub service_category_id: Option<u64>,
    pub capacity: Option<u64>,
    pub base_fare: f64,
    pub per_km: f64,
    pub per_minute: f64,
    pub status: bool,
}

impl TryFrom<Value> for VehicleCategory {
    type Error = RowError;

    fn try_from(value: Value) -> Result<Self, RowError> {
        let row = Row::new(&value)?;
        Ok(Self {
            id: row.id(&["id"])?,
            name: row.required_string(&["name", "title"])?,
            service_category_id: row.opt_id(&["service_category_id", "category_id"]),
            capacity: row.opt_id(&["capacity", "seats", "max_passengers"]),
            base_fare: row.f64_or_zero(&["base_fare"]),
            per_km: row.f64_or_zero(&["per_km", "price_per_km"]),
            per_minute: row.f64_or_zero(&["per_minute", "price_per_minute"]),
            status: row.flag(&["status", "is_active"]),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleCategoryDraft {
    pub name: String,
    pub service_category_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u64>,
    pub base_fare: f64,
    pub per_km: f64,
    pub per_minute: f64,
    pub status: u8,
}

pub struct VehicleCategories;

impl Resource for VehicleCategories {
    type Entity = VehicleCategory;
    type Draft = VehicleCategoryDraft;
    type Filter = StatusFilter;

    const NAME: &'static str = "vehicle category";
    const PATH: &'static str = "/admin/vehicle-categories";
    const SCOPE_KEYS: &'static [&'static str] = &["service_category_id"];
    const COLUMNS: &'static [&'static str] = &["ID", "Name", "Seats", "Base", "Per km", "Status"];

    fn id(e: &VehicleCategory) -> u64 {
        e.id
    }

    fn label(e: &VehicleCategory) -> String {
        e.name.clone()
    }

    fn is_active(e: &VehicleCategory) -> Option<bool> {
        Some(e.status)
    }

    fn matches(e: &VehicleCategory, filter: &StatusFilter) -> bool {
        filter.matches(Some(e.status))
    }

    fn row(e: &VehicleCategory) -> Vec<String> {
        vec![
            e.id.to_string(),
            e.name.clone(),
            e.capacity.map(|c| c.to_string()).unwrap_or_default(),
            format!("{:.2}", e.base_fare),
            format!("{:.2}", e.per_km),
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
