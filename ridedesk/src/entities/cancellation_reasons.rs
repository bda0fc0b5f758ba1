//! Ride cancellation reasons offered to riders and drivers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::wire::{Row, RowError};
use crate::crud::{status_label, unknown_filter_key, CrudError, Resource, StatusFilter};

/// Who may pick a cancellation reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasonAudience {
    #[serde(alias = "user", alias = "passenger", alias = "customer")]
    Rider,
    Driver,
    #[serde(other)]
    All,
}

impl ReasonAudience {
    pub fn label(&self) -> &'static str {
        match self {
            ReasonAudience::Rider => "Rider",
            ReasonAudience::Driver => "Driver",
            ReasonAudience::All => "All",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct CancellationReason {
    pub id: u64,
    pub name: String,
    pub audience: ReasonAudience,
    pub status: bool,
    pub sort_order: Option<u64>,
}

impl TryFrom<Value> for CancellationReason {
    type Error = RowError;

    fn try_from(value: Value) -> Result<Self, RowError> {
        let row = Row::new(&value)?;
        Ok(Self {
            id: row.id(&["id"])?,
            name: row.required_string(&["name", "reason", "title"])?,
            // Missing, null and unknown types apply to everyone.
            audience: row
                .decode(&["type", "audience"])
                .unwrap_or(ReasonAudience::All),
            status: row.flag(&["status", "is_active"]),
            sort_order: row.opt_id(&["sort_order"]),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancellationReasonDraft {
    pub name: String,
    #[serde(rename = "type")]
    pub audience: ReasonAudience,
    pub status: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CancellationReasonFilter {
    /// `None` shows every audience.
    pub audience: Option<ReasonAudience>,
    pub status: StatusFilter,
}

pub struct CancellationReasons;

impl Resource for CancellationReasons {
    type Entity = CancellationReason;
    type Draft = CancellationReasonDraft;
    type Filter = CancellationReasonFilter;

    const NAME: &'static str = "cancellation reason";
    const PATH: &'static str = "/admin/cancellation-reasons";
    const SCOPE_KEYS: &'static [&'static str] = &["type"];
    const COLUMNS: &'static [&'static str] = &["ID", "Reason", "For", "Status"];

    fn id(e: &CancellationReason) -> u64 {
        e.id
    }

    fn label(e: &CancellationReason) -> String {
        e.name.clone()
    }

    fn is_active(e: &CancellationReason) -> Option<bool> {
        Some(e.status)
    }

    /// Reasons for everyone pass both the rider and the driver filter.
    fn matches(e: &CancellationReason, filter: &CancellationReasonFilter) -> bool {
        let audience_ok = match filter.audience {
            None => true,
            Some(wanted) => e.audience == wanted || e.audience == ReasonAudience::All,
        };
        audience_ok && filter.status.matches(Some(e.status))
    }

    fn row(e: &CancellationReason) -> Vec<String> {
        vec![
            e.id.to_string(),
            e.name.clone(),
            e.audience.label().to_string(),
            status_label(Some(e.status)),
        ]
    }

    fn set_filter_field(
        filter: &mut CancellationReasonFilter,
        key: &str,
        value: &str,
    ) -> Result<(), CrudError> {
        match key {
            "type" | "audience" => {
                filter.audience = match value.trim().to_ascii_lowercase().as_str() {
                    "all" | "" => None,
                    "rider" => Some(ReasonAudience::Rider),
                    "driver" => Some(ReasonAudience::Driver),
                    other => {
                        return Err(CrudError::InvalidFilter(format!(
                            "unknown reason type '{}', expected rider, driver or all",
                            other
                        )))
                    }
                }
            }
            "status" => filter.status = StatusFilter::parse(value)?,
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
    fn test_decodes_backend_row() {
        let reason: CancellationReason = serde_json::from_value(json!({
            "id": 1, "name": "Rider cancelled", "type": "rider", "status": 1
        }))
        .unwrap();
        assert_eq!(reason.audience, ReasonAudience::Rider);
        assert!(reason.status);

        let reason: CancellationReason =
            serde_json::from_value(json!({"id": "2", "reason": "Other", "type": "both"})).unwrap();
        assert_eq!(reason.audience, ReasonAudience::All);
        assert_eq!(reason.name, "Other");
    }

    #[test]
    fn test_overlapping_names_and_null_type_decode() {
        let reason: CancellationReason = serde_json::from_value(json!({
            "id": "1", "name": "Rider cancelled", "reason": "Rider cancelled",
            "type": "rider", "status": 1, "is_active": 0
        }))
        .unwrap();
        assert_eq!(reason.id, 1);
        assert_eq!(reason.name, "Rider cancelled");
        assert_eq!(reason.audience, ReasonAudience::Rider);
        assert!(reason.status);

        let reason: CancellationReason = serde_json::from_value(json!({
            "id": 2, "name": null, "title": "Driver late", "type": null, "status": "1"
        }))
        .unwrap();
        assert_eq!(reason.name, "Driver late");
        assert_eq!(reason.audience, ReasonAudience::All);
    }

    #[test]
    fn test_row_without_name_is_rejected() {
        let result: Result<CancellationReason, _> =
            serde_json::from_value(json!({"id": 3, "type": "driver"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_audience_filter() {
        let rider: CancellationReason =
            serde_json::from_value(json!({"id": 1, "name": "a", "type": "rider", "status": 1}))
                .unwrap();
        let everyone: CancellationReason =
            serde_json::from_value(json!({"id": 2, "name": "b", "type": "all", "status": 1}))
                .unwrap();

        let drivers = CancellationReasons::filter_from_pairs([("type", "driver")]).unwrap();
        assert!(!CancellationReasons::matches(&rider, &drivers));
        assert!(CancellationReasons::matches(&everyone, &drivers));

        assert!(CancellationReasons::filter_from_pairs([("type", "robot")]).is_err());
    }

    #[test]
    fn test_draft_serializes_type() {
        let draft = CancellationReasonDraft {
            name: "Driver late".to_string(),
            audience: ReasonAudience::Rider,
            status: 1,
            sort_order: None,
        };
        assert_eq!(
            serde_json::to_value(&draft).unwrap(),
            json!({"name": "Driver late", "type": "rider", "status": 1})
        );
    }
}
