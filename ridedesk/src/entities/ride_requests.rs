//! Ride requests and their lifecycle status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::wire::{self, Row, RowError};
use crate::api::ApiRequest;
use crate::crud::{unknown_filter_key, CrudError, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    #[serde(alias = "requested")]
    Pending,
    Accepted,
    #[serde(alias = "driver_arrived")]
    Arrived,
    #[serde(alias = "started", alias = "ongoing")]
    InProgress,
    Completed,
    #[serde(alias = "canceled")]
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl RideStatus {
    pub fn parse(value: &str) -> Option<Self> {
        serde_json::from_value(json!(value.trim().to_ascii_lowercase())).ok()
    }

    /// Rides that can still be cancelled from the console.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            RideStatus::Pending | RideStatus::Accepted | RideStatus::Arrived | RideStatus::InProgress
        )
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RideStatus::Pending => "pending",
            RideStatus::Accepted => "accepted",
            RideStatus::Arrived => "arrived",
            RideStatus::InProgress => "in progress",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
            RideStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct RideRequest {
    pub id: u64,
    pub rider_name: String,
    pub driver_name: Option<String>,
    pub pickup: String,
    pub dropoff: String,
    pub status: RideStatus,
    pub fare: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<Value> for RideRequest {
    type Error = RowError;

    fn try_from(value: Value) -> Result<Self, RowError> {
        let row = Row::new(&value)?;
        Ok(Self {
            id: row.id(&["id"])?,
            rider_name: row.string_or_empty(&["rider_name", "user_name", "rider"]),
            driver_name: row.opt_string(&["driver_name", "driver"]),
            pickup: row.string_or_empty(&["pickup", "pickup_address"]),
            dropoff: row.string_or_empty(&["dropoff", "dropoff_address", "destination"]),
            status: row
                .first(&["status"], |v| v.as_str().and_then(RideStatus::parse))
                .unwrap_or(RideStatus::Unknown),
            fare: row.opt_f64(&["fare", "total_fare", "estimated_fare"]),
            created_at: row.opt_timestamp(&["created_at"]),
        })
    }
}

/// Ride requests originate in the apps; the draft exists for edits only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RideRequestDraft {
    pub status: RideStatus,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RideRequestFilter {
    pub status: Option<RideStatus>,
    /// Only rides that are still in flight.
    pub open_only: bool,
}

pub struct RideRequests;

impl RideRequests {
    pub fn cancel_request(id: u64, reason: &str) -> ApiRequest {
        ApiRequest::post(
            format!("{}/cancel", Self::item_path(id)),
            json!({ "reason": reason }),
        )
    }
}

impl Resource for RideRequests {
    type Entity = RideRequest;
    type Draft = RideRequestDraft;
    type Filter = RideRequestFilter;

    const NAME: &'static str = "ride request";
    const PATH: &'static str = "/admin/ride-requests";
    const SCOPE_KEYS: &'static [&'static str] = &["status", "from", "to"];
    const COLUMNS: &'static [&'static str] =
        &["ID", "Rider", "Driver", "Pickup", "Dropoff", "Status", "Fare"];
    const HAS_STATUS: bool = false;

    fn id(e: &RideRequest) -> u64 {
        e.id
    }

    fn label(e: &RideRequest) -> String {
        format!("ride #{}", e.id)
    }

    fn search_text(e: &RideRequest) -> String {
        format!(
            "{} {} {} {}",
            e.rider_name,
            e.driver_name.as_deref().unwrap_or_default(),
            e.pickup,
            e.dropoff
        )
    }

    fn matches(e: &RideRequest, filter: &RideRequestFilter) -> bool {
        filter.status.map_or(true, |wanted| e.status == wanted)
            && (!filter.open_only || e.status.is_open())
    }

    fn row(e: &RideRequest) -> Vec<String> {
        vec![
            e.id.to_string(),
            e.rider_name.clone(),
            e.driver_name.clone().unwrap_or_else(|| "-".to_string()),
            e.pickup.clone(),
            e.dropoff.clone(),
            e.status.to_string(),
            e.fare.map(|f| format!("{:.2}", f)).unwrap_or_default(),
        ]
    }

    fn set_filter_field(
        filter: &mut RideRequestFilter,
        key: &str,
        value: &str,
    ) -> Result<(), CrudError> {
        match key {
            "status" => {
                filter.status = if value.trim().is_empty() || value.trim() == "all" {
                    None
                } else {
                    match RideStatus::parse(value) {
                        Some(RideStatus::Unknown) | None => {
                            return Err(CrudError::InvalidFilter(format!(
                                "unknown ride status '{}'",
                                value
                            )))
                        }
                        status => status,
                    }
                };
            }
            "open" => {
                filter.open_only = wire::value_to_flag(&json!(value)).ok_or_else(|| {
                    CrudError::InvalidFilter(format!("'{}' is not a yes/no value", value))
                })?;
            }
            _ => return Err(unknown_filter_key::<Self>(key)),
        }
        Ok(())
    }
}
