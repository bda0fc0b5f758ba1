//! Demand heatmap.

mod model;
mod view;

pub use model::{
    DemandPeriod, DemandSummary, DemandZone, Intensity, RideMarker, HIGH_DEMAND_THRESHOLD,
    MEDIUM_DEMAND_THRESHOLD,
};
pub use view::{DemandConfig, DemandSnapshot, DemandView, DEMAND_RIDES_PATH, DEMAND_ZONES_PATH};
