//! Per-entity [`Resource`](crate::crud::Resource) implementations.
//!
//! Each module pairs a wire type (lenient decoding of backend rows), a draft
//! type (the create/update body) and a filter with a unit struct naming the
//! endpoint. A screen is then just `ListView::<SosContacts>::new(api)`.

mod cancellation_reasons;
mod category_features;
mod notifications;
mod ride_requests;
mod service_categories;
mod sos_contacts;
mod vehicle_categories;
mod wallets;

pub use cancellation_reasons::{
    CancellationReason, CancellationReasonDraft, CancellationReasonFilter, CancellationReasons,
    ReasonAudience,
};
pub use category_features::{
    CategoryFeature, CategoryFeatureDraft, CategoryFeatureFilter, CategoryFeatures,
};
pub use notifications::{
    Notification, NotificationAudience, NotificationDraft, NotificationFilter, Notifications,
};
pub use ride_requests::{
    RideRequest, RideRequestDraft, RideRequestFilter, RideRequests, RideStatus,
};
pub use service_categories::{ServiceCategories, ServiceCategory, ServiceCategoryDraft};
pub use sos_contacts::{SosContact, SosContactDraft, SosContacts};
pub use vehicle_categories::{VehicleCategories, VehicleCategory, VehicleCategoryDraft};
pub use wallets::{Wallet, WalletDraft, WalletFilter, WalletOwner, Wallets};
