//! Common types and utilities shared across CLI commands.

use clap::ValueEnum;

use crate::error::CliError;

/// Entity kind selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum EntityKind {
    /// Ride cancellation reasons
    CancellationReasons,
    /// Features offered by a service category
    CategoryFeatures,
    /// Push notifications sent to riders and drivers
    Notifications,
    /// Ride requests
    RideRequests,
    /// Top-level service categories
    ServiceCategories,
    /// Emergency contacts shown in the apps
    SosContacts,
    /// Vehicle classes and their fares
    VehicleCategories,
    /// Rider and driver wallets
    Wallets,
}

/// Run a generic async function for the resource type behind an [`EntityKind`].
///
/// ```ignore
/// with_resource!(kind, |R| run_list::<R>(api, &args))
/// ```
macro_rules! with_resource {
    ($kind:expr, |$r:ident| $body:expr) => {{
        use ridedesk::entities::*;
        use $crate::commands::common::EntityKind;
        match $kind {
            EntityKind::CancellationReasons => {
                type $r = CancellationReasons;
                $body
            }
            EntityKind::CategoryFeatures => {
                type $r = CategoryFeatures;
                $body
            }
            EntityKind::Notifications => {
                type $r = Notifications;
                $body
            }
            EntityKind::RideRequests => {
                type $r = RideRequests;
                $body
            }
            EntityKind::ServiceCategories => {
                type $r = ServiceCategories;
                $body
            }
            EntityKind::SosContacts => {
                type $r = SosContacts;
                $body
            }
            EntityKind::VehicleCategories => {
                type $r = VehicleCategories;
                $body
            }
            EntityKind::Wallets => {
                type $r = Wallets;
                $body
            }
        }
    }};
}

pub(crate) use with_resource;

/// Split `key=value` arguments.
pub fn parse_pairs(args: &[String]) -> Result<Vec<(String, String)>, CliError> {
    args.iter()
        .map(|arg| {
            let (key, value) = arg.split_once('=').ok_or_else(|| {
                CliError::Config(format!("Expected KEY=VALUE, got '{}'", arg))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(CliError::Config(format!("Missing key in '{}'", arg)));
            }
            Ok((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Require an interactive terminal for prompts.
pub fn require_tty(action: &str) -> Result<(), CliError> {
    if atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout) {
        Ok(())
    } else {
        Err(CliError::Terminal(format!(
            "{} needs an interactive terminal; pass --yes to skip the prompt",
            action
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_pairs() {
        let pairs = parse_pairs(&args(&["status=active", " type = rider "])).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("status".to_string(), "active".to_string()),
                ("type".to_string(), "rider".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_pairs_keeps_equals_in_value() {
        let pairs = parse_pairs(&args(&["note=a=b"])).unwrap();
        assert_eq!(pairs[0].1, "a=b");
    }

    #[test]
    fn test_parse_pairs_rejects_malformed() {
        assert!(parse_pairs(&args(&["status"])).is_err());
        assert!(parse_pairs(&args(&["=active"])).is_err());
    }

    #[test]
    fn test_entity_kind_names() {
        let kind = EntityKind::from_str("sos-contacts", true).unwrap();
        assert_eq!(kind, EntityKind::SosContacts);
        assert!(EntityKind::from_str("drivers", true).is_err());
    }
}
