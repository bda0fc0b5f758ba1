//! Rider and driver wallets.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::wire::{Row, RowError};
use crate::api::ApiRequest;
use crate::crud::{unknown_filter_key, CrudError, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletOwner {
    #[serde(alias = "rider", alias = "customer")]
    User,
    Driver,
    #[serde(other)]
    Unknown,
}

impl WalletOwner {
    pub fn label(&self) -> &'static str {
        match self {
            WalletOwner::User => "Rider",
            WalletOwner::Driver => "Driver",
            WalletOwner::Unknown => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct Wallet {
    pub id: u64,
    pub owner: WalletOwner,
    pub owner_name: String,
    pub balance: f64,
    pub currency: Option<String>,
}

impl TryFrom<Value> for Wallet {
    type Error = RowError;

    fn try_from(value: Value) -> Result<Self, RowError> {
        let row = Row::new(&value)?;
        Ok(Self {
            id: row.id(&["id"])?,
            owner: row
                .decode(&["owner", "owner_type", "type"])
                .unwrap_or(WalletOwner::Unknown),
            owner_name: row.string_or_empty(&["owner_name", "name", "user_name"]),
            balance: row.f64_or_zero(&["balance"]),
            currency: row.opt_string(&["currency"]),
        })
    }
}

/// Wallets are opened by the backend; the console never creates them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletDraft {
    pub owner_type: WalletOwner,
    pub owner_id: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalletFilter {
    pub owner: Option<WalletOwner>,
}

pub struct Wallets;

impl Wallets {
    /// Credit (positive) or debit (negative) a wallet.
    pub fn adjust_balance(id: u64, amount: f64, note: &str) -> ApiRequest {
        ApiRequest::post(
            format!("{}/adjust", Self::item_path(id)),
            json!({ "amount": amount, "note": note }),
        )
    }
}

impl Resource for Wallets {
    type Entity = Wallet;
    type Draft = WalletDraft;
    type Filter = WalletFilter;

    const NAME: &'static str = "wallet";
    const PATH: &'static str = "/admin/wallets";
    const COLUMNS: &'static [&'static str] = &["ID", "Owner", "Type", "Balance"];
    const HAS_STATUS: bool = false;
    const CAN_DELETE: bool = false;

    fn id(e: &Wallet) -> u64 {
        e.id
    }

    fn label(e: &Wallet) -> String {
        if e.owner_name.is_empty() {
            format!("Wallet #{}", e.id)
        } else {
            e.owner_name.clone()
        }
    }

    fn matches(e: &Wallet, filter: &WalletFilter) -> bool {
        filter.owner.map_or(true, |wanted| e.owner == wanted)
    }

    fn row(e: &Wallet) -> Vec<String> {
        vec![
            e.id.to_string(),
            Self::label(e),
            e.owner.label().to_string(),
            match &e.currency {
                Some(currency) => format!("{:.2} {}", e.balance, currency),
                None => format!("{:.2}", e.balance),
            },
        ]
    }

    fn set_filter_field(filter: &mut WalletFilter, key: &str, value: &str) -> Result<(), CrudError> {
        match key {
            "owner" | "type" | "owner_type" => {
                filter.owner = match value.trim().to_ascii_lowercase().as_str() {
                    "" | "all" => None,
                    "user" | "rider" => Some(WalletOwner::User),
                    "driver" => Some(WalletOwner::Driver),
                    other => {
                        return Err(CrudError::InvalidFilter(format!(
                            "unknown wallet owner '{}', expected rider, driver or all",
                            other
                        )))
                    }
                }
            }
            _ => return Err(unknown_filter_key::<Self>(key)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HttpMethod;

    #[test]
    fn test_adjust_request() {
        let request = Wallets::adjust_balance(9, -12.5, "refund reversal");
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.path, "/admin/wallets/9/adjust");
        assert_eq!(
            request.body,
            Some(json!({"amount": -12.5, "note": "refund reversal"}))
        );
    }

    #[test]
    fn test_wallets_cannot_be_bulk_deleted() {
        assert!(Wallets::bulk_delete_request(&[1, 2]).is_none());
    }

    #[test]
    fn test_owner_filter() {
        let wallet: Wallet = serde_json::from_value(json!({
            "id": 2, "owner_type": "driver", "balance": "40.10", "currency": "SAR"
        }))
        .unwrap();
        assert_eq!(Wallets::row(&wallet), vec!["2", "Wallet #2", "Driver", "40.10 SAR"]);

        let riders = Wallets::filter_from_pairs([("owner", "rider")]).unwrap();
        assert!(!Wallets::matches(&wallet, &riders));
        assert!(Wallets::matches(&wallet, &WalletFilter::default()));
    }

    #[test]
    fn test_overlapping_spellings_decode() {
        let wallet: Wallet = serde_json::from_value(json!({
            "id": "5", "owner_type": null, "type": "customer",
            "name": "Sara", "user_name": "sara_q", "balance": "12.00"
        }))
        .unwrap();
        assert_eq!(wallet.owner, WalletOwner::User);
        assert_eq!(wallet.owner_name, "Sara");
        assert_eq!(wallet.balance, 12.0);

        let wallet: Wallet =
            serde_json::from_value(json!({"id": 6, "owner_type": null})).unwrap();
        assert_eq!(wallet.owner, WalletOwner::Unknown);
    }
}
