//! Emergency numbers shown in the rider and driver apps.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::wire::{Row, RowError};
use crate::crud::{status_label, unknown_filter_key, CrudError, Resource, StatusFilter};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct SosContact {
    pub id: u64,
    pub name: String,
    pub phone: String,
    pub country_code: Option<String>,
    pub status: bool,
}

impl TryFrom<Value> for SosContact {
    type Error = RowError;

    fn try_from(value: Value) -> Result<Self, RowError> {
        let row = Row::new(&value)?;
        Ok(Self {
            id: row.id(&["id"])?,
            name: row.required_string(&["name", "title"])?,
            phone: row.required_string(&["phone", "number", "mobile"])?,
            country_code: row.opt_string(&["country_code"]),
            status: row.flag(&["status", "is_active"]),
        })
    }
}

impl SosContact {
    pub fn dial_string(&self) -> String {
        match &self.country_code {
            Some(code) if !self.phone.starts_with('+') => {
                format!("+{} {}", code.trim_start_matches('+'), self.phone)
            }
            _ => self.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SosContactDraft {
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    pub status: u8,
}

pub struct SosContacts;

impl Resource for SosContacts {
    type Entity = SosContact;
    type Draft = SosContactDraft;
    type Filter = StatusFilter;

    const NAME: &'static str = "SOS contact";
    const PATH: &'static str = "/admin/sos-contacts";
    const COLUMNS: &'static [&'static str] = &["ID", "Name", "Phone", "Status"];

    fn id(e: &SosContact) -> u64 {
        e.id
    }

    fn label(e: &SosContact) -> String {
        e.name.clone()
    }

    fn search_text(e: &SosContact) -> String {
        format!("{} {}", e.name, e.phone)
    }

    fn is_active(e: &SosContact) -> Option<bool> {
        Some(e.status)
    }

    fn matches(e: &SosContact, filter: &StatusFilter) -> bool {
        filter.matches(Some(e.status))
    }

    fn row(e: &SosContact) -> Vec<String> {
        vec![
            e.id.to_string(),
            e.name.clone(),
            e.dial_string(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dial_string() {
        let contact: SosContact = serde_json::from_value(json!({
            "id": 1, "name": "Police", "number": 999, "country_code": "966", "status": 1
        }))
        .unwrap();
        assert_eq!(contact.dial_string(), "+966 999");
        assert!(SosContacts::search_text(&contact).contains("999"));
    }

    #[test]
    fn test_overlapping_spellings_decode() {
        let contact: SosContact = serde_json::from_value(json!({
            "id": "3", "name": "Ambulance", "title": "Ambulance",
            "phone": null, "number": "997", "mobile": "0500000000", "status": "active"
        }))
        .unwrap();
        assert_eq!(contact.id, 3);
        assert_eq!(contact.phone, "997");
        assert!(contact.status);
    }

    #[test]
    fn test_contact_without_phone_is_rejected() {
        let result: Result<SosContact, _> =
            serde_json::from_value(json!({"id": 4, "name": "Fire"}));
        assert!(result.is_err());
    }
}
