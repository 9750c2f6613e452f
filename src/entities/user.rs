//! User record - staff members referenced by shifts and timesheets

use serde::{Deserialize, Serialize};

use crate::core::entity::{EntityKind, LookupRecord};

/// A Nimbus user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "ID")]
    pub id: i64,

    #[serde(rename = "Forename", default)]
    pub forename: Option<String>,

    #[serde(rename = "Surname", default)]
    pub surname: Option<String>,

    /// Payroll number
    #[serde(rename = "Payroll", default)]
    pub payroll: Option<String>,
}

impl User {
    /// "Forename Surname", trimmed; empty if neither is set
    pub fn full_name(&self) -> String {
        let forename = self.forename.as_deref().unwrap_or("").trim();
        let surname = self.surname.as_deref().unwrap_or("").trim();
        format!("{} {}", forename, surname).trim().to_string()
    }
}

impl LookupRecord for User {
    const ENTITY_SET: &'static str = "User";
    const SELECT: &'static [&'static str] = &["ID", "Forename", "Surname", "Payroll"];
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> i64 {
        self.id
    }

    fn description(&self) -> String {
        let name = self.full_name();
        if name.is_empty() {
            Self::KIND.placeholder(self.id)
        } else {
            name
        }
    }

    fn secondary_id(&self) -> Option<&str> {
        self.payroll.as_deref().filter(|p| !p.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_deserialize_from_odata() {
        let json = r#"{"ID": 12, "Forename": " Ada ", "Surname": "Lovelace", "Payroll": "P-0012"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, 12);
        assert_eq!(user.description(), "Ada Lovelace");
        assert_eq!(user.secondary_id(), Some("P-0012"));
    }

    #[test]
    fn test_user_blank_name_falls_back() {
        let user: User = serde_json::from_str(r#"{"ID": 5, "Payroll": "  "}"#).unwrap();
        assert_eq!(user.description(), "User 5");
        assert_eq!(user.secondary_id(), None);
    }
}
