//! Record trait - common interface for flat reference-data records

use serde::de::DeserializeOwned;

/// Common trait for the flat lookup tables (users, locations, departments, ...)
pub trait LookupRecord: DeserializeOwned + Clone + Send + Sync {
    /// The OData entity set the records are loaded from
    const ENTITY_SET: &'static str;

    /// Fields requested with `$select`
    const SELECT: &'static [&'static str];

    /// Label used when synthesizing a placeholder (e.g. "Location 42")
    const KIND: EntityKind;

    /// Get the record's numeric ID
    fn id(&self) -> i64;

    /// Get the human-readable description used for display and sorting
    fn description(&self) -> String;

    /// Optional secondary identifier (payroll number for users)
    fn secondary_id(&self) -> Option<&str> {
        None
    }
}

/// The kinds of reference data held by the lookup cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    User,
    Location,
    Department,
    AgreementType,
    Schedule,
}

impl EntityKind {
    /// Display label used in placeholders
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::User => "User",
            EntityKind::Location => "Location",
            EntityKind::Department => "Department",
            EntityKind::AgreementType => "Agreement Type",
            EntityKind::Schedule => "Schedule",
        }
    }

    /// Placeholder shown when an ID is valid but not cached
    pub fn placeholder(&self, id: i64) -> String {
        format!("{} {}", self.label(), id)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::User => write!(f, "user"),
            EntityKind::Location => write!(f, "location"),
            EntityKind::Department => write!(f, "department"),
            EntityKind::AgreementType => write!(f, "agreement-type"),
            EntityKind::Schedule => write!(f, "schedule"),
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" | "users" => Ok(EntityKind::User),
            "location" | "locations" => Ok(EntityKind::Location),
            "department" | "departments" => Ok(EntityKind::Department),
            "agreement-type" | "agreement_type" | "agreementtype" | "agreement-types" => {
                Ok(EntityKind::AgreementType)
            }
            "schedule" | "schedules" => Ok(EntityKind::Schedule),
            _ => Err(format!(
                "Invalid entity kind: {}. Use user, location, department, agreement-type, or schedule",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_format() {
        assert_eq!(EntityKind::Location.placeholder(9999), "Location 9999");
        assert_eq!(EntityKind::User.placeholder(7), "User 7");
        assert_eq!(EntityKind::AgreementType.placeholder(3), "Agreement Type 3");
    }

    #[test]
    fn test_kind_roundtrip_from_str() {
        for kind in [
            EntityKind::User,
            EntityKind::Location,
            EntityKind::Department,
            EntityKind::AgreementType,
            EntityKind::Schedule,
        ] {
            let parsed: EntityKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("shift".parse::<EntityKind>().is_err());
    }
}
